//! core::ignore
//!
//! Ignore rule resolution for snapshots.
//!
//! # Sources
//!
//! Patterns come from exactly one file:
//! 1. `.ipvlignore` if it exists
//! 2. otherwise `.gitignore` if it exists
//! 3. otherwise no patterns
//!
//! When `.ipvlignore` exists the fallback is never read, even if it would
//! fail to parse.
//!
//! # Syntax
//!
//! Lines follow gitignore conventions:
//! - blank lines and lines starting with `#` are skipped
//! - `!pattern` re-includes paths excluded by earlier lines
//! - `dir/` only matches directories
//! - a pattern without an inner `/` matches at any depth, otherwise it is
//!   anchored to the project root (a leading `/` forces anchoring)
//! - `\#` and `\!` escape a literal leading `#` or `!`
//! - trailing spaces are dropped unless escaped as `\ `
//!
//! # Resolution
//!
//! [`IgnoreRules::resolve`] is a pure function of the workspace and the
//! filesystem at call time. Matching walks the project tree once without
//! following symlinks and never enters the control directory. Nothing is
//! cached between invocations, so files created after a resolve are never
//! excluded by a stale set. The control directory is always part of the
//! exclusion set and cannot be re-included.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use thiserror::Error;
use tracing::debug;

use crate::core::paths::WorkspacePaths;

/// Errors from ignore rule resolution.
///
/// Any of these aborts publication before copying starts.
#[derive(Debug, Error)]
pub enum IgnoreError {
    /// The ignore file exists but could not be read (or is not UTF-8).
    #[error("failed to read ignore file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A line is not a valid glob pattern.
    #[error("invalid ignore pattern '{pattern}' on line {line}: {message}")]
    InvalidPattern {
        pattern: String,
        line: usize,
        message: String,
    },

    /// The project tree could not be walked while matching patterns.
    #[error("failed to walk '{path}' while matching ignore patterns: {source}")]
    Walk {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The expansion task did not complete.
    #[error("ignore expansion task failed: {0}")]
    Task(String),
}

/// Where the active patterns were loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreSource {
    /// The project-specific `.ipvlignore`.
    Project(PathBuf),
    /// The fallback `.gitignore`.
    Fallback(PathBuf),
    /// No ignore file exists.
    None,
}

/// A single parsed ignore line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule {
    /// The glob body, without `!`, leading `/` or trailing `/`.
    pub pattern: String,
    /// 1-based line number in the source file.
    pub line: usize,
    /// `!pattern`
    pub negated: bool,
    /// `pattern/`
    pub dir_only: bool,
    /// Anchored to the project root rather than matching at any depth.
    pub anchored: bool,
}

impl IgnoreRule {
    /// The glob expression for this rule, relative to the project root.
    ///
    /// Unanchored rules are prefixed with `**/` so they match at any depth.
    pub fn glob(&self) -> String {
        if self.anchored {
            self.pattern.clone()
        } else {
            format!("**/{}", self.pattern)
        }
    }

    fn compile(&self) -> Result<Vec<Pattern>, IgnoreError> {
        let mut exprs = vec![self.glob()];
        if !self.anchored {
            // top-level entries are matched by the bare pattern as well
            exprs.push(self.pattern.clone());
        }
        exprs
            .iter()
            .map(|expr| {
                Pattern::new(expr).map_err(|e| IgnoreError::InvalidPattern {
                    pattern: self.pattern.clone(),
                    line: self.line,
                    message: e.msg.to_string(),
                })
            })
            .collect()
    }
}

/// Parse ignore file contents into ordered rules.
///
/// Parsing never fails; pattern validity is checked during expansion.
///
/// # Example
///
/// ```
/// use ipvl::core::ignore::parse_ignore;
///
/// let rules = parse_ignore("# deps\nnode_modules/\n/dist\n!keep.log\n");
/// assert_eq!(rules.len(), 3);
/// assert!(rules[0].dir_only && !rules[0].anchored);
/// assert!(rules[1].anchored);
/// assert!(rules[2].negated);
/// ```
pub fn parse_ignore(contents: &str) -> Vec<IgnoreRule> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| parse_line(raw, idx + 1))
        .collect()
}

fn parse_line(raw: &str, line: usize) -> Option<IgnoreRule> {
    let trimmed = raw.trim_end();
    // `foo\ ` keeps one literal trailing space
    let unescaped;
    let trimmed = if trimmed.ends_with('\\') && raw[trimmed.len()..].starts_with(' ') {
        unescaped = format!("{} ", &trimmed[..trimmed.len() - 1]);
        unescaped.as_str()
    } else {
        trimmed
    };
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let (negated, body) = if let Some(rest) = trimmed.strip_prefix('!') {
        (true, rest)
    } else if let Some(rest) = trimmed.strip_prefix('\\') {
        // \# and \! keep the literal character
        (false, rest)
    } else {
        (false, trimmed)
    };

    let dir_only = body.ends_with('/');
    let body = body.trim_end_matches('/');
    let leading_slash = body.starts_with('/');
    let body = body.trim_start_matches('/');
    if body.is_empty() {
        return None;
    }

    Some(IgnoreRule {
        pattern: body.to_string(),
        line,
        negated,
        dir_only,
        anchored: leading_slash || body.contains('/'),
    })
}

/// The resolved exclusion set for one publish or update.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    source: IgnoreSource,
    excluded: HashSet<PathBuf>,
    control_dir: PathBuf,
}

impl IgnoreRules {
    /// Load the active ignore file and expand it against the filesystem.
    ///
    /// # Errors
    ///
    /// - [`IgnoreError::Read`] if the chosen ignore file cannot be read
    /// - [`IgnoreError::InvalidPattern`] if a line is not a valid glob
    /// - [`IgnoreError::Walk`] if a directory cannot be listed while matching
    pub async fn resolve(paths: &WorkspacePaths) -> Result<Self, IgnoreError> {
        let source = select_source(paths).await?;
        let rules = match &source {
            IgnoreSource::Project(path) | IgnoreSource::Fallback(path) => {
                let contents =
                    tokio::fs::read_to_string(path)
                        .await
                        .map_err(|e| IgnoreError::Read {
                            path: path.clone(),
                            source: e,
                        })?;
                parse_ignore(&contents)
            }
            IgnoreSource::None => Vec::new(),
        };

        let rule_count = rules.len();
        let root = paths.project_root.clone();
        let control_dir = paths.control_dir.clone();
        let mut excluded = tokio::task::spawn_blocking(move || expand(&root, &control_dir, &rules))
            .await
            .map_err(|e| IgnoreError::Task(e.to_string()))??;

        excluded.insert(paths.control_dir.clone());

        debug!(
            source = ?source,
            rules = rule_count,
            excluded = excluded.len(),
            "resolved ignore rules"
        );

        Ok(Self {
            source,
            excluded,
            control_dir: paths.control_dir.clone(),
        })
    }

    /// Whether `path` is excluded from the snapshot.
    ///
    /// Only exact members of the set match; descendants of an excluded
    /// directory are skipped because traversal never enters it.
    pub fn is_excluded(&self, path: &Path) -> bool {
        path == self.control_dir || self.excluded.contains(path)
    }

    /// Where the rules came from.
    pub fn source(&self) -> &IgnoreSource {
        &self.source
    }
}

async fn select_source(paths: &WorkspacePaths) -> Result<IgnoreSource, IgnoreError> {
    for (path, project) in [
        (&paths.project_ignore_path, true),
        (&paths.fallback_ignore_path, false),
    ] {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| IgnoreError::Read {
                path: path.clone(),
                source: e,
            })?;
        if exists {
            return Ok(if project {
                IgnoreSource::Project(path.clone())
            } else {
                IgnoreSource::Fallback(path.clone())
            });
        }
    }
    Ok(IgnoreSource::None)
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Walk the project tree once and apply every rule to each entry.
///
/// Symlinks are matched as entries but never followed, and the control
/// directory is pruned, so the walk is bounded by the project itself.
fn expand(
    root: &Path,
    control_dir: &Path,
    rules: &[IgnoreRule],
) -> Result<HashSet<PathBuf>, IgnoreError> {
    let compiled = rules
        .iter()
        .map(|rule| rule.compile().map(|patterns| (rule, patterns)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut excluded = HashSet::new();
    if compiled.is_empty() {
        return Ok(excluded);
    }

    let walk_err = |path: &Path, source| IgnoreError::Walk {
        path: path.to_path_buf(),
        source,
    };

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| walk_err(&dir, e))? {
            let entry = entry.map_err(|e| walk_err(&dir, e))?;
            let path = entry.path();
            if path == control_dir {
                continue;
            }
            let is_dir = entry
                .file_type()
                .map_err(|e| walk_err(&path, e))?
                .is_dir();

            let relative = path.strip_prefix(root).unwrap_or(path.as_path());
            if matches_rules(&compiled, relative, is_dir) {
                excluded.insert(path.clone());
            }
            if is_dir {
                pending.push(path);
            }
        }
    }
    Ok(excluded)
}

/// Last matching rule wins; a negated match re-includes.
fn matches_rules(rules: &[(&IgnoreRule, Vec<Pattern>)], relative: &Path, is_dir: bool) -> bool {
    let mut excluded = false;
    for (rule, patterns) in rules {
        if rule.dir_only && !is_dir {
            continue;
        }
        if patterns
            .iter()
            .any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
        {
            excluded = !rule.negated;
        }
    }
    excluded
}
