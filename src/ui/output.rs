//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. The keys of
//! a log are command results rather than chatter, so [`result`] prints them
//! even in quiet mode.

use std::fmt::Display;

use crate::core::snapshot::SnapshotSummary;
use crate::log::LogIdentity;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print command result data (always shown).
pub fn result(message: impl Display) {
    println!("{}", message);
}

/// Format the keys of a log, one per line.
///
/// # Example
///
/// ```
/// use ipvl::log::LogIdentity;
/// use ipvl::ui::output::format_identity;
///
/// let identity = LogIdentity {
///     public_key: vec![0xab],
///     secret_key: vec![0xcd],
///     discovery_key: vec![0xef],
/// };
/// let text = format_identity(&identity);
/// assert!(text.contains("Public key:    ab"));
/// assert!(text.contains("(keep secret)"));
/// ```
pub fn format_identity(identity: &LogIdentity) -> String {
    [
        format!("Public key:    {}", identity.public_key_hex()),
        format!("Discovery key: {}", identity.discovery_key_hex()),
        format!("Secret key:    {} (keep secret)", identity.secret_key_hex()),
    ]
    .join("\n")
}

/// Format what a snapshot contains.
pub fn format_summary(summary: &SnapshotSummary) -> String {
    let mut text = format!(
        "{} {}, {} {}, {}",
        summary.files,
        plural(summary.files, "file", "files"),
        summary.directories,
        plural(summary.directories, "directory", "directories"),
        format_bytes(summary.bytes)
    );
    if summary.symlinks > 0 {
        text.push_str(&format!(
            ", {} {}",
            summary.symlinks,
            plural(summary.symlinks, "symlink", "symlinks")
        ));
    }
    text
}

/// Format a byte count with a binary unit.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}
