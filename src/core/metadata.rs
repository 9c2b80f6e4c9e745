//! core::metadata
//!
//! Project metadata read from `package.json`.
//!
//! Only `name`, `description` and `author` are consumed. Every field is
//! optional: a missing or malformed file yields a [`MetadataError`] that the
//! caller logs and replaces with [`PackageMetadata::default`]. A field with
//! an unexpected type is dropped on its own, with a warning; the other
//! fields still apply.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// File name of the package metadata at the project root.
pub const PACKAGE_FILE: &str = "package.json";

/// Errors from reading package metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Fields of `package.json` that travel with a version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
}

/// npm accepts `author` as a string or as `{ name, email, url }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Author {
    Text(String),
    Person {
        name: Option<String>,
        email: Option<String>,
        url: Option<String>,
    },
}

impl Author {
    fn render(self) -> Option<String> {
        match self {
            Author::Text(text) => Some(text),
            Author::Person { name, email, url } => {
                let mut parts = Vec::new();
                if let Some(name) = name {
                    parts.push(name);
                }
                if let Some(email) = email {
                    parts.push(format!("<{}>", email));
                }
                if let Some(url) = url {
                    parts.push(format!("({})", url));
                }
                (!parts.is_empty()).then(|| parts.join(" "))
            }
        }
    }
}

/// Take `field` from the top-level object, dropping it if it is mistyped.
fn take_field<T: DeserializeOwned>(object: &mut Map<String, Value>, field: &str) -> Option<T> {
    let value = object.remove(field)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field, error = %e, "ignoring malformed package.json field");
            None
        }
    }
}

impl PackageMetadata {
    /// Parse metadata from `package.json` contents.
    ///
    /// # Example
    ///
    /// ```
    /// use ipvl::core::metadata::PackageMetadata;
    ///
    /// let meta = PackageMetadata::parse(
    ///     r#"{"name": "demo", "author": {"name": "Ada", "email": "ada@example.com"}}"#,
    /// ).unwrap();
    /// assert_eq!(meta.name.as_deref(), Some("demo"));
    /// assert_eq!(meta.author.as_deref(), Some("Ada <ada@example.com>"));
    /// assert!(meta.description.is_none());
    /// ```
    ///
    /// # Errors
    ///
    /// Fails only if `contents` is not a JSON object.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let mut object: Map<String, Value> = serde_json::from_str(contents)?;
        Ok(Self {
            name: take_field(&mut object, "name"),
            description: take_field(&mut object, "description"),
            author: take_field::<Author>(&mut object, "author").and_then(Author::render),
        })
    }

    /// Read `package.json` from the project root.
    pub async fn read(project_root: &Path) -> Result<Self, MetadataError> {
        let path = project_root.join(PACKAGE_FILE);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| MetadataError::Read {
                path: path.clone(),
                source: e,
            })?;
        Self::parse(&contents).map_err(|e| MetadataError::Parse { path, source: e })
    }
}
