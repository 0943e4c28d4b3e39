//! Configuration types for backend initialization.
//!
//! A backend is configured either with a single MEGA login or with an
//! accounts document that lists several logins sharing one remote folder:
//!
//! ```toml
//! path = "/Root/backup"
//!
//! [accounts]
//! "alice@example.com" = "first-password"
//! "bob@example.com" = "second-password"
//! ```
//!
//! The same document may be written as JSON when the file ends in `.json`.

use crate::{MegapoolError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Format of an accounts document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `{"path": "...", "accounts": {"user": "password"}}`
    Json,
    /// `path = "..."` plus an `[accounts]` table
    Toml,
}

impl DocumentFormat {
    /// Picks the format from a file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Raw multi-account document as written on disk.
#[derive(Debug, Deserialize)]
struct AccountsDocument {
    path: Option<String>,
    accounts: Option<BTreeMap<String, String>>,
}

/// Configuration for creating a backend.
///
/// ```
/// use megapool::Config;
///
/// let config = Config::new("/Root/backup")
///     .with_account("alice@example.com", "secret-1")
///     .with_account("bob@example.com", "secret-2");
///
/// assert_eq!(config.accounts.len(), 2);
/// ```
#[derive(Clone)]
pub struct Config {
    /// Remote folder shared by every account (e.g. `/Root/backup`)
    pub remote_path: String,

    /// Username to password mapping
    pub accounts: BTreeMap<String, String>,

    /// Create the remote folder on every account during `init()` (default: true)
    pub create_root: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("remote_path", &self.remote_path)
            .field("accounts", &self.accounts.keys().collect::<Vec<_>>())
            .field("create_root", &self.create_root)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with no accounts yet.
    pub fn new(remote_path: impl Into<String>) -> Self {
        Self {
            remote_path: remote_path.into(),
            accounts: BTreeMap::new(),
            create_root: true,
        }
    }

    /// Creates a single-account configuration.
    pub fn single(
        username: impl Into<String>,
        password: impl Into<String>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self::new(remote_path).with_account(username, password)
    }

    /// Adds an account. A repeated username replaces the earlier password.
    pub fn with_account(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.accounts.insert(username.into(), password.into());
        self
    }

    /// Controls whether `init()` creates the remote folder.
    pub fn with_create_root(mut self, create_root: bool) -> Self {
        self.create_root = create_root;
        self
    }

    /// Parses an accounts document.
    ///
    /// # Errors
    ///
    /// Returns [`MegapoolError::Config`] if `path` or `accounts` is missing
    /// or `accounts` is empty, and a JSON/TOML error if the text is malformed.
    pub fn parse_document(text: &str, format: DocumentFormat) -> Result<Self> {
        let doc: AccountsDocument = match format {
            DocumentFormat::Json => serde_json::from_str(text)?,
            DocumentFormat::Toml => toml::from_str(text)?,
        };

        let path = doc
            .path
            .ok_or_else(|| MegapoolError::Config("missing required key 'path'".to_string()))?;
        let accounts = doc
            .accounts
            .ok_or_else(|| MegapoolError::Config("missing required key 'accounts'".to_string()))?;

        if accounts.is_empty() {
            return Err(MegapoolError::Config(
                "'accounts' must list at least one account".to_string(),
            ));
        }

        Ok(Self {
            remote_path: path,
            accounts,
            create_root: true,
        })
    }

    /// Loads an accounts document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`MegapoolError::Config`] if the file cannot be read, in
    /// addition to the errors of [`Config::parse_document`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MegapoolError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::parse_document(&text, DocumentFormat::from_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_builder() {
        let config = Config::single("alice@example.com", "pw", "/Root/backup")
            .with_create_root(false);

        assert_eq!(config.remote_path, "/Root/backup");
        assert_eq!(config.accounts.get("alice@example.com"), Some(&"pw".to_string()));
        assert!(!config.create_root);
    }

    #[test]
    fn test_parse_toml_document() {
        let text = r#"
            path = "/Root/backup"

            [accounts]
            "alice@example.com" = "one"
            "bob@example.com" = "two"
        "#;
        let config = Config::parse_document(text, DocumentFormat::Toml).unwrap();

        assert_eq!(config.remote_path, "/Root/backup");
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts["bob@example.com"], "two");
    }

    #[test]
    fn test_parse_json_document() {
        let text = r#"{"path": "/Root/b", "accounts": {"carol": "three"}}"#;
        let config = Config::parse_document(text, DocumentFormat::Json).unwrap();

        assert_eq!(config.remote_path, "/Root/b");
        assert_eq!(config.accounts["carol"], "three");
    }

    #[test]
    fn test_missing_path_is_config_error() {
        let text = r#"{"accounts": {"carol": "three"}}"#;
        let err = Config::parse_document(text, DocumentFormat::Json).unwrap_err();

        assert!(matches!(err, MegapoolError::Config(ref m) if m.contains("'path'")));
    }

    #[test]
    fn test_missing_accounts_is_config_error() {
        let err = Config::parse_document("path = \"/Root\"", DocumentFormat::Toml).unwrap_err();

        assert!(matches!(err, MegapoolError::Config(ref m) if m.contains("'accounts'")));
    }

    #[test]
    fn test_empty_accounts_is_config_error() {
        let text = r#"{"path": "/Root", "accounts": {}}"#;
        let err = Config::parse_document(text, DocumentFormat::Json).unwrap_err();

        assert!(matches!(err, MegapoolError::Config(_)));
    }

    #[test]
    fn test_debug_hides_passwords() {
        let config = Config::single("alice", "hunter2", "/Root");
        let debug = format!("{:?}", config);

        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("a.JSON")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("a.toml")), DocumentFormat::Toml);
        assert_eq!(DocumentFormat::from_path(Path::new("accounts")), DocumentFormat::Toml);
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, r#"{"path": "/Root/x", "accounts": {"u": "p"}}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.remote_path, "/Root/x");
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::from_file(dir.path().join("nope.toml")).unwrap_err();

        assert!(matches!(err, MegapoolError::Config(ref m) if m.contains("cannot read")));
    }
}
