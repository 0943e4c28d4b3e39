//! MEGA backend driven by megatools.
//!
//! Files are kept in one remote folder that exists on every configured
//! account. Each file lives on exactly one account; uploads go to the
//! account with the most free space.
//!
//! # Requirements
//!
//! - `megatools` (`megamkdir`, `megaput`, `megaget`, `megals`, `megarm`, `megadf`)
//!
//! # URL schemes
//!
//! - `mega://user%40example.com:password@/Root/backup`: one account. The
//!   password may instead come from `MEGA_PASSWORD` or `FTP_PASSWORD`.
//! - `megapool:///path/to/accounts.toml`: several accounts listed in an
//!   accounts document (see [`Config`](crate::Config)).
//!
//! # Example
//!
//! ```no_run
//! use megapool::backends::mega::MegaBackend;
//! use megapool::{Backend, Config};
//!
//! #[tokio::main]
//! async fn main() -> megapool::Result<()> {
//!     let config = Config::from_file("/etc/megapool/accounts.toml")?;
//!     let mut backend = MegaBackend::new(config)?;
//!     backend.init().await?;
//!
//!     for usage in backend.free_space().await? {
//!         println!("{}: {} bytes free", usage.username, usage.free_bytes);
//!     }
//!     Ok(())
//! }
//! ```

mod backend;

pub use backend::MegaBackend;

use crate::url::BackendUrl;
use crate::{Backend, Config, MegapoolError, Result};

/// Environment variables consulted for a password missing from the URL.
pub const PASSWORD_ENV_VARS: [&str; 2] = ["MEGA_PASSWORD", "FTP_PASSWORD"];

/// Builds a single-account configuration from a `mega://` URL.
pub fn single_account_config(url: &BackendUrl) -> Result<Config> {
    let username = url
        .username
        .clone()
        .ok_or_else(|| MegapoolError::Config("URL has no user name".to_string()))?;

    let password = match &url.password {
        Some(password) => password.clone(),
        None => PASSWORD_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .ok_or_else(|| {
                MegapoolError::Config(format!(
                    "no password in URL and none of {} is set",
                    PASSWORD_ENV_VARS.join(", ")
                ))
            })?,
    };

    if url.path.is_empty() {
        return Err(MegapoolError::Config("URL has no remote path".to_string()));
    }

    Ok(Config::single(username, password, url.path.clone()))
}

/// Builds a multi-account configuration from a `megapool://` URL.
pub fn pool_config(url: &BackendUrl) -> Result<Config> {
    if url.path.is_empty() {
        return Err(MegapoolError::Config(
            "URL does not name an accounts file".to_string(),
        ));
    }
    Config::from_file(&url.path)
}

/// Registers the `mega` and `megapool` schemes with the factory.
pub fn register() {
    crate::factory::register_backend("mega", |url| {
        let backend: Box<dyn Backend> = Box::new(MegaBackend::new(single_account_config(url)?)?);
        Ok(backend)
    });
    crate::factory::register_backend("megapool", |url| {
        let backend: Box<dyn Backend> = Box::new(MegaBackend::new(pool_config(url)?)?);
        Ok(backend)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_account_config() {
        let url = BackendUrl::parse("mega://alice%40example.com:pw@/Root/backup").unwrap();
        let config = single_account_config(&url).unwrap();

        assert_eq!(config.remote_path, "/Root/backup");
        assert_eq!(config.accounts["alice@example.com"], "pw");
    }

    #[test]
    fn test_single_account_requires_path() {
        let url = BackendUrl::parse("mega://alice:pw@").unwrap();
        assert!(matches!(
            single_account_config(&url),
            Err(MegapoolError::Config(_))
        ));
    }

    #[test]
    fn test_pool_config_reads_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(
            &path,
            r#"{"path": "/Root/pool", "accounts": {"a": "1", "b": "2"}}"#,
        )
        .unwrap();

        let url = BackendUrl::parse(&format!("megapool://{}", path.display())).unwrap();
        let config = pool_config(&url).unwrap();

        assert_eq!(config.remote_path, "/Root/pool");
        assert_eq!(config.accounts.len(), 2);
    }
}
