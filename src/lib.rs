//! Megapool - MEGA storage backend for backup tools.
//!
//! Megapool stores backup volumes on MEGA by running the `megatools`
//! programs, and can spread one backup over several MEGA accounts that
//! share a remote folder. Each new file is placed on the account with the
//! most free space.
//!
//! # Features
//!
//! - **Backup backend contract**: `put`, `get`, `list`, `delete`
//! - **Multiple accounts**: capacity-aware placement across logins
//! - **Lazy catalog**: one listing and one quota query per account per session
//! - **Pluggable executor**: run megatools, or an in-memory mock for tests
//! - **Scheme registry**: `mega://` and `megapool://` URLs via [`factory`]
//!
//! # Quick Start
//!
//! ```no_run
//! use megapool::{factory, Backend};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> megapool::Result<()> {
//!     // Register the built-in URL schemes
//!     megapool::init();
//!
//!     let mut backend = factory::new_backend("megapool:///etc/megapool/accounts.toml")?;
//!     backend.init().await?;
//!
//!     backend.put(Path::new("/tmp/vol1.difftar.gpg"), "vol1.difftar.gpg").await?;
//!     backend.get("vol1.difftar.gpg", Path::new("/tmp/restored.gpg")).await?;
//!     backend.delete("vol1.difftar.gpg").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Flag | Default | Provides |
//! |------|---------|----------|
//! | `mock` | yes | [`executor::mock::MockExecutor`] |

pub mod accounts;
pub mod backend;
pub mod backends;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod factory;
pub mod placement;
pub mod url;
pub mod validation;

pub use accounts::{Account, AccountRegistry};
pub use backend::Backend;
pub use catalog::AccountUsage;
pub use config::Config;
pub use error::{MegapoolError, Result};

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the megapool library.
///
/// This registers all compiled backends with the factory. Call it before
/// [`factory::new_backend`]; it is idempotent.
pub fn init() {
    INIT.call_once(backends::register_all);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_initialization() {
        init();
        init();

        assert!(factory::schemes().contains(&"mega".to_string()));
    }
}
