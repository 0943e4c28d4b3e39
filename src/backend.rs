//! Backend trait definition.
//!
//! This module defines the [`Backend`] trait a backup tool talks to: upload
//! one local file as one remote object, fetch one remote object to one
//! local path, enumerate remote object names, and remove one remote object.

use crate::catalog::AccountUsage;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// A storage backend for backup volumes.
///
/// Implementations must be `Send + Sync`; mutating operations take `&self`
/// and serialize internally.
///
/// # Example
///
/// ```no_run
/// use megapool::{factory, Backend};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> megapool::Result<()> {
///     megapool::init();
///
///     let mut backend = factory::new_backend("mega://alice%40example.com:pw@/Root/backup")?;
///     backend.init().await?;
///
///     backend.put(Path::new("/tmp/vol1.difftar.gpg"), "vol1.difftar.gpg").await?;
///     for name in backend.list().await? {
///         println!("{}", name);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the backend name (e.g. "mega").
    fn name(&self) -> &str;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Prepares the backend.
    ///
    /// For megatools this checks the programs are installed and creates the
    /// remote folder on every account.
    ///
    /// # Errors
    ///
    /// Returns [`MegapoolError::BackendNotInstalled`](crate::MegapoolError::BackendNotInstalled)
    /// if the required CLI tools are not available.
    async fn init(&mut self) -> Result<()>;

    /// Ends the session. Cached listings are dropped.
    async fn close(&mut self) -> Result<()>;

    // ========================================================================
    // Object operations
    // ========================================================================

    /// Uploads `local` as `remote_name`.
    ///
    /// # Errors
    ///
    /// - [`MegapoolError::InsufficientCapacity`](crate::MegapoolError::InsufficientCapacity):
    ///   no account has room for the file
    /// - [`MegapoolError::RemoteOperation`](crate::MegapoolError::RemoteOperation):
    ///   the upload command failed
    /// - [`MegapoolError::InvalidFileName`](crate::MegapoolError::InvalidFileName):
    ///   `remote_name` is not a plain file name
    async fn put(&self, local: &Path, remote_name: &str) -> Result<()>;

    /// Downloads `remote_name` into `local`.
    ///
    /// # Errors
    ///
    /// - [`MegapoolError::NotFound`](crate::MegapoolError::NotFound):
    ///   no account holds the file
    /// - [`MegapoolError::RemoteOperation`](crate::MegapoolError::RemoteOperation):
    ///   the download command failed
    async fn get(&self, remote_name: &str, local: &Path) -> Result<()>;

    /// Lists all remote file names.
    async fn list(&self) -> Result<Vec<String>>;

    /// Removes `remote_name`.
    ///
    /// # Errors
    ///
    /// - [`MegapoolError::NotFound`](crate::MegapoolError::NotFound):
    ///   no account holds the file
    /// - [`MegapoolError::RemoteOperation`](crate::MegapoolError::RemoteOperation):
    ///   the delete command or the follow-up free-space query failed
    async fn delete(&self, remote_name: &str) -> Result<()>;

    /// Reports free space and file count per account.
    async fn free_space(&self) -> Result<Vec<AccountUsage>>;
}
