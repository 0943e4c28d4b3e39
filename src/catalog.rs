//! In-memory catalog of what each account holds and how much room it has.
//!
//! The catalog is built on first use by listing the shared folder and
//! querying free space once per account. After that it only changes
//! through [`Catalog::record_put`] and [`Catalog::record_delete`]; it is a
//! cache, so files added or removed by other clients are not seen until the
//! backend is closed and reopened.

use crate::accounts::{Account, AccountRegistry};
use crate::executor::{RemoteCommand, RemoteExecutor};
use crate::{MegapoolError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Cached state for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountEntry {
    /// Free bytes left on the account
    pub free_bytes: u64,
    /// Names of files in the shared folder on this account
    pub files: BTreeSet<String>,
    /// When `free_bytes` was last reported by the remote
    pub checked_at: DateTime<Utc>,
}

/// Per-account usage summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountUsage {
    /// Account login
    pub username: String,
    /// Free bytes left
    pub free_bytes: u64,
    /// Number of files in the shared folder
    pub files: usize,
    /// When the free space was last queried
    pub checked_at: DateTime<Utc>,
}

/// Loaded catalog: username to [`AccountEntry`].
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: BTreeMap<String, AccountEntry>,
}

impl Catalog {
    /// Builds a catalog from known entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, AccountEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Lists the shared folder and queries free space for every account.
    ///
    /// A listing or free-space query that exits non-zero leaves that part of
    /// the account's entry empty or zero for the rest of the session.
    ///
    /// # Errors
    ///
    /// Fails only if the executor cannot run a command at all.
    pub async fn load(registry: &AccountRegistry, executor: &dyn RemoteExecutor) -> Result<Self> {
        let root = registry.remote_root();
        let mut entries = BTreeMap::new();

        for account in registry.accounts() {
            let listing = executor.execute(RemoteCommand::List, account, &[root]).await?;
            let files = if listing.success() {
                parse_listing(&listing.stdout, root)
            } else {
                warn!(
                    account = account.username(),
                    stderr = listing.stderr.trim(),
                    "listing failed, treating account as empty"
                );
                BTreeSet::new()
            };

            let quota = executor.execute(RemoteCommand::FreeSpace, account, &[]).await?;
            let checked_at = Utc::now();
            let free_bytes = match parse_free_space(&quota.stdout) {
                Some(free) if quota.success() => free,
                _ => {
                    warn!(
                        account = account.username(),
                        status = quota.status,
                        stderr = quota.stderr.trim(),
                        "free space query failed, treating account as full"
                    );
                    0
                }
            };

            debug!(
                account = account.username(),
                files = files.len(),
                free_bytes,
                "loaded account"
            );
            entries.insert(
                account.username().to_string(),
                AccountEntry {
                    free_bytes,
                    files,
                    checked_at,
                },
            );
        }

        let catalog = Self::from_entries(entries);
        info!(
            accounts = catalog.entries.len(),
            files = catalog.entries.values().map(|e| e.files.len()).sum::<usize>(),
            free_bytes = catalog.total_free(),
            "remote catalog loaded"
        );
        Ok(catalog)
    }

    /// Entries in account order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &AccountEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// The entry of one account.
    pub fn entry(&self, username: &str) -> Option<&AccountEntry> {
        self.entries.get(username)
    }

    /// Files believed to be on an account.
    pub fn files_of(&self, username: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(username).map(|e| &e.files)
    }

    /// Free bytes believed to be left on an account (0 if unknown).
    pub fn free_of(&self, username: &str) -> u64 {
        self.entries.get(username).map(|e| e.free_bytes).unwrap_or(0)
    }

    /// Sum of free bytes over all accounts.
    pub fn total_free(&self) -> u64 {
        self.entries.values().map(|e| e.free_bytes).sum()
    }

    /// Every file name, account by account.
    pub fn all_files(&self) -> Vec<String> {
        self.entries
            .values()
            .flat_map(|e| e.files.iter().cloned())
            .collect()
    }

    /// First account (in account order) holding `filename`.
    pub fn owner_of(&self, filename: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.files.contains(filename))
            .map(|(name, _)| name.as_str())
    }

    /// Usage summary per account.
    pub fn usage(&self) -> Vec<AccountUsage> {
        self.entries
            .iter()
            .map(|(name, entry)| AccountUsage {
                username: name.clone(),
                free_bytes: entry.free_bytes,
                files: entry.files.len(),
                checked_at: entry.checked_at,
            })
            .collect()
    }

    /// Records a successful upload of `size` bytes to `username`.
    pub fn record_put(&mut self, username: &str, filename: &str, size: u64) {
        let entry = self.entries.entry(username.to_string()).or_default();
        entry.files.insert(filename.to_string());
        entry.free_bytes = entry.free_bytes.saturating_sub(size);
    }

    /// Records a successful removal of `filename` from `account`, then asks
    /// the remote how much space the account has now.
    ///
    /// # Errors
    ///
    /// Returns [`MegapoolError::RemoteOperation`] if the free-space query
    /// fails. The file is already gone from the catalog at that point.
    pub async fn record_delete(
        &mut self,
        account: &Account,
        filename: &str,
        executor: &dyn RemoteExecutor,
    ) -> Result<()> {
        let entry = self.entries.entry(account.username().to_string()).or_default();
        entry.files.remove(filename);

        let output = executor
            .execute(RemoteCommand::FreeSpace, account, &[])
            .await?
            .into_result(RemoteCommand::FreeSpace)?;
        let free = parse_free_space(&output.stdout).ok_or_else(|| {
            MegapoolError::Other(anyhow::anyhow!(
                "unexpected {} output: {:?}",
                RemoteCommand::FreeSpace,
                output.stdout.trim()
            ))
        })?;

        entry.free_bytes = free;
        entry.checked_at = Utc::now();
        Ok(())
    }
}

/// Turns a folder listing into bare file names.
///
/// Each line is an absolute path; the root plus one `/` is stripped. Lines
/// outside the root, the root itself, and entries in sub-folders are dropped.
///
/// megals does not mark folders in this format, so a sub-folder directly
/// under the root (`/Root/backup/sub`) is reported as a file named `sub`.
pub(crate) fn parse_listing(stdout: &str, root: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim_end_matches('\r').strip_prefix(root))
        .filter_map(|rest| rest.strip_prefix('/'))
        .filter(|name| !name.is_empty() && !name.contains('/'))
        .map(str::to_string)
        .collect()
}

/// Parses the bare integer printed by the free-space command.
pub(crate) fn parse_free_space(stdout: &str) -> Option<u64> {
    stdout.trim().parse().ok()
}

/// Lazily loaded catalog shared by one backend.
///
/// The catalog stays `None` until the first [`RemoteCatalog::lock`]. The
/// lock is held for the whole of an operation, so placement, the remote
/// call and the catalog update happen as one step.
#[derive(Debug, Default)]
pub struct RemoteCatalog {
    state: Mutex<Option<Catalog>>,
}

impl RemoteCatalog {
    /// Creates an unloaded catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the catalog, loading it first if this is the first access.
    ///
    /// If loading fails the catalog stays unloaded and the next call tries
    /// again.
    pub async fn lock(
        &self,
        registry: &AccountRegistry,
        executor: &dyn RemoteExecutor,
    ) -> Result<MappedMutexGuard<'_, Catalog>> {
        let mut guard = self.state.lock().await;
        if guard.is_none() {
            *guard = Some(Catalog::load(registry, executor).await?);
        }

        MutexGuard::try_map(guard, |state| state.as_mut()).map_err(|_| {
            MegapoolError::Other(anyhow::anyhow!("remote catalog vanished while locked"))
        })
    }

    /// True once the catalog has been loaded.
    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Drops the loaded catalog; the next access reloads it.
    pub async fn reset(&self) {
        *self.state.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(free_bytes: u64, files: &[&str]) -> AccountEntry {
        AccountEntry {
            free_bytes,
            files: files.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_listing() {
        let stdout = "/Root/backup\n/Root/backup/a.gpg\n/Root/backup/b.gpg\n\
                      /Root/backup/sub/c.gpg\n/Root/other/d.gpg\n/Root/backupx\n";
        let files = parse_listing(stdout, "/Root/backup");

        let names: Vec<_> = files.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["a.gpg", "b.gpg"]);
    }

    #[test]
    fn test_parse_listing_keeps_direct_subfolder_name() {
        let stdout = "/Root/backup\n/Root/backup/sub\n/Root/backup/sub/c.gpg\n";
        let files = parse_listing(stdout, "/Root/backup");

        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["sub"]);
    }

    #[test]
    fn test_parse_listing_empty() {
        assert!(parse_listing("", "/Root/backup").is_empty());
        assert!(parse_listing("/Root/backup\n", "/Root/backup").is_empty());
    }

    #[test]
    fn test_parse_free_space() {
        assert_eq!(parse_free_space("53687091200\n"), Some(53_687_091_200));
        assert_eq!(parse_free_space("  7 "), Some(7));
        assert_eq!(parse_free_space("Free: 7 GiB"), None);
        assert_eq!(parse_free_space(""), None);
    }

    #[test]
    fn test_record_put_touches_only_target() {
        let mut catalog = Catalog::from_entries([
            ("a".to_string(), entry(100, &[])),
            ("b".to_string(), entry(50, &["x"])),
        ]);

        catalog.record_put("a", "new", 60);

        assert_eq!(catalog.free_of("a"), 40);
        assert_eq!(catalog.files_of("a").unwrap().len(), 1);
        assert!(catalog.files_of("a").unwrap().contains("new"));
        assert_eq!(catalog.entry("b"), Some(&entry(50, &["x"])));
    }

    #[test]
    fn test_all_files_and_owner() {
        let catalog = Catalog::from_entries([
            ("a".to_string(), entry(1, &["one", "two"])),
            ("b".to_string(), entry(1, &["three"])),
        ]);

        assert_eq!(catalog.all_files(), vec!["one", "two", "three"]);
        assert_eq!(catalog.owner_of("three"), Some("b"));
        assert_eq!(catalog.owner_of("four"), None);
    }

    #[test]
    fn test_usage() {
        let catalog = Catalog::from_entries([("a".to_string(), entry(9, &["one"]))]);
        assert_eq!(
            catalog.usage(),
            vec![AccountUsage {
                username: "a".to_string(),
                free_bytes: 9,
                files: 1,
                checked_at: DateTime::<Utc>::default(),
            }]
        );
    }

    #[cfg(feature = "mock")]
    mod remote {
        use super::super::*;
        use crate::executor::mock::MockExecutor;
        use crate::Config;

        async fn setup() -> (MockExecutor, AccountRegistry) {
            let mock = MockExecutor::new();
            mock.add_account("alice", "pa", 100).await;
            mock.add_account("bob", "pb", 50).await;
            mock.put_file("alice", "/Root/backup/one", vec![0u8; 10]).await;
            mock.put_file("bob", "/Root/backup/two", vec![0u8; 5]).await;

            let config = Config::new("/Root/backup")
                .with_account("alice", "pa")
                .with_account("bob", "pb");
            (mock, AccountRegistry::from_config(&config).unwrap())
        }

        #[tokio::test]
        async fn test_load() {
            let (mock, registry) = setup().await;
            let before = Utc::now();
            let catalog = Catalog::load(&registry, &mock).await.unwrap();

            assert!(catalog.usage().iter().all(|u| u.checked_at >= before));
            assert_eq!(catalog.free_of("alice"), 90);
            assert_eq!(catalog.free_of("bob"), 45);
            assert_eq!(catalog.all_files(), vec!["one", "two"]);
        }

        #[tokio::test]
        async fn test_failed_queries_contribute_nothing() {
            let (mock, registry) = setup().await;
            mock.set_free_output("bob", "garbage").await;
            mock.fail_command(RemoteCommand::List, "ERROR: network").await;

            let catalog = Catalog::load(&registry, &mock).await.unwrap();

            assert_eq!(catalog.free_of("alice"), 90);
            assert_eq!(catalog.free_of("bob"), 0);
            assert!(catalog.all_files().is_empty());
        }

        #[tokio::test]
        async fn test_lock_loads_once() {
            let (mock, registry) = setup().await;
            let remote = RemoteCatalog::new();
            assert!(!remote.is_loaded().await);

            for _ in 0..3 {
                let catalog = remote.lock(&registry, &mock).await.unwrap();
                assert_eq!(catalog.all_files().len(), 2);
            }

            assert!(remote.is_loaded().await);
            assert_eq!(mock.calls(RemoteCommand::List, "alice").await, 1);
            assert_eq!(mock.calls(RemoteCommand::List, "bob").await, 1);
            assert_eq!(mock.calls(RemoteCommand::FreeSpace, "alice").await, 1);
            assert_eq!(mock.calls(RemoteCommand::FreeSpace, "bob").await, 1);

            remote.reset().await;
            assert!(!remote.is_loaded().await);
        }

        #[tokio::test]
        async fn test_record_delete_requeries_free_space() {
            let (mock, registry) = setup().await;
            let mut catalog = Catalog::load(&registry, &mock).await.unwrap();

            let alice_checked = catalog.entry("alice").unwrap().checked_at;
            let before_delete = Utc::now();

            // Remote reclaims more than the file size.
            mock.set_free_output("bob", "77\n").await;
            let bob = registry.account("bob").unwrap();
            catalog.record_delete(bob, "two", &mock).await.unwrap();

            assert_eq!(catalog.free_of("bob"), 77);
            assert!(catalog.entry("bob").unwrap().checked_at >= before_delete);
            assert_eq!(catalog.entry("alice").unwrap().checked_at, alice_checked);
            assert!(catalog.files_of("bob").unwrap().is_empty());
            assert_eq!(catalog.files_of("alice").unwrap().len(), 1);
            assert_eq!(mock.calls(RemoteCommand::FreeSpace, "bob").await, 2);
        }

        #[tokio::test]
        async fn test_record_delete_surfaces_query_failure() {
            let (mock, registry) = setup().await;
            let mut catalog = Catalog::load(&registry, &mock).await.unwrap();
            mock.fail_command(RemoteCommand::FreeSpace, "ERROR: quota").await;

            let bob = registry.account("bob").unwrap();
            let err = catalog.record_delete(bob, "two", &mock).await.unwrap_err();

            assert!(matches!(err, MegapoolError::RemoteOperation { .. }));
            assert!(catalog.files_of("bob").unwrap().is_empty());
        }
    }
}
