//! Mock executor for testing.
//!
//! Simulates a set of MEGA accounts in memory: each has a quota, a set of
//! folders, and files with contents. Every call is counted per command and
//! username, and commands can be made to fail on demand.

use crate::accounts::Account;
use crate::executor::{CommandOutput, RemoteCommand, RemoteExecutor};
use crate::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MockAccount {
    password: String,
    quota: u64,
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    free_output: Option<String>,
}

impl MockAccount {
    fn used(&self) -> u64 {
        self.files.values().map(|data| data.len() as u64).sum()
    }

    fn free(&self) -> u64 {
        self.quota.saturating_sub(self.used())
    }
}

#[derive(Debug, Default)]
struct MockState {
    accounts: BTreeMap<String, MockAccount>,
    calls: HashMap<(RemoteCommand, String), usize>,
    failures: HashMap<RemoteCommand, String>,
}

/// In-memory stand-in for megatools.
///
/// # Example
///
/// ```
/// use megapool::executor::mock::MockExecutor;
/// use megapool::executor::{RemoteCommand, RemoteExecutor};
/// use megapool::Account;
///
/// #[tokio::main]
/// async fn main() -> megapool::Result<()> {
///     let mock = MockExecutor::new();
///     mock.add_account("alice", "pw", 100).await;
///
///     let out = mock
///         .execute(RemoteCommand::FreeSpace, &Account::new("alice", "pw"), &[])
///         .await?;
///     assert_eq!(out.stdout.trim(), "100");
///     Ok(())
/// }
/// ```
#[derive(Debug, Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
}

impl MockExecutor {
    /// Creates a mock with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account with `quota` bytes of storage and a `/Root` folder.
    pub async fn add_account(&self, username: &str, password: &str, quota: u64) {
        let mut state = self.state.lock().await;
        let account = state.accounts.entry(username.to_string()).or_default();
        account.password = password.to_string();
        account.quota = quota;
        account.dirs.insert("/Root".to_string());
    }

    /// Places a file on an account, creating its parent folder.
    pub async fn put_file(&self, username: &str, remote_path: &str, data: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().await;
        let account = state.accounts.entry(username.to_string()).or_default();
        if let Some((parent, _)) = remote_path.rsplit_once('/') {
            account.dirs.insert(parent.to_string());
        }
        account.files.insert(remote_path.to_string(), data.into());
    }

    /// Remote paths currently stored on an account.
    pub async fn files(&self, username: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .accounts
            .get(username)
            .map(|a| a.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Free bytes currently left on an account.
    pub async fn free(&self, username: &str) -> u64 {
        let state = self.state.lock().await;
        state.accounts.get(username).map(MockAccount::free).unwrap_or(0)
    }

    /// Overrides what the free-space command prints for an account.
    pub async fn set_free_output(&self, username: &str, output: &str) {
        let mut state = self.state.lock().await;
        if let Some(account) = state.accounts.get_mut(username) {
            account.free_output = Some(output.to_string());
        }
    }

    /// Makes every later `command` exit with status 1 and `stderr`.
    pub async fn fail_command(&self, command: RemoteCommand, stderr: &str) {
        let mut state = self.state.lock().await;
        state.failures.insert(command, stderr.to_string());
    }

    /// Removes all injected failures.
    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.failures.clear();
    }

    /// How many times `command` ran as `username`.
    pub async fn calls(&self, command: RemoteCommand, username: &str) -> usize {
        let state = self.state.lock().await;
        state
            .calls
            .get(&(command, username.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// How many times `command` ran for any account.
    pub async fn total_calls(&self, command: RemoteCommand) -> usize {
        let state = self.state.lock().await;
        state
            .calls
            .iter()
            .filter(|((cmd, _), _)| *cmd == command)
            .map(|(_, count)| *count)
            .sum()
    }
}

#[async_trait]
impl RemoteExecutor for MockExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(
        &self,
        command: RemoteCommand,
        account: &Account,
        args: &[&str],
    ) -> Result<CommandOutput> {
        command.check_arity(args)?;

        let mut state = self.state.lock().await;
        *state
            .calls
            .entry((command, account.username().to_string()))
            .or_insert(0) += 1;

        if let Some(stderr) = state.failures.get(&command) {
            return Ok(CommandOutput::failed(1, stderr.clone()));
        }

        let remote = match state.accounts.get_mut(account.username()) {
            Some(remote) if remote.password == account.password() => remote,
            _ => return Ok(CommandOutput::failed(1, "ERROR: Can't login to mega.nz")),
        };

        let output = match command {
            RemoteCommand::MakeDir => {
                if remote.dirs.insert(args[0].to_string()) {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed(1, format!("ERROR: File already exists at {}", args[0]))
                }
            }
            RemoteCommand::Upload => {
                let (remote_path, local_path) = (args[0], args[1]);
                if remote.files.contains_key(remote_path) {
                    return Ok(CommandOutput::failed(
                        1,
                        format!("ERROR: File already exists at {}", remote_path),
                    ));
                }
                let data = match tokio::fs::read(local_path).await {
                    Ok(data) => data,
                    Err(_) => {
                        return Ok(CommandOutput::failed(
                            1,
                            format!("ERROR: Can't open source file {}", local_path),
                        ))
                    }
                };
                if data.len() as u64 > remote.free() {
                    return Ok(CommandOutput::failed(1, "ERROR: Upload failed: Over quota"));
                }
                remote.files.insert(remote_path.to_string(), data);
                CommandOutput::ok("")
            }
            RemoteCommand::Download => {
                let (remote_path, local_path) = (args[0], args[1]);
                match remote.files.get(remote_path) {
                    Some(data) => {
                        tokio::fs::write(local_path, data).await?;
                        CommandOutput::ok(format!("Downloaded {}\n", local_path))
                    }
                    None => CommandOutput::failed(
                        1,
                        format!("ERROR: Remote file not found: {}", remote_path),
                    ),
                }
            }
            RemoteCommand::List => {
                let dir = args[0];
                if !remote.dirs.contains(dir) {
                    return Ok(CommandOutput::failed(1, format!("ERROR: {} not found", dir)));
                }
                let prefix = format!("{}/", dir);
                let mut out = format!("{}\n", dir);
                for path in remote.files.keys().filter(|p| p.starts_with(&prefix)) {
                    out.push_str(path);
                    out.push('\n');
                }
                CommandOutput::ok(out)
            }
            RemoteCommand::Delete => match remote.files.remove(args[0]) {
                Some(_) => CommandOutput::ok(""),
                None => CommandOutput::failed(1, format!("ERROR: {} not found", args[0])),
            },
            RemoteCommand::FreeSpace => match &remote.free_output {
                Some(text) => CommandOutput::ok(text.clone()),
                None => CommandOutput::ok(format!("{}\n", remote.free())),
            },
        };

        Ok(output)
    }
}
