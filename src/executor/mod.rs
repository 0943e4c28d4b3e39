//! Remote command execution.
//!
//! Every remote operation is a single invocation of an external program.
//! The [`RemoteExecutor`] trait is the seam between the catalog/placement
//! logic and whatever actually runs those programs:
//!
//! - [`megatools::MegatoolsExecutor`] runs the `megatools` binaries
//! - [`mock::MockExecutor`] simulates a set of MEGA accounts in memory
//!   (feature `mock`, enabled by default)
//!
//! Building argv for a command is the executor's job. Callers pass the
//! logical command, the account to act as, and the command's operands.

pub mod megatools;

#[cfg(feature = "mock")]
pub mod mock;

use crate::accounts::Account;
use crate::{MegapoolError, Result};
use async_trait::async_trait;

/// Logical remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemoteCommand {
    /// Create a folder. Operands: `[dir]`
    MakeDir,
    /// Upload a local file. Operands: `[remote_path, local_path]`
    Upload,
    /// Download a remote file. Operands: `[remote_path, local_path]`
    Download,
    /// List a folder. Operands: `[dir]`
    List,
    /// Remove a remote file. Operands: `[remote_path]`
    Delete,
    /// Report free bytes for the account. Operands: none
    FreeSpace,
}

impl RemoteCommand {
    /// All commands, in declaration order.
    pub const ALL: [RemoteCommand; 6] = [
        Self::MakeDir,
        Self::Upload,
        Self::Download,
        Self::List,
        Self::Delete,
        Self::FreeSpace,
    ];

    /// The megatools program that implements this command.
    pub fn program(&self) -> &'static str {
        match self {
            Self::MakeDir => "megamkdir",
            Self::Upload => "megaput",
            Self::Download => "megaget",
            Self::List => "megals",
            Self::Delete => "megarm",
            Self::FreeSpace => "megadf",
        }
    }

    /// Number of operands the command expects.
    pub fn arity(&self) -> usize {
        match self {
            Self::MakeDir | Self::List | Self::Delete => 1,
            Self::Upload | Self::Download => 2,
            Self::FreeSpace => 0,
        }
    }

    pub(crate) fn check_arity(&self, args: &[&str]) -> Result<()> {
        if args.len() != self.arity() {
            return Err(MegapoolError::Other(anyhow::anyhow!(
                "{} expects {} operand(s), got {}",
                self.program(),
                self.arity(),
                args.len()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

/// What a finished remote command reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status (`-1` if the process was killed by a signal)
    pub status: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Output of a command that exited with status 0.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output of a command that failed.
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// True if the command exited with status 0.
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Turns a non-zero status into [`MegapoolError::RemoteOperation`].
    pub fn into_result(self, command: RemoteCommand) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(MegapoolError::RemoteOperation {
                command: command.program().to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs remote commands on behalf of an account.
///
/// Implementations return `Err` only when the command could not be run at
/// all. A command that ran and failed is reported through
/// [`CommandOutput::status`].
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Returns the executor name (e.g. "megatools", "mock").
    fn name(&self) -> &str;

    /// Checks that whatever the executor needs is available.
    async fn check_installed(&self) -> Result<()> {
        Ok(())
    }

    /// Runs `command` as `account` with the given operands.
    async fn execute(
        &self,
        command: RemoteCommand,
        account: &Account,
        args: &[&str],
    ) -> Result<CommandOutput>;
}
