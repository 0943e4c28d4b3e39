//! Executor backed by the `megatools` command-line programs.

use crate::accounts::Account;
use crate::executor::{CommandOutput, RemoteCommand, RemoteExecutor};
use crate::{MegapoolError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Runs `megamkdir`, `megaput`, `megaget`, `megals`, `megarm` and `megadf`.
///
/// Arguments go straight to the process as an argv vector; no shell is
/// involved.
#[derive(Debug, Clone, Default)]
pub struct MegatoolsExecutor {
    bin_dir: Option<PathBuf>,
}

impl MegatoolsExecutor {
    /// Creates an executor that finds the programs on `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses programs from a specific directory instead of `PATH`.
    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    fn program_path(&self, command: RemoteCommand) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(command.program()),
            None => PathBuf::from(command.program()),
        }
    }
}

/// Builds the argv (without the program name) for a command.
pub(crate) fn build_args(
    command: RemoteCommand,
    account: &Account,
    args: &[&str],
) -> Result<Vec<String>> {
    command.check_arity(args)?;

    let mut argv = vec![
        "-u".to_string(),
        account.username().to_string(),
        "-p".to_string(),
        account.password().to_string(),
        "--no-ask-password".to_string(),
    ];

    match command {
        RemoteCommand::Upload => {
            argv.push("--disable-previews".to_string());
            argv.push(format!("--path={}", args[0]));
            argv.push(args[1].to_string());
        }
        RemoteCommand::Download => {
            argv.push(format!("--path={}", args[1]));
            argv.push(args[0].to_string());
        }
        RemoteCommand::MakeDir | RemoteCommand::List | RemoteCommand::Delete => {
            argv.push(args[0].to_string());
        }
        RemoteCommand::FreeSpace => {
            argv.push("--free".to_string());
        }
    }

    Ok(argv)
}

/// Checks if a command-line tool is available in PATH.
pub async fn check_command_exists(program: &str) -> Result<bool> {
    let output = Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(MegapoolError::Io)?;

    Ok(output.success())
}

#[async_trait]
impl RemoteExecutor for MegatoolsExecutor {
    fn name(&self) -> &str {
        "megatools"
    }

    async fn check_installed(&self) -> Result<()> {
        for command in RemoteCommand::ALL {
            let installed = match &self.bin_dir {
                Some(_) => self.program_path(command).is_file(),
                None => check_command_exists(command.program()).await?,
            };
            if !installed {
                return Err(MegapoolError::BackendNotInstalled(format!(
                    "{} command not found - install megatools from https://megatools.megous.com/",
                    command.program()
                )));
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        command: RemoteCommand,
        account: &Account,
        args: &[&str],
    ) -> Result<CommandOutput> {
        let argv = build_args(command, account, args)?;

        let mut cmd = Command::new(self.program_path(command));
        cmd.args(&argv);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MegapoolError::BackendNotInstalled(format!("{} command not found", command))
            } else {
                MegapoolError::Io(e)
            }
        })?;

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            MegapoolError::Other(anyhow::anyhow!("Invalid UTF-8 in {} output: {}", command, e))
        })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
