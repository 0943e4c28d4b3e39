//! MEGA backend implementation.

use crate::accounts::{Account, AccountRegistry};
use crate::catalog::{AccountUsage, RemoteCatalog};
use crate::executor::megatools::MegatoolsExecutor;
use crate::executor::{CommandOutput, RemoteCommand, RemoteExecutor};
use crate::placement::{choose_account, choose_account_excluding};
use crate::validation::validate_file_name;
use crate::{Backend, Config, MegapoolError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// MEGA backend spreading files over one or more accounts.
///
/// All accounts share one remote folder. New files go to the account with
/// the most free space; reads and deletes go to whichever account the
/// catalog says holds the file.
pub struct MegaBackend {
    registry: AccountRegistry,
    executor: Arc<dyn RemoteExecutor>,
    catalog: RemoteCatalog,
    create_root: bool,
}

impl MegaBackend {
    /// Creates a backend that runs the megatools programs.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_executor(config, Arc::new(MegatoolsExecutor::new()))
    }

    /// Creates a backend with a custom executor.
    pub fn with_executor(config: Config, executor: Arc<dyn RemoteExecutor>) -> Result<Self> {
        Ok(Self {
            registry: AccountRegistry::from_config(&config)?,
            executor,
            catalog: RemoteCatalog::new(),
            create_root: config.create_root,
        })
    }

    /// The accounts this backend uses.
    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    fn account(&self, username: &str) -> Result<&Account> {
        self.registry.account(username).ok_or_else(|| {
            MegapoolError::Other(anyhow::anyhow!("catalog names unknown account {}", username))
        })
    }

    /// Runs a remote command and fails on a non-zero exit status.
    async fn remote(
        &self,
        command: RemoteCommand,
        account: &Account,
        args: &[&str],
    ) -> Result<CommandOutput> {
        debug!(%command, account = account.username(), ?args, "running remote command");
        self.executor
            .execute(command, account, args)
            .await?
            .into_result(command)
    }
}

fn local_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        MegapoolError::Other(anyhow::anyhow!(
            "local path is not valid UTF-8: {}",
            path.display()
        ))
    })
}

#[async_trait]
impl Backend for MegaBackend {
    fn name(&self) -> &str {
        "mega"
    }

    async fn init(&mut self) -> Result<()> {
        self.executor.check_installed().await?;

        if !self.create_root {
            return Ok(());
        }

        let root = self.registry.remote_root();
        for account in self.registry.accounts() {
            let output = self
                .executor
                .execute(RemoteCommand::MakeDir, account, &[root])
                .await?;
            if !output.success() {
                // Usually "already exists"; a real problem shows up on first listing.
                debug!(
                    account = account.username(),
                    stderr = output.stderr.trim(),
                    "remote folder not created"
                );
            }
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.catalog.reset().await;
        Ok(())
    }

    async fn put(&self, local: &Path, remote_name: &str) -> Result<()> {
        validate_file_name(remote_name)?;
        let local_path = local_str(local)?;

        let mut catalog = self.catalog.lock(&self.registry, &*self.executor).await?;
        let size = tokio::fs::metadata(local).await?.len();

        // megaput refuses to overwrite, so a replacement lands on another
        // account and the old copy goes only after the upload succeeded.
        let previous = catalog.owner_of(remote_name).map(str::to_string);
        let target = match previous.as_deref() {
            Some(owner) => match choose_account_excluding(&catalog, size, owner) {
                Ok(target) => target,
                Err(MegapoolError::InsufficientCapacity { .. }) => {
                    return Err(MegapoolError::FileExists {
                        name: remote_name.to_string(),
                        account: owner.to_string(),
                    });
                }
                Err(e) => return Err(e),
            },
            None => choose_account(&catalog, size)?,
        };
        let target = self.account(target)?;
        let remote_path = self.registry.remote_path(remote_name);

        info!(
            file = remote_name,
            size,
            account = target.username(),
            free_bytes = catalog.free_of(target.username()),
            "uploading"
        );
        self.remote(
            RemoteCommand::Upload,
            target,
            &[remote_path.as_str(), local_path],
        )
        .await?;
        catalog.record_put(target.username(), remote_name, size);

        if let Some(owner) = previous {
            let owner = self.account(&owner)?;
            info!(file = remote_name, account = owner.username(), "removing replaced copy");
            self.remote(RemoteCommand::Delete, owner, &[remote_path.as_str()])
                .await
                .map_err(|e| {
                    warn!(
                        file = remote_name,
                        account = owner.username(),
                        "replaced copy left behind"
                    );
                    e
                })?;
            catalog
                .record_delete(owner, remote_name, &*self.executor)
                .await?;
        }

        Ok(())
    }

    async fn get(&self, remote_name: &str, local: &Path) -> Result<()> {
        validate_file_name(remote_name)?;
        let local_path = local_str(local)?;

        let catalog = self.catalog.lock(&self.registry, &*self.executor).await?;
        let owner = catalog
            .owner_of(remote_name)
            .ok_or_else(|| MegapoolError::NotFound(remote_name.to_string()))?;
        let account = self.account(owner)?;

        let remote_path = self.registry.remote_path(remote_name);
        self.remote(
            RemoteCommand::Download,
            account,
            &[remote_path.as_str(), local_path],
        )
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let catalog = self.catalog.lock(&self.registry, &*self.executor).await?;
        Ok(catalog.all_files())
    }

    async fn delete(&self, remote_name: &str) -> Result<()> {
        validate_file_name(remote_name)?;

        let mut catalog = self.catalog.lock(&self.registry, &*self.executor).await?;
        let owner = catalog
            .owner_of(remote_name)
            .ok_or_else(|| MegapoolError::NotFound(remote_name.to_string()))?;
        let account = self.account(owner)?;

        let remote_path = self.registry.remote_path(remote_name);
        self.remote(RemoteCommand::Delete, account, &[remote_path.as_str()])
            .await?;
        catalog
            .record_delete(account, remote_name, &*self.executor)
            .await?;

        info!(file = remote_name, account = account.username(), "deleted");
        Ok(())
    }

    async fn free_space(&self) -> Result<Vec<AccountUsage>> {
        let catalog = self.catalog.lock(&self.registry, &*self.executor).await?;
        Ok(catalog.usage())
    }
}
