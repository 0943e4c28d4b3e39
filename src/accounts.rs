//! Account credentials and the shared remote folder.

use crate::{Config, MegapoolError, Result};
use std::collections::BTreeMap;

/// One MEGA login.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    username: String,
    password: String,
}

impl Account {
    /// Creates an account from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the login name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password. Callers must not log it.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The accounts a backend spreads files over, and the folder they share.
///
/// Accounts iterate in username order.
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    accounts: BTreeMap<String, Account>,
    remote_root: String,
}

impl AccountRegistry {
    /// Builds a registry from configuration.
    ///
    /// The remote path loses any trailing `/`.
    ///
    /// # Errors
    ///
    /// Returns [`MegapoolError::Config`] if there are no accounts or the
    /// remote path is empty.
    pub fn from_config(config: &Config) -> Result<Self> {
        let remote_root = config.remote_path.trim_end_matches('/').to_string();
        if remote_root.is_empty() {
            return Err(MegapoolError::Config(
                "remote path must name a folder below the root".to_string(),
            ));
        }

        if config.accounts.is_empty() {
            return Err(MegapoolError::Config("no accounts configured".to_string()));
        }

        let accounts = config
            .accounts
            .iter()
            .map(|(user, pass)| (user.clone(), Account::new(user.clone(), pass.clone())))
            .collect();

        Ok(Self {
            accounts,
            remote_root,
        })
    }

    /// Iterates over all accounts.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Looks up an account by username.
    pub fn account(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no accounts are registered (never the case for a registry
    /// built through [`AccountRegistry::from_config`]).
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Remote folder shared by every account, without trailing `/`.
    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    /// Full remote path of a file inside the shared folder.
    pub fn remote_path(&self, filename: &str) -> String {
        format!("{}/{}", self.remote_root, filename)
    }
}
