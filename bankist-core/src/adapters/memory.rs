//! In-memory account registry

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Movement};
use crate::ports::AccountStore;

/// Account store backed by a `Vec`, preserving insertion order
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: Vec<Account>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from seed accounts, rejecting invalid or duplicate ones
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Result<Self> {
        let mut store = Self::new();
        for account in accounts {
            store.insert(account)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn find_by_username(&self, username: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.username == username)
    }

    fn list_all(&self) -> Vec<&Account> {
        self.accounts.iter().collect()
    }

    fn insert(&mut self, account: Account) -> Result<()> {
        account.validate().map_err(Error::validation)?;
        if self.find_by_username(&account.username).is_some() {
            return Err(Error::validation(format!(
                "username '{}' is already taken",
                account.username
            )));
        }
        self.accounts.push(account);
        Ok(())
    }

    fn append_movement(&mut self, username: &str, movement: Movement) -> Result<()> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.username == username)
            .ok_or_else(|| Error::AccountNotFound(username.to_string()))?;
        account.push_movement(movement);
        Ok(())
    }

    fn remove_by_username(&mut self, username: &str) -> Option<Account> {
        let index = self.accounts.iter().position(|a| a.username == username)?;
        Some(self.accounts.remove(index))
    }
}
