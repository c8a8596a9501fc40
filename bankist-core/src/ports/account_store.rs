//! Account store port - registry abstraction

use crate::domain::result::Result;
use crate::domain::{Account, Movement};

/// Registry of accounts keyed by derived username
///
/// Implementations must keep usernames unique: `insert` rejects an account
/// whose username is already taken, and a removed username is gone for good
/// unless a new account is inserted under it.
pub trait AccountStore: Send + Sync {
    // === Lookups ===

    /// Find an account by exact username
    fn find_by_username(&self, username: &str) -> Option<&Account>;

    /// All accounts, in insertion order
    fn list_all(&self) -> Vec<&Account>;

    // === Mutations ===

    /// Add an account to the registry
    fn insert(&mut self, account: Account) -> Result<()>;

    /// Append a movement (amount and date together) to an account
    fn append_movement(&mut self, username: &str, movement: Movement) -> Result<()>;

    /// Remove an account permanently, returning it if it existed
    fn remove_by_username(&mut self, username: &str) -> Option<Account>;
}
