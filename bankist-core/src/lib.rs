//! Bankist Core - session logic for a small simulated bank
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Accounts, movements, derived display values, errors
//! - **ports**: Trait definitions for external dependencies (AccountStore, Clock)
//! - **services**: Session controller, logout countdown, activity log
//! - **adapters**: Concrete implementations (in-memory store, clocks, demo data)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::clock::SystemClock;
use adapters::memory::InMemoryAccountStore;
use config::Config;
use ports::Clock;
use services::{ActivityLog, SessionService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, TransferRejection};
pub use domain::{
    Account, AccountView, DisplayBundle, Money, Movement, MovementKind, MovementView,
    RelativeDay, SortOrder,
};
pub use services::{ActivityEntry, CountdownState, SessionEvent};

/// Main context for Bankist operations
///
/// Holds the configuration, the activity log and the session service built
/// on top of the seeded account registry.
pub struct BankistContext {
    pub config: Config,
    pub activity: Arc<ActivityLog>,
    pub session: SessionService,
}

impl BankistContext {
    /// Create a context from the settings in `bankist_dir`
    pub fn new(bankist_dir: &Path) -> Result<Self> {
        let config = Config::load(bankist_dir)?;
        Self::from_config(config, Arc::new(SystemClock))
    }

    /// Create a context from an already loaded configuration
    pub fn from_config(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let accounts = config.seed_accounts(clock.now())?;
        let store = InMemoryAccountStore::with_accounts(accounts)
            .context("Invalid account registry")?;

        let activity = Arc::new(ActivityLog::default());
        let session = SessionService::new(store, config.logout_after, clock, Arc::clone(&activity));
        activity.log_event("registry_loaded");

        Ok(Self {
            config,
            activity,
            session,
        })
    }
}
