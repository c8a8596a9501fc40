//! Configuration management
//!
//! Settings live in `settings.json` inside the Bankist directory:
//! ```json
//! {
//!   "session": { "logoutAfterSecs": 300 },
//!   "accounts": [ { "owner": "...", "pin": 1111, "movements": [200, -50], ... } ]
//! }
//! ```
//! When no accounts are configured the demo accounts are used.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::adapters::demo::generate_demo_accounts;
use crate::domain::result::Error;
use crate::domain::{Account, Movement};

pub const DEFAULT_LOGOUT_AFTER_SECS: u64 = 300;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    session: SessionSettings,
    #[serde(default)]
    accounts: Option<Vec<AccountSeed>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSettings {
    #[serde(default = "default_logout_after_secs")]
    logout_after_secs: u64,
}

fn default_logout_after_secs() -> u64 {
    DEFAULT_LOGOUT_AFTER_SECS
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            logout_after_secs: DEFAULT_LOGOUT_AFTER_SECS,
        }
    }
}

/// Account record as written in settings.json
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSeed {
    pub owner: String,
    pub pin: u32,
    #[serde(default)]
    pub movements: Vec<Decimal>,
    /// One date per movement; synthesized one day apart when omitted
    #[serde(default)]
    pub movement_dates: Option<Vec<DateTime<Utc>>>,
    #[serde(default)]
    pub interest_rate: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_locale() -> String {
    "pt-PT".to_string()
}

impl AccountSeed {
    /// Turn the seed into an account, pairing each amount with its date
    pub fn into_account(self, now: DateTime<Utc>) -> crate::domain::result::Result<Account> {
        let count = self.movements.len();
        let dates = match self.movement_dates {
            Some(dates) if dates.len() != count => {
                return Err(Error::config(format!(
                    "{}: {} movements but {} movement dates",
                    self.owner,
                    count,
                    dates.len()
                )));
            }
            Some(dates) => dates,
            None => (0..count)
                .map(|i| now - chrono::Duration::days((count - 1 - i) as i64))
                .collect(),
        };

        let account = Account::new(self.owner, self.pin)
            .with_interest_rate(self.interest_rate)
            .with_currency(&self.currency, self.locale)
            .with_movements(
                self.movements
                    .into_iter()
                    .zip(dates)
                    .map(|(amount, date)| Movement::new(amount, date)),
            );
        account.validate().map_err(Error::config)?;
        Ok(account)
    }
}

/// Bankist configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Idle time before the session is logged out, in whole seconds
    pub logout_after: Duration,
    pub accounts: Option<Vec<AccountSeed>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logout_after: Duration::from_secs(DEFAULT_LOGOUT_AFTER_SECS),
            accounts: None,
        }
    }
}

impl Config {
    /// Load config from the Bankist directory
    ///
    /// The logout delay can be overridden with BANKIST_LOGOUT_SECS.
    pub fn load(bankist_dir: &Path) -> Result<Self> {
        let settings_path = bankist_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {:?}", settings_path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {:?}", settings_path))?
        } else {
            SettingsFile::default()
        };

        let logout_after_secs = match std::env::var("BANKIST_LOGOUT_SECS").ok() {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("BANKIST_LOGOUT_SECS is not a number: {}", value))?,
            None => raw.session.logout_after_secs,
        };

        let config = Self {
            logout_after: Duration::from_secs(logout_after_secs),
            accounts: raw.accounts,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the session service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.logout_after.as_secs() == 0 {
            return Err(Error::config("logout delay must be at least one second").into());
        }
        Ok(())
    }

    /// Accounts to start the registry with
    pub fn seed_accounts(&self, now: DateTime<Utc>) -> Result<Vec<Account>> {
        match &self.accounts {
            Some(seeds) => seeds
                .iter()
                .cloned()
                .map(|seed| seed.into_account(now).map_err(anyhow::Error::from))
                .collect(),
            None => Ok(generate_demo_accounts(now)),
        }
    }
}
