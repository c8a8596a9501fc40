//! CLI command implementations

pub mod accounts;
pub mod shell;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bankist_core::adapters::clock::SystemClock;
use bankist_core::config::Config;
use bankist_core::BankistContext;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub dir: Option<PathBuf>,
    pub logout_after: Option<u64>,
}

/// Get the Bankist directory from the flag, the environment or the default
pub fn get_bankist_dir(options: &GlobalOptions) -> Result<PathBuf> {
    if let Some(dir) = &options.dir {
        return Ok(dir.clone());
    }
    if let Ok(dir) = std::env::var("BANKIST_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bankist"))
        .context("Could not find home directory, pass --dir or set BANKIST_DIR")
}

/// Load settings and build the Bankist context
pub fn get_context(options: &GlobalOptions) -> Result<BankistContext> {
    let bankist_dir = get_bankist_dir(options)?;
    tracing::debug!(dir = ?bankist_dir, "loading settings");

    let mut config = Config::load(&bankist_dir)
        .with_context(|| format!("Failed to load settings from {:?}", bankist_dir))?;
    if let Some(secs) = options.logout_after {
        config.logout_after = Duration::from_secs(secs);
        config.validate()?;
    }

    BankistContext::from_config(config, Arc::new(SystemClock))
        .context("Failed to initialize bankist context")
}
