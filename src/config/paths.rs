//! Where ferret keeps its files.
//!
//! | what                 | Linux default                         |
//! |----------------------|---------------------------------------|
//! | global config        | `~/.config/ferret/config.toml`        |
//! | run archive          | `~/.local/share/ferret/runs/`         |
//! | shell history        | `~/.cache/ferret/shell_history.txt`   |

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::types::Config;
use crate::constants::{APP_NAME, CONFIG_FILENAME};

/// `base/ferret`, or an error naming the missing platform directory.
fn app_dir(base: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
    base.map(|dir| dir.join(APP_NAME))
        .with_context(|| format!("no {kind} directory for this platform"))
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        app_dir(dirs::config_dir(), "config")
    }

    /// Parent of the run archive.
    pub fn data_dir() -> Result<PathBuf> {
        app_dir(dirs::data_dir(), "data")
    }

    pub fn cache_dir() -> Result<PathBuf> {
        app_dir(dirs::cache_dir(), "cache")
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }
}
