//! Where Bible Chat keeps its files
//!
//! Everything lives in one directory, `~/.config/biblechat/`, whatever the
//! platform: `config.toml` next to `biblechat.sqlite` (the `kv_store` table
//! holding the user state blob).

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "biblechat";

/// `~/.config/biblechat/`, created on first use
pub fn app_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join(APP_DIR_NAME);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}

/// TOML settings file
pub fn config_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("config.toml"))
}

/// `SQLite` file backing the user store
pub fn database_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("biblechat.sqlite"))
}
