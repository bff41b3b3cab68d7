pub mod config_cmd;
pub mod memory;
pub mod onboard;
pub mod run;
pub mod tasks;

use anyhow::Context;
use prospector_config::AppConfig;
use std::path::{Path, PathBuf};

/// The `--config` file, or the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load config with environment overrides applied.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let path = config_path(explicit);
    AppConfig::load_with_env(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
