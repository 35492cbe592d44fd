//! Initialize the configuration directory: create ~/.kronos-chat, a default
//! config file, and an editable copy of the bundled redesign patterns.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

static BUNDLED_PATTERNS: &str = include_str!("../config/redesign_patterns.json");

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing.
/// - Seeds `redesign_patterns.json` from the bundled defaults if missing
///   (the gateway picks it up automatically; see `config::resolve_patterns_path`).
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let patterns_path = config_dir.join("redesign_patterns.json");
    if !patterns_path.exists() {
        std::fs::write(&patterns_path, BUNDLED_PATTERNS)
            .with_context(|| format!("writing redesign patterns to {}", patterns_path.display()))?;
        log::info!("seeded redesign patterns at {}", patterns_path.display());
    } else {
        log::debug!(
            "redesign patterns already exist at {}, skipping",
            patterns_path.display()
        );
    }

    Ok(config_dir.to_path_buf())
}
