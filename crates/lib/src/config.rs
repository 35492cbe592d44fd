//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.kronos-chat/config.json`) and environment.
//! Secrets (API key, assistant id) can always be supplied via environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Remote assistant service settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Analysis engine (database API) settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Redesign-pattern reference data settings.
    #[serde(default)]
    pub patterns: PatternsConfig,
}

/// Gateway bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// HTTP port (default 15252).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15252
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Remote assistant service settings (hosted Assistants API).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    /// API key for the assistant service. Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,
    /// Identifier of the pre-configured assistant. Overridden by KRONOS_ASSISTANT_ID env.
    pub assistant_id: Option<String>,
    /// API base URL (default https://api.openai.com/v1).
    pub base_url: Option<String>,
    /// Model used for runs when the caller does not pass one.
    pub default_model: Option<String>,
}

/// Analysis engine database API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Base URL of the database API (default http://127.0.0.1:5000).
    pub base_url: Option<String>,
}

/// Redesign-pattern reference data settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternsConfig {
    /// Override the pattern file. Relative paths are resolved against the config
    /// file's parent. When unset, `redesign_patterns.json` next to the config file
    /// is used if present, otherwise the bundled defaults.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Resolve the assistant API key: env OPENAI_API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    std::env::var("OPENAI_API_KEY")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .assistant
                .api_key
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the assistant id: env KRONOS_ASSISTANT_ID overrides config.
pub fn resolve_assistant_id(config: &Config) -> Option<String> {
    std::env::var("KRONOS_ASSISTANT_ID")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .assistant
                .assistant_id
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("KRONOS_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".kronos-chat").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or KRONOS_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Resolve the pattern file path: `patterns.file` if set (relative paths resolved
/// against the config file's parent), else `redesign_patterns.json` next to the
/// config file when it exists. None means "use the bundled defaults".
pub fn resolve_patterns_path(config: &Config, config_path: &Path) -> Option<PathBuf> {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.patterns.file {
        Some(f) if !f.as_os_str().is_empty() => {
            if f.is_absolute() {
                Some(f.clone())
            } else {
                Some(config_parent.join(f))
            }
        }
        _ => {
            let seeded = config_parent.join("redesign_patterns.json");
            if seeded.is_file() {
                Some(seeded)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 15252);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn parses_camel_case_fields() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": {"port": 9000},
                "assistant": {"assistantId": "asst_abc", "defaultModel": "gpt-4o"},
                "engine": {"baseUrl": "http://10.0.0.2:5000"}
            }"#,
        )
        .expect("parse config");
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.assistant.assistant_id.as_deref(), Some("asst_abc"));
        assert_eq!(config.assistant.default_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.engine.base_url.as_deref(), Some("http://10.0.0.2:5000"));
    }

    #[test]
    fn resolve_patterns_path_override_relative() {
        let mut config = Config::default();
        config.patterns.file = Some(PathBuf::from("custom/patterns.json"));
        let path = Path::new("/home/user/.kronos-chat/config.json");
        assert_eq!(
            resolve_patterns_path(&config, path),
            Some(PathBuf::from("/home/user/.kronos-chat/custom/patterns.json"))
        );
    }

    #[test]
    fn resolve_patterns_path_override_absolute() {
        let mut config = Config::default();
        config.patterns.file = Some(PathBuf::from("/data/patterns.json"));
        let path = Path::new("/home/user/.kronos-chat/config.json");
        assert_eq!(
            resolve_patterns_path(&config, path),
            Some(PathBuf::from("/data/patterns.json"))
        );
    }

    #[test]
    fn resolve_patterns_path_defaults_to_bundled() {
        let config = Config::default();
        let path = Path::new("/nonexistent/.kronos-chat/config.json");
        assert_eq!(resolve_patterns_path(&config, path), None);
    }
}
