//! Application configuration for mermagen.
//!
//! User config lives at `~/.mermagen/mermagen.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MermagenError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mermagen.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mermagen";

// ---------------------------------------------------------------------------
// Config structs (matching mermagen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenAI settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Pipeline execution settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Run-history database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Extra CORS origins, appended to the local-dev defaults.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model to use for detection, generation, and autofix.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL (override for proxies or compatible providers).
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Force deterministic mock output even when an API key is configured.
    #[serde(default)]
    pub use_mock: bool,
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.mermagen/mermagen.db".into()
}

// ---------------------------------------------------------------------------
// Execution mode
// ---------------------------------------------------------------------------

/// Whether pipeline stages call the live model or return canned output.
///
/// Resolved once when the server wires its dependencies, so every stage of a
/// run sees the same mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Mock,
    Live,
}

impl ExecutionMode {
    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Live => "live",
        }
    }
}

impl AppConfig {
    /// Resolve the execution mode: mock when forced by config or when the
    /// API key env var is unset/empty.
    pub fn execution_mode(&self) -> ExecutionMode {
        if self.pipeline.use_mock {
            return ExecutionMode::Mock;
        }
        match std::env::var(&self.openai.api_key_env) {
            Ok(val) if !val.is_empty() => ExecutionMode::Live,
            _ => ExecutionMode::Mock,
        }
    }

    /// Read the API key from the configured env var, if present.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.openai.api_key_env)
            .ok()
            .filter(|v| !v.is_empty())
    }

    /// CORS origins: local-dev defaults plus any configured extras.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEFAULT_CORS_ORIGINS
            .iter()
            .map(|o| (*o).to_string())
            .collect();
        origins.extend(self.server.cors_origins.iter().cloned());
        origins
    }
}

/// Default origins for local frontend development.
const DEFAULT_CORS_ORIGINS: [&str; 6] = [
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:5175",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:5174",
    "http://127.0.0.1:5175",
];

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mermagen/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MermagenError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mermagen/mermagen.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MermagenError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| MermagenError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MermagenError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MermagenError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MermagenError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("gpt-4o"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.server.port, 8000);
        assert_eq!(parsed.openai.api_key_env, "OPENAI_API_KEY");
        assert!(!parsed.pipeline.use_mock);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[server]
port = 9000

[pipeline]
use_mock = true
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.openai.model, "gpt-4o");
        assert!(config.pipeline.use_mock);
    }

    #[test]
    fn mock_mode_when_forced() {
        let config = AppConfig {
            pipeline: PipelineConfig { use_mock: true },
            ..Default::default()
        };
        assert!(config.execution_mode().is_mock());
    }

    #[test]
    fn mock_mode_when_key_missing() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openai.api_key_env = "MERMAGEN_TEST_NONEXISTENT_KEY_98765".into();
        assert!(config.execution_mode().is_mock());
        assert!(config.api_key().is_none());
    }

    #[test]
    fn allowed_origins_include_defaults_and_extras() {
        let config = AppConfig {
            server: ServerConfig {
                cors_origins: vec!["https://app.example.com".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let origins = config.allowed_origins();
        assert!(origins.contains(&"http://localhost:5173".to_string()));
        assert!(origins.contains(&"https://app.example.com".to_string()));
        assert_eq!(origins.len(), 7);
    }
}
