use anyhow::{Context, Result};
use flowstate_core::{ForecastConfig, ModelConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Directory holding `config.toml`, relative to the working directory when
/// no home directory is known.
const DATA_DIR: &str = ".flowstate";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Bind on all interfaces instead of loopback.
    #[serde(default)]
    pub public: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            public: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        let host = if self.public { "0.0.0.0" } else { "127.0.0.1" };
        format!("{}:{}", host, self.port)
    }
}

/// Hosted model endpoint that receives `{"history": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn get_config_path() -> PathBuf {
        let base = dirs::home_dir().unwrap_or_else(|| {
            warn!("Could not determine home directory, using ./{}", DATA_DIR);
            PathBuf::new()
        });
        base.join(DATA_DIR).join("config.toml")
    }

    /// Loads the default config file, writing one with defaults when missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Applies process environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`:
    /// `REMOTE_PRED_URL`, `REMOTE_API_KEY`, `USE_SAMPLE_PREDICTION`, `FLOWSTATE_PUBLIC`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("REMOTE_PRED_URL") {
            let url = url.trim().to_string();
            self.remote.url = (!url.is_empty()).then_some(url);
        }
        if let Some(key) = lookup("REMOTE_API_KEY") {
            self.remote.api_key = (!key.is_empty()).then_some(key);
        }
        if let Some(flag) = lookup("USE_SAMPLE_PREDICTION") {
            self.forecast.sample_only = flag.trim().eq_ignore_ascii_case("true");
        }
        if lookup("FLOWSTATE_PUBLIC").is_some() {
            self.server.public = true;
        }
    }
}
