//! Configuration system (layered: code > env > config file).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use serde::Deserialize;

use crate::error::StrandError;
use crate::types::Truncation;

/// Global default config (lazy-initialized from file + env).
static DEFAULT_CONFIG: OnceLock<StrandConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";

/// Defaults applied to every session built from a config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    /// Turn ceiling per session.
    pub max_turns: u32,
    /// Token budget for history selection; `None` sends the full log.
    pub max_input_tokens: Option<usize>,
    /// Abort a streamed turn when no event arrives for this long.
    pub stream_idle_timeout_ms: Option<u64>,
    /// Ask the model service to persist responses.
    pub store: bool,
    pub truncation: Truncation,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            max_turns: 20,
            max_input_tokens: None,
            stream_idle_timeout_ms: None,
            store: false,
            truncation: Truncation::Auto,
        }
    }
}

impl RunDefaults {
    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    defaults: RunDefaults,
    #[serde(default)]
    providers: HashMap<String, ProviderEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderEntry {
    api_key: Option<String>,
    base_url: Option<String>,
}

/// Layered configuration for Strand.
///
/// Resolution order:
/// 1. Explicit setters
/// 2. Environment variables (`.env` is loaded first)
/// 3. The TOML config file
#[derive(Clone)]
pub struct StrandConfig {
    api_keys: Arc<RwLock<HashMap<String, String>>>,
    base_urls: Arc<RwLock<HashMap<String, String>>>,
    defaults: RunDefaults,
}

impl fmt::Debug for StrandConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<String> = self
            .api_keys
            .read()
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("StrandConfig")
            .field("providers_with_keys", &providers)
            .field("base_urls", &self.base_urls)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl Default for StrandConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StrandConfig {
    /// Create an empty config with built-in defaults.
    pub fn new() -> Self {
        Self {
            api_keys: Arc::new(RwLock::new(HashMap::new())),
            base_urls: Arc::new(RwLock::new(HashMap::new())),
            defaults: RunDefaults::default(),
        }
    }

    /// Load from environment variables only.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Load a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, StrandError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|e| {
            StrandError::Configuration(format!("{}: {e}", path.display()))
        })
    }

    /// Parse TOML config text.
    pub fn from_toml_str(raw: &str) -> Result<Self, StrandError> {
        let file: ConfigFile =
            toml::from_str(raw).map_err(|e| StrandError::Configuration(e.to_string()))?;
        let config = Self::new().with_defaults(file.defaults);
        for (provider, entry) in file.providers {
            if let Some(key) = entry.api_key {
                config.set_api_key(&provider, key);
            }
            if let Some(url) = entry.base_url {
                config.set_base_url(&provider, url);
            }
        }
        Ok(config)
    }

    /// Config file (if any) overlaid with the environment.
    pub fn load() -> Result<Self, StrandError> {
        let _ = dotenvy::dotenv();
        let mut config = match config_file_path() {
            Some(path) if path.is_file() => Self::from_file(&path)?,
            _ => Self::new(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Get (or create) the global default config.
    ///
    /// An unreadable config file is logged and skipped.
    pub fn global() -> &'static StrandConfig {
        DEFAULT_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring config file");
                Self::from_env()
            })
        })
    }

    /// Overlay values read through `lookup` (an environment accessor).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.set_api_key("openai", key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.set_base_url("openai", url);
        }
        if let Some(turns) = lookup("STRAND_MAX_TURNS").and_then(|v| v.parse().ok()) {
            self.defaults.max_turns = turns;
        }
        if let Some(tokens) = lookup("STRAND_MAX_INPUT_TOKENS").and_then(|v| v.parse().ok()) {
            self.defaults.max_input_tokens = Some(tokens);
        }
        if let Some(ms) = lookup("STRAND_STREAM_IDLE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.defaults.stream_idle_timeout_ms = Some(ms);
        }
    }

    pub fn with_defaults(mut self, defaults: RunDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &RunDefaults {
        &self.defaults
    }

    pub fn set_api_key(&self, provider: &str, key: String) {
        if let Ok(mut keys) = self.api_keys.write() {
            keys.insert(provider.to_string(), key);
        }
    }

    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.api_keys.read().ok()?.get(provider).cloned()
    }

    pub fn set_base_url(&self, provider: &str, url: String) {
        if let Ok(mut urls) = self.base_urls.write() {
            urls.insert(provider.to_string(), url);
        }
    }

    pub fn get_base_url(&self, provider: &str) -> Option<String> {
        self.base_urls.read().ok()?.get(provider).cloned()
    }

    pub fn has_credentials(&self, provider: &str) -> bool {
        self.get_api_key(provider).is_some()
    }
}

/// `$STRAND_CONFIG`, or `config.toml` in the platform config directory.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("STRAND_CONFIG") {
        return Some(PathBuf::from(path));
    }
    directories::ProjectDirs::from("", "", "strand")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
