//! Configuration system (layered: code > env > config file).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

/// Global default config (lazy-initialized from env).
static DEFAULT_CONFIG: OnceLock<RunLoopConfig> = OnceLock::new();

const EXCLUDED_KEYS_ENV: &str = "AGENT_RUNLOOP_EXCLUDED_STATE_KEYS";
const SNAPSHOT_ROLE_ENV: &str = "AGENT_RUNLOOP_SNAPSHOT_ROLE";
const YIELD_ENV: &str = "AGENT_RUNLOOP_YIELD_AFTER_EVENT";

fn default_excluded_state_keys() -> Vec<String> {
    vec!["messages".to_string(), "id".to_string()]
}

fn default_snapshot_role() -> String {
    "assistant".to_string()
}

fn default_yield_after_event() -> bool {
    true
}

/// Settings for one run loop.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLoopConfig {
    /// State keys never included in a snapshot payload (message history,
    /// engine identity).
    #[builder(default = default_excluded_state_keys())]
    pub excluded_state_keys: Vec<String>,
    /// Role stamped on synthesized state snapshots.
    #[builder(default = default_snapshot_role(), into)]
    pub snapshot_role: String,
    /// Give the producer a turn after every consumed event.
    #[builder(default = default_yield_after_event())]
    pub yield_after_event: bool,
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            excluded_state_keys: default_excluded_state_keys(),
            snapshot_role: default_snapshot_role(),
            yield_after_event: default_yield_after_event(),
        }
    }
}

impl RunLoopConfig {
    /// Load from environment variables, on top of the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(keys) = std::env::var(EXCLUDED_KEYS_ENV) {
            self.excluded_state_keys = keys
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(role) = std::env::var(SNAPSHOT_ROLE_ENV) {
            if !role.trim().is_empty() {
                self.snapshot_role = role.trim().to_string();
            }
        }
        if let Ok(flag) = std::env::var(YIELD_ENV) {
            match flag.trim() {
                "0" | "false" => self.yield_after_event = false,
                "1" | "true" => self.yield_after_event = true,
                other => tracing::warn!(value = other, "ignoring invalid {YIELD_ENV}"),
            }
        }
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file, then let environment variables override it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env();
        Ok(config)
    }

    /// Default config file location (`<config dir>/agent-runloop/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "agent-runloop")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get (or create) the global default config.
    ///
    /// Reads the default config file when present, otherwise the environment.
    pub fn global() -> &'static RunLoopConfig {
        DEFAULT_CONFIG.get_or_init(|| {
            let from_file = Self::default_path()
                .filter(|path| path.exists())
                .map(|path| Self::load(&path));
            match from_file {
                Some(Ok(config)) => config,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "failed to load config file, using env");
                    Self::from_env()
                }
                None => Self::from_env(),
            }
        })
    }

    fn validate(&self) -> Result<()> {
        if self.snapshot_role.trim().is_empty() {
            return Err(RuntimeError::Configuration(
                "snapshot_role must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn is_excluded(&self, key: &str) -> bool {
        self.excluded_state_keys.iter().any(|excluded| excluded == key)
    }
}
