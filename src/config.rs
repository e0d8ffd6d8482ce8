use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_MODEL;
use crate::error::{PromptBudgetError, Result};
use crate::truncate::{TokenLimit, DEFAULT_TOKEN_LIMIT};

/// Config file name searched for in the working and home directories.
pub const CONFIG_FILE_NAME: &str = "promptbudget.toml";

/// Top-level configuration for promptbudget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Model whose vocabulary is used for encoding.
    pub model: String,
    /// Maximum tokens kept after truncation. Signed so that a negative
    /// value in a config file is reported instead of failing to parse.
    pub token_limit: i64,
}

// --- Defaults ---

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            token_limit: DEFAULT_TOKEN_LIMIT as i64,
        }
    }
}

// --- Config methods ---

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PromptBudgetError::io(format!("reading config from '{}'", path.display()), e)
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| PromptBudgetError::config_with_source("failed to parse config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| PromptBudgetError::config_with_source("failed to serialize config", e))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PromptBudgetError::io(
                    format!("creating config directory '{}'", parent.display()),
                    e,
                )
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            PromptBudgetError::io(format!("writing config to '{}'", path.display()), e)
        })
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(PromptBudgetError::invalid_configuration(
                "model",
                "must not be empty",
            ));
        }
        self.limit().map(|_| ())
    }

    /// The token limit as a validated [`TokenLimit`].
    pub fn limit(&self) -> Result<TokenLimit> {
        TokenLimit::try_from(self.token_limit)
    }

    /// Apply command-line or environment overrides on top of this config.
    pub fn apply_overrides(&mut self, model: Option<String>, token_limit: Option<i64>) {
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(limit) = token_limit {
            self.token_limit = limit;
        }
    }
}

/// Builder for constructing Config with selective overrides.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn with_token_limit(mut self, limit: i64) -> Self {
        self.config.token_limit = limit;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Discover the config file using standard search order:
/// 1. Explicit path (if provided)
/// 2. ./promptbudget.toml
/// 3. ~/.promptbudget.toml
/// 4. Platform config dir
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() {
            return Some(p.to_path_buf());
        }
        return None;
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(home) = dirs_home() {
        let home_config = home.join(format!(".{CONFIG_FILE_NAME}"));
        if home_config.exists() {
            return Some(home_config);
        }
    }

    if let Some(platform) = default_config_path() {
        if platform.exists() {
            return Some(platform);
        }
    }

    None
}

/// Where `init` writes the config when no path is given.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "promptbudget").map(|d| d.config_dir().join(CONFIG_FILE_NAME))
}

/// Load config from an explicit path or by discovery, falling back to
/// defaults when nothing is found. A missing explicit path is an error.
pub fn load_or_default(explicit: Option<&Path>) -> Result<Config> {
    match find_config_file(explicit) {
        Some(p) => Config::load(&p),
        None => match explicit {
            Some(p) => Err(PromptBudgetError::config(format!(
                "config file '{}' does not exist",
                p.display()
            ))),
            None => Ok(Config::default()),
        },
    }
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
