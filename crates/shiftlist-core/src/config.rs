//! Shiftlist configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShiftlistError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftlistConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub evidence: EvidenceConfig,
}

impl ShiftlistConfig {
    /// Load config from the default path (~/.shiftlist/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShiftlistError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ShiftlistError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ShiftlistError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// `SHIFTLIST_DB` overrides the database path.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("SHIFTLIST_DB") {
            if !path.trim().is_empty() {
                self.database.path = path;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.evidence.max_bytes == 0 {
            return Err(ShiftlistError::Config("evidence.max_bytes must be > 0".into()));
        }
        if self.evidence.allowed_types.is_empty() {
            return Err(ShiftlistError::Config("evidence.allowed_types is empty".into()));
        }
        if let Some(bad) = self
            .evidence
            .allowed_types
            .iter()
            .find(|t| !t.starts_with("image/"))
        {
            return Err(ShiftlistError::Config(format!(
                "evidence type '{bad}' is not an image type"
            )));
        }
        if self.scheduler.daily_cron.split_whitespace().count() != 5 {
            return Err(ShiftlistError::Config(format!(
                "scheduler.daily_cron '{}' needs 5 fields",
                self.scheduler.daily_cron
            )));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Shiftlist home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".shiftlist")
    }
}

/// Datastore location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.shiftlist/shiftlist.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

impl DatabaseConfig {
    pub fn expanded_path(&self) -> PathBuf {
        expand(&self.path)
    }
}

/// Daily generation trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// MIN HOUR DOM MON DOW, local time.
    #[serde(default = "default_daily_cron")]
    pub daily_cron: String,
    /// Run a catch-up generation when the process starts.
    #[serde(default = "bool_true")]
    pub run_on_startup: bool,
}

fn bool_true() -> bool { true }
fn default_daily_cron() -> String { "0 1 * * *".into() }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_cron: default_daily_cron(),
            run_on_startup: true,
        }
    }
}

/// Evidence upload constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

fn default_upload_dir() -> String { "~/.shiftlist/uploads".into() }
fn default_max_bytes() -> usize { 5 * 1024 * 1024 }
fn default_allowed_types() -> Vec<String> {
    vec!["image/jpeg".into(), "image/png".into(), "image/gif".into()]
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_bytes: default_max_bytes(),
            allowed_types: default_allowed_types(),
        }
    }
}

impl EvidenceConfig {
    pub fn expanded_dir(&self) -> PathBuf {
        expand(&self.upload_dir)
    }
}

fn expand(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}
