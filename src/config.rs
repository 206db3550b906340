use crate::ledger::{LedgerOptions, DEFAULT_PROFILE_NAME, DEFAULT_SUMMARY_NOTE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "friendly-debts";
const DB_FILE: &str = "friendlydebts.db";
const LOG_FILE: &str = "friendly-debts.log";

pub const ENV_DB: &str = "FRIENDLY_DEBTS_DB";
pub const ENV_LOG: &str = "FRIENDLY_DEBTS_LOG";

/// Application settings.
///
/// Resolution order: defaults, then the JSON config file, then environment
/// variables, then command-line flags (applied by the binary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub default_profile_name: String,
    pub summary_note: String,
    /// `tracing` filter directive, e.g. `info` or `friendly_debts=debug`
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: data_dir().join(DB_FILE),
            default_profile_name: DEFAULT_PROFILE_NAME.to_string(),
            summary_note: DEFAULT_SUMMARY_NOTE.to_string(),
            log_level: "info".to_string(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
}

impl Settings {
    /// Load settings. An explicit path must exist; the default path is
    /// optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup(ENV_DB).filter(|v| !v.trim().is_empty()) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
    }

    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            default_profile_name: self.default_profile_name.clone(),
            summary_note: self.summary_note.clone(),
        }
    }

    /// Log file used while the terminal UI owns the screen
    pub fn log_path(&self) -> PathBuf {
        self.database_path.with_file_name(LOG_FILE)
    }

    /// Create the directory holding the database if needed
    pub fn ensure_database_dir(&self) -> Result<()> {
        if let Some(parent) = self.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"summary_note": "Merged", "database_path": "/tmp/x.db"}}"#).unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.summary_note, "Merged");
        assert_eq!(settings.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.default_profile_name, DEFAULT_PROFILE_NAME);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env(|key| match key {
            ENV_DB => Some("/data/debts.db".to_string()),
            ENV_LOG => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(settings.database_path, PathBuf::from("/data/debts.db"));
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_path(), PathBuf::from("/data/friendly-debts.log"));
    }

    #[test]
    fn test_blank_env_ignored() {
        let mut settings = Settings::default();
        let before = settings.clone();
        settings.apply_env(|_| Some("  ".to_string()));
        assert_eq!(settings, before);
    }

    #[test]
    fn test_ensure_database_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            database_path: dir.path().join("nested").join("db.sqlite"),
            ..Settings::default()
        };
        settings.ensure_database_dir().unwrap();
        assert!(dir.path().join("nested").is_dir());
    }
}
