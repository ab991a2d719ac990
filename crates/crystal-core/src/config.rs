//! Persistent configuration for crystal.
//!
//! Stores user settings in `~/.crystal/config.json`. Set `CRYSTAL_HOME` to
//! use a different directory.
//!
//! # Example
//!
//! ```no_run
//! use crystal_core::config::CrystalConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = CrystalConfig::load();
//!
//! if !config.confirm_destructive {
//!     println!("Deletes and overwrites will not ask first");
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const CONFIG_FILENAME: &str = "config.json";

/// Returns the crystal settings directory.
///
/// `CRYSTAL_HOME` wins when set; otherwise `~/.crystal`, falling back to
/// `.crystal` in the working directory when no home directory is known.
pub fn crystal_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("CRYSTAL_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".crystal")
}

/// Persistent crystal configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrystalConfig {
    /// Ask before deleting or overwriting.
    pub confirm_destructive: bool,
    /// Print a `[SUCCESS]` line after each file or network action.
    pub report_actions: bool,
    /// Echo requests sent by `ping`.
    pub ping_count: u32,
    pub ping_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for CrystalConfig {
    fn default() -> Self {
        Self {
            confirm_destructive: true,
            report_actions: true,
            ping_count: 4,
            ping_timeout_secs: 10,
            download_timeout_secs: 60,
        }
    }
}

impl CrystalConfig {
    pub fn path() -> PathBuf {
        crystal_dir().join(CONFIG_FILENAME)
    }

    /// Load config from `~/.crystal/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        std::fs::read_to_string(Self::path())
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_confirms_and_reports() {
        let config = CrystalConfig::default();
        assert!(config.confirm_destructive);
        assert!(config.report_actions);
        assert_eq!(config.ping_count, 4);
        assert_eq!(config.ping_timeout_secs, 10);
        assert_eq!(config.download_timeout_secs, 60);
    }

    #[test]
    fn roundtrip_serialization() {
        let config = CrystalConfig {
            confirm_destructive: false,
            ping_count: 2,
            ..CrystalConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let loaded: CrystalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn deserialize_empty_json() {
        let loaded: CrystalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded, CrystalConfig::default());
    }

    #[test]
    fn deserialize_partial_json_keeps_other_defaults() {
        let loaded: CrystalConfig = serde_json::from_str(r#"{"report_actions": false}"#).unwrap();
        assert!(!loaded.report_actions);
        assert!(loaded.confirm_destructive);
    }

    #[test]
    fn load_returns_default_for_missing_file() {
        // Should not panic whether or not a real config file exists.
        let config = CrystalConfig::load();
        let _ = config;
    }
}
