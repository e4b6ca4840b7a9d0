//! Analyzer settings
//!
//! Stored as TOML; every key is optional and falls back to its default.

use std::path::{Path, PathBuf};

use anyhow::Context;
use hid_analyzer_transport::{DeviceFilter, SessionConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Bound on output/feature writes
    pub write_timeout_ms: u64,
    /// Presence poll period for attach/detach
    pub monitor_interval_ms: u64,
    /// Receive loop idle wake-up
    pub read_poll_ms: u64,
    /// Receive errors in a row before the session faults
    pub max_read_errors: u32,
    /// Session event channel depth
    pub event_capacity: usize,
    /// Color log lines by emphasis
    pub color: bool,
    /// `VID:PID` applied to `list` and index selection when none is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_filter: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            write_timeout_ms: session.write_timeout_ms,
            monitor_interval_ms: session.monitor_interval_ms,
            read_poll_ms: session.read_poll_ms,
            max_read_errors: session.max_read_errors,
            event_capacity: session.event_capacity,
            color: true,
            default_filter: None,
        }
    }
}

impl AnalyzerConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hid-analyzer")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: AnalyzerConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Session settings derived from this file
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            write_timeout_ms: self.write_timeout_ms,
            read_poll_ms: self.read_poll_ms,
            max_read_errors: self.max_read_errors,
            monitor_interval_ms: self.monitor_interval_ms,
            event_capacity: self.event_capacity,
            ..SessionConfig::default()
        }
    }

    /// The configured default filter, or match-all
    pub fn filter(&self) -> anyhow::Result<DeviceFilter> {
        match &self.default_filter {
            Some(text) => Ok(text.parse()?),
            None => Ok(DeviceFilter::any()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_session_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.write_timeout_ms, 3000);
        assert_eq!(config.monitor_interval_ms, 500);
        assert_eq!(config.session_config(), SessionConfig::default());
        assert!(config.color);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AnalyzerConfig =
            toml::from_str("write_timeout_ms = 1000\ncolor = false\n").unwrap();
        assert_eq!(config.write_timeout_ms, 1000);
        assert!(!config.color);
        assert_eq!(config.read_poll_ms, 50);
        assert_eq!(config.max_read_errors, 8);
        assert_eq!(config.session_config().write_timeout_ms, 1000);
    }

    #[test]
    fn test_filter_from_config() {
        let mut config = AnalyzerConfig::default();
        assert_eq!(config.filter().unwrap(), DeviceFilter::any());

        config.default_filter = Some("046d:c52b".into());
        assert_eq!(config.filter().unwrap(), DeviceFilter::exact(0x046D, 0xC52B));

        config.default_filter = Some("046D".into());
        assert!(config.filter().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("hid-analyzer-config-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");

        let config = AnalyzerConfig {
            event_capacity: 32,
            default_filter: Some("1050:0407".into()),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(AnalyzerConfig::load(&path).unwrap(), config);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = Path::new("/nonexistent/hid-analyzer/config.toml");
        assert_eq!(AnalyzerConfig::load(path).unwrap(), AnalyzerConfig::default());
    }

    #[test]
    fn test_omits_unset_filter() {
        let text = AnalyzerConfig::default().to_toml().unwrap();
        assert!(text.contains("write_timeout_ms = 3000"));
        assert!(!text.contains("default_filter"));
    }
}
