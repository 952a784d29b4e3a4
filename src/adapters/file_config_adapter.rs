//! INI file configuration adapter.
//!
//! Sections read by the binary: `[sqlite]`, `[market_data]`, `[alpaca]`,
//! `[paper]`. Values may be overridden per key by environment variables
//! named `AUTOTRADER_<SECTION>_<KEY>`.

use crate::domain::error::AutotraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
    env_overrides: bool,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AutotraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| AutotraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self {
            config,
            env_overrides: true,
        })
    }

    /// Parse INI text. Environment overrides are off so results depend on
    /// the text alone.
    pub fn from_string(content: &str) -> Result<Self, AutotraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| AutotraderError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self {
            config,
            env_overrides: false,
        })
    }

    fn env_key(section: &str, key: &str) -> String {
        format!(
            "AUTOTRADER_{}_{}",
            section.to_uppercase(),
            key.to_uppercase()
        )
    }

    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        if self.env_overrides {
            if let Ok(value) = std::env::var(Self::env_key(section, key)) {
                return Some(value);
            }
        }
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.lookup(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.lookup(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.lookup(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

/// Fetch a required string value.
pub fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, AutotraderError> {
    config
        .get_string(section, key)
        .ok_or_else(|| AutotraderError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        })
}
