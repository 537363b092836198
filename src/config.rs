//! TOML configuration for the keyboard shell.
//!
//! ```toml
//! [voice]
//! attack = 2.0
//! bit_depth = 6
//!
//! [dispatch]
//! pending = "drop"
//!
//! [logging]
//! file = "crushkeys.log"
//! level = "debug"
//!
//! [keyboard]
//! auto_release_ms = 300
//! ```
//!
//! Every section and field is optional.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{dispatch::PendingPolicy, params::VoiceParams};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub voice: VoiceParams,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
    pub keyboard: KeyboardConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub pending: PendingPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
    /// `tracing` filter directive, e.g. `info` or `crushkeys=trace`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("crushkeys.log"),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Release delay for terminals that never report key-up.
    pub auto_release_ms: u64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self { auto_release_ms: 250 }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse TOML text. Voice values are clamped into range.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.voice = config.voice.clamped();
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = Config::parse(
            r#"
            [voice]
            bit_depth = 4

            [dispatch]
            pending = "drop"
            "#,
        )
        .unwrap();

        assert_eq!(config.voice.bit_depth(), 4);
        assert_eq!(config.voice.volume(), VoiceParams::default().volume());
        assert_eq!(config.dispatch.pending, PendingPolicy::Drop);
        assert_eq!(config.keyboard.auto_release_ms, 250);
    }

    #[test]
    fn out_of_range_voice_values_are_clamped() {
        let config = Config::parse(
            r#"
            [voice]
            volume = 7.0
            cutoff = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(config.voice.volume(), 1.0);
        assert_eq!(config.voice.cutoff_hz(), 20.0);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = Config::parse("[voice\nattack = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load(Path::new("/nonexistent/crushkeys.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn written_config_reads_back() {
        let mut config = Config::default();
        config.voice.set_blend(0.75);
        config.logging.level = "debug".to_string();

        let text = config.to_toml().unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }
}
