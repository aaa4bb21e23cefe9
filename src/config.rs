//! Bindery Configuration Module
//!
//! Behaviour knobs for models and timers, loadable from TOML.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`BINDERY_STRICT_CYCLES`, `BINDERY_CASCADE`)
//! 2. Config file passed to [`BinderyConfig::load_from`]
//! 3. Defaults
//!
//! ```toml
//! [model]
//! cycle_check = "full"
//! cascade = "transitive"
//!
//! [timer]
//! default_interval_ms = 250
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BinderyError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BinderyConfig {
    /// Options applied to every model built from this config
    #[serde(default)]
    pub model: ModelOptions,

    /// Timer defaults
    #[serde(default)]
    pub timer: TimerConfig,
}

/// How far dependency registration looks for cycles
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CycleCheck {
    /// Reject self-dependencies and direct two-property cycles only
    #[default]
    Direct,
    /// Reject any edge that closes a cycle, whatever its length
    Full,
}

/// How far a "changed" notification cascades through dependents
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CascadeDepth {
    /// Notify the direct dependents of the changed property only
    #[default]
    Direct,
    /// Keep notifying dependents of dependents; each property at most once
    Transitive,
}

/// Per-model behaviour
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelOptions {
    pub cycle_check: CycleCheck,
    pub cascade: CascadeDepth,
}

impl ModelOptions {
    /// Strict mode: full-graph cycle detection
    pub fn strict() -> Self {
        Self {
            cycle_check: CycleCheck::Full,
            ..Self::default()
        }
    }

    /// Set the cycle check mode
    pub fn with_cycle_check(mut self, cycle_check: CycleCheck) -> Self {
        self.cycle_check = cycle_check;
        self
    }

    /// Set the cascade depth
    pub fn with_cascade(mut self, cascade: CascadeDepth) -> Self {
        self.cascade = cascade;
        self
    }
}

/// Timer defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimerConfig {
    /// Interval used by `RescheduledTimer::start_default`
    pub default_interval_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: 1000,
        }
    }
}

impl TimerConfig {
    /// Set the default interval
    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Default interval as a `Duration`
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }
}

impl BinderyConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BinderyError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| BinderyError::ConfigError {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        Self::from_toml_str(&content)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BinderyError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    /// Unrecognized values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Ok(strict) = std::env::var("BINDERY_STRICT_CYCLES") {
            match strict.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.model.cycle_check = CycleCheck::Full,
                "0" | "false" | "no" => self.model.cycle_check = CycleCheck::Direct,
                _ => {}
            }
        }

        if let Ok(cascade) = std::env::var("BINDERY_CASCADE") {
            match cascade.trim().to_ascii_lowercase().as_str() {
                "direct" => self.model.cascade = CascadeDepth::Direct,
                "transitive" => self.model.cascade = CascadeDepth::Transitive,
                _ => {}
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    #[test]
    fn defaults_are_compatible_mode() {
        let config = BinderyConfig::default();
        assert_eq!(config.model.cycle_check, CycleCheck::Direct);
        assert_eq!(config.model.cascade, CascadeDepth::Direct);
        assert_eq!(config.timer.default_interval(), Duration::from_secs(1));
    }

    #[test]
    fn parse_full_config() {
        let config = BinderyConfig::from_toml_str(
            r#"
[model]
cycle_check = "full"
cascade = "transitive"

[timer]
default_interval_ms = 250
"#,
        )
        .unwrap();

        assert_eq!(
            config,
            BinderyConfig {
                model: ModelOptions {
                    cycle_check: CycleCheck::Full,
                    cascade: CascadeDepth::Transitive,
                },
                timer: TimerConfig {
                    default_interval_ms: 250
                },
            }
        );
    }

    #[test]
    fn parse_partial_config_fills_defaults() {
        let config = BinderyConfig::from_toml_str("[model]\ncascade = \"transitive\"\n").unwrap();
        assert_eq!(config.model.cycle_check, CycleCheck::Direct);
        assert_eq!(config.model.cascade, CascadeDepth::Transitive);
        assert_eq!(config.timer, TimerConfig::default());
    }

    #[test]
    fn parse_rejects_unknown_mode() {
        let err = BinderyConfig::from_toml_str("[model]\ncycle_check = \"sometimes\"\n").unwrap_err();
        assert_eq!(err.code(), "BND-030");
    }

    #[test]
    fn toml_roundtrip_preserves_options() {
        let config = BinderyConfig {
            model: ModelOptions::strict(),
            timer: TimerConfig::default().with_default_interval(Duration::from_millis(40)),
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("cycle_check = \"full\""));
        assert_eq!(BinderyConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = BinderyConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BinderyConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindery.toml");
        std::fs::write(&path, "[timer]\ndefault_interval_ms = 5\n").unwrap();

        let config = BinderyConfig::load_from(&path).unwrap();
        assert_eq!(config.timer.default_interval(), Duration::from_millis(5));
    }

    #[test]
    #[serial]
    fn env_overrides_file_values() {
        std::env::set_var("BINDERY_STRICT_CYCLES", "true");
        std::env::set_var("BINDERY_CASCADE", "Transitive");

        let config = BinderyConfig::default().with_env();

        std::env::remove_var("BINDERY_STRICT_CYCLES");
        std::env::remove_var("BINDERY_CASCADE");

        assert_eq!(config.model.cycle_check, CycleCheck::Full);
        assert_eq!(config.model.cascade, CascadeDepth::Transitive);
    }

    #[test]
    #[serial]
    fn env_ignores_garbage() {
        std::env::set_var("BINDERY_STRICT_CYCLES", "maybe");
        std::env::remove_var("BINDERY_CASCADE");

        let config = BinderyConfig {
            model: ModelOptions::strict(),
            ..Default::default()
        }
        .with_env();

        std::env::remove_var("BINDERY_STRICT_CYCLES");

        assert_eq!(config.model.cycle_check, CycleCheck::Full);
    }
}
