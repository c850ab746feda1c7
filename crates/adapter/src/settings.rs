use core::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::{DEFAULT_SCRIPT_BASE_URL, DEFAULT_SLOT_ID_PREFIX, SETTINGS_ENV_PREFIX};
use crate::error::FastlaneError;

/// Exchange connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FastlaneSettings {
    /// Base URL the per-account SDK script is served from.
    #[validate(url)]
    pub script_base_url: String,

    /// Prefix for the render-target ids handed to the exchange.
    #[serde(default = "default_slot_id_prefix")]
    #[validate(length(min = 1, max = 64))]
    pub slot_id_prefix: String,

    /// How long a bid round may wait for the exchange. Unbounded when unset.
    #[serde(default)]
    #[validate(range(min = 1, max = 60_000))]
    pub auction_timeout_ms: Option<u64>,
}

fn default_slot_id_prefix() -> String {
    DEFAULT_SLOT_ID_PREFIX.to_string()
}

impl Default for FastlaneSettings {
    fn default() -> Self {
        Self {
            script_base_url: DEFAULT_SCRIPT_BASE_URL.to_string(),
            slot_id_prefix: default_slot_id_prefix(),
            auction_timeout_ms: None,
        }
    }
}

impl FastlaneSettings {
    #[must_use]
    pub fn auction_timeout(&self) -> Option<Duration> {
        self.auction_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    #[validate(length(min = 1))]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingSettings {
    /// Parse the configured level.
    ///
    /// # Errors
    ///
    /// Returns [`FastlaneError::Configuration`] for an unknown level name.
    pub fn level_filter(&self) -> Result<LevelFilter, Report<FastlaneError>> {
        LevelFilter::from_str(self.level.trim()).map_err(|_| {
            Report::new(FastlaneError::configuration(format!(
                "unknown log level '{}'",
                self.level
            )))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub fastlane: FastlaneSettings,
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load the settings bundled with the crate, with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`FastlaneError::Configuration`] if the bundled file or an
    /// override is invalid.
    pub fn new() -> Result<Self, Report<FastlaneError>> {
        let toml_str = include_str!("../../../fastlane-adapter.toml");
        Self::from_toml(toml_str)
    }

    /// Parse `toml_str`, apply `FASTLANE_ADAPTER__SECTION__KEY` overrides and
    /// validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`FastlaneError::Configuration`] when the TOML cannot be
    /// parsed, a required field is missing or a value fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<FastlaneError>> {
        let environment = Environment::default()
            .prefix(SETTINGS_ENV_PREFIX)
            .separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let settings: Self = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(FastlaneError::configuration("Failed to build configuration"))?
            .try_deserialize()
            .change_context(FastlaneError::configuration("Failed to deserialize settings"))?;

        settings
            .validate()
            .change_context(FastlaneError::configuration("Settings validation failed"))?;

        if !settings
            .fastlane
            .slot_id_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Report::new(FastlaneError::configuration(format!(
                "slot_id_prefix '{}' may only contain letters, digits, '-' and '_'",
                settings.fastlane.slot_id_prefix
            ))));
        }
        settings.logging.level_filter()?;

        Ok(settings)
    }
}
