//! Error types for the Fastlane adapter.
//!
//! Fallible operations return `Result<T, Report<FastlaneError>>` so the
//! original cause stays attached as the error travels up through
//! `change_context`. Nothing here ever reaches the host framework as a panic:
//! the adapter boundary turns every error into a logged failure outcome.

use derive_more::Display;

/// Errors raised inside the adapter.
#[derive(Debug, Display)]
pub enum FastlaneError {
    /// Missing or invalid configuration (script URL, account id, settings).
    ///
    /// Fatal to the session's initialisation; never retried.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// The exchange returned data the adapter cannot turn into a bid.
    ///
    /// Recovered locally into a failure or degraded outcome.
    #[display("Data quality error: {message}")]
    DataQuality { message: String },

    /// The exchange SDK rejected a command.
    #[display("Exchange error: {message}")]
    Exchange { message: String },
}

impl core::error::Error for FastlaneError {}

impl FastlaneError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn data_quality(message: impl Into<String>) -> Self {
        Self::DataQuality {
            message: message.into(),
        }
    }

    pub fn exchange(message: impl Into<String>) -> Self {
        Self::Exchange {
            message: message.into(),
        }
    }
}
