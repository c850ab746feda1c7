use error_stack::{Report, ResultExt};
use log::LevelFilter;

use crate::error::FastlaneError;
use crate::settings::LoggingSettings;

/// Install the global logger, writing timestamped lines to stderr.
///
/// Should be called once by the embedding host. Adapter code only uses the
/// `log` macros, so a host with its own logger can skip this entirely.
///
/// # Errors
///
/// Returns [`FastlaneError::Configuration`] for an unknown level or when a
/// global logger is already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), Report<FastlaneError>> {
    let level = settings.level_filter()?;

    dispatch(level)
        .apply()
        .change_context(FastlaneError::configuration("Failed to initialize logger"))
}

fn dispatch(level: LevelFilter) -> fern::Dispatch {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                record.target(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stderr())
}

/// Log level helper to determine if debug logging is enabled
#[must_use]
pub fn is_debug_enabled() -> bool {
    log::log_enabled!(log::Level::Debug)
}
