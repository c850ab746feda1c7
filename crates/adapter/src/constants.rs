/// Bidder code reported on every outcome this adapter produces.
pub const FASTLANE_BIDDER_CODE: &str = "fastlane";

/// Prefix of the render-target ids handed to the exchange.
pub const DEFAULT_SLOT_ID_PREFIX: &str = "pb_flane_slot-";

/// Where the exchange serves its per-account client library.
pub const DEFAULT_SCRIPT_BASE_URL: &str = "https://ads.rubiconproject.com/header/";

/// Prefix for environment overrides of settings (`FASTLANE_ADAPTER__SECTION__KEY`).
pub const SETTINGS_ENV_PREFIX: &str = "FASTLANE_ADAPTER";
