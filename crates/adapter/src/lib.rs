//! Fastlane bid adapter for client-side header bidding.
//!
//! The adapter takes a batch of ad placements from the host framework, has
//! the exchange's client SDK run an auction for them, and hands exactly one
//! normalized outcome per placement back to the host's bid registry.
//!
//! # Modules
//!
//! - [`adapter`]: The public entry point registered with the host framework
//! - [`bid_timer`]: Per-round phase timing for diagnostics
//! - [`constants`]: Bidder code, defaults and environment prefix
//! - [`creative`]: Render-call creative payloads and their inverse
//! - [`error`]: Error types and error handling utilities
//! - [`exchange`]: SDK session, command queue and bid rounds
//! - [`logging`]: Logger installation for embedding hosts
//! - [`normalizer`]: Raw exchange candidates to bid outcomes
//! - [`ranker`]: Price ordering and winner selection
//! - [`registry`]: The host's bid registry interface
//! - [`settings`]: Configuration management and validation
//! - [`size_codec`]: Ad size to exchange size id mapping
//! - [`test_support`]: Testing utilities and fakes
//! - [`types`]: Request, candidate and outcome types

pub mod adapter;
pub mod bid_timer;
pub mod constants;
pub mod creative;
pub mod error;
pub mod exchange;
pub mod logging;
pub mod normalizer;
pub mod ranker;
pub mod registry;
pub mod settings;
pub mod size_codec;
pub mod test_support;
pub mod types;

pub use adapter::{BidAdapter, FastlaneAdapter};
pub use error::FastlaneError;
pub use registry::BidRegistry;
pub use types::{BidOutcome, BidderRequest, PlacementRequest};
