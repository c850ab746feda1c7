//! Interaction with the exchange's client SDK.
//!
//! The SDK itself is opaque. The adapter only sees the surface described by
//! [`ExchangeSdk`] and [`ExchangeSlot`], reached through a FIFO command queue
//! that the exchange drains once its script has loaded and signalled ready.
//!
//! - [`queue`]: the command queue and its readiness gate
//! - [`session`]: the page-wide session that loads the SDK at most once
//! - [`controller`]: one bid round, from slot definition to result fan-out

use std::sync::Arc;

use error_stack::Report;
use url::Url;

use crate::error::FastlaneError;
use crate::types::{AdCandidate, AdSize};

pub mod controller;
pub mod queue;
pub mod session;

pub use controller::{BatchTicket, RoundPhase, SessionController, SlotHandle};
pub use queue::CommandQueue;
pub use session::{ExchangeSession, OutcomeLedger, ReadySignal, SessionState};

/// A deferred operation run against the SDK once it is ready.
pub type Command = Box<dyn FnOnce(&dyn ExchangeSdk) + Send>;

/// Called by the SDK when an auction run finishes.
pub type AuctionCallback = Box<dyn FnOnce(&dyn ExchangeSdk) + Send>;

/// One slot as the exchange reports it after an auction.
pub trait ExchangeSlot: Send + Sync {
    /// Render-target id the slot was defined with.
    fn element_id(&self) -> String;
    /// Placement code (ad unit path) the slot was defined with.
    fn slot_name(&self) -> String;
    /// Candidates the exchange collected for this slot, if any.
    fn raw_responses(&self) -> Option<Vec<AdCandidate>>;
}

/// The exchange SDK surface the adapter relies on.
pub trait ExchangeSdk: Send + Sync {
    /// Register a slot for the next auction.
    ///
    /// # Errors
    ///
    /// Returns an error when the SDK refuses the definition.
    fn define_slot(
        &self,
        slot_name: &str,
        sizes: &[AdSize],
        element_id: &str,
    ) -> Result<(), Report<FastlaneError>>;

    /// Run an auction over every defined slot and call `on_complete` when
    /// results are available.
    fn run(&self, on_complete: AuctionCallback);

    /// Every slot defined so far, across all runs.
    fn all_slots(&self) -> Vec<Arc<dyn ExchangeSlot>>;
}

/// Fetches and executes the exchange's client library.
pub trait ScriptLoader: Send + Sync {
    /// Start loading the script at `url`. Once the exchange is usable the
    /// loader (or the loaded script) calls [`ReadySignal::ready`].
    ///
    /// # Errors
    ///
    /// Returns an error when the load cannot even be started.
    fn load_script(&self, url: &Url, on_ready: ReadySignal) -> Result<(), Report<FastlaneError>>;
}
