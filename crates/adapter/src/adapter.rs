//! The adapter as registered with the host header-bidding framework.

use std::sync::Arc;

use crate::constants::FASTLANE_BIDDER_CODE;
use crate::exchange::{BatchTicket, ExchangeSession, ScriptLoader, SessionController};
use crate::registry::BidRegistry;
use crate::settings::Settings;
use crate::types::BidderRequest;

/// Trait implemented by bid adapters the host framework can call.
pub trait BidAdapter: Send + Sync {
    /// Bidder code stamped on every outcome (e.g. "fastlane").
    fn bidder_code(&self) -> &'static str;

    /// Start bidding for `request`.
    ///
    /// Outcomes are delivered to the registry, one per placement. The ticket
    /// can be awaited to bound the wait or simply dropped.
    fn call_bids(&self, request: &BidderRequest) -> BatchTicket;
}

/// Fastlane bid adapter.
pub struct FastlaneAdapter {
    controller: SessionController,
}

impl FastlaneAdapter {
    /// Create an adapter over an existing page session.
    ///
    /// Several adapters may share one session; the SDK is still loaded once
    /// and their commands share one queue.
    #[must_use]
    pub fn new(session: Arc<ExchangeSession>, registry: Arc<dyn BidRegistry>) -> Self {
        Self {
            controller: SessionController::new(session, registry),
        }
    }

    /// Create an adapter with a fresh session built from `settings`.
    #[must_use]
    pub fn from_settings(
        settings: &Settings,
        loader: Arc<dyn ScriptLoader>,
        registry: Arc<dyn BidRegistry>,
    ) -> Self {
        let session = ExchangeSession::new(settings.fastlane.clone(), loader);
        Self::new(session, registry)
    }

    #[must_use]
    pub fn session(&self) -> &Arc<ExchangeSession> {
        self.controller.session()
    }

    /// Entry point for a batch of placements.
    ///
    /// The SDK account is taken from the first placement only; `accountId`
    /// on later placements is not consulted.
    pub fn request_bids(&self, request: &BidderRequest) -> BatchTicket {
        log::info!(
            "{}: bid request for {} placements",
            FASTLANE_BIDDER_CODE,
            request.bids.len()
        );
        self.controller.start_round(request)
    }
}

impl BidAdapter for FastlaneAdapter {
    fn bidder_code(&self) -> &'static str {
        FASTLANE_BIDDER_CODE
    }

    fn call_bids(&self, request: &BidderRequest) -> BatchTicket {
        self.request_bids(request)
    }
}
