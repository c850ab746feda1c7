//! One bid round against the exchange.
//!
//! A round walks `Idle → SdkLoading → SlotsDefining → AuctionRunning →
//! Complete`. Everything after slot definition happens inside commands the
//! exchange drains on its own schedule, so the controller only ever observes
//! completion through the auction callback. A round can instead end
//! `Aborted` (configuration error before any slot was defined) or
//! `TimedOut` (the host gave up waiting through [`BatchTicket`]).
//!
//! Every render target is settled exactly once per page through the
//! session's [`OutcomeLedger`]: by the first auction fan-out that sees it, by
//! the exchange rejecting its definition, or by a timeout.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::bid_timer::BidTimer;
use crate::constants::FASTLANE_BIDDER_CODE;
use crate::logging::is_debug_enabled;
use crate::normalizer::normalize;
use crate::registry::BidRegistry;
use crate::types::{BidOutcome, BidderRequest, PlacementRequest};

use super::session::{ExchangeSession, OutcomeLedger};
use super::{ExchangeSdk, ExchangeSlot};

/// Where a round currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    SdkLoading,
    SlotsDefining,
    AuctionRunning,
    Complete,
    Aborted,
    TimedOut,
}

impl RoundPhase {
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::Aborted | Self::TimedOut)
    }
}

/// A placement that has been given a render target and queued for definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotHandle {
    pub target_id: String,
    pub placement_code: String,
}

struct RoundState {
    phase: RoundPhase,
    slots: Vec<SlotHandle>,
    timer: BidTimer,
    done: Option<oneshot::Sender<()>>,
}

struct AuctionRound {
    state: Mutex<RoundState>,
}

impl AuctionRound {
    fn new(done: oneshot::Sender<()>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RoundState {
                phase: RoundPhase::Idle,
                slots: Vec::new(),
                timer: BidTimer::start(),
                done: Some(done),
            }),
        })
    }

    fn phase(&self) -> RoundPhase {
        self.lock().phase
    }

    fn set_phase(&self, phase: RoundPhase) {
        self.lock().phase = phase;
    }

    fn slots(&self) -> Vec<SlotHandle> {
        self.lock().slots.clone()
    }

    fn finish(&self, phase: RoundPhase) {
        let mut state = self.lock();
        if !state.phase.is_finished() {
            state.phase = phase;
        }
        if phase == RoundPhase::Complete {
            log::info!("{}", state.timer.log_line());
        }
        if let Some(done) = state.done.take() {
            let _ = done.send(());
        }
    }

    /// Give up on the round, returning the slots that never got an outcome.
    fn expire(&self, outcomes: &OutcomeLedger) -> Vec<SlotHandle> {
        let mut state = self.lock();
        if state.phase.is_finished() {
            return Vec::new();
        }
        state.phase = RoundPhase::TimedOut;

        state
            .slots
            .iter()
            .filter(|slot| outcomes.claim_timeout(&slot.target_id))
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, RoundState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drives bid rounds for one adapter instance over a shared session.
pub struct SessionController {
    session: Arc<ExchangeSession>,
    registry: Arc<dyn BidRegistry>,
    timeout: Option<Duration>,
}

impl SessionController {
    #[must_use]
    pub fn new(session: Arc<ExchangeSession>, registry: Arc<dyn BidRegistry>) -> Self {
        let timeout = session.config().auction_timeout();
        Self {
            session,
            registry,
            timeout,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<ExchangeSession> {
        &self.session
    }

    /// Run one round for `request`.
    ///
    /// The SDK is initialised from the first placement's params only. Every
    /// placement gets a slot, then the auction run is queued behind them.
    /// Outcomes reach the registry from the auction callback; on a
    /// configuration error every placement gets a failure right away.
    pub fn start_round(&self, request: &BidderRequest) -> BatchTicket {
        let (done_tx, done_rx) = oneshot::channel();
        let round = AuctionRound::new(done_tx);
        let ticket = BatchTicket {
            round: Arc::clone(&round),
            done: done_rx,
            registry: Arc::clone(&self.registry),
            outcomes: Arc::clone(self.session.outcomes()),
            timeout: self.timeout,
        };

        let Some(first) = request.bids.first() else {
            log::debug!("{}: empty bid request, nothing to do", FASTLANE_BIDDER_CODE);
            round.finish(RoundPhase::Complete);
            return ticket;
        };

        round.set_phase(RoundPhase::SdkLoading);
        if let Err(err) = self.session.ensure_loaded(first.params.account_id.as_deref()) {
            log::error!(
                "{}: aborting bid request for {} placements: {:?}",
                FASTLANE_BIDDER_CODE,
                request.bids.len(),
                err
            );
            let reason = err.current_context().to_string();
            for placement in &request.bids {
                self.registry.add_bid_response(
                    &placement.placement_code,
                    BidOutcome::failed(reason.clone()),
                );
            }
            round.finish(RoundPhase::Aborted);
            return ticket;
        }

        {
            let mut state = round.lock();
            state.timer.mark_sdk();
            state.phase = RoundPhase::SlotsDefining;
        }

        let handles: Vec<SlotHandle> = request
            .bids
            .iter()
            .map(|placement| self.define_slot(placement))
            .collect();

        {
            let mut state = round.lock();
            state.slots = handles;
            state.timer.mark_slots();
            state.phase = RoundPhase::AuctionRunning;
        }

        self.run_auction(Arc::clone(&round));
        ticket
    }

    /// Allocate a render target for `placement` and queue its definition.
    ///
    /// A definition the exchange rejects settles the placement with a
    /// failure on the spot.
    fn define_slot(&self, placement: &PlacementRequest) -> SlotHandle {
        let handle = SlotHandle {
            target_id: self.session.next_target_id(),
            placement_code: placement.placement_code.clone(),
        };

        let slot_name = handle.placement_code.clone();
        let element_id = handle.target_id.clone();
        let sizes = placement.sizes.clone();
        let registry = Arc::clone(&self.registry);
        let outcomes = Arc::clone(self.session.outcomes());
        self.session.enqueue(Box::new(move |sdk: &dyn ExchangeSdk| {
            let Err(err) = sdk.define_slot(&slot_name, &sizes, &element_id) else {
                return;
            };
            log::error!(
                "{}: exchange rejected slot '{}' ({}): {:?}",
                FASTLANE_BIDDER_CODE,
                slot_name,
                element_id,
                err
            );
            if outcomes.claim_report(&element_id) {
                registry.add_bid_response(
                    &slot_name,
                    BidOutcome::failed(err.current_context().to_string()),
                );
            }
        }));

        log::debug!(
            "{}: queued slot '{}' as {}",
            FASTLANE_BIDDER_CODE,
            handle.placement_code,
            handle.target_id
        );
        handle
    }

    fn run_auction(&self, round: Arc<AuctionRound>) {
        let registry = Arc::clone(&self.registry);
        let outcomes = Arc::clone(self.session.outcomes());
        self.session.enqueue(Box::new(move |sdk: &dyn ExchangeSdk| {
            sdk.run(Box::new(move |sdk: &dyn ExchangeSdk| {
                complete_round(sdk, &round, registry.as_ref(), &outcomes);
            }));
        }));
    }
}

/// Fan the exchange's results out to the registry.
///
/// Walks every slot the exchange knows about, including those defined by
/// earlier rounds, and reports each one that has no outcome yet.
fn complete_round(
    sdk: &dyn ExchangeSdk,
    round: &AuctionRound,
    registry: &dyn BidRegistry,
    outcomes: &OutcomeLedger,
) {
    let slots = sdk.all_slots();
    if is_debug_enabled() {
        let targets: Vec<String> = slots.iter().map(|slot| slot.element_id()).collect();
        log::debug!(
            "{}: auction complete, exchange knows {} slots: {}",
            FASTLANE_BIDDER_CODE,
            targets.len(),
            targets.join(", ")
        );
    }

    for slot in slots {
        report_slot(slot.as_ref(), registry, outcomes);
    }

    round.finish(RoundPhase::Complete);
}

fn report_slot(slot: &dyn ExchangeSlot, registry: &dyn BidRegistry, outcomes: &OutcomeLedger) {
    let target_id = slot.element_id();
    if !outcomes.claim_report(&target_id) {
        log::trace!(
            "{}: slot {} already settled, skipping",
            FASTLANE_BIDDER_CODE,
            target_id
        );
        return;
    }

    let outcome = normalize(&target_id, slot.raw_responses());
    registry.add_bid_response(&slot.slot_name(), outcome);
}

/// Handle on a started round.
///
/// Dropping the ticket is fine: outcomes still reach the registry when the
/// exchange completes. Awaiting it bounds how long the host waits.
pub struct BatchTicket {
    round: Arc<AuctionRound>,
    done: oneshot::Receiver<()>,
    registry: Arc<dyn BidRegistry>,
    outcomes: Arc<OutcomeLedger>,
    timeout: Option<Duration>,
}

impl BatchTicket {
    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    /// Slots defined by this round, in request order.
    #[must_use]
    pub fn slots(&self) -> Vec<SlotHandle> {
        self.round.slots()
    }

    /// Wait for the round using the configured timeout, or without bound
    /// when none is configured.
    pub async fn wait(self) -> RoundPhase {
        match self.timeout {
            Some(timeout) => self.wait_for(timeout).await,
            None => {
                let _ = self.done.await;
                self.round.phase()
            }
        }
    }

    /// Wait at most `timeout` for the round to complete.
    ///
    /// On expiry every slot of this round that has no outcome yet gets a
    /// failure, and a late auction completion will not report it again.
    pub async fn wait_for(self, timeout: Duration) -> RoundPhase {
        if tokio::time::timeout(timeout, self.done).await.is_err() {
            let expired = self.round.expire(&self.outcomes);
            if !expired.is_empty() {
                log::warn!(
                    "{}: auction timed out after {}ms, failing {} placements",
                    FASTLANE_BIDDER_CODE,
                    timeout.as_millis(),
                    expired.len()
                );
            }
            for slot in expired {
                self.registry.add_bid_response(
                    &slot.placement_code,
                    BidOutcome::failed(format!("timed out after {}ms", timeout.as_millis())),
                );
            }
        }
        self.round.phase()
    }
}
