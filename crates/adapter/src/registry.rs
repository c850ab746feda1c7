//! The host framework's bid registry, as seen by the adapter.

use crate::types::BidOutcome;

/// Receives finished outcomes, one per placement.
///
/// The registry owns what happens next (auction across adapters, ad server
/// targeting). Implementations must not call back into the adapter
/// synchronously.
pub trait BidRegistry: Send + Sync {
    fn add_bid_response(&self, placement_code: &str, bid: BidOutcome);
}
