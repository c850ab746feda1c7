//! Turns one slot's raw exchange candidates into exactly one [`BidOutcome`].

use crate::constants::FASTLANE_BIDDER_CODE;
use crate::creative::build_creative;
use crate::ranker::{rank_candidates, select_winner};
use crate::size_codec::describe_table;
use crate::types::{AdCandidate, BidOutcome, FailedBid, FailureDetail, SuccessBid};

/// Normalize the candidates the exchange returned for the slot rendered into
/// `target_id`.
///
/// - no candidates: a failure carrying the (possibly empty) raw list
/// - winner without dimensions: a logged data-quality failure
/// - winner with a size the exchange cannot render: a success with an empty
///   creative, priced and sized from the winner
///
/// Never panics; every data problem ends up in the returned outcome.
#[must_use]
pub fn normalize(target_id: &str, candidates: Option<Vec<AdCandidate>>) -> BidOutcome {
    let candidates = match candidates {
        Some(candidates) if !candidates.is_empty() => candidates,
        other => return BidOutcome::no_bid(other.unwrap_or_default()),
    };

    let ranked = rank_candidates(candidates);
    let Some(winner) = select_winner(&ranked) else {
        return BidOutcome::no_bid(Vec::new());
    };

    let Some(size) = winner.dimensions else {
        log::error!(
            "{}: no dimensions given for winning candidate {:?} in slot '{}' (known sizes: {})",
            FASTLANE_BIDDER_CODE,
            winner,
            target_id,
            describe_table()
        );
        return BidOutcome::Failure(FailedBid {
            bidder_code: FASTLANE_BIDDER_CODE,
            error: FailureDetail::Candidates(ranked),
        });
    };

    // An unknown size still yields a priced record, just without markup.
    let ad = build_creative(target_id, size).unwrap_or_else(|err| {
        log::error!(
            "{}: could not build creative for slot '{}': {}",
            FASTLANE_BIDDER_CODE,
            target_id,
            err.current_context()
        );
        String::new()
    });

    BidOutcome::Success(SuccessBid {
        bidder_code: FASTLANE_BIDDER_CODE,
        cpm: winner.price(),
        ad,
        width: size.width,
        height: size.height,
    })
}
