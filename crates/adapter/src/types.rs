//! Core types for bid requests, exchange candidates and outcomes.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::FASTLANE_BIDDER_CODE;

/// Creative dimensions in pixels.
///
/// Serialized as a `[width, height]` pair, matching what both the host
/// framework and the exchange use on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct AdSize {
    pub width: u32,
    pub height: u32,
}

impl AdSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<[u32; 2]> for AdSize {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<AdSize> for [u32; 2] {
    fn from(size: AdSize) -> Self {
        [size.width, size.height]
    }
}

impl fmt::Display for AdSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Bidder-level params supplied with each placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastlaneParams {
    /// Exchange account id (accepts both string and integer from the page).
    #[serde(
        rename = "accountId",
        alias = "account_id",
        default,
        deserialize_with = "deserialize_account_id"
    )]
    pub account_id: Option<String>,
}

/// Custom deserializer for `account_id` that accepts strings, integers or null.
fn deserialize_account_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct AccountIdVisitor;

    impl<'de> Visitor<'de> for AccountIdVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer for accountId")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(AccountIdVisitor)
        }
    }

    deserializer.deserialize_any(AccountIdVisitor)
}

/// One placement the host framework wants a bid for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRequest {
    /// Ad unit path; also the key outcomes are reported under.
    #[serde(rename = "placementCode")]
    pub placement_code: String,
    /// Accepted sizes, in the publisher's order of preference.
    #[serde(default)]
    pub sizes: Vec<AdSize>,
    #[serde(default)]
    pub params: FastlaneParams,
}

/// A batch of placements handed to the adapter in one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidderRequest {
    #[serde(default)]
    pub bids: Vec<PlacementRequest>,
}

/// Raw ad offer returned by the exchange for one slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdCandidate {
    /// Bid price in CPM; absent is treated as zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpm: Option<f64>,
    /// Creative size; absent is a data-quality problem, not a no-bid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<AdSize>,
}

impl AdCandidate {
    #[must_use]
    pub fn new(cpm: f64, dimensions: AdSize) -> Self {
        Self {
            cpm: Some(cpm),
            dimensions: Some(dimensions),
        }
    }

    /// Price used for ranking and reporting.
    #[must_use]
    pub fn price(&self) -> f64 {
        self.cpm.unwrap_or(0.0)
    }
}

/// Status of an outcome, using the bid factory's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Good,
    NoBid,
}

impl BidStatus {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Good => 1,
            Self::NoBid => 2,
        }
    }
}

/// A priced creative ready for the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessBid {
    pub bidder_code: &'static str,
    pub cpm: f64,
    /// Creative payload; empty when the size could not be resolved.
    pub ad: String,
    pub width: u32,
    pub height: u32,
}

impl SuccessBid {
    /// False for the degraded record produced when the size had no id.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        !self.ad.is_empty()
    }
}

/// What went wrong for a failed placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FailureDetail {
    /// The raw (possibly empty) candidate list from the exchange.
    Candidates(Vec<AdCandidate>),
    /// A reason produced by the adapter itself.
    Reason(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedBid {
    pub bidder_code: &'static str,
    pub error: FailureDetail,
}

/// The normalized result handed to the registry, one per placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BidOutcome {
    Success(SuccessBid),
    Failure(FailedBid),
}

impl BidOutcome {
    /// Build a failure carrying the exchange's candidates.
    #[must_use]
    pub fn no_bid(candidates: Vec<AdCandidate>) -> Self {
        Self::Failure(FailedBid {
            bidder_code: FASTLANE_BIDDER_CODE,
            error: FailureDetail::Candidates(candidates),
        })
    }

    /// Build a failure carrying an adapter-side reason.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failure(FailedBid {
            bidder_code: FASTLANE_BIDDER_CODE,
            error: FailureDetail::Reason(reason.into()),
        })
    }

    #[must_use]
    pub fn bidder_code(&self) -> &'static str {
        match self {
            Self::Success(bid) => bid.bidder_code,
            Self::Failure(bid) => bid.bidder_code,
        }
    }

    #[must_use]
    pub fn status(&self) -> BidStatus {
        match self {
            Self::Success(_) => BidStatus::Good,
            Self::Failure(_) => BidStatus::NoBid,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn cpm(&self) -> Option<f64> {
        match self {
            Self::Success(bid) => Some(bid.cpm),
            Self::Failure(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bidder_request_from_host_json() {
        let request: BidderRequest = serde_json::from_value(json!({
            "bids": [
                {
                    "placementCode": "/19968336/header-bid-tag-0",
                    "sizes": [[300, 250], [300, 600]],
                    "params": { "accountId": "1001" }
                },
                {
                    "placementCode": "/19968336/header-bid-tag-1",
                    "sizes": [[728, 90]],
                    "params": { "account_id": 1001 }
                }
            ]
        }))
        .expect("should parse bidder request");

        assert_eq!(request.bids.len(), 2);
        assert_eq!(
            request.bids[0].sizes,
            vec![AdSize::new(300, 250), AdSize::new(300, 600)]
        );
        assert_eq!(request.bids[0].params.account_id.as_deref(), Some("1001"));
        assert_eq!(
            request.bids[1].params.account_id.as_deref(),
            Some("1001"),
            "Integer account ids should be accepted"
        );
    }

    #[test]
    fn test_missing_params_yield_no_account_id() {
        let placement: PlacementRequest = serde_json::from_value(json!({
            "placementCode": "div-1",
            "sizes": [[320, 50]]
        }))
        .expect("should parse placement without params");
        assert_eq!(placement.params.account_id, None);

        let placement: PlacementRequest = serde_json::from_value(json!({
            "placementCode": "div-1",
            "params": { "accountId": null }
        }))
        .expect("should parse null account id");
        assert_eq!(placement.params.account_id, None);
        assert!(placement.sizes.is_empty());
    }

    #[test]
    fn test_candidate_missing_fields() {
        let candidate: AdCandidate =
            serde_json::from_value(json!({})).expect("should parse empty candidate");
        assert_eq!(candidate.price(), 0.0);
        assert_eq!(candidate.dimensions, None);

        let candidate: AdCandidate =
            serde_json::from_value(json!({ "cpm": 1.25, "dimensions": [970, 250] }))
                .expect("should parse candidate");
        assert_eq!(candidate.price(), 1.25);
        assert_eq!(candidate.dimensions, Some(AdSize::new(970, 250)));
    }

    #[test]
    fn test_ad_size_display() {
        assert_eq!(AdSize::new(300, 1050).to_string(), "300x1050");
    }

    #[test]
    fn test_outcome_status_codes() {
        let success = BidOutcome::Success(SuccessBid {
            bidder_code: FASTLANE_BIDDER_CODE,
            cpm: 0.5,
            ad: "<script></script>".to_string(),
            width: 300,
            height: 250,
        });
        assert_eq!(success.status().code(), 1);
        assert_eq!(success.cpm(), Some(0.5));
        assert_eq!(success.bidder_code(), "fastlane");

        let failure = BidOutcome::no_bid(Vec::new());
        assert_eq!(failure.status().code(), 2);
        assert_eq!(failure.cpm(), None);
        assert!(!failure.is_success());
    }

    #[test]
    fn test_failure_serializes_raw_candidates() {
        let failure = BidOutcome::no_bid(vec![AdCandidate {
            cpm: Some(2.0),
            dimensions: None,
        }]);
        let value = serde_json::to_value(&failure).expect("should serialize outcome");
        assert_eq!(
            value,
            json!({
                "status": "failure",
                "bidder_code": "fastlane",
                "error": [{ "cpm": 2.0 }]
            })
        );
    }
}
