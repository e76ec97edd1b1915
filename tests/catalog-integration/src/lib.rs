//! Shared fixtures for end-to-end catalog scenarios.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mymarket_catalog::{MarketResponse, ToggleOutcome};
use mymarket_common::feed::FeedSnapshot;
use mymarket_common::listing::{Listing, ListingDraft};

pub mod harness;

/// A complete upload form.
pub fn draft(description: &str, category: &str) -> ListingDraft {
    ListingDraft {
        image_url: Some(format!("file:///photos/{}.jpg", description.to_lowercase())),
        description: Some(description.to_string()),
        price: Some("25".to_string()),
        category: Some(category.to_string()),
    }
}

/// Fixed base instant so ordering assertions do not depend on the clock.
pub fn minutes_after_base(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn descriptions(snapshot: &FeedSnapshot) -> Vec<&str> {
    snapshot
        .listings
        .iter()
        .map(|d| d.listing.description.as_str())
        .collect()
}

pub fn expect_feed(response: MarketResponse) -> FeedSnapshot {
    match response {
        MarketResponse::Feed(snapshot) => snapshot,
        other => panic!("expected a feed, got {other:?}"),
    }
}

pub fn expect_listing(response: MarketResponse) -> Listing {
    match response {
        MarketResponse::Listing(listing) => listing,
        other => panic!("expected a listing, got {other:?}"),
    }
}

pub fn expect_toggled(response: MarketResponse) -> ToggleOutcome {
    match response {
        MarketResponse::Toggled(outcome) => outcome,
        other => panic!("expected a toggle outcome, got {other:?}"),
    }
}
