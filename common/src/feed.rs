//! Pure feed derivation over already-loaded listings.
//!
//! Every feed is ordered newest first by `created_at`. The sort is stable, so
//! listings created at the same instant keep their concatenation order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::listing::{Category, Listing, ListingId};
use crate::profile::Profile;

/// Which view a feed was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedKind {
    /// Unsold listings from every owner.
    Global,
    /// Unsold listings from every owner in one category.
    Category(Category),
    /// Everything one owner has listed, sold or not.
    Owner(UserId),
}

/// A listing joined with its seller's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoratedListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub seller: Profile,
}

/// A computed feed, valid as of `taken_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub kind: FeedKind,
    pub listings: Vec<DecoratedListing>,
    pub taken_at: DateTime<Utc>,
}

impl FeedSnapshot {
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

pub fn sort_newest_first(listings: &mut [Listing]) {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

pub fn global_feed(listings: Vec<Listing>) -> Vec<Listing> {
    let mut unsold: Vec<Listing> = listings.into_iter().filter(|l| !l.sold).collect();
    sort_newest_first(&mut unsold);
    unsold
}

pub fn category_feed(listings: Vec<Listing>, category: Category) -> Vec<Listing> {
    let mut matching: Vec<Listing> = listings
        .into_iter()
        .filter(|l| !l.sold && l.category == category)
        .collect();
    sort_newest_first(&mut matching);
    matching
}

pub fn owner_feed(mut listings: Vec<Listing>) -> Vec<Listing> {
    sort_newest_first(&mut listings);
    listings
}

/// Apply a feed kind to a pool of listings.
///
/// For [`FeedKind::Owner`] the pool is expected to be that owner's collection
/// already; listings belonging to anyone else are dropped.
pub fn derive(kind: &FeedKind, listings: Vec<Listing>) -> Vec<Listing> {
    match kind {
        FeedKind::Global => global_feed(listings),
        FeedKind::Category(category) => category_feed(listings, *category),
        FeedKind::Owner(owner) => owner_feed(
            listings
                .into_iter()
                .filter(|l| &l.user_id == owner)
                .collect(),
        ),
    }
}

/// Negate the `sold` flag of the listing with `id`, returning the updated copy.
pub fn toggle_sold(listings: &mut [Listing], id: &ListingId) -> Option<Listing> {
    let listing = listings.iter_mut().find(|l| &l.id == id)?;
    listing.sold = !listing.sold;
    Some(listing.clone())
}

/// Distinct owners appearing in a feed, in stable order.
pub fn distinct_sellers(listings: &[Listing]) -> BTreeSet<UserId> {
    listings.iter().map(|l| l.user_id.clone()).collect()
}

/// Join listings with profiles fetched in one batch. Sellers without a
/// profile get an empty one.
pub fn decorate(listings: Vec<Listing>, profiles: &BTreeMap<UserId, Profile>) -> Vec<DecoratedListing> {
    listings
        .into_iter()
        .map(|listing| {
            let seller = profiles
                .get(&listing.user_id)
                .cloned()
                .unwrap_or_else(|| Profile::empty(listing.user_id.clone()));
            DecoratedListing { listing, seller }
        })
        .collect()
}
