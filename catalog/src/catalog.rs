//! Listing catalog: create, browse and mark listings sold.

use chrono::{DateTime, Utc};
use mymarket_common::feed::{self, FeedKind, FeedSnapshot};
use mymarket_common::identity::UserId;
use mymarket_common::listing::{
    Category, CategoryError, Listing, ListingDraft, ListingId, ListingIdGenerator,
    ValidationError,
};
use mymarket_store::KeyValueStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::identity::IdentityProvider;
use crate::profiles::Profiles;
use crate::repository::{ListingRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Category(#[from] CategoryError),
    #[error("not signed in")]
    NotSignedIn,
    #[error("that feed belongs to another seller")]
    NotOwner,
    #[error("listing {0} not found")]
    ListingNotFound(ListingId),
    #[error("could not load your listings, try again: {0}")]
    StoreRead(#[source] RepositoryError),
    #[error("could not save listing, try again: {0}")]
    StoreWrite(#[source] RepositoryError),
}

impl CatalogError {
    /// Store failures may succeed on a second attempt; validation, identity
    /// and corrupt-data failures will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreRead(e) | Self::StoreWrite(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result of [`Catalog::toggle_sold`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    /// The listing with its `sold` flag flipped, whether or not it was saved.
    pub listing: Listing,
    pub persisted: bool,
}

pub struct Catalog<R, I> {
    repository: R,
    identity: I,
    ids: ListingIdGenerator,
}

impl<R: ListingRepository, I: IdentityProvider> Catalog<R, I> {
    pub fn new(repository: R, identity: I) -> Self {
        Self {
            repository,
            identity,
            ids: ListingIdGenerator::new(),
        }
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    async fn require_user(&self) -> Result<UserId, CatalogError> {
        self.identity
            .current_user()
            .await
            .ok_or(CatalogError::NotSignedIn)
    }

    pub async fn create_listing(&self, draft: &ListingDraft) -> Result<Listing, CatalogError> {
        self.create_listing_at(draft, Utc::now()).await
    }

    /// Validate `draft` and append it to the signed-in user's collection,
    /// stamped with `now`.
    pub async fn create_listing_at(
        &self,
        draft: &ListingDraft,
        now: DateTime<Utc>,
    ) -> Result<Listing, CatalogError> {
        let valid = draft.validate()?;
        let owner = self.require_user().await?;

        // Appending to a collection we could not read would overwrite it.
        let existing = self
            .repository
            .read_owner(&owner)
            .await
            .map_err(CatalogError::StoreRead)?;
        let mut id = self.ids.next_at(now);
        while existing.iter().any(|l| l.id == id) {
            id = self.ids.next_at(now);
        }

        let listing = valid.into_listing(id, owner.clone(), now);
        self.repository
            .append(&owner, listing.clone())
            .await
            .map_err(CatalogError::StoreWrite)?;
        info!(id = %listing.id, owner = %owner, category = %listing.category, "listing created");
        Ok(listing)
    }

    async fn pool(&self) -> Vec<Listing> {
        match self.repository.read_all().await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(error = %e, "could not read listings; showing an empty feed");
                Vec::new()
            }
        }
    }

    async fn owner_pool(&self, owner: &UserId) -> Vec<Listing> {
        match self.repository.read_owner(owner).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(owner = %owner, error = %e, "could not read owner listings; treating as empty");
                Vec::new()
            }
        }
    }

    /// Unsold listings from every owner, newest first.
    pub async fn global_feed(&self) -> Vec<Listing> {
        let listings = feed::global_feed(self.pool().await);
        debug!(listings = listings.len(), "global feed");
        listings
    }

    /// Unsold listings in `category`, newest first.
    pub async fn category_feed(&self, category: Category) -> Vec<Listing> {
        let listings = feed::category_feed(self.pool().await, category);
        debug!(%category, listings = listings.len(), "category feed");
        listings
    }

    /// Everything the signed-in user has listed, sold included.
    pub async fn owner_feed(&self) -> Result<Vec<Listing>, CatalogError> {
        let owner = self.require_user().await?;
        let listings = feed::owner_feed(self.owner_pool(&owner).await);
        debug!(owner = %owner, listings = listings.len(), "owner feed");
        Ok(listings)
    }

    /// Resolve `kind` to its listings. An owner feed is only available to
    /// that owner.
    pub async fn feed(&self, kind: &FeedKind) -> Result<Vec<Listing>, CatalogError> {
        match kind {
            FeedKind::Global => Ok(self.global_feed().await),
            FeedKind::Category(category) => Ok(self.category_feed(*category).await),
            FeedKind::Owner(owner) => {
                if &self.require_user().await? != owner {
                    return Err(CatalogError::NotOwner);
                }
                Ok(feed::derive(kind, self.owner_pool(owner).await))
            }
        }
    }

    /// Compute `kind` and join it with seller profiles in one batched read.
    pub async fn snapshot<S: KeyValueStore>(
        &self,
        kind: &FeedKind,
        profiles: &Profiles<S>,
    ) -> Result<FeedSnapshot, CatalogError> {
        let listings = self.feed(kind).await?;
        let sellers = profiles.lookup_many(&feed::distinct_sellers(&listings)).await;
        Ok(FeedSnapshot {
            kind: kind.clone(),
            listings: feed::decorate(listings, &sellers),
            taken_at: Utc::now(),
        })
    }

    /// Flip `sold` on one of the signed-in user's listings.
    ///
    /// A failed write is logged and reported through
    /// [`ToggleOutcome::persisted`]; the flipped listing is returned either way.
    /// Only the one record's `sold` field is rewritten.
    pub async fn toggle_sold(&self, id: &ListingId) -> Result<ToggleOutcome, CatalogError> {
        let owner = self.require_user().await?;
        let mut listings = self.owner_pool(&owner).await;
        let listing = feed::toggle_sold(&mut listings, id)
            .ok_or_else(|| CatalogError::ListingNotFound(id.clone()))?;

        let persisted = match self.repository.update_sold(&owner, id, listing.sold).await {
            Ok(true) => {
                info!(id = %id, sold = listing.sold, "listing updated");
                true
            }
            Ok(false) => {
                error!(id = %id, "listing vanished before its sold flag was saved");
                false
            }
            Err(e) => {
                error!(id = %id, error = %e, "failed to save sold flag");
                false
            }
        };
        Ok(ToggleOutcome { listing, persisted })
    }
}
