//! Listing catalog, identity and seller profiles for the marketplace.
//!
//! Everything here is built on a [`mymarket_store::KeyValueStore`]; nothing
//! talks to a network.

pub mod catalog;
pub mod identity;
pub mod market;
pub mod profiles;
pub mod repository;
pub mod view;

pub use catalog::{Catalog, CatalogError, ToggleOutcome};
pub use identity::{CredentialsUpdate, IdentityError, IdentityProvider, LocalIdentityProvider};
pub use market::{Market, MarketRequest, MarketResponse};
pub use profiles::{ProfileError, Profiles};
pub use repository::{KvListingRepository, ListingRepository, RepositoryError};
pub use view::{spawn_refresher, ActivationBus, FeedView, ViewEvent};
