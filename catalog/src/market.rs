//! Request dispatcher bundling identity, catalog and profiles over one store.

use std::fmt;
use std::sync::Arc;

use mymarket_common::feed::{FeedKind, FeedSnapshot};
use mymarket_common::identity::{Session, UserId};
use mymarket_common::listing::{Category, Listing, ListingDraft, ListingId};
use mymarket_common::profile::{Profile, ProfileUpdate};
use mymarket_store::KeyValueStore;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::catalog::{Catalog, CatalogError, ToggleOutcome};
use crate::identity::{CredentialsUpdate, IdentityError, IdentityProvider, LocalIdentityProvider};
use crate::profiles::{ProfileError, Profiles};
use crate::repository::KvListingRepository;
use crate::view::{spawn_refresher, ActivationBus, FeedView};

pub type MarketCatalog<S> = Catalog<KvListingRepository<S>, LocalIdentityProvider<S>>;
pub type MarketFeedView<S> = FeedView<KvListingRepository<S>, LocalIdentityProvider<S>, S>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketRequest {
    SignUp { email: String, password: String },
    SignIn { email: String, password: String },
    SignOut,
    WhoAmI,
    UpdateCredentials(CredentialsUpdate),
    Upload(ListingDraft),
    GlobalFeed,
    CategoryFeed(String),
    MyListings,
    ToggleSold(ListingId),
    /// `None` means the signed-in user.
    GetProfile(Option<UserId>),
    EditProfile(ProfileUpdate),
}

impl MarketRequest {
    /// Variant name, safe to log. Some requests carry passwords.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SignUp { .. } => "sign_up",
            Self::SignIn { .. } => "sign_in",
            Self::SignOut => "sign_out",
            Self::WhoAmI => "who_am_i",
            Self::UpdateCredentials(_) => "update_credentials",
            Self::Upload(_) => "upload",
            Self::GlobalFeed => "global_feed",
            Self::CategoryFeed(_) => "category_feed",
            Self::MyListings => "my_listings",
            Self::ToggleSold(_) => "toggle_sold",
            Self::GetProfile(_) => "get_profile",
            Self::EditProfile(_) => "edit_profile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketResponse {
    Session(Session),
    SignedOut,
    CurrentUser(Option<UserId>),
    CredentialsUpdated,
    Listing(Listing),
    Feed(FeedSnapshot),
    Toggled(ToggleOutcome),
    Profile(Profile),
    ProfileSaved,
    Error { message: String, retryable: bool },
}

impl MarketResponse {
    fn error(e: impl fmt::Display, retryable: bool) -> Self {
        Self::Error {
            message: e.to_string(),
            retryable,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl From<CatalogError> for MarketResponse {
    fn from(e: CatalogError) -> Self {
        let retryable = e.is_retryable();
        Self::error(e, retryable)
    }
}

impl From<ProfileError> for MarketResponse {
    fn from(e: ProfileError) -> Self {
        let retryable = e.is_retryable();
        Self::error(e, retryable)
    }
}

impl From<IdentityError> for MarketResponse {
    fn from(e: IdentityError) -> Self {
        let retryable = e.is_retryable();
        Self::error(e, retryable)
    }
}

pub struct Market<S> {
    catalog: Arc<MarketCatalog<S>>,
    profiles: Arc<Profiles<S>>,
}

impl<S: KeyValueStore + Clone + 'static> Market<S> {
    pub fn new(store: S) -> Self {
        let identity = LocalIdentityProvider::new(store.clone());
        let repository = KvListingRepository::new(store.clone());
        Self {
            catalog: Arc::new(Catalog::new(repository, identity)),
            profiles: Arc::new(Profiles::new(store)),
        }
    }

    pub fn catalog(&self) -> &MarketCatalog<S> {
        &self.catalog
    }

    pub fn profiles(&self) -> &Profiles<S> {
        &self.profiles
    }

    pub fn identity(&self) -> &LocalIdentityProvider<S> {
        self.catalog.identity()
    }

    pub fn feed_view(&self, kind: FeedKind) -> MarketFeedView<S> {
        FeedView::new(self.catalog.clone(), self.profiles.clone(), kind)
    }

    pub fn spawn_refresher(
        &self,
        bus: &ActivationBus,
    ) -> (watch::Receiver<Option<FeedSnapshot>>, JoinHandle<()>) {
        spawn_refresher(self.catalog.clone(), self.profiles.clone(), bus)
    }

    async fn snapshot(&self, kind: FeedKind) -> MarketResponse {
        match self.catalog.snapshot(&kind, &self.profiles).await {
            Ok(snapshot) => MarketResponse::Feed(snapshot),
            Err(e) => e.into(),
        }
    }

    pub async fn handle_request(&self, request: MarketRequest) -> MarketResponse {
        debug!(request = request.label(), "handling market request");
        let identity = self.identity();
        match request {
            MarketRequest::SignUp { email, password } => {
                match identity.sign_up(&email, &password).await {
                    Ok(session) => MarketResponse::Session(session),
                    Err(e) => e.into(),
                }
            }
            MarketRequest::SignIn { email, password } => {
                match identity.sign_in(&email, &password).await {
                    Ok(session) => MarketResponse::Session(session),
                    Err(e) => e.into(),
                }
            }
            MarketRequest::SignOut => match identity.sign_out().await {
                Ok(()) => MarketResponse::SignedOut,
                Err(e) => e.into(),
            },
            MarketRequest::WhoAmI => MarketResponse::CurrentUser(identity.current_user().await),
            MarketRequest::UpdateCredentials(update) => {
                match identity.update_credentials(&update).await {
                    Ok(()) => MarketResponse::CredentialsUpdated,
                    Err(e) => e.into(),
                }
            }
            MarketRequest::Upload(draft) => match self.catalog.create_listing(&draft).await {
                Ok(listing) => MarketResponse::Listing(listing),
                Err(e) => e.into(),
            },
            MarketRequest::GlobalFeed => self.snapshot(FeedKind::Global).await,
            MarketRequest::CategoryFeed(name) => match name.parse::<Category>() {
                Ok(category) => self.snapshot(FeedKind::Category(category)).await,
                Err(e) => CatalogError::from(e).into(),
            },
            MarketRequest::MyListings => match identity.current_user().await {
                Some(user) => self.snapshot(FeedKind::Owner(user)).await,
                None => CatalogError::NotSignedIn.into(),
            },
            MarketRequest::ToggleSold(id) => match self.catalog.toggle_sold(&id).await {
                Ok(outcome) => MarketResponse::Toggled(outcome),
                Err(e) => e.into(),
            },
            MarketRequest::GetProfile(user) => {
                let user = match user {
                    Some(user) => Some(user),
                    None => identity.current_user().await,
                };
                match user {
                    Some(user) => MarketResponse::Profile(self.profiles.load(&user).await),
                    None => ProfileError::NotSignedIn.into(),
                }
            }
            MarketRequest::EditProfile(update) => match identity.current_user().await {
                Some(user) => match self.profiles.save(&user, &update).await {
                    Ok(()) => MarketResponse::ProfileSaved,
                    Err(e) => e.into(),
                },
                None => ProfileError::NotSignedIn.into(),
            },
        }
    }
}
