use mymarket_catalog::{IdentityProvider, Market, MarketRequest, MarketResponse};
use mymarket_common::feed::{FeedKind, FeedSnapshot};
use mymarket_common::identity::UserId;
use mymarket_common::listing::{Listing, ListingDraft};
use mymarket_store::MemoryStore;

use crate::{expect_feed, minutes_after_base};

/// One registered account.
#[derive(Debug, Clone)]
pub struct Seller {
    pub email: String,
    pub password: String,
    pub user_id: UserId,
}

/// A market over a shared in-memory store with two registered sellers.
///
/// Only one user is signed in at a time, as on a single device. Use
/// [`TestHarness::act_as`] to switch.
pub struct TestHarness {
    pub store: MemoryStore,
    pub market: Market<MemoryStore>,
    pub ann: Seller,
    pub bob: Seller,
}

impl TestHarness {
    pub async fn setup() -> Self {
        tracing_subscriber::fmt::try_init().ok();
        let store = MemoryStore::new();
        let market = Market::new(store.clone());
        let ann = register(&market, "ann@example.com", "ann-secret").await;
        let bob = register(&market, "bob@example.com", "bob-secret").await;
        Self {
            store,
            market,
            ann,
            bob,
        }
    }

    pub async fn act_as(&self, seller: &Seller) {
        let response = self
            .market
            .handle_request(MarketRequest::SignIn {
                email: seller.email.clone(),
                password: seller.password.clone(),
            })
            .await;
        assert!(
            matches!(response, MarketResponse::Session(ref s) if s.user_id == seller.user_id),
            "sign in failed: {response:?}"
        );
    }

    pub async fn sign_out(&self) {
        self.market.identity().sign_out().await.unwrap();
    }

    /// Create a listing as the signed-in user at a fixed offset from the base
    /// instant.
    pub async fn upload_at(&self, draft: &ListingDraft, minutes: i64) -> Listing {
        self.market
            .catalog()
            .create_listing_at(draft, minutes_after_base(minutes))
            .await
            .unwrap()
    }

    pub async fn global(&self) -> FeedSnapshot {
        expect_feed(self.market.handle_request(MarketRequest::GlobalFeed).await)
    }

    pub async fn category(&self, name: &str) -> FeedSnapshot {
        expect_feed(
            self.market
                .handle_request(MarketRequest::CategoryFeed(name.to_string()))
                .await,
        )
    }

    pub async fn mine(&self) -> FeedSnapshot {
        let snapshot = expect_feed(self.market.handle_request(MarketRequest::MyListings).await);
        assert!(matches!(snapshot.kind, FeedKind::Owner(_)));
        snapshot
    }

    /// Raw stored collection for `seller`.
    pub async fn stored_collection(&self, seller: &Seller) -> Option<String> {
        use mymarket_store::KeyValueStore;
        self.store
            .get(&format!("uploads_{}", seller.user_id))
            .await
            .unwrap()
    }
}

async fn register(market: &Market<MemoryStore>, email: &str, password: &str) -> Seller {
    let response = market
        .handle_request(MarketRequest::SignUp {
            email: email.to_string(),
            password: password.to_string(),
        })
        .await;
    let MarketResponse::Session(session) = response else {
        panic!("sign up failed: {response:?}");
    };
    Seller {
        email: email.to_string(),
        password: password.to_string(),
        user_id: session.user_id,
    }
}
