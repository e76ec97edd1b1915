use std::sync::Arc;

use mymarket_catalog::{Market, MarketRequest, MarketResponse};
use mymarket_catalog_integration::{draft, expect_feed, expect_listing};
use mymarket_store::FileStore;

async fn open(path: &std::path::Path) -> Market<Arc<FileStore>> {
    Market::new(Arc::new(FileStore::open(path).await.unwrap()))
}

#[tokio::test]
async fn catalog_and_session_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let market = open(&path).await;
    let MarketResponse::Session(session) = market
        .handle_request(MarketRequest::SignUp {
            email: "ann@example.com".into(),
            password: "ann-secret".into(),
        })
        .await
    else {
        panic!("sign up failed");
    };
    let listing = expect_listing(
        market
            .handle_request(MarketRequest::Upload(draft("Bread", "Food")))
            .await,
    );
    drop(market);

    let market = open(&path).await;
    assert_eq!(
        market.handle_request(MarketRequest::WhoAmI).await,
        MarketResponse::CurrentUser(Some(session.user_id))
    );
    let feed = expect_feed(market.handle_request(MarketRequest::GlobalFeed).await);
    assert_eq!(feed.listings[0].listing, listing);
}

#[tokio::test]
async fn stored_collections_use_the_flat_key_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let market = open(&path).await;
    market
        .handle_request(MarketRequest::SignUp {
            email: "bob@example.com".into(),
            password: "bob-secret".into(),
        })
        .await;
    market
        .handle_request(MarketRequest::Upload(draft("Lamp", "Furniture")))
        .await;

    let raw: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let uploads: Vec<&String> = raw.keys().filter(|k| k.starts_with("uploads_")).collect();
    assert_eq!(uploads.len(), 1);

    let collection: serde_json::Value =
        serde_json::from_str(raw[uploads[0]].as_str().unwrap()).unwrap();
    let record = &collection[0];
    assert_eq!(record["category"], "Furniture");
    assert_eq!(record["price"], "25");
    assert_eq!(record["sold"], false);
    assert!(record["createdAt"].is_string());
    assert!(record["imageUrl"].is_string());
    assert!(record["userId"].is_string());
}
