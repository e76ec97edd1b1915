use mymarket_catalog::{MarketRequest, MarketResponse};
use mymarket_catalog_integration::harness::TestHarness;
use mymarket_catalog_integration::{descriptions, draft, expect_listing, expect_toggled};
use mymarket_store::StoreFailure;

#[tokio::test]
async fn incomplete_upload_persists_nothing() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    h.upload_at(&draft("Bread", "Food"), 0).await;
    let before = h.stored_collection(&h.ann).await;

    for strip in 0..4 {
        let mut incomplete = draft("Jam", "Food");
        match strip {
            0 => incomplete.image_url = None,
            1 => incomplete.description = Some(String::new()),
            2 => incomplete.price = None,
            _ => incomplete.category = Some("  ".into()),
        }
        let response = h.market.handle_request(MarketRequest::Upload(incomplete)).await;
        assert!(
            matches!(response, MarketResponse::Error { retryable: false, .. }),
            "case {strip}: {response:?}"
        );
        assert_eq!(h.stored_collection(&h.ann).await, before);
    }
}

#[tokio::test]
async fn signed_out_upload_persists_nothing() {
    let h = TestHarness::setup().await;
    h.sign_out().await;
    let response = h
        .market
        .handle_request(MarketRequest::Upload(draft("Jam", "Food")))
        .await;
    assert!(matches!(response, MarketResponse::Error { retryable: false, .. }));
    assert_eq!(h.stored_collection(&h.bob).await, None);
    assert_eq!(h.stored_collection(&h.ann).await, None);
}

#[tokio::test]
async fn upload_write_failure_can_be_retried() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    let key = format!("uploads_{}", h.ann.user_id);

    h.store.set_failure(Some(StoreFailure::OnKey(key))).await;
    let response = h
        .market
        .handle_request(MarketRequest::Upload(draft("Jam", "Food")))
        .await;
    assert!(matches!(response, MarketResponse::Error { retryable: true, .. }));

    h.store.set_failure(None).await;
    let listing = expect_listing(
        h.market
            .handle_request(MarketRequest::Upload(draft("Jam", "Food")))
            .await,
    );
    assert_eq!(listing.description, "Jam");
}

#[tokio::test]
async fn toggle_write_failure_returns_optimistic_result() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    let bread = h.upload_at(&draft("Bread", "Food"), 0).await;

    h.store.set_failure(Some(StoreFailure::Writes)).await;
    let outcome = expect_toggled(
        h.market
            .handle_request(MarketRequest::ToggleSold(bread.id.clone()))
            .await,
    );
    assert!(outcome.listing.sold);
    assert!(!outcome.persisted);

    h.store.set_failure(None).await;
    assert_eq!(descriptions(&h.global().await), vec!["Bread"]);
}

#[tokio::test]
async fn read_failure_degrades_to_empty_feed() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    h.upload_at(&draft("Bread", "Food"), 0).await;

    h.store.set_failure(Some(StoreFailure::Reads)).await;
    // The session cannot be read either, but public feeds do not need it.
    assert!(h.global().await.is_empty());
    assert!(h.category("Food").await.is_empty());
}

#[tokio::test]
async fn corrupt_collection_is_treated_as_empty() {
    use mymarket_store::KeyValueStore;

    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    h.upload_at(&draft("Bread", "Food"), 0).await;
    h.store
        .set(&format!("uploads_{}", h.bob.user_id), "{not json".into())
        .await
        .unwrap();

    assert_eq!(descriptions(&h.global().await), vec!["Bread"]);
}

#[tokio::test]
async fn upload_over_corrupt_collection_keeps_it() {
    use mymarket_store::KeyValueStore;

    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    let legacy = r#"{"0":{"id":"1","description":"Old bike"}}"#;
    h.store
        .set(&format!("uploads_{}", h.ann.user_id), legacy.into())
        .await
        .unwrap();

    let response = h
        .market
        .handle_request(MarketRequest::Upload(draft("Jam", "Food")))
        .await;
    assert!(matches!(response, MarketResponse::Error { retryable: false, .. }));
    assert_eq!(h.stored_collection(&h.ann).await.as_deref(), Some(legacy));
}

#[tokio::test]
async fn upload_and_toggle_keep_unreadable_records() {
    use mymarket_store::KeyValueStore;

    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    let bread = h.upload_at(&draft("Bread", "Food"), 0).await;

    let key = format!("uploads_{}", h.ann.user_id);
    let mut records: Vec<serde_json::Value> =
        serde_json::from_str(&h.stored_collection(&h.ann).await.unwrap()).unwrap();
    let toy = serde_json::json!({"id": "1", "description": "Toy car", "category": "Toys"});
    records.push(toy.clone());
    h.store
        .set(&key, serde_json::to_string(&records).unwrap())
        .await
        .unwrap();

    h.upload_at(&draft("Jam", "Food"), 1).await;
    let outcome = expect_toggled(
        h.market
            .handle_request(MarketRequest::ToggleSold(bread.id.clone()))
            .await,
    );
    assert!(outcome.persisted);

    let stored: Vec<serde_json::Value> =
        serde_json::from_str(&h.stored_collection(&h.ann).await.unwrap()).unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[1], toy);
    assert_eq!(descriptions(&h.global().await), vec!["Jam"]);
}
