use mymarket_catalog::MarketRequest;
use mymarket_catalog_integration::harness::TestHarness;
use mymarket_catalog_integration::{descriptions, draft, expect_toggled};
use mymarket_common::listing::Category;

/// Food then Gadgets from one owner; selling the Food item hides it everywhere
/// except the owner's own list.
#[tokio::test]
async fn sold_item_leaves_public_feeds_but_not_owner_feed() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    let bread = h.upload_at(&draft("Bread", "Food"), 0).await;
    h.upload_at(&draft("Headphones", "Gadgets"), 1).await;

    assert_eq!(descriptions(&h.global().await), vec!["Headphones", "Bread"]);
    assert_eq!(descriptions(&h.category("food").await), vec!["Bread"]);

    let outcome = expect_toggled(
        h.market
            .handle_request(MarketRequest::ToggleSold(bread.id.clone()))
            .await,
    );
    assert!(outcome.listing.sold);
    assert!(outcome.persisted);

    assert_eq!(descriptions(&h.global().await), vec!["Headphones"]);
    assert!(h.category("Food").await.is_empty());

    let mine = h.mine().await;
    let sold = mine
        .listings
        .iter()
        .find(|d| d.listing.id == bread.id)
        .expect("owner still sees sold listing");
    assert!(sold.listing.sold);
}

#[tokio::test]
async fn feeds_merge_owners_newest_first() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    h.upload_at(&draft("Sofa", "Furniture"), 0).await;
    h.upload_at(&draft("Scarf", "Clothes"), 20).await;
    h.act_as(&h.bob).await;
    h.upload_at(&draft("Table", "Furniture"), 10).await;
    h.upload_at(&draft("Cheese", "Food"), 30).await;

    let global = h.global().await;
    assert_eq!(descriptions(&global), vec!["Cheese", "Scarf", "Table", "Sofa"]);
    assert!(global
        .listings
        .windows(2)
        .all(|w| w[0].listing.created_at >= w[1].listing.created_at));

    let furniture = h.category("FURNITURE").await;
    assert_eq!(descriptions(&furniture), vec!["Table", "Sofa"]);
    assert!(furniture
        .listings
        .iter()
        .all(|d| d.listing.category == Category::Furniture));

    // Bob's list has only Bob's items.
    assert_eq!(descriptions(&h.mine().await), vec!["Cheese", "Table"]);
}

#[tokio::test]
async fn feeds_show_seller_profiles() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    h.market
        .handle_request(MarketRequest::EditProfile(
            mymarket_common::profile::ProfileUpdate {
                name: "Ann's Bakery".into(),
                contact: "081 555 0101".into(),
                picture: Some("file:///ann.jpg".into()),
            },
        ))
        .await;
    h.upload_at(&draft("Bread", "Food"), 0).await;
    h.act_as(&h.bob).await;
    h.upload_at(&draft("Kettle", "Gadgets"), 1).await;

    let global = h.global().await;
    let sellers: Vec<(&str, &str)> = global
        .listings
        .iter()
        .map(|d| (d.seller.display_name(), d.seller.display_contact()))
        .collect();
    assert_eq!(
        sellers,
        vec![("No Name", "No Contact"), ("Ann's Bakery", "081 555 0101")]
    );
}

#[tokio::test]
async fn seller_lookup_is_one_batched_read_per_feed() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    for minute in 0..5 {
        h.upload_at(&draft(&format!("Item {minute}"), "Gadgets"), minute).await;
    }
    h.act_as(&h.bob).await;
    for minute in 5..8 {
        h.upload_at(&draft(&format!("Item {minute}"), "Gadgets"), minute).await;
    }

    let gets_before = h.store.get_calls();
    let batches_before = h.store.multi_get_calls();
    let feed = h.category("Gadgets").await;
    assert_eq!(feed.len(), 8);
    // One batch for the collections and one for the sellers, no single gets.
    assert_eq!(h.store.multi_get_calls() - batches_before, 2);
    assert_eq!(h.store.get_calls(), gets_before);
}

#[tokio::test]
async fn double_toggle_restores_listing() {
    let h = TestHarness::setup().await;
    h.act_as(&h.bob).await;
    let lamp = h.upload_at(&draft("Lamp", "Furniture"), 0).await;

    for _ in 0..2 {
        h.market
            .handle_request(MarketRequest::ToggleSold(lamp.id.clone()))
            .await;
    }
    assert_eq!(descriptions(&h.global().await), vec!["Lamp"]);
    assert!(!h.mine().await.listings[0].listing.sold);
}

#[tokio::test]
async fn cannot_toggle_someone_elses_listing() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    let bread = h.upload_at(&draft("Bread", "Food"), 0).await;

    h.act_as(&h.bob).await;
    let response = h
        .market
        .handle_request(MarketRequest::ToggleSold(bread.id))
        .await;
    assert!(response.is_error());
    assert_eq!(descriptions(&h.global().await), vec!["Bread"]);
}
