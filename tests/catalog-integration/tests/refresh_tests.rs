use mymarket_catalog::ActivationBus;
use mymarket_catalog_integration::draft;
use mymarket_catalog_integration::harness::TestHarness;
use mymarket_common::feed::FeedKind;
use mymarket_common::listing::Category;

#[tokio::test]
async fn each_activation_reflects_latest_store_state() {
    let h = TestHarness::setup().await;
    h.act_as(&h.ann).await;
    h.upload_at(&draft("Bread", "Food"), 0).await;

    let bus = ActivationBus::new();
    let (mut snapshots, task) = h.market.spawn_refresher(&bus);

    bus.activate(FeedKind::Global);
    snapshots.changed().await.unwrap();
    assert_eq!(snapshots.borrow_and_update().as_ref().unwrap().len(), 1);
    bus.deactivate();

    h.upload_at(&draft("Jam", "Food"), 1).await;
    bus.activate(FeedKind::Category(Category::Food));
    snapshots.changed().await.unwrap();
    let snapshot = snapshots.borrow_and_update().clone().unwrap();
    assert_eq!(snapshot.kind, FeedKind::Category(Category::Food));
    assert_eq!(snapshot.len(), 2);

    drop(bus);
    task.await.unwrap();
}

#[tokio::test]
async fn owner_view_refresh_uses_signed_in_user() {
    let h = TestHarness::setup().await;
    h.act_as(&h.bob).await;
    h.upload_at(&draft("Lamp", "Furniture"), 0).await;

    let view = h.market.feed_view(FeedKind::Owner(h.bob.user_id.clone()));
    assert_eq!(view.refresh().await.unwrap().len(), 1);

    h.act_as(&h.ann).await;
    assert!(view.refresh().await.is_err());
}
