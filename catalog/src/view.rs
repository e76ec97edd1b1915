//! Feed views and their background refresher.
//!
//! A screen announces itself on the [`ActivationBus`] when it becomes visible
//! and again when it goes away. The refresher recomputes the activated feed
//! and publishes the newest [`FeedSnapshot`] on a watch channel.
//!
//! Every activation gets a generation number and its refresh runs as its own
//! task. A finished refresh is published only while its generation is still
//! the active one, so results for a deactivated or superseded view are
//! discarded.

use std::sync::Arc;

use mymarket_common::feed::{FeedKind, FeedSnapshot};
use mymarket_store::KeyValueStore;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::identity::IdentityProvider;
use crate::profiles::Profiles;
use crate::repository::ListingRepository;

const BUS_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Activated(FeedKind),
    Deactivated,
}

#[derive(Debug, Clone)]
pub struct ActivationBus {
    tx: broadcast::Sender<ViewEvent>,
}

impl ActivationBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn activate(&self, kind: FeedKind) {
        self.publish(ViewEvent::Activated(kind));
    }

    pub fn deactivate(&self) {
        self.publish(ViewEvent::Deactivated);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, event: ViewEvent) {
        // No subscribers just means nobody is refreshing yet.
        if self.tx.send(event).is_err() {
            debug!("view event with no refresher listening");
        }
    }
}

impl Default for ActivationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One feed bound to the services that compute it.
pub struct FeedView<R, I, S> {
    catalog: Arc<Catalog<R, I>>,
    profiles: Arc<Profiles<S>>,
    kind: FeedKind,
}

impl<R, I, S> FeedView<R, I, S>
where
    R: ListingRepository,
    I: IdentityProvider,
    S: KeyValueStore,
{
    pub fn new(catalog: Arc<Catalog<R, I>>, profiles: Arc<Profiles<S>>, kind: FeedKind) -> Self {
        Self {
            catalog,
            profiles,
            kind,
        }
    }

    pub fn kind(&self) -> &FeedKind {
        &self.kind
    }

    /// Recompute the feed from the store.
    pub async fn refresh(&self) -> Result<FeedSnapshot, CatalogError> {
        self.catalog.snapshot(&self.kind, &self.profiles).await
    }
}

type Finished = (u64, Result<FeedSnapshot, CatalogError>);

/// Spawn a task that refreshes whichever view `bus` last activated.
///
/// The task stops once every bus handle has been dropped.
pub fn spawn_refresher<R, I, S>(
    catalog: Arc<Catalog<R, I>>,
    profiles: Arc<Profiles<S>>,
    bus: &ActivationBus,
) -> (watch::Receiver<Option<FeedSnapshot>>, JoinHandle<()>)
where
    R: ListingRepository + 'static,
    I: IdentityProvider + 'static,
    S: KeyValueStore + 'static,
{
    let (tx, rx) = watch::channel(None);
    let mut events = bus.subscribe();

    let task = tokio::spawn(async move {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Finished>();
        let mut generation: u64 = 0;
        let mut active: Option<u64> = None;
        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Ok(ViewEvent::Activated(kind)) => {
                        generation += 1;
                        if active.is_some() {
                            debug!(generation, "previous refresh superseded");
                        }
                        active = Some(generation);
                        let view = FeedView::new(catalog.clone(), profiles.clone(), kind);
                        let done = done_tx.clone();
                        let started = generation;
                        tokio::spawn(async move {
                            let result = view.refresh().await;
                            if done.send((started, result)).is_err() {
                                debug!(generation = started, "refresher gone; refresh dropped");
                            }
                        });
                    }
                    Ok(ViewEvent::Deactivated) => {
                        if let Some(generation) = active.take() {
                            debug!(generation, "view deactivated");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "refresher fell behind view events");
                    }
                    Err(RecvError::Closed) => break,
                },
                Some((finished, result)) = done_rx.recv() => {
                    if active != Some(finished) {
                        debug!(generation = finished, "discarding stale refresh");
                        continue;
                    }
                    active = None;
                    match result {
                        Ok(snapshot) => {
                            debug!(generation = finished, listings = snapshot.len(), "publishing feed snapshot");
                            tx.send_replace(Some(snapshot));
                        }
                        Err(e) => warn!(generation = finished, error = %e, "feed refresh failed"),
                    }
                }
            }
        }
        debug!("activation bus closed; refresher exiting");
    });

    (rx, task)
}
