//! Keyed-collection repository for listings.
//!
//! Catalog semantics only see [`ListingRepository`]. [`KvListingRepository`]
//! maps it onto the flat `uploads_{userId}` convention; an indexed backend can
//! replace it without touching the catalog.
//!
//! Writes that modify an existing collection work on the raw JSON records, so
//! records this version cannot decode are written back untouched. A stored
//! value that is not an array at all is reported as [`RepositoryError::Corrupt`]
//! and never overwritten by `append` or `update_sold`.

use std::future::Future;

use mymarket_common::identity::UserId;
use mymarket_common::keys;
use mymarket_common::listing::{decode_records, parse_collection, Listing, ListingId};
use mymarket_store::{KeyValueStore, StoreError};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("reading listings failed: {0}")]
    Read(#[source] StoreError),
    #[error("writing listings failed: {0}")]
    Write(#[source] StoreError),
    #[error("encoding listings failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("stored listings under {key} are unreadable: {reason}")]
    Corrupt { key: String, reason: String },
}

impl RepositoryError {
    /// A corrupt value stays corrupt; store errors may clear up.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Write(_))
    }
}

pub trait ListingRepository: Send + Sync {
    /// Add one listing to the end of `owner`'s collection. Existing records
    /// are kept as stored.
    fn append(
        &self,
        owner: &UserId,
        listing: Listing,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite `owner`'s whole collection.
    fn replace_all(
        &self,
        owner: &UserId,
        listings: &[Listing],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Every owner that has a collection, in stable order.
    fn list_all_owners(&self) -> impl Future<Output = Result<Vec<UserId>, RepositoryError>> + Send;

    /// One owner's collection in insertion order. Missing means empty;
    /// undecodable records are skipped.
    fn read_owner(
        &self,
        owner: &UserId,
    ) -> impl Future<Output = Result<Vec<Listing>, RepositoryError>> + Send;

    /// Set `sold` on the record with `id`, leaving every other record as
    /// stored. Returns `false` when no record has that id.
    fn update_sold(
        &self,
        owner: &UserId,
        id: &ListingId,
        sold: bool,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// All collections concatenated in owner order.
    fn read_all(&self) -> impl Future<Output = Result<Vec<Listing>, RepositoryError>> + Send;
}

#[derive(Debug, Clone)]
pub struct KvListingRepository<S> {
    store: S,
}

impl<S: KeyValueStore> KvListingRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn read_records(&self, key: &str) -> Result<Vec<Value>, RepositoryError> {
        let Some(raw) = self.store.get(key).await.map_err(RepositoryError::Read)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| RepositoryError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    async fn write_records(&self, key: &str, records: &[Value]) -> Result<(), RepositoryError> {
        let value = serde_json::to_string(records)?;
        self.store
            .set(key, value)
            .await
            .map_err(RepositoryError::Write)
    }
}

impl<S: KeyValueStore> ListingRepository for KvListingRepository<S> {
    async fn append(&self, owner: &UserId, listing: Listing) -> Result<(), RepositoryError> {
        let key = keys::uploads(owner);
        let mut records = self.read_records(&key).await?;
        records.push(serde_json::to_value(&listing)?);
        self.write_records(&key, &records).await
    }

    async fn replace_all(&self, owner: &UserId, listings: &[Listing]) -> Result<(), RepositoryError> {
        let value = serde_json::to_string(listings)?;
        self.store
            .set(&keys::uploads(owner), value)
            .await
            .map_err(RepositoryError::Write)
    }

    async fn list_all_owners(&self) -> Result<Vec<UserId>, RepositoryError> {
        let keys = self.store.all_keys().await.map_err(RepositoryError::Read)?;
        Ok(keys.iter().filter_map(|k| keys::owner_of_uploads(k)).collect())
    }

    async fn read_owner(&self, owner: &UserId) -> Result<Vec<Listing>, RepositoryError> {
        let key = keys::uploads(owner);
        let records = self.read_records(&key).await?;
        Ok(decode_records(&key, records))
    }

    async fn update_sold(
        &self,
        owner: &UserId,
        id: &ListingId,
        sold: bool,
    ) -> Result<bool, RepositoryError> {
        let key = keys::uploads(owner);
        let mut records = self.read_records(&key).await?;
        let Some(record) = records
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|record| record.get("id").and_then(Value::as_str) == Some(id.0.as_str()))
        else {
            return Ok(false);
        };
        record.insert("sold".to_string(), Value::Bool(sold));
        self.write_records(&key, &records).await?;
        Ok(true)
    }

    async fn read_all(&self) -> Result<Vec<Listing>, RepositoryError> {
        let owner_keys: Vec<String> = self
            .list_all_owners()
            .await?
            .iter()
            .map(keys::uploads)
            .collect();
        if owner_keys.is_empty() {
            return Ok(Vec::new());
        }
        let values = self
            .store
            .multi_get(&owner_keys)
            .await
            .map_err(RepositoryError::Read)?;
        let listings: Vec<Listing> = values
            .into_iter()
            .filter_map(|(key, raw)| raw.map(|raw| parse_collection(&key, &raw)))
            .flatten()
            .collect();
        debug!(owners = owner_keys.len(), listings = listings.len(), "read all collections");
        Ok(listings)
    }
}
