use std::collections::{BTreeMap, BTreeSet};

use mymarket_common::identity::UserId;
use mymarket_common::keys;
use mymarket_common::profile::{Profile, ProfileUpdate};
use mymarket_store::{KeyValueStore, StoreError};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("not signed in")]
    NotSignedIn,
    #[error("failed to save profile, try again: {0}")]
    StoreWrite(#[from] StoreError),
}

impl ProfileError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreWrite(_))
    }
}

/// Seller profile attributes, one store key per attribute.
#[derive(Debug, Clone)]
pub struct Profiles<S> {
    store: S,
}

fn profile_keys(user: &UserId) -> [String; 3] {
    [keys::user_name(user), keys::contact(user), keys::profile_pic(user)]
}

/// Empty strings are stored by the edit form but mean "not set".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl<S: KeyValueStore> Profiles<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load one user's profile. Read failures are logged and yield an empty
    /// profile.
    pub async fn load(&self, user: &UserId) -> Profile {
        self.lookup_many(&BTreeSet::from([user.clone()]))
            .await
            .remove(user)
            .unwrap_or_else(|| Profile::empty(user.clone()))
    }

    /// Fetch profiles for many sellers with a single batched read.
    pub async fn lookup_many(&self, users: &BTreeSet<UserId>) -> BTreeMap<UserId, Profile> {
        if users.is_empty() {
            return BTreeMap::new();
        }
        let wanted: Vec<String> = users.iter().flat_map(profile_keys).collect();
        let values: BTreeMap<String, Option<String>> = match self.store.multi_get(&wanted).await {
            Ok(values) => values.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, sellers = users.len(), "seller lookup failed; showing placeholders");
                return BTreeMap::new();
            }
        };
        let take = |key: String| non_empty(values.get(&key).cloned().flatten());

        let profiles: BTreeMap<UserId, Profile> = users
            .iter()
            .map(|user| {
                let [name, contact, picture] = profile_keys(user);
                let profile = Profile {
                    user_id: user.clone(),
                    name: take(name),
                    contact: take(contact),
                    picture: take(picture),
                };
                (user.clone(), profile)
            })
            .collect();
        debug!(sellers = profiles.len(), "resolved seller profiles");
        profiles
    }

    /// Write the edit form. A missing picture removes the stored one.
    pub async fn save(&self, user: &UserId, update: &ProfileUpdate) -> Result<(), ProfileError> {
        self.store
            .set(&keys::user_name(user), update.name.clone())
            .await?;
        self.store
            .set(&keys::contact(user), update.contact.clone())
            .await?;
        match &update.picture {
            Some(picture) => {
                self.store
                    .set(&keys::profile_pic(user), picture.clone())
                    .await?
            }
            None => self.store.remove(&keys::profile_pic(user)).await?,
        }
        Ok(())
    }
}
