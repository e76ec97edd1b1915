//! Credential-backed identity.
//!
//! [`IdentityProvider`] is the seam the catalog depends on.
//! [`LocalIdentityProvider`] implements it on top of the same key-value store:
//! an ed25519 key is derived from email and password with HKDF, only the
//! verifying key is stored, and the device session is a record signed with
//! the derived key.

use std::future::Future;

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use mymarket_common::identity::{Session, UserId};
use mymarket_common::keys;
use mymarket_store::{KeyValueStore, StoreError};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

pub const MIN_PASSWORD_LEN: usize = 6;
const USER_ID_LEN: usize = 20;
const KEY_INFO: &[u8] = b"mymarket-account-key-v1";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("please enter both email and password")]
    MissingCredentials,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,
    #[error("an account already exists for this email")]
    EmailInUse,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not signed in")]
    NotSignedIn,
    #[error("nothing new to update")]
    NothingToUpdate,
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("identity storage failed: {0}")]
    Store(#[from] StoreError),
    #[error("identity record encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl IdentityError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Requested changes for [`IdentityProvider::update_credentials`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsUpdate {
    pub current_password: String,
    pub new_email: Option<String>,
    pub new_password: Option<String>,
}

pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any. Unreadable or forged sessions count as none.
    fn current_user(&self) -> impl Future<Output = Option<UserId>> + Send;

    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, IdentityError>> + Send;

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, IdentityError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Re-authenticate with the current password, change email and/or
    /// password, then sign out so the user logs in with the new credentials.
    fn update_credentials(
        &self,
        update: &CredentialsUpdate,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;
}

/// Stored per account. Holds no secret material.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    user_id: UserId,
    email: String,
    verifying_key: VerifyingKey,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    user_id: UserId,
    email: String,
    issued_at: DateTime<Utc>,
    signature: Signature,
}

#[derive(Serialize)]
struct SignableSession<'a> {
    user_id: &'a UserId,
    email: &'a str,
    issued_at: &'a DateTime<Utc>,
}

fn session_signable_bytes(
    user_id: &UserId,
    email: &str,
    issued_at: &DateTime<Utc>,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&SignableSession {
        user_id,
        email,
        issued_at,
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Derive the account signing key from credentials.
///
/// The same email and password always yield the same key.
pub fn derive_signing_key(email: &str, password: &str) -> Result<SigningKey, IdentityError> {
    let salt = normalize_email(email);
    let hk = Hkdf::<Sha256>::new(Some(salt.as_bytes()), password.as_bytes());
    let mut seed = [0u8; 32];
    hk.expand(KEY_INFO, &mut seed)
        .map_err(|_| IdentityError::KeyDerivation)?;
    Ok(SigningKey::from_bytes(&seed))
}

fn generate_user_id() -> UserId {
    let id: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(USER_ID_LEN)
        .map(char::from)
        .collect();
    UserId(id)
}

fn check_email(email: &str) -> Result<(), IdentityError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(IdentityError::InvalidEmail(email.to_string())),
    }
}

fn check_password(password: &str) -> Result<(), IdentityError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct LocalIdentityProvider<S> {
    store: S,
}

impl<S: KeyValueStore> LocalIdentityProvider<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn load_account(&self, email: &str) -> Result<Option<AccountRecord>, IdentityError> {
        match self.store.get(&keys::account(email)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_account(&self, account: &AccountRecord) -> Result<(), IdentityError> {
        let raw = serde_json::to_string(account)?;
        self.store.set(&keys::account(&account.email), raw).await?;
        Ok(())
    }

    async fn load_session(&self) -> Result<Option<SessionRecord>, IdentityError> {
        match self.store.get(keys::SESSION_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Check credentials against the stored verifying key.
    async fn authenticate(&self, email: &str, password: &str) -> Result<AccountRecord, IdentityError> {
        let account = self
            .load_account(email)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;
        let key = derive_signing_key(email, password)?;
        if key.verifying_key() != account.verifying_key {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(account)
    }

    async fn start_session(
        &self,
        account: &AccountRecord,
        key: &SigningKey,
    ) -> Result<Session, IdentityError> {
        let issued_at = Utc::now();
        let msg = session_signable_bytes(&account.user_id, &account.email, &issued_at)?;
        let record = SessionRecord {
            user_id: account.user_id.clone(),
            email: account.email.clone(),
            issued_at,
            signature: key.sign(&msg),
        };
        self.store
            .set(keys::SESSION_KEY, serde_json::to_string(&record)?)
            .await?;
        info!(user = %account.user_id, "signed in");
        Ok(Session {
            user_id: account.user_id.clone(),
            email: account.email.clone(),
        })
    }

    /// The verified session, or `None` when there is no valid one.
    pub async fn current_session(&self) -> Result<Option<Session>, IdentityError> {
        let Some(record) = self.load_session().await? else {
            return Ok(None);
        };
        let Some(account) = self.load_account(&record.email).await? else {
            return Ok(None);
        };
        if account.user_id != record.user_id {
            return Ok(None);
        }
        let msg = session_signable_bytes(&record.user_id, &record.email, &record.issued_at)?;
        if account.verifying_key.verify(&msg, &record.signature).is_err() {
            return Ok(None);
        }
        Ok(Some(Session {
            user_id: record.user_id,
            email: record.email,
        }))
    }
}

impl<S: KeyValueStore> IdentityProvider for LocalIdentityProvider<S> {
    async fn current_user(&self) -> Option<UserId> {
        match self.current_session().await {
            Ok(session) => session.map(|s| s.user_id),
            Err(e) => {
                warn!(error = %e, "could not read session; treating as signed out");
                None
            }
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(IdentityError::MissingCredentials);
        }
        check_email(email)?;
        check_password(password)?;
        if self.load_account(email).await?.is_some() {
            return Err(IdentityError::EmailInUse);
        }

        let key = derive_signing_key(email, password)?;
        let account = AccountRecord {
            user_id: generate_user_id(),
            email: normalize_email(email),
            verifying_key: key.verifying_key(),
            created_at: Utc::now(),
        };
        self.save_account(&account).await?;
        info!(user = %account.user_id, "account created");
        self.start_session(&account, &key).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(IdentityError::MissingCredentials);
        }
        let account = self.authenticate(email, password).await?;
        let key = derive_signing_key(email, password)?;
        self.start_session(&account, &key).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.store.remove(keys::SESSION_KEY).await?;
        info!("signed out");
        Ok(())
    }

    async fn update_credentials(&self, update: &CredentialsUpdate) -> Result<(), IdentityError> {
        let session = self
            .current_session()
            .await?
            .ok_or(IdentityError::NotSignedIn)?;
        if update.current_password.is_empty() {
            return Err(IdentityError::MissingCredentials);
        }

        let new_email = update
            .new_email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty() && *e != session.email);
        let new_password = update
            .new_password
            .as_deref()
            .filter(|p| !p.trim().is_empty());
        if new_email.is_none() && new_password.is_none() {
            return Err(IdentityError::NothingToUpdate);
        }

        let mut account = self
            .authenticate(&session.email, &update.current_password)
            .await?;

        if let Some(email) = &new_email {
            check_email(email)?;
            if self.load_account(email).await?.is_some() {
                return Err(IdentityError::EmailInUse);
            }
        }
        if let Some(password) = new_password {
            check_password(password)?;
        }

        let email = new_email.unwrap_or_else(|| session.email.clone());
        let password = new_password.unwrap_or(&update.current_password);
        account.verifying_key = derive_signing_key(&email, password)?.verifying_key();
        account.email = email;
        self.save_account(&account).await?;
        if account.email != session.email {
            self.store.remove(&keys::account(&session.email)).await?;
        }
        info!(user = %account.user_id, "credentials updated");
        self.sign_out().await
    }
}
