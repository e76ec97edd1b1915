//! Store key namespace.
//!
//! Every per-user value lives under `{prefix}{userId}` in one flat key-value
//! namespace. These helpers are the only place the prefixes are spelled out.

use crate::identity::UserId;

pub const UPLOADS_PREFIX: &str = "uploads_";
pub const USER_NAME_PREFIX: &str = "userName_";
pub const CONTACT_PREFIX: &str = "contact_";
pub const PROFILE_PIC_PREFIX: &str = "profilePic_";
pub const ACCOUNT_PREFIX: &str = "account_";

/// Key holding the signed record of whoever is signed in on this device.
pub const SESSION_KEY: &str = "session_current";

/// Key of a user's listing collection.
pub fn uploads(user: &UserId) -> String {
    format!("{UPLOADS_PREFIX}{user}")
}

pub fn user_name(user: &UserId) -> String {
    format!("{USER_NAME_PREFIX}{user}")
}

pub fn contact(user: &UserId) -> String {
    format!("{CONTACT_PREFIX}{user}")
}

pub fn profile_pic(user: &UserId) -> String {
    format!("{PROFILE_PIC_PREFIX}{user}")
}

/// Account records are keyed by lower-cased email.
pub fn account(email: &str) -> String {
    format!("{ACCOUNT_PREFIX}{}", email.trim().to_lowercase())
}

/// Recover the owner from an `uploads_` key.
pub fn owner_of_uploads(key: &str) -> Option<UserId> {
    key.strip_prefix(UPLOADS_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(|rest| UserId(rest.to_string()))
}
