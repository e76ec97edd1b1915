use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identity::UserId;
use crate::price::{Price, PriceError};

/// Unique listing identifier (wall-clock milliseconds, monotonically increasing).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Issues [`ListingId`]s from the wall clock.
///
/// Two ids requested within the same millisecond (or after the clock stepped
/// backwards) still come out strictly increasing.
#[derive(Debug)]
pub struct ListingIdGenerator {
    last: AtomicI64,
}

impl ListingIdGenerator {
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    pub fn next_at(&self, now: DateTime<Utc>) -> ListingId {
        let millis = now.timestamp_millis();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(millis.max(prev.saturating_add(1)))
            })
            .unwrap_or_else(|prev| prev);
        ListingId(millis.max(prev.saturating_add(1)).to_string())
    }
}

impl Default for ListingIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// The fixed set of listing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Food,
    Clothes,
    Gadgets,
    Furniture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryError(pub String);

impl fmt::Display for CategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown category '{}' (expected one of Food, Clothes, Gadgets, Furniture)",
            self.0
        )
    }
}

impl std::error::Error for CategoryError {}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Food,
            Category::Clothes,
            Category::Gadgets,
            Category::Furniture,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Clothes => "Clothes",
            Category::Gadgets => "Gadgets",
            Category::Furniture => "Furniture",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    /// Case-insensitive: "food", "FOOD" and "Food" are the same category.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::all()
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CategoryError(s.to_string()))
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An item offered for sale by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub description: String,
    pub price: Price,
    pub category: Category,
    /// Local device resource locator; never uploaded anywhere.
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
    /// The only field that changes after creation.
    #[serde(default)]
    pub sold: bool,
}

/// Parse a stored per-owner collection.
///
/// A value that is not a JSON array yields an empty collection; records that
/// fail to parse are skipped. Both cases are logged and otherwise silent.
pub fn parse_collection(key: &str, raw: &str) -> Vec<Listing> {
    match serde_json::from_str(raw) {
        Ok(records) => decode_records(key, records),
        Err(e) => {
            warn!(key, error = %e, "stored listings are not a JSON array; treating as empty");
            Vec::new()
        }
    }
}

/// Decode raw collection records, skipping the ones that are not listings.
pub fn decode_records(key: &str, records: Vec<serde_json::Value>) -> Vec<Listing> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(listing) => Some(listing),
            Err(e) => {
                warn!(key, index, error = %e, "skipping unreadable listing record");
                None
            }
        })
        .collect()
}

/// Which draft field was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftField {
    Image,
    Description,
    Price,
    Category,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftField::Image => write!(f, "image"),
            DraftField::Description => write!(f, "description"),
            DraftField::Price => write!(f, "price"),
            DraftField::Category => write!(f, "category"),
        }
    }
}

/// Why a draft cannot become a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(DraftField),
    InvalidPrice(PriceError),
    UnknownCategory(CategoryError),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "all fields are required: {field} is missing"),
            Self::InvalidPrice(e) => write!(f, "invalid price: {e}"),
            Self::UnknownCategory(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Upload form contents before validation. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
}

/// A draft whose fields have all been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    pub image_url: String,
    pub description: String,
    pub price: Price,
    pub category: Category,
}

impl ListingDraft {
    /// Check fields in form order: image, description, price, category.
    pub fn validate(&self) -> Result<ValidDraft, ValidationError> {
        let image_url = required(&self.image_url, DraftField::Image)?;
        let description = required(&self.description, DraftField::Description)?;
        let price = required(&self.price, DraftField::Price)?;
        let category = required(&self.category, DraftField::Category)?;

        let price = Price::parse(price).map_err(ValidationError::InvalidPrice)?;
        let category = category
            .parse::<Category>()
            .map_err(ValidationError::UnknownCategory)?;

        Ok(ValidDraft {
            image_url: image_url.to_string(),
            description: description.to_string(),
            price,
            category,
        })
    }
}

fn required(value: &Option<String>, field: DraftField) -> Result<&str, ValidationError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

impl ValidDraft {
    pub fn into_listing(self, id: ListingId, owner: UserId, created_at: DateTime<Utc>) -> Listing {
        Listing {
            id,
            description: self.description,
            price: self.price,
            category: self.category,
            image_url: self.image_url,
            created_at,
            user_id: owner,
            sold: false,
        }
    }
}
