pub mod feed;
pub mod identity;
pub mod keys;
pub mod listing;
pub mod price;
pub mod profile;
