use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// Public seller attributes. Each one is stored under its own key, so any of
/// them may be missing independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: UserId,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub picture: Option<String>,
}

impl Profile {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("No Name")
    }

    pub fn display_contact(&self) -> &str {
        self.contact.as_deref().unwrap_or("No Contact")
    }
}

/// What the edit-profile form submits. A `None` picture clears the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub contact: String,
    pub picture: Option<String>,
}
