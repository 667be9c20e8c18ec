//! Accounts listed in the admin user directory.

use chrono::{DateTime, Utc};
use mercato_core::{Role, UserId};
use serde::Deserialize;

use crate::gateway::wire::null_as_default;

/// An account as returned by `GET /users`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserAccount {
    /// Case-insensitive match on username or email.
    #[must_use]
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.trim().to_lowercase();
        needle.is_empty()
            || self.username.to_lowercase().contains(&needle)
            || self.email.to_lowercase().contains(&needle)
    }
}
