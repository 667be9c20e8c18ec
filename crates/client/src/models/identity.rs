//! The signed-in identity.

use mercato_core::{Role, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The authenticated account and its bearer token.
///
/// This is also the persisted form stored under the `user` key, so it keeps
/// the backend's field names. `Debug` output redacts the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Backend account ID.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Account email.
    pub email: String,
    /// Bearer token attached to every request while signed in.
    #[serde(
        serialize_with = "serialize_token",
        deserialize_with = "deserialize_token"
    )]
    pub token: SecretString,
    /// Account role; missing roles mean customer.
    #[serde(default)]
    pub role: Role,
}

impl Identity {
    /// Whether this identity may use the admin dashboard.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

fn serialize_token<S: Serializer>(token: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(token.expose_secret())
}

fn deserialize_token<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
