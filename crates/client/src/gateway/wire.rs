//! Backend request and response schemas.
//!
//! The backend is loose about shapes: roles may be missing, list endpoints
//! may omit their `data` envelope, single resources may or may not be
//! wrapped. Those defaulting rules are applied here, once, so the stores only
//! ever see the typed models.

use mercato_core::UserId;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{CatalogPage, Identity, Product, UserAccount};

/// Read an explicit `null` the same way as a missing field.
///
/// Pair with `#[serde(default)]` so both shapes land on `T::default()`.
///
/// # Errors
///
/// Fails only if a present, non-null value does not decode as `T`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `{ "message": "..." }` error body.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    /// Extract a human-readable message from an error body, if it has one.
    #[must_use]
    pub fn message_from(body: &str) -> Option<String> {
        let parsed: Self = serde_json::from_str(body).ok()?;
        parsed
            .message
            .or(parsed.error)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Login accepts either an email or a username; the other field is omitted.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    pub password: &'a str,
}

impl<'a> LoginRequest<'a> {
    /// Anything containing `@` is sent as an email, everything else as a username.
    #[must_use]
    pub fn new(identifier: &'a str, password: &'a str) -> Self {
        let is_email = identifier.contains('@');
        Self {
            email: is_email.then_some(identifier),
            username: (!is_email).then_some(identifier),
            password,
        }
    }
}

/// `{_id, username, email, token, role}` returned by login and register.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(rename = "_id")]
    id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    email: String,
    token: String,
    #[serde(default)]
    role: Option<String>,
}

impl From<AuthResponse> for Identity {
    fn from(response: AuthResponse) -> Self {
        Self {
            id: response.id,
            username: response.username,
            email: response.email,
            token: SecretString::from(response.token),
            role: response.role.as_deref().map(Into::into).unwrap_or_default(),
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// `GET /products` answer.
#[derive(Debug, Deserialize)]
pub struct ProductListEnvelope {
    #[serde(default)]
    data: Option<ProductListData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductListData {
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    current_page: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
    #[serde(default)]
    total_products: Option<u64>,
    #[serde(default)]
    page_size: Option<u32>,
}

impl ProductListEnvelope {
    /// Convert into a page, filling gaps from the request that produced it.
    #[must_use]
    pub fn into_page(self, requested_page: u32, requested_size: u32) -> CatalogPage {
        let Some(data) = self.data else {
            return CatalogPage::empty(requested_size);
        };
        let total_items = data
            .total_products
            .unwrap_or_else(|| data.products.len() as u64);
        CatalogPage {
            current_page: data.current_page.unwrap_or(requested_page).max(1),
            total_pages: data.total_pages.unwrap_or(1).max(1),
            page_size: data.page_size.unwrap_or(requested_size),
            total_items,
            products: data.products,
        }
    }
}

/// A single product, bare or wrapped in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductEnvelope {
    Wrapped { data: Product },
    Bare(Product),
}

impl From<ProductEnvelope> for Product {
    fn from(envelope: ProductEnvelope) -> Self {
        match envelope {
            ProductEnvelope::Wrapped { data } | ProductEnvelope::Bare(data) => data,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// `GET /users` answer.
#[derive(Debug, Deserialize)]
pub struct UserListEnvelope {
    #[serde(default)]
    data: Vec<UserAccount>,
}

impl From<UserListEnvelope> for Vec<UserAccount> {
    fn from(envelope: UserListEnvelope) -> Self {
        envelope.data
    }
}
