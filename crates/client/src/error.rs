//! Store-facing error taxonomy.
//!
//! Every store operation returns `Result<T, ClientError>` and also records the
//! failure in its [`crate::status::StoreStatus`], so a rendering layer can read
//! it without the error ever propagating further.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::storage::StorageError;

/// Client-side validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was left blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// An email address is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] mercato_core::EmailError),

    /// A price filter outside `0 <= min <= max <= ceiling`.
    #[error("price range must satisfy 0 <= min <= max <= {ceiling}")]
    PriceRange {
        /// Configured upper bound.
        ceiling: mercato_core::Money,
    },

    /// Page numbers and sizes start at 1.
    #[error("{0} must be at least 1")]
    Pagination(&'static str),

    /// An update with nothing to change.
    #[error("nothing to update")]
    EmptyPatch,

    /// Checkout with an empty cart.
    #[error("cart is empty")]
    EmptyCart,
}

/// Error surfaced by any store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Input rejected before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Bad credentials or a rejected registration. The session is unchanged.
    #[error("{0}")]
    Auth(String),

    /// Missing or rejected bearer token. The session is left as it is.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout, refused connection or other network failure.
    #[error("Network error: {0}")]
    Transport(String),

    /// Any other backend failure, reduced to a display message.
    #[error("{0}")]
    Fetch(String),

    /// Durable client storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Message shown when a privileged call is attempted while signed out.
    pub const LOGIN_REQUIRED: &'static str = "Not authorized, please login first";

    /// Whether this is an authorization failure the caller may want to
    /// answer with a redirect to the login view.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether the failure happened before the request left the client.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<GatewayError> for ClientError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized(message) => Self::Unauthorized(message),
            GatewayError::NotFound(message) => Self::NotFound(message),
            GatewayError::Http(e) => Self::Transport(e.to_string()),
            GatewayError::Status { message, .. } => Self::Fetch(message),
            other @ (GatewayError::Parse(_) | GatewayError::Endpoint(_)) => {
                Self::Fetch(other.to_string())
            }
        }
    }
}

impl From<StorageError> for ClientError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
