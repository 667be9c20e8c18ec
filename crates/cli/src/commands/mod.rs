//! Subcommand implementations.
//!
//! Results are reported through `tracing` at info level, failures bubble up
//! as [`CliError`] and end the process with status 1.

pub mod auth;
pub mod guard;
pub mod products;
pub mod theme;
pub mod users;

use mercato_client::config::ConfigError;
use mercato_client::error::{ClientError, ValidationError};
use mercato_client::gateway::GatewayError;
use thiserror::Error;

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be set up.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A store operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The requested product does not exist.
    #[error("No product with ID {0}")]
    ProductNotFound(String),
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        Self::Client(err.into())
    }
}
