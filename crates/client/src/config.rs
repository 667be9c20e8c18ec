//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional:
//! - `MERCATO_API_BASE_URL` - Backend base address (default: `http://localhost:5000/api`)
//! - `MERCATO_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `MERCATO_STORAGE_DIR` - Directory holding the persisted session (default: `.mercato`)
//! - `MERCATO_FREE_SHIPPING_THRESHOLD` - Subtotal above which shipping is free (default: 100.00)
//! - `MERCATO_FLAT_SHIPPING_FEE` - Shipping fee below the threshold (default: 10.00)
//! - `MERCATO_PRICE_CEILING` - Upper bound of the catalog price filter (default: 1000)
//! - `MERCATO_SEARCH_DEBOUNCE_MS` - Search quiescence window (default: 300)
//! - `MERCATO_PAGE_SIZE` - Default catalog page size (default: 10)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mercato_core::Money;
use thiserror::Error;
use url::Url;

use crate::cart::ShippingPolicy;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STORAGE_DIR: &str = ".mercato";
const DEFAULT_PRICE_CEILING: u32 = 1000;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base address every backend path is appended to
    pub api_base_url: Url,
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// Directory for the durable session and preferences
    pub storage_dir: PathBuf,
    /// Free-shipping threshold and flat fee
    pub shipping: ShippingPolicy,
    /// Upper bound of the price filter
    pub price_ceiling: Money,
    /// Quiescence window before a search term is committed
    pub search_debounce: Duration,
    /// Page size used when none is given
    pub page_size: u32,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_base =
            lookup("MERCATO_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url("MERCATO_API_BASE_URL", &raw_base)?;

        let timeout_secs: u64 =
            parse_or_default(&lookup, "MERCATO_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MERCATO_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let storage_dir = lookup("MERCATO_STORAGE_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from);

        let defaults = ShippingPolicy::default();
        let shipping = ShippingPolicy {
            free_threshold: parse_or_default(
                &lookup,
                "MERCATO_FREE_SHIPPING_THRESHOLD",
                defaults.free_threshold,
            )?,
            flat_fee: parse_or_default(&lookup, "MERCATO_FLAT_SHIPPING_FEE", defaults.flat_fee)?,
        };

        let price_ceiling = parse_or_default(
            &lookup,
            "MERCATO_PRICE_CEILING",
            Money::from_units(DEFAULT_PRICE_CEILING),
        )?;
        let debounce_ms: u64 = parse_or_default(
            &lookup,
            "MERCATO_SEARCH_DEBOUNCE_MS",
            DEFAULT_SEARCH_DEBOUNCE_MS,
        )?;
        let page_size: u32 = parse_or_default(&lookup, "MERCATO_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MERCATO_PAGE_SIZE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            storage_dir,
            shipping,
            price_ceiling,
            search_debounce: Duration::from_millis(debounce_ms),
            page_size,
        })
    }

    /// Default configuration pointed at `api_base_url`.
    ///
    /// Mainly useful for tests and embedding, where the environment is not
    /// the source of truth.
    #[must_use]
    pub fn for_base_url(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            shipping: ShippingPolicy::default(),
            price_ceiling: Money::from_units(DEFAULT_PRICE_CEILING),
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable if present, otherwise fall back to `default`.
fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse the backend base URL; it must be able to carry path segments.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("'{raw}' is not an http(s) base address"),
        ));
    }
    Ok(url)
}
