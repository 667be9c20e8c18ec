//! Catalog store: the fetched page of products and the admin mutations.
//!
//! # Fetch ordering
//!
//! Every fetch takes a ticket from a monotonic counter before it is sent.
//! When the answer arrives, it is only committed if no later fetch has been
//! dispatched in the meantime; otherwise it is discarded without touching
//! the page or the status. A slow response can therefore never overwrite a
//! newer one.
//!
//! Mutations never patch the local page: on success they refetch the page the
//! user is looking at.

mod debounce;
mod query;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use mercato_core::ProductId;
use reqwest::Method;
use tracing::{debug, info, instrument, warn};

pub use debounce::SearchDebouncer;
pub use query::{ALL_CATEGORIES, CatalogQuery, PriceRange, QueryStore, SortKey, categories};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::gateway::wire::{ProductEnvelope, ProductListEnvelope};
use crate::gateway::{Gateway, GatewayError};
use crate::models::{CatalogPage, Product, ProductDraft, ProductPatch};
use crate::session::ActiveIdentity;
use crate::status::{StatusCell, StoreStatus};

/// The catalog page on screen, its query parameters, and product mutations.
pub struct CatalogStore {
    gateway: Gateway,
    identity: ActiveIdentity,
    query: QueryStore,
    page: RwLock<CatalogPage>,
    status: StatusCell,
    dispatched: AtomicU64,
}

impl CatalogStore {
    #[must_use]
    pub fn new(config: &ClientConfig, gateway: Gateway, identity: ActiveIdentity) -> Self {
        Self {
            gateway,
            identity,
            query: QueryStore::new(config.price_ceiling, config.page_size),
            page: RwLock::new(CatalogPage::empty(config.page_size)),
            status: StatusCell::default(),
            dispatched: AtomicU64::new(0),
        }
    }

    /// Filter, sort, search and pagination parameters.
    #[must_use]
    pub const fn query(&self) -> &QueryStore {
        &self.query
    }

    /// Progress and error of the last committed operation.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        self.status.snapshot()
    }

    /// The most recently committed page.
    #[must_use]
    pub fn current_page(&self) -> CatalogPage {
        self.page.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The current page run through the active filters and sort order.
    #[must_use]
    pub fn visible(&self) -> Vec<Product> {
        let query = self.query.current();
        query.apply(&self.page.read().unwrap_or_else(PoisonError::into_inner).products)
    }

    /// Category choices for the current page.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        categories(&self.page.read().unwrap_or_else(PoisonError::into_inner).products)
    }

    /// Fetch one page of products.
    ///
    /// On success the page replaces the current one wholesale and becomes the
    /// pagination cursor. On failure the previous page is kept. If a later
    /// fetch was dispatched while this one was in flight, the answer is
    /// returned to the caller but never committed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a zero page or page size, and
    /// the mapped gateway error otherwise.
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, page: u32, page_size: u32) -> Result<CatalogPage, ClientError> {
        // Rejected before any status change so an in-flight fetch keeps its
        // loading flag.
        query::validate_pagination(page, page_size)?;

        let ticket = self.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.begin();

        let result = self
            .gateway
            .get::<ProductListEnvelope>(
                &["products"],
                &[("page", page.to_string()), ("limit", page_size.to_string())],
            )
            .await
            .map(|envelope| envelope.into_page(page, page_size))
            .map_err(ClientError::from);

        let latest = self.dispatched.load(Ordering::SeqCst);
        if ticket != latest {
            warn!(ticket, latest, "discarding superseded catalog response");
            return result;
        }

        match &result {
            Ok(fetched) => {
                debug!(
                    page = fetched.current_page,
                    products = fetched.products.len(),
                    "catalog page committed"
                );
                *self.page.write().unwrap_or_else(PoisonError::into_inner) = fetched.clone();
                if let Err(e) = self.query.set_page(page, page_size) {
                    debug!(error = %e, "pagination cursor left unchanged");
                }
                self.status.finish(None);
            }
            Err(e) => {
                warn!(error = %e, "catalog fetch failed; keeping previous page");
                self.status.finish(Some(e));
            }
        }
        result
    }

    /// Refetch the page the cursor points at.
    ///
    /// # Errors
    ///
    /// See [`fetch_page`](Self::fetch_page).
    pub async fn refresh(&self) -> Result<CatalogPage, ClientError> {
        let query = self.query.current();
        self.fetch_page(query.page, query.page_size).await
    }

    /// Fetch a single product for the detail view. A missing product is
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the mapped gateway error for anything but a 404.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, ClientError> {
        self.status
            .track(async {
                match self
                    .gateway
                    .get::<ProductEnvelope>(&["products", id.as_str()], &[])
                    .await
                {
                    Ok(envelope) => Ok(Some(envelope.into())),
                    Err(GatewayError::NotFound(_)) => {
                        debug!("product not found");
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    /// Create a product, then refetch the current page.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` without a network call when nobody
    /// is signed in, `ClientError::Validation` for an incomplete draft, and the
    /// mapped gateway error otherwise.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn add_product(&self, draft: &ProductDraft) -> Result<Product, ClientError> {
        let created = self
            .status
            .track(async {
                self.require_token()?;
                draft.validate()?;
                let envelope: ProductEnvelope = self.gateway.post(&["products"], draft).await?;
                Ok(Product::from(envelope))
            })
            .await?;
        info!(product_id = %created.id, "product created");
        self.refresh_after_mutation().await;
        Ok(created)
    }

    /// Apply a partial update, then refetch the current page.
    ///
    /// # Errors
    ///
    /// As [`add_product`](Self::add_product), plus `ClientError::NotFound`
    /// for an unknown product.
    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, ClientError> {
        let updated = self
            .status
            .track(async {
                self.require_token()?;
                patch.validate()?;
                let envelope: ProductEnvelope =
                    self.gateway.put(&["products", id.as_str()], patch).await?;
                Ok(Product::from(envelope))
            })
            .await?;
        info!("product updated");
        self.refresh_after_mutation().await;
        Ok(updated)
    }

    /// Delete a product, then refetch the current page.
    ///
    /// # Errors
    ///
    /// As [`update_product`](Self::update_product).
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ClientError> {
        self.status
            .track(async {
                self.require_token()?;
                self.gateway
                    .execute::<()>(Method::DELETE, &["products", id.as_str()], None)
                    .await?;
                Ok(())
            })
            .await?;
        info!("product deleted");
        self.refresh_after_mutation().await;
        Ok(())
    }

    fn require_token(&self) -> Result<(), ClientError> {
        if self.identity.bearer().is_none() {
            return Err(ClientError::Unauthorized(
                ClientError::LOGIN_REQUIRED.to_string(),
            ));
        }
        Ok(())
    }

    /// The mutation itself succeeded; a failed refetch only shows up in the
    /// store status.
    async fn refresh_after_mutation(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "refetch after mutation failed");
        }
    }
}
