//! Application context shared across views.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cart::{Cart, OrderSummary};
use crate::catalog::{CatalogStore, SearchDebouncer};
use crate::checkout::{self, CheckoutForm, OrderReceipt};
use crate::config::ClientConfig;
use crate::error::ValidationError;
use crate::gateway::{Gateway, GatewayError};
use crate::guard::{GuardDecision, RouteRequirements};
use crate::session::{ActiveIdentity, SessionStore};
use crate::storage::{FileStore, KeyValueStore};
use crate::theme::ThemeStore;
use crate::users::UserDirectory;

/// Every store of the client, owned by the application root.
///
/// This struct is cheaply cloneable via `Arc`. Tests build a fresh context
/// per case, so no state leaks between them.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

struct AppContextInner {
    config: ClientConfig,
    session: SessionStore,
    cart: Mutex<Cart>,
    catalog: CatalogStore,
    search: SearchDebouncer,
    users: UserDirectory,
    theme: ThemeStore,
}

impl AppContext {
    /// Create a context and restore any persisted session and theme.
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration
    /// * `storage` - Durable storage for the session and preferences
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, GatewayError> {
        let identity = ActiveIdentity::default();
        let gateway = Gateway::new(&config, identity.clone())?;

        let session = SessionStore::new(identity.clone(), gateway.clone(), Arc::clone(&storage));
        session.restore_session();

        let catalog = CatalogStore::new(&config, gateway.clone(), identity);
        let query = catalog.query().clone();
        let search = SearchDebouncer::new(config.search_debounce, move |term| {
            query.set_search_query(term);
        });

        Ok(Self {
            inner: Arc::new(AppContextInner {
                session,
                cart: Mutex::new(Cart::new()),
                catalog,
                search,
                users: UserDirectory::new(gateway),
                theme: ThemeStore::load(storage),
                config,
            }),
        })
    }

    /// Create a context persisting to `config.storage_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self, GatewayError> {
        let storage = Arc::new(FileStore::new(config.storage_dir.clone()));
        Self::new(config, storage)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.inner.catalog
    }

    #[must_use]
    pub fn users(&self) -> &UserDirectory {
        &self.inner.users
    }

    #[must_use]
    pub fn theme(&self) -> &ThemeStore {
        &self.inner.theme
    }

    /// Lock the cart. Do not hold the guard across an `.await`.
    pub fn cart(&self) -> MutexGuard<'_, Cart> {
        self.inner.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed a search-box keystroke through the debouncer.
    pub fn search_input(&self, value: impl Into<String>) {
        self.inner.search.input(value);
    }

    /// Whether the signed-in user (if any) may open `path`.
    #[must_use]
    pub fn guard(&self, path: &str) -> GuardDecision {
        RouteRequirements::for_path(path).check(self.inner.session.identity().as_ref())
    }

    /// Totals for the checkout page.
    #[must_use]
    pub fn order_summary(&self) -> OrderSummary {
        self.inner.config.shipping.summarize(&self.cart())
    }

    /// Place an order for the cart's contents and empty the cart.
    ///
    /// # Errors
    ///
    /// See [`checkout::submit_order`].
    pub fn submit_order(&self, form: &CheckoutForm) -> Result<OrderReceipt, ValidationError> {
        checkout::submit_order(&mut self.cart(), &self.inner.config.shipping, form)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use mercato_core::{Money, ProductId, Role, UserId};
    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::guard::{HOME_PATH, LOGIN_PATH};
    use crate::models::Identity;
    use crate::storage::{MemoryStore, keys};

    fn config() -> ClientConfig {
        ClientConfig::for_base_url(Url::parse("http://127.0.0.1:9/api").unwrap())
    }

    fn persisted(role: Role) -> Arc<dyn KeyValueStore> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let identity = Identity {
            id: UserId::new("u1"),
            username: "ada".into(),
            email: "ada@example.com".into(),
            token: SecretString::from("tok"),
            role,
        };
        storage
            .set(keys::USER, &serde_json::to_string(&identity).unwrap())
            .unwrap();
        storage
    }

    #[test]
    fn test_context_restores_session_on_startup() {
        let ctx = AppContext::new(config(), persisted(Role::Admin)).unwrap();
        assert!(ctx.session().active().is_admin());
        assert_eq!(ctx.guard("/admin/products"), GuardDecision::Allow);
    }

    #[test]
    fn test_guard_uses_current_identity() {
        let anonymous = AppContext::new(config(), Arc::new(MemoryStore::new())).unwrap();
        assert_eq!(anonymous.guard("/admin"), GuardDecision::RedirectTo(LOGIN_PATH));
        assert_eq!(anonymous.guard("/products"), GuardDecision::Allow);

        let customer = AppContext::new(config(), persisted(Role::Customer)).unwrap();
        assert_eq!(customer.guard("/admin/users"), GuardDecision::RedirectTo(HOME_PATH));
    }

    #[test]
    fn test_cart_is_independent_of_session() {
        let ctx = AppContext::new(config(), persisted(Role::Customer)).unwrap();
        ctx.cart()
            .add_item(ProductId::new("p1"), "Lamp", Money::from_units(120), "");

        ctx.session().clear_session();

        assert_eq!(ctx.cart().item_count(), 1);
        assert_eq!(ctx.order_summary().shipping, Money::ZERO);
    }

    #[test]
    fn test_search_input_without_runtime_commits_directly() {
        let ctx = AppContext::new(config(), Arc::new(MemoryStore::new())).unwrap();

        ctx.search_input("lamp");

        assert_eq!(ctx.catalog().query().current().search_query, "lamp");
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_input_commits_to_query_after_quiescence() {
        let ctx = AppContext::new(config(), Arc::new(MemoryStore::new())).unwrap();
        let mut changes = ctx.catalog().query().subscribe();

        ctx.search_input("la");
        tokio::time::sleep(Duration::from_millis(100)).await;
        ctx.search_input("lamp");
        assert_eq!(ctx.catalog().query().current().search_query, "");

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().search_query, "lamp");
    }
}
