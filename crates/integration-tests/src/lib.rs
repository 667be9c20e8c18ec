//! Integration tests for the Mercato client core.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mercato-integration-tests
//! ```
//!
//! No external services are needed: every test spawns a [`FakeBackend`], an
//! in-process axum server implementing the backend's REST surface on an
//! ephemeral port, and points a fresh [`AppContext`] at it.
//!
//! # Seeded Data
//!
//! - An admin account ([`ADMIN_EMAIL`] / [`ADMIN_PASSWORD`])
//! - A customer account ([`CUSTOMER_USERNAME`] / [`CUSTOMER_PASSWORD`])
//! - [`SEEDED_PRODUCTS`] products across the Audio, Home and Outdoors
//!   categories

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mercato_client::config::ClientConfig;
use mercato_client::state::AppContext;
use mercato_client::storage::{KeyValueStore, MemoryStore};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

pub const ADMIN_ID: &str = "u-admin";
pub const ADMIN_EMAIL: &str = "admin@mercato.test";
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const CUSTOMER_ID: &str = "u-ada";
pub const CUSTOMER_USERNAME: &str = "ada";
pub const CUSTOMER_PASSWORD: &str = "ada-pass";
pub const SEEDED_PRODUCTS: usize = 25;

const CATEGORIES: [&str; 3] = ["Audio", "Home", "Outdoors"];

// =============================================================================
// Backend state
// =============================================================================

#[derive(Clone)]
struct Account {
    id: String,
    username: String,
    email: String,
    password: String,
    role: &'static str,
}

impl Account {
    fn auth_response(&self, token: &str) -> Value {
        json!({
            "_id": self.id,
            "username": self.username,
            "email": self.email,
            "token": token,
            "role": self.role,
        })
    }

    fn listing(&self) -> Value {
        json!({
            "_id": self.id,
            "username": self.username,
            "email": self.email,
            "role": self.role,
            "createdAt": "2024-01-15T09:30:00Z",
        })
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRecord {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    price: f64,
    #[serde(default)]
    image: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    stock: u32,
    #[serde(default)]
    rating: f64,
}

#[derive(Default)]
struct BackendState {
    accounts: Mutex<Vec<Account>>,
    products: Mutex<Vec<ProductRecord>>,
    /// Issued bearer token -> account ID.
    tokens: Mutex<HashMap<String, String>>,
    logout_calls: Mutex<Vec<String>>,
    page_delays: Mutex<HashMap<u32, Duration>>,
    fail_logout: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BackendState {
    fn seeded() -> Self {
        let state = Self::default();
        lock(&state.accounts).extend([
            Account {
                id: ADMIN_ID.to_string(),
                username: "admin".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
                role: "admin",
            },
            Account {
                id: CUSTOMER_ID.to_string(),
                username: CUSTOMER_USERNAME.to_string(),
                email: "ada@mercato.test".to_string(),
                password: CUSTOMER_PASSWORD.to_string(),
                role: "user",
            },
        ]);
        lock(&state.products).extend((1..=SEEDED_PRODUCTS).map(|n| {
            let category = CATEGORIES[n % CATEGORIES.len()];
            ProductRecord {
                id: format!("p{n:02}"),
                name: format!("{category} item {n:02}"),
                price: f64::from(u32::try_from(n).unwrap_or_default()).mul_add(7.5, 0.99),
                image: format!("/images/p{n:02}.jpg"),
                category: category.to_string(),
                description: format!("Seeded {} product", category.to_lowercase()),
                stock: u32::try_from(n % 7).unwrap_or_default(),
                rating: f64::from(u32::try_from(n % 5).unwrap_or_default()) + 0.5,
            }
        }));
        state
    }

    fn issue_token(&self, account_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        lock(&self.tokens).insert(token.clone(), account_id.to_string());
        token
    }

    fn bearer_account(&self, headers: &HeaderMap) -> Option<Account> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        let account_id = lock(&self.tokens).get(token)?.clone();
        lock(&self.accounts)
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
    }

    /// 401 without a valid token, 403 for non-admins.
    fn require_admin(&self, headers: &HeaderMap) -> Result<Account, Response> {
        match self.bearer_account(headers) {
            None => Err(message(
                StatusCode::UNAUTHORIZED,
                "Not authorized, token failed",
            )),
            Some(account) if account.role != "admin" => {
                Err(message(StatusCode::FORBIDDEN, "Not authorized as an admin"))
            }
            Some(account) => Ok(account),
        }
    }
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

type Shared = State<Arc<BackendState>>;

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    email: String,
    password: String,
}

async fn register(State(state): Shared, Json(body): Json<RegisterBody>) -> Response {
    let account = {
        let mut accounts = lock(&state.accounts);
        if accounts
            .iter()
            .any(|a| a.email == body.email || a.username == body.username)
        {
            return message(StatusCode::BAD_REQUEST, "User already exists");
        }
        let account = Account {
            id: format!("u-{}", Uuid::new_v4().simple()),
            username: body.username,
            email: body.email,
            password: body.password,
            role: "user",
        };
        accounts.push(account.clone());
        account
    };
    let token = state.issue_token(&account.id);
    (StatusCode::CREATED, Json(account.auth_response(&token))).into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    email: Option<String>,
    username: Option<String>,
    password: String,
}

async fn login(State(state): Shared, Json(body): Json<LoginBody>) -> Response {
    let found = lock(&state.accounts)
        .iter()
        .find(|a| {
            let identifier_ok = body.email.as_deref() == Some(a.email.as_str())
                || body.username.as_deref() == Some(a.username.as_str());
            identifier_ok && a.password == body.password
        })
        .cloned();
    match found {
        Some(account) => {
            let token = state.issue_token(&account.id);
            Json(account.auth_response(&token)).into_response()
        }
        None => message(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

async fn logout(State(state): Shared, Path(id): Path<String>) -> Response {
    lock(&state.logout_calls).push(id.clone());
    if state.fail_logout.load(Ordering::SeqCst) {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Logout failed");
    }
    lock(&state.tokens).retain(|_, account_id| *account_id != id);
    message(StatusCode::OK, "Logged out successfully")
}

async fn list_users(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.require_admin(&headers) {
        return rejection;
    }
    let users: Vec<Value> = lock(&state.accounts).iter().map(Account::listing).collect();
    Json(json!({ "success": true, "data": users })).into_response()
}

#[derive(Deserialize)]
struct PageParams {
    page: Option<u32>,
    limit: Option<u32>,
}

async fn list_products(State(state): Shared, Query(params): Query<PageParams>) -> Response {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).max(1);

    let delay = lock(&state.page_delays).get(&page).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let products = lock(&state.products).clone();
    let total = products.len();
    let limit_usize = usize::try_from(limit).unwrap_or(usize::MAX);
    let total_pages = total.div_ceil(limit_usize).max(1);
    let start = usize::try_from(page - 1)
        .unwrap_or(usize::MAX)
        .saturating_mul(limit_usize);
    let slice: Vec<ProductRecord> = products.into_iter().skip(start).take(limit_usize).collect();

    Json(json!({
        "success": true,
        "data": {
            "products": slice,
            "currentPage": page,
            "totalPages": total_pages,
            "totalProducts": total,
            "pageSize": limit,
        }
    }))
    .into_response()
}

async fn get_product(State(state): Shared, Path(id): Path<String>) -> Response {
    lock(&state.products)
        .iter()
        .find(|p| p.id == id)
        .map_or_else(
            || message(StatusCode::NOT_FOUND, "Product not found"),
            |p| Json(p.clone()).into_response(),
        )
}

async fn create_product(
    State(state): Shared,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(rejection) = state.require_admin(&headers) {
        return rejection;
    }
    body["_id"] = json!(format!("p-{}", Uuid::new_v4().simple()));
    let Ok(record) = serde_json::from_value::<ProductRecord>(body) else {
        return message(StatusCode::BAD_REQUEST, "Invalid product data");
    };
    lock(&state.products).push(record.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": record })),
    )
        .into_response()
}

async fn update_product(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Response {
    if let Err(rejection) = state.require_admin(&headers) {
        return rejection;
    }
    let mut products = lock(&state.products);
    let Some(existing) = products.iter_mut().find(|p| p.id == id) else {
        return message(StatusCode::NOT_FOUND, "Product not found");
    };

    let mut merged = serde_json::to_value(&*existing).unwrap_or_default();
    if let (Some(target), Some(changes)) = (merged.as_object_mut(), patch.as_object()) {
        for (key, value) in changes {
            if key != "_id" {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    let Ok(updated) = serde_json::from_value::<ProductRecord>(merged) else {
        return message(StatusCode::BAD_REQUEST, "Invalid product data");
    };
    *existing = updated.clone();
    Json(json!({ "success": true, "data": updated })).into_response()
}

async fn delete_product(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = state.require_admin(&headers) {
        return rejection;
    }
    let mut products = lock(&state.products);
    let before = products.len();
    products.retain(|p| p.id != id);
    if products.len() == before {
        return message(StatusCode::NOT_FOUND, "Product not found");
    }
    message(StatusCode::OK, "Product removed")
}

fn router(state: Arc<BackendState>) -> Router {
    let api = Router::new()
        .route("/users", get(list_users))
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/{id}/logout", post(logout))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        );
    Router::new().nest("/api", api).with_state(state)
}

// =============================================================================
// FakeBackend
// =============================================================================

/// In-process backend bound to an ephemeral port. Stops when dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a backend with the seeded accounts and products.
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::seeded());
        let app = router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().expect("listener has no address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend crashed");
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// `http://127.0.0.1:<port>/api`
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).expect("valid base url")
    }

    /// Default client configuration pointed at this backend.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_base_url(self.base_url())
    }

    /// A fresh context with in-memory storage.
    #[must_use]
    pub fn context(&self) -> AppContext {
        self.context_with(Arc::new(MemoryStore::new()))
    }

    /// A fresh context over the given storage, restoring whatever it holds.
    #[must_use]
    pub fn context_with(&self, storage: Arc<dyn KeyValueStore>) -> AppContext {
        AppContext::new(self.config(), storage).expect("failed to build context")
    }

    /// Make `POST /users/:id/logout` answer 500.
    pub fn fail_logout(&self, fail: bool) {
        self.state.fail_logout.store(fail, Ordering::SeqCst);
    }

    /// Account IDs the logout endpoint was called for, in order.
    #[must_use]
    pub fn logout_calls(&self) -> Vec<String> {
        lock(&self.state.logout_calls).clone()
    }

    /// Hold answers for `page` back by `delay`.
    pub fn delay_page(&self, page: u32, delay: Duration) {
        lock(&self.state.page_delays).insert(page, delay);
    }

    /// Invalidate every issued token, as if they had all expired.
    pub fn expire_tokens(&self) {
        lock(&self.state.tokens).clear();
    }

    #[must_use]
    pub fn product_count(&self) -> usize {
        lock(&self.state.products).len()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
