//! Mercato client library.
//!
//! The client state core behind the storefront and the admin dashboard:
//! who is signed in, what is in the cart, which catalog page is on screen,
//! and whether a view may be rendered. Every data-bearing operation is an
//! HTTP call to the Mercato backend through a single [`gateway::Gateway`].
//!
//! # Architecture
//!
//! - [`state::AppContext`] owns every store; consumers receive it explicitly
//! - [`session::SessionStore`] is the only writer of the bearer token
//! - [`cart::Cart`] is plain in-memory data with derived totals
//! - [`catalog::CatalogStore`] fetches pages, discards superseded responses,
//!   and refetches after privileged mutations instead of patching locally
//! - [`guard`] is a pure navigation check
//!
//! # Example
//!
//! ```rust,ignore
//! use mercato_client::{config::ClientConfig, state::AppContext};
//!
//! let ctx = AppContext::from_config(ClientConfig::from_env()?)?;
//! ctx.session().login("admin@example.com", &password).await?;
//! let page = ctx.catalog().fetch_page(1, 12).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod models;
pub mod session;
pub mod state;
pub mod status;
pub mod storage;
pub mod theme;
pub mod users;
