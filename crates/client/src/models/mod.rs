//! Domain models for the client core.
//!
//! These are the fully-typed shapes the stores work with. Backend responses
//! are defaulted and validated into them once, at the gateway boundary.

pub mod identity;
pub mod product;
pub mod user;

pub use identity::Identity;
pub use product::{CatalogPage, Product, ProductDraft, ProductPatch};
pub use user::UserAccount;
