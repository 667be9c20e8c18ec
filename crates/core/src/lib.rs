//! Mercato Core - Shared domain types.
//!
//! This crate provides the value types used across all Mercato components:
//! - `client` - Session, cart and catalog state for the storefront and admin views
//! - `cli` - Command-line driver for the client core
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money amounts, emails, and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
