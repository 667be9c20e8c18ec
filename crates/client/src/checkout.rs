//! Checkout form and order submission.
//!
//! Orders are not sent to the backend: placing an order validates the
//! shipping form, snapshots the cart into a receipt, and empties the cart.

use chrono::{DateTime, Utc};
use mercato_core::Email;
use serde::Serialize;
use tracing::info;

use crate::cart::{Cart, CartLine, OrderSummary, ShippingPolicy};
use crate::error::ValidationError;

/// Shipping form as typed by the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
}

/// A validated shipping form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub name: String,
    pub email: Email,
    pub address: String,
    pub city: String,
    pub zip_code: String,
}

impl CheckoutForm {
    /// Check that every field is filled in and the email is well formed.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in form order.
    pub fn validate(&self) -> Result<ShippingDetails, ValidationError> {
        let name = filled("name", &self.name)?;
        let email = Email::parse(&self.email).map_err(|e| {
            if self.email.trim().is_empty() {
                ValidationError::MissingField("email")
            } else {
                ValidationError::InvalidEmail(e)
            }
        })?;
        let address = filled("address", &self.address)?;
        let city = filled("city", &self.city)?;
        let zip_code = filled("zip code", &self.zip_code)?;

        Ok(ShippingDetails {
            name,
            email,
            address,
            city,
            zip_code,
        })
    }
}

fn filled(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}

/// What was ordered, where it goes, and what it cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub shipping: ShippingDetails,
    pub lines: Vec<CartLine>,
    pub summary: OrderSummary,
    pub placed_at: DateTime<Utc>,
}

/// Place an order for the cart's contents.
///
/// The cart is cleared exactly once, and only after the form has been
/// accepted; a rejected submission leaves it untouched.
///
/// # Errors
///
/// Returns `ValidationError::EmptyCart` for an empty cart, or the form's
/// validation error.
pub fn submit_order(
    cart: &mut Cart,
    policy: &ShippingPolicy,
    form: &CheckoutForm,
) -> Result<OrderReceipt, ValidationError> {
    if cart.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    let shipping = form.validate()?;

    let receipt = OrderReceipt {
        shipping,
        lines: cart.lines().to_vec(),
        summary: policy.summarize(cart),
        placed_at: Utc::now(),
    };
    cart.clear();

    info!(
        lines = receipt.lines.len(),
        total = %receipt.summary.total,
        "order placed"
    );
    Ok(receipt)
}
