//! Shopping cart.
//!
//! Lives in memory only and is independent of the session: signing in or out
//! leaves it untouched. Totals are recomputed from the lines on every call.

use mercato_core::{Money, ProductId};
use serde::Serialize;
use tracing::debug;

use crate::models::Product;

/// One product's entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub image: String,
    quantity: u32,
}

impl CartLine {
    /// Units of this product in the cart; always at least 1.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Ordered cart lines, unique by product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of a product, appending a line if it is not in the cart yet.
    pub fn add_item(
        &mut self,
        item_id: ProductId,
        name: impl Into<String>,
        unit_price: Money,
        image: impl Into<String>,
    ) {
        if let Some(line) = self.line_mut(&item_id) {
            line.quantity = line.quantity.saturating_add(1);
            debug!(item_id = %item_id, quantity = line.quantity, "cart quantity incremented");
            return;
        }
        debug!(item_id = %item_id, "cart line added");
        self.lines.push(CartLine {
            item_id,
            name: name.into(),
            unit_price,
            image: image.into(),
            quantity: 1,
        });
    }

    /// Add one unit of a catalog product.
    pub fn add_product(&mut self, product: &Product) {
        self.add_item(
            product.id.clone(),
            product.name.clone(),
            product.price,
            product.image.clone(),
        );
    }

    /// Set a line's quantity. Zero or less removes the line; unknown products
    /// are ignored.
    pub fn update_quantity(&mut self, item_id: &ProductId, quantity: i64) {
        let Ok(quantity) = u32::try_from(quantity.max(0)) else {
            if let Some(line) = self.line_mut(item_id) {
                line.quantity = u32::MAX;
            }
            return;
        };
        if quantity == 0 {
            self.remove_item(item_id);
        } else if let Some(line) = self.line_mut(item_id) {
            line.quantity = quantity;
        }
    }

    /// Remove a line if present.
    pub fn remove_item(&mut self, item_id: &ProductId) {
        self.lines.retain(|line| &line.item_id != item_id);
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Sum of quantities, as shown on the navigation badge.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn line_mut(&mut self, item_id: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| &line.item_id == item_id)
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Free shipping strictly above a threshold, a flat fee otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub free_threshold: Money,
    pub flat_fee: Money,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold: Money::from_units(100),
            flat_fee: Money::from_units(10),
        }
    }
}

impl ShippingPolicy {
    /// Shipping charged on `subtotal`. A subtotal equal to the threshold still
    /// pays the fee.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal > self.free_threshold {
            Money::ZERO
        } else {
            self.flat_fee
        }
    }

    /// Subtotal, shipping and grand total for a cart.
    #[must_use]
    pub fn summarize(&self, cart: &Cart) -> OrderSummary {
        let subtotal = cart.total();
        let shipping = self.shipping_for(subtotal);
        OrderSummary {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }
}

/// Amounts shown on the checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn id(raw: &str) -> ProductId {
        ProductId::new(raw)
    }

    fn cart_with(items: &[(&str, u32)]) -> Cart {
        let mut cart = Cart::new();
        for (item, cents) in items {
            cart.add_item(id(item), *item, Money::from_cents(*cents), "");
        }
        cart
    }

    #[test]
    fn test_adding_twice_increments_quantity() {
        let cart = cart_with(&[("mug", 800), ("mug", 800)]);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity(), 2);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total(), Money::from_units(16));
    }

    #[test]
    fn test_zero_quantity_removes_line() {
        let mut cart = cart_with(&[("mug", 800), ("lamp", 4_950)]);
        cart.update_quantity(&id("mug"), 0);
        assert_eq!(cart.lines().len(), 1);
        cart.update_quantity(&id("lamp"), -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_updating_unknown_item_is_noop() {
        let mut cart = cart_with(&[("mug", 800)]);
        let before = cart.clone();
        cart.update_quantity(&id("ghost"), 4);
        cart.remove_item(&id("ghost"));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let mut cart = cart_with(&[("a", 100), ("b", 100), ("c", 100)]);
        cart.add_item(id("a"), "a", Money::from_cents(100), "");
        let order: Vec<_> = cart.lines().iter().map(|l| l.item_id.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_shipping_threshold() {
        let policy = ShippingPolicy::default();
        let cases = [
            (Money::from_units(120), Money::ZERO, Money::from_units(120)),
            (Money::from_units(45), Money::from_units(10), Money::from_units(55)),
            (Money::from_units(100), Money::from_units(10), Money::from_units(110)),
        ];
        for (subtotal, shipping, total) in cases {
            let mut cart = Cart::new();
            cart.add_item(id("x"), "x", subtotal, "");
            let summary = policy.summarize(&cart);
            assert_eq!(summary.shipping, shipping, "subtotal {subtotal}");
            assert_eq!(summary.total, total, "subtotal {subtotal}");
        }
    }

    #[test]
    fn test_clear_empties_cart() {
        let mut cart = cart_with(&[("mug", 800)]);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::ZERO);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8),
        Update(u8, i64),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..5).prop_map(Op::Add),
            (0u8..5, -3i64..8).prop_map(|(i, q)| Op::Update(i, q)),
            (0u8..5).prop_map(Op::Remove),
        ]
    }

    fn price_of(item: u8) -> Money {
        Money::from_cents(u32::from(item) * 1_250 + 99)
    }

    proptest! {
        #[test]
        fn prop_total_matches_lines(ops in prop::collection::vec(op(), 0..60)) {
            let mut cart = Cart::new();
            for op in ops {
                match op {
                    Op::Add(i) => cart.add_item(id(&i.to_string()), "item", price_of(i), ""),
                    Op::Update(i, q) => cart.update_quantity(&id(&i.to_string()), q),
                    Op::Remove(i) => cart.remove_item(&id(&i.to_string())),
                }
            }

            let expected: Money = cart
                .lines()
                .iter()
                .map(|l| l.unit_price.times(l.quantity()))
                .sum();
            prop_assert_eq!(cart.total(), expected);
            prop_assert!(cart.lines().iter().all(|l| l.quantity() >= 1));

            let mut ids: Vec<_> = cart.lines().iter().map(|l| l.item_id.clone()).collect();
            ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            ids.dedup();
            prop_assert_eq!(ids.len(), cart.lines().len());
        }
    }
}
