//! Catalog filter, sort, search and pagination parameters.

use core::fmt;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use mercato_core::Money;
use tokio::sync::watch;
use tracing::debug;

use crate::error::ValidationError;
use crate::models::Product;

/// Category filter value that lets every product through.
pub const ALL_CATEGORIES: &str = "All";

/// Catalog ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Alphabetical by name.
    #[default]
    Name,
    PriceLowToHigh,
    PriceHighToLow,
    /// Best rated first.
    Rating,
}

impl SortKey {
    /// Name used in links and on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLowToHigh => "price-low",
            Self::PriceHighToLow => "price-high",
            Self::Rating => "rating",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::PriceLowToHigh => a.price.cmp(&b.price),
            Self::PriceHighToLow => b.price.cmp(&a.price),
            Self::Rating => b.rating.total_cmp(&a.rating),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name" => Ok(Self::Name),
            "price-low" => Ok(Self::PriceLowToHigh),
            "price-high" => Ok(Self::PriceHighToLow),
            "rating" => Ok(Self::Rating),
            other => Err(format!(
                "unknown sort key '{other}' (expected name, price-low, price-high or rating)"
            )),
        }
    }
}

/// Inclusive price bounds, `0 <= min <= max <= ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    min: Money,
    max: Money,
}

impl PriceRange {
    /// Validate a range against the configured ceiling.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::PriceRange` if `min > max` or `max > ceiling`.
    pub fn new(min: Money, max: Money, ceiling: Money) -> Result<Self, ValidationError> {
        if min > max || max > ceiling {
            return Err(ValidationError::PriceRange { ceiling });
        }
        Ok(Self { min, max })
    }

    /// `[0, ceiling]`.
    #[must_use]
    pub const fn full(ceiling: Money) -> Self {
        Self {
            min: Money::ZERO,
            max: ceiling,
        }
    }

    #[must_use]
    pub const fn min(&self) -> Money {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> Money {
        self.max
    }

    #[must_use]
    pub fn contains(&self, price: Money) -> bool {
        self.min <= price && price <= self.max
    }
}

/// User-chosen catalog parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub category: String,
    pub price_range: PriceRange,
    pub sort_by: SortKey,
    pub search_query: String,
    pub page: u32,
    pub page_size: u32,
}

impl CatalogQuery {
    /// Every product, by name, first page.
    #[must_use]
    pub fn defaults(ceiling: Money, page_size: u32) -> Self {
        Self {
            category: ALL_CATEGORIES.to_string(),
            price_range: PriceRange::full(ceiling),
            sort_by: SortKey::Name,
            search_query: String::new(),
            page: 1,
            page_size,
        }
    }

    /// Whether a product passes the category, price and search filters.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok =
            self.category == ALL_CATEGORIES || product.category.eq_ignore_ascii_case(&self.category);
        if !category_ok || !self.price_range.contains(product.price) {
            return false;
        }

        let needle = self.search_query.trim().to_lowercase();
        needle.is_empty()
            || [&product.name, &product.description, &product.category]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
    }

    /// The filtered and sorted view of `products`.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut visible: Vec<Product> = products
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        visible.sort_by(|a, b| self.sort_by.compare(a, b));
        visible
    }
}

/// `"All"` followed by the distinct categories of `products`, sorted.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let distinct: BTreeSet<&str> = products
        .iter()
        .map(|p| p.category.as_str())
        .filter(|c| !c.is_empty())
        .collect();
    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}

// =============================================================================
// QueryStore
// =============================================================================

/// Observable holder of the current [`CatalogQuery`].
///
/// Cloning shares the underlying channel; subscribers are woken only when a
/// setter actually changes something.
#[derive(Clone)]
pub struct QueryStore {
    tx: Arc<watch::Sender<CatalogQuery>>,
    ceiling: Money,
}

impl QueryStore {
    #[must_use]
    pub fn new(ceiling: Money, page_size: u32) -> Self {
        let (tx, _rx) = watch::channel(CatalogQuery::defaults(ceiling, page_size));
        Self {
            tx: Arc::new(tx),
            ceiling,
        }
    }

    /// Snapshot of the current parameters.
    #[must_use]
    pub fn current(&self) -> CatalogQuery {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CatalogQuery> {
        self.tx.subscribe()
    }

    /// Upper bound accepted by [`set_price_range`](Self::set_price_range).
    #[must_use]
    pub const fn ceiling(&self) -> Money {
        self.ceiling
    }

    pub fn set_category(&self, category: impl Into<String>) {
        let category = category.into();
        let category = if category.trim().is_empty() {
            ALL_CATEGORIES.to_string()
        } else {
            category
        };
        self.update(|q| replace(&mut q.category, category));
    }

    /// # Errors
    ///
    /// Returns `ValidationError::PriceRange` for an out-of-bounds range; the
    /// current range is kept.
    pub fn set_price_range(&self, min: Money, max: Money) -> Result<(), ValidationError> {
        let range = PriceRange::new(min, max, self.ceiling)?;
        self.update(|q| replace(&mut q.price_range, range));
        Ok(())
    }

    pub fn set_sort_by(&self, sort_by: SortKey) {
        self.update(|q| replace(&mut q.sort_by, sort_by));
    }

    /// Commit a search term immediately. Keystrokes should go through the
    /// debouncer instead.
    pub fn set_search_query(&self, search: impl Into<String>) {
        let search = search.into();
        self.update(|q| replace(&mut q.search_query, search));
    }

    /// # Errors
    ///
    /// Returns `ValidationError::Pagination` if `page` or `page_size` is zero.
    pub fn set_page(&self, page: u32, page_size: u32) -> Result<(), ValidationError> {
        validate_pagination(page, page_size)?;
        self.update(|q| {
            let changed = q.page != page || q.page_size != page_size;
            q.page = page;
            q.page_size = page_size;
            changed
        });
        Ok(())
    }

    /// Restore category, price range, sort and search to their defaults.
    /// Pagination is left alone.
    pub fn reset_filters(&self) {
        let ceiling = self.ceiling;
        self.update(|q| {
            let reset = CatalogQuery {
                page: q.page,
                page_size: q.page_size,
                ..CatalogQuery::defaults(ceiling, q.page_size)
            };
            replace(q, reset)
        });
        debug!("catalog filters reset");
    }

    fn update(&self, modify: impl FnOnce(&mut CatalogQuery) -> bool) {
        self.tx.send_if_modified(modify);
    }
}

/// Assign `value` to `slot`, reporting whether it changed.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

pub(crate) fn validate_pagination(page: u32, page_size: u32) -> Result<(), ValidationError> {
    if page == 0 {
        return Err(ValidationError::Pagination("page"));
    }
    if page_size == 0 {
        return Err(ValidationError::Pagination("page size"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mercato_core::ProductId;

    use super::*;

    fn product(name: &str, category: &str, cents: u32, rating: f64) -> Product {
        Product {
            id: ProductId::new(name),
            name: name.to_string(),
            price: Money::from_cents(cents),
            image: String::new(),
            category: category.to_string(),
            description: format!("A fine {name}"),
            stock: 5,
            rating,
            created_at: None,
            updated_at: None,
        }
    }

    fn store() -> QueryStore {
        QueryStore::new(Money::from_units(1000), 10)
    }

    #[test]
    fn test_reset_filters_restores_defaults() {
        let store = store();
        store.set_category("Audio");
        store.set_price_range(Money::from_units(5), Money::from_units(50)).unwrap();
        store.set_sort_by(SortKey::Rating);
        store.set_search_query("lamp");
        store.set_page(3, 10).unwrap();

        store.reset_filters();

        let q = store.current();
        assert_eq!(q.category, "All");
        assert_eq!(q.price_range.min(), Money::ZERO);
        assert_eq!(q.price_range.max(), Money::from_units(1000));
        assert_eq!(q.sort_by, SortKey::Name);
        assert_eq!(q.search_query, "");
        assert_eq!(q.page, 3);
    }

    #[test]
    fn test_price_range_bounds() {
        let store = store();
        assert!(store.set_price_range(Money::from_units(60), Money::from_units(50)).is_err());
        assert!(store.set_price_range(Money::ZERO, Money::from_units(1001)).is_err());
        assert!(store.set_price_range(Money::from_units(50), Money::from_units(50)).is_ok());
        assert_eq!(store.current().price_range.min(), Money::from_units(50));
    }

    #[test]
    fn test_pagination_rejects_zero() {
        let store = store();
        assert_eq!(store.set_page(0, 10), Err(ValidationError::Pagination("page")));
        assert_eq!(store.current().page, 1);
    }

    #[tokio::test]
    async fn test_subscribers_only_see_changes() {
        let store = store();
        let mut rx = store.subscribe();
        rx.mark_unchanged();

        store.set_sort_by(SortKey::Name);
        assert!(!rx.has_changed().unwrap());

        store.set_sort_by(SortKey::PriceHighToLow);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().sort_by, SortKey::PriceHighToLow);
    }

    #[test]
    fn test_apply_filters_and_sorts() {
        let products = vec![
            product("Speaker", "Audio", 12_000, 4.1),
            product("Headphones", "Audio", 8_000, 4.8),
            product("Lamp", "Home", 3_000, 3.9),
        ];
        let mut query = CatalogQuery::defaults(Money::from_units(1000), 10);

        query.sort_by = SortKey::PriceLowToHigh;
        let names: Vec<_> = query.apply(&products).into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Lamp", "Headphones", "Speaker"]);

        query.category = "Audio".into();
        query.sort_by = SortKey::Rating;
        let names: Vec<_> = query.apply(&products).into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Headphones", "Speaker"]);

        query.search_query = "SPEAK".into();
        assert_eq!(query.apply(&products).len(), 1);
    }

    #[test]
    fn test_categories_are_distinct_and_sorted() {
        let products = vec![
            product("a", "Home", 100, 0.0),
            product("b", "Audio", 100, 0.0),
            product("c", "Home", 100, 0.0),
        ];
        assert_eq!(categories(&products), ["All", "Audio", "Home"]);
    }

    #[test]
    fn test_sort_key_names() {
        for key in [
            SortKey::Name,
            SortKey::PriceLowToHigh,
            SortKey::PriceHighToLow,
            SortKey::Rating,
        ] {
            assert_eq!(key.to_string().parse::<SortKey>().unwrap(), key);
        }
        assert!("cheapest".parse::<SortKey>().is_err());
    }
}
