//! Catalog products and pages.

use chrono::{DateTime, Utc};
use mercato_core::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::gateway::wire::null_as_default;

/// Read-only snapshot of a backend product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stock: u32,
    /// Average review score; unrated products read as 0.
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The most recently fetched page of products.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub page_size: u32,
}

impl CatalogPage {
    /// A page with no products, as shown before the first fetch.
    #[must_use]
    pub const fn empty(page_size: u32) -> Self {
        Self {
            products: Vec::new(),
            current_page: 1,
            total_pages: 1,
            total_items: 0,
            page_size,
        }
    }

    /// Look up a product on this page.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Up to `limit` other products from the same category as `product`.
    #[must_use]
    pub fn related(&self, product: &Product, limit: usize) -> Vec<Product> {
        self.products
            .iter()
            .filter(|p| p.category == product.category && p.id != product.id)
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Fields for a new product, as submitted from the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub price: Money,
    pub category: String,
    pub stock: u32,
    pub image: String,
    pub description: String,
}

impl ProductDraft {
    /// Check required fields before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` for a blank name or category.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::MissingField("category"));
        }
        Ok(())
    }
}

/// Partial product update. Unset fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProductPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.stock.is_none()
            && self.image.is_none()
            && self.description.is_none()
    }

    /// Reject patches that change nothing or blank a required field.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` describing the problem.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ValidationError::MissingField("name"));
        }
        if self.category.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ValidationError::MissingField("category"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_defaults_missing_fields() {
        let product: Product = serde_json::from_str(
            r#"{"_id":"p1","name":"Lamp","price":49.5,"createdAt":"2024-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(product.price, Money::from_cents(4_950));
        assert_eq!(product.stock, 0);
        assert!(product.rating.abs() < f64::EPSILON);
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = ProductPatch {
            stock: Some(3),
            ..ProductPatch::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"stock":3}"#);
        assert_eq!(
            ProductPatch::default().validate(),
            Err(ValidationError::EmptyPatch)
        );
    }

    #[test]
    fn test_draft_requires_name() {
        let draft = ProductDraft {
            name: "  ".into(),
            price: Money::from_units(5),
            category: "Home".into(),
            stock: 1,
            image: String::new(),
            description: String::new(),
        };
        assert_eq!(draft.validate(), Err(ValidationError::MissingField("name")));
    }

    #[test]
    fn test_related_excludes_self_and_other_categories() {
        let make = |id: &str, category: &str| Product {
            id: ProductId::new(id),
            name: id.to_string(),
            price: Money::from_units(1),
            image: String::new(),
            category: category.to_string(),
            description: String::new(),
            stock: 1,
            rating: 0.0,
            created_at: None,
            updated_at: None,
        };
        let page = CatalogPage {
            products: vec![make("a", "Audio"), make("b", "Audio"), make("c", "Home")],
            current_page: 1,
            total_pages: 1,
            total_items: 3,
            page_size: 10,
        };
        let anchor = page.product(&ProductId::new("a")).unwrap().clone();
        let related = page.related(&anchor, 4);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id.as_str(), "b");
    }
}
