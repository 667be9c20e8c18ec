//! Catalog commands.

use mercato_client::catalog::SortKey;
use mercato_client::models::{Product, ProductDraft, ProductPatch};
use mercato_client::state::AppContext;
use mercato_core::{Money, ProductId};

use super::CliError;

/// Client-side view options applied to the fetched page.
pub struct ListFilters {
    pub category: Option<String>,
    pub sort: SortKey,
    pub search: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
}

pub async fn list(
    ctx: &AppContext,
    page: u32,
    limit: u32,
    filters: ListFilters,
) -> Result<(), CliError> {
    let query = ctx.catalog().query();
    if let Some(category) = filters.category {
        query.set_category(category);
    }
    if filters.min_price.is_some() || filters.max_price.is_some() {
        query.set_price_range(
            filters.min_price.unwrap_or(Money::ZERO),
            filters.max_price.unwrap_or_else(|| query.ceiling()),
        )?;
    }
    query.set_sort_by(filters.sort);
    if let Some(search) = filters.search {
        query.set_search_query(search);
    }

    let fetched = ctx.catalog().fetch_page(page, limit).await?;
    let visible = ctx.catalog().visible();

    tracing::info!(
        "Page {}/{} ({} products total), showing {} of {}",
        fetched.current_page,
        fetched.total_pages,
        fetched.total_items,
        visible.len(),
        fetched.products.len()
    );
    for product in &visible {
        tracing::info!("{}", summary_line(product));
    }
    tracing::info!("Categories: {}", ctx.catalog().categories().join(", "));
    Ok(())
}

pub async fn show(ctx: &AppContext, id: &ProductId) -> Result<(), CliError> {
    let product = ctx
        .catalog()
        .fetch_product(id)
        .await?
        .ok_or_else(|| CliError::ProductNotFound(id.to_string()))?;

    tracing::info!("{}", product.name);
    tracing::info!("  ID:       {}", product.id);
    tracing::info!("  Price:    {}", product.price);
    tracing::info!("  Category: {}", product.category);
    tracing::info!("  Stock:    {}", product.stock);
    tracing::info!("  Rating:   {:.1}", product.rating);
    if !product.description.is_empty() {
        tracing::info!("  {}", product.description);
    }
    Ok(())
}

pub async fn add(ctx: &AppContext, draft: &ProductDraft) -> Result<(), CliError> {
    let created = ctx.catalog().add_product(draft).await?;
    tracing::info!("Created {}", summary_line(&created));
    Ok(())
}

pub async fn update(
    ctx: &AppContext,
    id: &ProductId,
    patch: &ProductPatch,
) -> Result<(), CliError> {
    let updated = ctx.catalog().update_product(id, patch).await?;
    tracing::info!("Updated {}", summary_line(&updated));
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: &ProductId) -> Result<(), CliError> {
    ctx.catalog().delete_product(id).await?;
    tracing::info!("Deleted product {id}");
    Ok(())
}

fn summary_line(product: &Product) -> String {
    format!(
        "{:<26} {:<32} {:>10} {:<14} stock {:>4}  rating {:.1}",
        product.id.as_str(),
        product.name,
        product.price.to_string(),
        product.category,
        product.stock,
        product.rating
    )
}
