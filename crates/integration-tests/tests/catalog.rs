//! Catalog fetching, ordering and admin product management against the fake
//! backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use mercato_client::catalog::SortKey;
use mercato_client::checkout::CheckoutForm;
use mercato_client::error::ClientError;
use mercato_client::models::{ProductDraft, ProductPatch};
use mercato_client::state::AppContext;
use mercato_core::{Money, ProductId};
use mercato_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, CUSTOMER_PASSWORD, CUSTOMER_USERNAME, FakeBackend,
    SEEDED_PRODUCTS,
};
use secrecy::SecretString;

async fn signed_in_admin(backend: &FakeBackend) -> AppContext {
    let ctx = backend.context();
    ctx.session()
        .login(ADMIN_EMAIL, &SecretString::from(ADMIN_PASSWORD))
        .await
        .unwrap();
    ctx
}

fn draft(name: &str) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        price: Money::from_cents(3_990),
        category: "Home".to_string(),
        stock: 4,
        image: String::new(),
        description: "Warm light".to_string(),
    }
}

#[tokio::test]
async fn test_pages_are_fetched_and_replaced() {
    let backend = FakeBackend::spawn().await;
    let ctx = backend.context();

    let first = ctx.catalog().fetch_page(1, 10).await.unwrap();
    assert_eq!(first.products.len(), 10);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.total_items, SEEDED_PRODUCTS as u64);

    let last = ctx.catalog().fetch_page(3, 10).await.unwrap();
    assert_eq!(last.products.len(), 5);
    assert_eq!(ctx.catalog().current_page(), last);
    assert_eq!(ctx.catalog().query().current().page, 3);
    assert!(!ctx.catalog().status().loading);
}

#[tokio::test]
async fn test_superseded_response_is_discarded() {
    let backend = FakeBackend::spawn().await;
    backend.delay_page(1, Duration::from_millis(300));
    let ctx = backend.context();

    let (slow, fast) = tokio::join!(
        ctx.catalog().fetch_page(1, 10),
        ctx.catalog().fetch_page(2, 10)
    );

    assert_eq!(slow.unwrap().current_page, 1);
    assert_eq!(fast.unwrap().current_page, 2);
    assert_eq!(ctx.catalog().current_page().current_page, 2);
    assert_eq!(ctx.catalog().query().current().page, 2);
}

#[tokio::test]
async fn test_client_side_view_filters_and_sorts() {
    let backend = FakeBackend::spawn().await;
    let ctx = backend.context();
    ctx.catalog().fetch_page(1, 25).await.unwrap();

    let query = ctx.catalog().query();
    query.set_category("Audio");
    query.set_sort_by(SortKey::PriceHighToLow);

    let visible = ctx.catalog().visible();
    assert!(!visible.is_empty());
    assert!(visible.iter().all(|p| p.category == "Audio"));
    assert!(visible.windows(2).all(|w| w[0].price >= w[1].price));
    assert_eq!(ctx.catalog().categories(), ["All", "Audio", "Home", "Outdoors"]);

    query.reset_filters();
    assert_eq!(ctx.catalog().visible().len(), SEEDED_PRODUCTS);
}

#[tokio::test]
async fn test_product_detail_and_placeholder() {
    let backend = FakeBackend::spawn().await;
    let ctx = backend.context();

    let product = ctx
        .catalog()
        .fetch_product(&ProductId::new("p01"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.name, "Home item 01");

    let missing = ctx
        .catalog()
        .fetch_product(&ProductId::new("nope"))
        .await
        .unwrap();
    assert!(missing.is_none());
    assert_eq!(ctx.catalog().status().error, None);
}

#[tokio::test]
async fn test_admin_mutations_refetch_current_page() {
    let backend = FakeBackend::spawn().await;
    let ctx = signed_in_admin(&backend).await;
    ctx.catalog().fetch_page(3, 10).await.unwrap();

    let created = ctx.catalog().add_product(&draft("Desk lamp")).await.unwrap();
    assert_eq!(backend.product_count(), SEEDED_PRODUCTS + 1);
    let page = ctx.catalog().current_page();
    assert_eq!(page.current_page, 3);
    assert!(page.product(&created.id).is_some());

    let patch = ProductPatch {
        stock: Some(12),
        ..ProductPatch::default()
    };
    let updated = ctx.catalog().update_product(&created.id, &patch).await.unwrap();
    assert_eq!(updated.stock, 12);
    assert_eq!(updated.name, "Desk lamp");
    assert_eq!(
        ctx.catalog().current_page().product(&created.id).unwrap().stock,
        12
    );

    ctx.catalog().delete_product(&created.id).await.unwrap();
    assert_eq!(backend.product_count(), SEEDED_PRODUCTS);
    assert!(ctx.catalog().current_page().product(&created.id).is_none());
}

#[tokio::test]
async fn test_mutation_rejections() {
    let backend = FakeBackend::spawn().await;

    let anonymous = backend.context();
    let err = anonymous.catalog().add_product(&draft("Lamp")).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Unauthorized(ClientError::LOGIN_REQUIRED.to_string())
    );

    let customer = backend.context();
    customer
        .session()
        .login(CUSTOMER_USERNAME, &SecretString::from(CUSTOMER_PASSWORD))
        .await
        .unwrap();
    let err = customer.catalog().add_product(&draft("Lamp")).await.unwrap_err();
    assert_eq!(err, ClientError::Fetch("Not authorized as an admin".into()));

    let admin = signed_in_admin(&backend).await;
    let err = admin
        .catalog()
        .delete_product(&ProductId::new("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));

    assert_eq!(backend.product_count(), SEEDED_PRODUCTS);
}

#[tokio::test]
async fn test_expired_token_is_reported_without_logout() {
    let backend = FakeBackend::spawn().await;
    let ctx = signed_in_admin(&backend).await;
    backend.expire_tokens();

    let patch = ProductPatch {
        name: Some("Renamed".into()),
        ..ProductPatch::default()
    };
    let err = ctx
        .catalog()
        .update_product(&ProductId::new("p01"), &patch)
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(ctx.catalog().status().error, Some(err));
    assert!(
        ctx.session().identity().is_some(),
        "an authorization failure must not sign the user out"
    );
}

#[tokio::test]
async fn test_checkout_from_fetched_page() {
    let backend = FakeBackend::spawn().await;
    let ctx = backend.context();
    let page = ctx.catalog().fetch_page(1, 10).await.unwrap();

    {
        let mut cart = ctx.cart();
        cart.add_product(&page.products[0]);
        cart.add_product(&page.products[0]);
        cart.add_product(&page.products[1]);
    }
    let expected = ctx.order_summary();
    assert_eq!(ctx.cart().item_count(), 3);

    let form = CheckoutForm {
        name: "Ada Lovelace".into(),
        email: "ada@mercato.test".into(),
        address: "12 Analytical Row".into(),
        city: "London".into(),
        zip_code: "N1 9GU".into(),
    };
    let receipt = ctx.submit_order(&form).unwrap();

    assert_eq!(receipt.summary, expected);
    assert_eq!(receipt.lines.len(), 2);
    assert!(ctx.cart().is_empty());
}
