mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{errors::ServiceError, services::carts::CartIdentity};

#[tokio::test]
async fn adding_a_product_creates_a_single_line() {
    let app = TestApp::new().await;
    let category = app.seed_category("Сад", "sad").await;
    let product = app
        .seed_product(category.id, "Лейка", dec!(12.50), 10)
        .await;

    let carts = &app.state.services.carts;
    let identity = CartIdentity::Session("sess-1".into());
    let cart = carts.get_or_create(&identity).await.unwrap();

    let view = carts.add_item(cart.id, product.id).await.unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].item.quantity, 1);
    assert_eq!(view.total_quantity, 1);
    assert_eq!(view.total_amount, dec!(12.50));

    // Adding the same product again increments the line, never duplicates it.
    let view = carts.add_item(cart.id, product.id).await.unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].item.quantity, 2);
    assert_eq!(view.total_amount, dec!(25.00));
}

#[tokio::test]
async fn unavailable_products_cannot_be_added() {
    let app = TestApp::new().await;
    let category = app.seed_category("Сад", "sad").await;
    let out_of_stock = app
        .seed_product(category.id, "Тачка", dec!(100.00), 0)
        .await;

    let carts = &app.state.services.carts;
    let identity = CartIdentity::Session("sess-2".into());
    let cart = carts.get_or_create(&identity).await.unwrap();

    let err = carts.add_item(cart.id, out_of_stock.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    let view = carts.get_view(cart.id).await.unwrap();
    assert!(view.lines.is_empty());
}

#[tokio::test]
async fn quantity_update_overwrites_and_zero_deletes() {
    let app = TestApp::new().await;
    let category = app.seed_category("Сад", "sad").await;
    let product = app.seed_product(category.id, "Шланг", dec!(8.00), 3).await;

    let carts = &app.state.services.carts;
    let identity = CartIdentity::Session("sess-3".into());
    let cart = carts.get_or_create(&identity).await.unwrap();
    let view = carts.add_item(cart.id, product.id).await.unwrap();
    let item_id = view.lines[0].item.id;

    // No upper bound against stock: 99 > 3 is accepted here.
    let view = carts
        .update_item_quantity(cart.id, item_id, 99)
        .await
        .unwrap();
    assert_eq!(view.lines[0].item.quantity, 99);

    let view = carts
        .update_item_quantity(cart.id, item_id, 0)
        .await
        .unwrap();
    assert!(view.lines.is_empty());
}

#[tokio::test]
async fn carts_are_partitioned_by_identity() {
    let app = TestApp::new().await;
    let customer = app
        .seed_customer("cart@example.com", "+79990000003", false)
        .await;

    let carts = &app.state.services.carts;
    let by_customer = CartIdentity::Customer(customer.id);
    let by_session = CartIdentity::Session("anon-key".into());

    let customer_cart = carts.get_or_create(&by_customer).await.unwrap();
    let session_cart = carts.get_or_create(&by_session).await.unwrap();
    assert_ne!(customer_cart.id, session_cart.id);

    // The same identity always resolves to the same cart.
    let again = carts.get_or_create(&by_customer).await.unwrap();
    assert_eq!(again.id, customer_cart.id);
    let again = carts.get_or_create(&by_session).await.unwrap();
    assert_eq!(again.id, session_cart.id);
}
