mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{
    entities::OrderStatus,
    errors::ServiceError,
    services::{carts::CartIdentity, checkout::CheckoutInput},
};
use uuid::Uuid;

/// Seeds a customer with a cart of [product_a x 2, product_b x 1] and
/// checks it out, returning (order, product ids).
async fn checkout_fixture(app: &TestApp, stock_a: i32, stock_b: i32) -> (Uuid, Uuid, Uuid) {
    let category = app.seed_category("Инструменты", "instrumenty").await;
    let product_a = app
        .seed_product(category.id, "Лопата", dec!(10.00), stock_a)
        .await;
    let product_b = app
        .seed_product(category.id, "Грабли", dec!(5.00), stock_b)
        .await;
    let customer = app
        .seed_customer("buyer@example.com", "+79990000001", false)
        .await;

    let identity = CartIdentity::Customer(customer.id);
    let carts = &app.state.services.carts;
    let cart = carts.get_or_create(&identity).await.unwrap();
    carts.add_item(cart.id, product_a.id).await.unwrap();
    carts.add_item(cart.id, product_a.id).await.unwrap();
    carts.add_item(cart.id, product_b.id).await.unwrap();

    let order = app
        .state
        .services
        .checkout
        .checkout(&identity, customer.id, CheckoutInput::default())
        .await
        .unwrap();

    (order.id, product_a.id, product_b.id)
}

#[tokio::test]
async fn confirming_decrements_stock_and_recomputes_total() {
    let app = TestApp::new().await;
    let (order_id, product_a, product_b) = checkout_fixture(&app, 5, 5).await;

    let order = app
        .state
        .services
        .orders
        .update_status(order_id, OrderStatus::Confirmed, Some("ок".into()))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.total_amount, dec!(25.00));
    assert_eq!(order.admin_comment, "ок");
    assert_eq!(app.product_quantity(product_a).await, 3);
    assert_eq!(app.product_quantity(product_b).await, 4);
}

#[tokio::test]
async fn insufficient_stock_refuses_the_whole_transition() {
    let app = TestApp::new().await;
    // product_a needs 2 but only 1 in stock; product_b has plenty.
    let (order_id, product_a, product_b) = checkout_fixture(&app, 1, 5).await;

    let err = app
        .state
        .services
        .orders
        .update_status(order_id, OrderStatus::Confirmed, None)
        .await
        .unwrap_err();

    match err {
        ServiceError::InsufficientStock(message) => {
            assert!(message.contains("Лопата"));
            assert!(message.contains('1'));
            assert!(message.contains('2'));
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Atomic refusal: nothing changed.
    assert_eq!(app.product_quantity(product_a).await, 1);
    assert_eq!(app.product_quantity(product_b).await, 5);
    let order = app
        .state
        .services
        .orders
        .get_order(order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::New);
}

#[tokio::test]
async fn cancelling_a_confirmed_order_restores_stock() {
    let app = TestApp::new().await;
    let (order_id, product_a, product_b) = checkout_fixture(&app, 5, 5).await;
    let orders = &app.state.services.orders;

    orders
        .update_status(order_id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    assert_eq!(app.product_quantity(product_a).await, 3);

    orders
        .update_status(order_id, OrderStatus::Cancelled, None)
        .await
        .unwrap();
    assert_eq!(app.product_quantity(product_a).await, 5);
    assert_eq!(app.product_quantity(product_b).await, 5);
}

#[tokio::test]
async fn cancelling_a_new_order_does_not_credit_stock() {
    let app = TestApp::new().await;
    let (order_id, product_a, product_b) = checkout_fixture(&app, 5, 5).await;

    let order = app
        .state
        .services
        .orders
        .update_status(order_id, OrderStatus::Cancelled, None)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Cancelled);
    // The order never consumed stock, so cancelling must not add any.
    assert_eq!(app.product_quantity(product_a).await, 5);
    assert_eq!(app.product_quantity(product_b).await, 5);
}

#[tokio::test]
async fn same_status_transition_is_idempotent() {
    let app = TestApp::new().await;
    let (order_id, product_a, _) = checkout_fixture(&app, 5, 5).await;
    let orders = &app.state.services.orders;

    orders
        .update_status(order_id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    let notifications_after_first = app.notifications().len();
    assert_eq!(app.product_quantity(product_a).await, 3);

    // Re-confirming changes nothing and sends nothing.
    orders
        .update_status(order_id, OrderStatus::Confirmed, Some("повторно".into()))
        .await
        .unwrap();
    assert_eq!(app.product_quantity(product_a).await, 3);
    assert_eq!(app.notifications().len(), notifications_after_first);
}

#[tokio::test]
async fn status_change_sends_one_notification() {
    let app = TestApp::new().await;
    let (order_id, _, _) = checkout_fixture(&app, 5, 5).await;

    // Checkout already sent the new-order notification.
    let baseline = app.notifications().len();
    assert_eq!(baseline, 1);

    app.state
        .services
        .orders
        .update_status(order_id, OrderStatus::Confirmed, None)
        .await
        .unwrap();

    let messages = app.notifications();
    assert_eq!(messages.len(), baseline + 1);
    assert!(messages.last().unwrap().contains("подтвержден"));
}

#[tokio::test]
async fn bulk_confirm_skips_orders_that_are_not_new() {
    let app = TestApp::new().await;
    let (first, _, _) = checkout_fixture(&app, 5, 5).await;

    let category = app.seed_category("Сад", "sad").await;
    let product = app
        .seed_product(category.id, "Секатор", dec!(3.00), 10)
        .await;
    let customer = app
        .seed_customer("second@example.com", "+79990000002", false)
        .await;
    let identity = CartIdentity::Customer(customer.id);
    let cart = app
        .state
        .services
        .carts
        .get_or_create(&identity)
        .await
        .unwrap();
    app.state
        .services
        .carts
        .add_item(cart.id, product.id)
        .await
        .unwrap();
    let second = app
        .state
        .services
        .checkout
        .checkout(&identity, customer.id, CheckoutInput::default())
        .await
        .unwrap()
        .id;

    let orders = &app.state.services.orders;
    // First order is already cancelled; only the second is still new.
    orders
        .update_status(first, OrderStatus::Cancelled, None)
        .await
        .unwrap();

    let transitioned = orders
        .confirm_orders(&[first, second, Uuid::new_v4()], "массово")
        .await
        .unwrap();
    assert_eq!(transitioned, 1);

    assert_eq!(
        orders.get_order(first).await.unwrap().unwrap().status,
        OrderStatus::Cancelled
    );
    assert_eq!(
        orders.get_order(second).await.unwrap().unwrap().status,
        OrderStatus::Confirmed
    );
}
