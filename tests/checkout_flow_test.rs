mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use storefront_api::{
    entities::{order_item, product, OrderItem, OrderStatus},
    errors::ServiceError,
    services::{carts::CartIdentity, checkout::CheckoutInput},
};

#[tokio::test]
async fn checkout_captures_prices_and_empties_the_cart() {
    let app = TestApp::new().await;
    let category = app.seed_category("Сад", "sad").await;
    let product_a = app
        .seed_product(category.id, "Лопата", dec!(10.00), 5)
        .await;
    let product_b = app
        .seed_product(category.id, "Грабли", dec!(5.00), 5)
        .await;
    let customer = app
        .seed_customer("order@example.com", "+79990000010", false)
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
        .checkout(
            &identity,
            customer.id,
            CheckoutInput {
                contact_phone: None,
                delivery_address: "ул. Ленина, 1".into(),
                comment: String::new(),
            },
        )
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.total_amount, dec!(25.00));
    // Blank contact phone falls back to the customer's phone.
    assert_eq!(order.contact_phone, customer.phone);

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    let mut prices: Vec<_> = items.iter().map(|i| i.price).collect();
    prices.sort();
    assert_eq!(prices, vec![dec!(5.00), dec!(10.00)]);

    // The cart is gone.
    assert!(carts.find(&identity).await.unwrap().is_none());

    // The new-order notification was sent at checkout time.
    let messages = app.notifications();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("НОВЫЙ ЗАКАЗ"));
    assert!(messages[0].contains(&customer.phone));
}

#[tokio::test]
async fn captured_price_survives_later_price_changes() {
    let app = TestApp::new().await;
    let category = app.seed_category("Сад", "sad").await;
    let seeded = app
        .seed_product(category.id, "Секатор", dec!(20.00), 5)
        .await;
    let customer = app
        .seed_customer("capture@example.com", "+79990000011", false)
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
        .add_item(cart.id, seeded.id)
        .await
        .unwrap();
    let order = app
        .state
        .services
        .checkout
        .checkout(&identity, customer.id, CheckoutInput::default())
        .await
        .unwrap();

    // Reprice the product after checkout.
    let mut active: product::ActiveModel = storefront_api::entities::Product::find_by_id(seeded.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .into();
    active.price = Set(dec!(99.00));
    active.update(&*app.state.db).await.unwrap();

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(items[0].price, dec!(20.00));

    // Recomputed total still uses the captured price.
    let order = app
        .state
        .services
        .orders
        .update_status(order.id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    assert_eq!(order.total_amount, dec!(20.00));
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let app = TestApp::new().await;
    let customer = app
        .seed_customer("empty@example.com", "+79990000012", false)
        .await;
    let identity = CartIdentity::Customer(customer.id);

    // No cart at all.
    let err = app
        .state
        .services
        .checkout
        .checkout(&identity, customer.id, CheckoutInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    // A cart with no items behaves the same.
    app.state
        .services
        .carts
        .get_or_create(&identity)
        .await
        .unwrap();
    let err = app
        .state
        .services
        .checkout
        .checkout(&identity, customer.id, CheckoutInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn explicit_contact_phone_is_kept() {
    let app = TestApp::new().await;
    let category = app.seed_category("Сад", "sad").await;
    let product = app.seed_product(category.id, "Ведро", dec!(3.00), 5).await;
    let customer = app
        .seed_customer("phone@example.com", "+79990000013", false)
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

    let order = app
        .state
        .services
        .checkout
        .checkout(
            &identity,
            customer.id,
            CheckoutInput {
                contact_phone: Some("+70001112233".into()),
                delivery_address: String::new(),
                comment: "позвонить заранее".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(order.contact_phone, "+70001112233");
    assert_eq!(order.comment, "позвонить заранее");
}
