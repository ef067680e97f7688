use crate::{
    entities::{cart_item, order, order_item, Cart, CartItem, Customer, OrderModel, OrderStatus,
        Product},
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::Notifier,
    services::carts::CartIdentity,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set, TransactionTrait,
    DatabaseConnection,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Contact fields collected at checkout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutInput {
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub comment: String,
}

/// Converts a cart into an order.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifier: Arc<dyn Notifier>,
    site_url: String,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        notifier: Arc<dyn Notifier>,
        site_url: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            notifier,
            site_url,
        }
    }

    /// Creates an order from the identity's cart.
    ///
    /// Every cart line becomes an order item capturing the product price at
    /// this moment; the cart and its lines are then deleted. The whole
    /// conversion is one transaction. Stock is NOT checked here — only
    /// order confirmation enforces it.
    #[instrument(skip(self, input), fields(customer_id = %customer_id))]
    pub async fn checkout(
        &self,
        identity: &CartIdentity,
        customer_id: Uuid,
        input: CheckoutInput,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let customer = Customer::find_by_id(customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {customer_id} not found")))?;

        let cart = match identity {
            CartIdentity::Customer(id) => {
                Cart::find()
                    .filter(crate::entities::cart::Column::CustomerId.eq(Some(*id)))
                    .one(&txn)
                    .await?
            }
            CartIdentity::Session(key) => {
                Cart::find()
                    .filter(crate::entities::cart::Column::SessionKey.eq(Some(key.clone())))
                    .filter(crate::entities::cart::Column::CustomerId.is_null())
                    .one(&txn)
                    .await?
            }
        }
        .ok_or_else(|| ServiceError::InvalidOperation("Корзина пуста".to_string()))?;

        let items = cart.find_related(CartItem).all(&txn).await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation("Корзина пуста".to_string()));
        }

        let order_id = Uuid::new_v4();
        let number = order_number(order_id);
        let contact_phone = input
            .contact_phone
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| customer.phone.clone());

        let order = order::ActiveModel {
            id: Set(order_id),
            number: Set(number.clone()),
            customer_id: Set(customer_id),
            status: Set(OrderStatus::New),
            total_amount: Set(Decimal::ZERO),
            contact_phone: Set(contact_phone.clone()),
            delivery_address: Set(input.delivery_address),
            comment: Set(input.comment.clone()),
            admin_comment: Set(String::new()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let order = order.insert(&txn).await?;

        let mut total = Decimal::ZERO;
        let mut item_count = 0;
        for item in &items {
            let product = Product::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;

            let line = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(product.price),
            };
            line.insert(&txn).await?;

            total += product.price * Decimal::from(item.quantity);
            item_count += item.quantity;
        }

        let mut active: order::ActiveModel = order.into();
        active.total_amount = Set(total);
        active.updated_at = Set(Utc::now());
        let order = active.update(&txn).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        Cart::delete_by_id(cart.id).exec(&txn).await?;

        txn.commit().await?;

        let comment = if input.comment.trim().is_empty() {
            "нет".to_string()
        } else {
            input.comment
        };
        let mut message = format!(
            "🆕 НОВЫЙ ЗАКАЗ {number}\n\n👤 Клиент: {}\n📞 Телефон: {}\n💰 Сумма: {} руб.\n📦 Товаров: {} шт.\n\n💬 Комментарий: {comment}",
            customer.full_name(),
            contact_phone,
            order.total_amount,
            item_count,
        );
        if !self.site_url.is_empty() {
            message.push_str(&format!(
                "\n\n🛠 Управление заказом: {}/admin/orders/{order_id}",
                self.site_url
            ));
        }
        if let Err(e) = self.notifier.notify(&message).await {
            warn!(error = %e, "new order notification delivery failed");
        }

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;

        info!(order_id = %order_id, total = %order.total_amount, "order created from cart");
        Ok(order)
    }
}

fn order_number(order_id: Uuid) -> String {
    let simple = order_id.simple().to_string();
    format!("ORD-{}", simple[..8].to_uppercase())
}
