use crate::{
    entities::{
        order, order_item, product, Customer, CustomerModel, Order, OrderItem, OrderItemModel,
        OrderModel, OrderStatus, Product, ProductModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::Notifier,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Order with its line items and their products.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: OrderModel,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize)]
pub struct OrderLine {
    pub item: OrderItemModel,
    pub product: Option<ProductModel>,
    pub total_price: Decimal,
}

/// Order engine: owns the status state machine.
///
/// Stock changes are tied strictly to the edges new→confirmed (decrement)
/// and confirmed→cancelled (restore), never to status values in isolation,
/// so re-confirming or re-cancelling is a safe no-op.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifier: Arc<dyn Notifier>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            event_sender,
            notifier,
        }
    }

    /// Transitions an order to `new_status`.
    ///
    /// A same-status transition returns immediately without touching stock,
    /// the admin comment, or notifications. Transitioning into `confirmed`
    /// verifies every line against available stock under exclusive row
    /// locks and refuses the whole transition on any shortfall, leaving all
    /// quantities untouched. Transitioning a confirmed order to `cancelled`
    /// returns its stock; cancelling an order that never consumed stock
    /// does not credit anything.
    ///
    /// The notification is emitted after the transaction commits and its
    /// failure is never propagated.
    #[instrument(skip(self, admin_comment), fields(order_id = %order_id, new_status = ?new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        admin_comment: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        if order.status == new_status {
            txn.commit().await?;
            return Ok(order);
        }

        let old_status = order.status;
        let items = order.find_related(OrderItem).all(&txn).await?;

        match new_status {
            OrderStatus::Confirmed => {
                // Check every line before mutating anything; a shortfall on
                // any product aborts the whole transition.
                let mut locked = Vec::with_capacity(items.len());
                for item in &items {
                    let product = Self::lock_product(&txn, item.product_id).await?;
                    if item.quantity > product.quantity {
                        return Err(ServiceError::InsufficientStock(format!(
                            "Недостаточно товара '{}'. На складе: {}, в заказе: {}",
                            product.name, product.quantity, item.quantity
                        )));
                    }
                    locked.push((item.quantity, product));
                }
                for (ordered, product) in locked {
                    let remaining = product.quantity - ordered;
                    let mut active: product::ActiveModel = product.into();
                    active.quantity = Set(remaining);
                    active.updated_at = Set(Utc::now());
                    active.update(&txn).await?;
                }
            }
            OrderStatus::Cancelled => {
                // Stock returns only when this order consumed it: a `new`
                // order never decremented, so cancelling it credits nothing.
                if old_status == OrderStatus::Confirmed {
                    for item in &items {
                        let product = Self::lock_product(&txn, item.product_id).await?;
                        let restored = product.quantity + item.quantity;
                        let mut active: product::ActiveModel = product.into();
                        active.quantity = Set(restored);
                        active.updated_at = Set(Utc::now());
                        active.update(&txn).await?;
                    }
                }
            }
            OrderStatus::New => {}
        }

        let total = Self::total_of(&items);
        let customer = Customer::find_by_id(order.customer_id).one(&txn).await?;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        active.admin_comment = Set(admin_comment.unwrap_or_default());
        active.total_amount = Set(total);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        match new_status {
            OrderStatus::Confirmed => {
                self.deliver(&status_message("✅ Заказ подтвержден", &updated, customer.as_ref()))
                    .await
            }
            OrderStatus::Cancelled => {
                self.deliver(&status_message("❌ Заказ отменен", &updated, customer.as_ref()))
                    .await
            }
            OrderStatus::New => {}
        }

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;

        info!(
            order_id = %order_id,
            old_status = ?old_status,
            new_status = ?new_status,
            "order status updated"
        );
        Ok(updated)
    }

    /// Bulk admin action: confirm every listed order that is still `new`.
    /// Each order transitions in its own transaction; one failure does not
    /// stop the rest.
    #[instrument(skip(self, order_ids))]
    pub async fn confirm_orders(
        &self,
        order_ids: &[Uuid],
        admin_comment: &str,
    ) -> Result<usize, ServiceError> {
        self.bulk_transition(order_ids, OrderStatus::Confirmed, admin_comment)
            .await
    }

    /// Bulk admin action: cancel every listed order that is still `new`.
    #[instrument(skip(self, order_ids))]
    pub async fn cancel_orders(
        &self,
        order_ids: &[Uuid],
        admin_comment: &str,
    ) -> Result<usize, ServiceError> {
        self.bulk_transition(order_ids, OrderStatus::Cancelled, admin_comment)
            .await
    }

    async fn bulk_transition(
        &self,
        order_ids: &[Uuid],
        new_status: OrderStatus,
        admin_comment: &str,
    ) -> Result<usize, ServiceError> {
        let mut transitioned = 0;
        for &order_id in order_ids {
            let order = match self.get_order(order_id).await? {
                Some(order) => order,
                None => continue,
            };
            if order.status != OrderStatus::New {
                continue;
            }
            match self
                .update_status(order_id, new_status, Some(admin_comment.to_string()))
                .await
            {
                Ok(_) => transitioned += 1,
                Err(e) => warn!(order_id = %order_id, error = %e, "bulk transition skipped order"),
            }
        }
        Ok(transitioned)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderModel>, ServiceError> {
        Order::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(Into::into)
    }

    pub async fn get_order_detail(&self, order_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let rows = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let items = rows
            .into_iter()
            .map(|(item, product)| {
                let total_price = item.total_price();
                OrderLine {
                    item,
                    product,
                    total_price,
                }
            })
            .collect();

        Ok(OrderDetail { order, items })
    }

    /// Newest-first order listing with an optional status filter.
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        status: Option<OrderStatus>,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let mut query = Order::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Customer order history, newest first.
    pub async fn list_orders_for_customer(
        &self,
        customer_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    async fn lock_product(
        txn: &impl ConnectionTrait,
        product_id: Uuid,
    ) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))
    }

    fn total_of(items: &[OrderItemModel]) -> Decimal {
        items.iter().map(|item| item.total_price()).sum()
    }

    async fn deliver(&self, text: &str) {
        if let Err(e) = self.notifier.notify(text).await {
            warn!(error = %e, "order notification delivery failed");
        }
    }
}

fn status_message(status_text: &str, order: &OrderModel, customer: Option<&CustomerModel>) -> String {
    let customer_name = customer
        .map(|c| c.full_name())
        .unwrap_or_else(|| "—".to_string());
    format!(
        "{status_text}\n\n📦 Заказ {}\n👤 Клиент: {}\n💰 Сумма: {} руб.",
        order.number, customer_name, order.total_amount
    )
}
