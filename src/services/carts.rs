use crate::{
    entities::{cart, cart_item, Cart, CartItem, CartItemModel, CartModel, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Cart partition key: a cart belongs to exactly one of an authenticated
/// customer or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartIdentity {
    Customer(Uuid),
    Session(String),
}

/// One cart line joined with its product.
#[derive(Debug, Serialize)]
pub struct CartLine {
    pub item: CartItemModel,
    pub product: ProductModel,
    pub line_total: Decimal,
}

/// Cart with loaded lines and computed totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart: CartModel,
    pub lines: Vec<CartLine>,
    pub total_amount: Decimal,
    pub total_quantity: i32,
}

/// Shopping cart service.
///
/// Stock sufficiency is deliberately NOT checked when adding to the cart or
/// changing quantities; the only guard here is that the product is active
/// and has any stock at all. Stock is enforced once, at order confirmation.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the single cart for the identity, creating it if absent.
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, identity: &CartIdentity) -> Result<CartModel, ServiceError> {
        if let Some(cart) = self.find(identity).await? {
            return Ok(cart);
        }

        let (customer_id, session_key) = match identity {
            CartIdentity::Customer(id) => (Some(*id), None),
            CartIdentity::Session(key) => (None, Some(key.clone())),
        };

        let cart_id = Uuid::new_v4();
        let cart = cart::ActiveModel {
            id: Set(cart_id),
            customer_id: Set(customer_id),
            session_key: Set(session_key),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let cart = cart.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartCreated(cart_id))
            .await;

        info!(cart_id = %cart_id, "created cart");
        Ok(cart)
    }

    /// Looks up the cart for an identity without creating one.
    pub async fn find(&self, identity: &CartIdentity) -> Result<Option<CartModel>, ServiceError> {
        let query = match identity {
            CartIdentity::Customer(id) => {
                Cart::find().filter(cart::Column::CustomerId.eq(Some(*id)))
            }
            CartIdentity::Session(key) => Cart::find()
                .filter(cart::Column::SessionKey.eq(Some(key.clone())))
                .filter(cart::Column::CustomerId.is_null()),
        };
        query.one(&*self.db).await.map_err(Into::into)
    }

    /// Adds one unit of a product to the cart.
    ///
    /// Inactive or out-of-stock products are refused; an existing line for
    /// the same product is incremented instead of duplicated.
    #[instrument(skip(self))]
    pub async fn add_item(&self, cart_id: Uuid, product_id: Uuid) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Cart::find_by_id(cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {cart_id} not found")))?;

        let product = Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        if !product.available() {
            return Err(ServiceError::InvalidOperation(format!(
                "Товар '{}' недоступен для заказа",
                product.name
            )));
        }

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        if let Some(item) = existing {
            let quantity = item.quantity;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity + 1);
            item.update(&txn).await?;
        } else {
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                product_id: Set(product_id),
                quantity: Set(1),
                added_at: Set(Utc::now()),
            };
            item.insert(&txn).await?;
        }

        let mut cart: cart::ActiveModel = cart.into();
        cart.updated_at = Set(Utc::now());
        cart.update(&txn).await?;

        let view = Self::load_view(&txn, cart_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id,
                product_id,
            })
            .await;

        info!(cart_id = %cart_id, product_id = %product_id, "added item to cart");
        Ok(view)
    }

    /// Overwrites a line's quantity; zero or less removes the line.
    /// No upper bound is applied against stock.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let item = CartItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {item_id} not found")))?;

        if item.cart_id != cart_id {
            return Err(ServiceError::InvalidOperation(
                "Item does not belong to this cart".to_string(),
            ));
        }

        if quantity <= 0 {
            item.delete(&txn).await?;
        } else {
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.update(&txn).await?;
        }

        let view = Self::load_view(&txn, cart_id).await?;
        txn.commit().await?;
        Ok(view)
    }

    /// Removes a line outright.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<CartView, ServiceError> {
        self.update_item_quantity(cart_id, item_id, 0).await
    }

    /// Cart with lines and totals.
    pub async fn get_view(&self, cart_id: Uuid) -> Result<CartView, ServiceError> {
        Self::load_view(&*self.db, cart_id).await
    }

    async fn load_view(
        conn: &impl sea_orm::ConnectionTrait,
        cart_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {cart_id} not found")))?;

        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Product)
            .all(conn)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        let mut total_amount = Decimal::ZERO;
        let mut total_quantity = 0;
        for (item, product) in rows {
            let product = product.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "cart item {} references a missing product",
                    item.id
                ))
            })?;
            let line_total = product.price * Decimal::from(item.quantity);
            total_amount += line_total;
            total_quantity += item.quantity;
            lines.push(CartLine {
                item,
                product,
                line_total,
            });
        }

        Ok(CartView {
            cart,
            lines,
            total_amount,
            total_quantity,
        })
    }
}
