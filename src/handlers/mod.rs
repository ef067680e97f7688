pub mod auth;
pub mod carts;
pub mod catalog;
pub mod chat;
pub mod checkout;
pub mod common;
pub mod imports;
pub mod orders;

use axum::{http::StatusCode, routing::get, Router};
use std::sync::Arc;

use crate::{
    services::{
        carts::CartService, catalog::CatalogService, chat::ChatService,
        checkout::CheckoutService, customers::CustomerService, import::ImportService,
        orders::OrderService,
    },
    AppState,
};

/// Shared service instances behind the router.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub carts: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub customers: Arc<CustomerService>,
    pub import: Arc<ImportService>,
    pub chat: Arc<ChatService>,
}

/// Assembles the full application router.
pub fn app_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(catalog::catalog_routes())
        .merge(carts::cart_routes())
        .merge(checkout::checkout_routes())
        .merge(auth::auth_routes())
        .merge(chat::chat_routes())
        .merge(orders::admin_order_routes())
        .merge(imports::admin_import_routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}
