use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CartSession,
    errors::ServiceError,
    handlers::common::success_response,
    AppState,
};

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(issue_session))
        .route("/cart", get(get_cart))
        .route("/cart/items", post(add_item))
        .route(
            "/cart/items/:item_id",
            put(update_item).delete(remove_item),
        )
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    session_key: String,
}

/// Issues an anonymous session key used as the cart partition key.
async fn issue_session() -> Response {
    success_response(SessionResponse {
        session_key: Uuid::new_v4().to_string(),
    })
}

async fn get_cart(
    State(state): State<AppState>,
    CartSession(identity): CartSession,
) -> Result<Response, ServiceError> {
    let cart = state.services.carts.get_or_create(&identity).await?;
    let view = state.services.carts.get_view(cart.id).await?;
    Ok(success_response(view))
}

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    product_id: Uuid,
}

async fn add_item(
    State(state): State<AppState>,
    CartSession(identity): CartSession,
    Json(body): Json<AddItemRequest>,
) -> Result<Response, ServiceError> {
    let cart = state.services.carts.get_or_create(&identity).await?;
    let view = state
        .services
        .carts
        .add_item(cart.id, body.product_id)
        .await?;
    Ok(success_response(view))
}

#[derive(Debug, Deserialize)]
struct UpdateItemRequest {
    quantity: i32,
}

async fn update_item(
    State(state): State<AppState>,
    CartSession(identity): CartSession,
    Path(item_id): Path<Uuid>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Response, ServiceError> {
    let cart = state.services.carts.get_or_create(&identity).await?;
    let view = state
        .services
        .carts
        .update_item_quantity(cart.id, item_id, body.quantity)
        .await?;
    Ok(success_response(view))
}

async fn remove_item(
    State(state): State<AppState>,
    CartSession(identity): CartSession,
    Path(item_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let cart = state.services.carts.get_or_create(&identity).await?;
    let view = state.services.carts.remove_item(cart.id, item_id).await?;
    Ok(success_response(view))
}
