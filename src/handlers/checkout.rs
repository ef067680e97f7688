use axum::{extract::State, response::Response, routing::post, Json, Router};

use crate::{
    auth::CurrentCustomer,
    errors::ServiceError,
    handlers::common::created_response,
    services::{carts::CartIdentity, checkout::CheckoutInput},
    AppState,
};

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/checkout", post(checkout))
}

/// Converts the customer's cart into an order.
///
/// An authenticated customer checks out their own cart; the anonymous
/// session cart is not used here since an order always needs an account.
async fn checkout(
    State(state): State<AppState>,
    CurrentCustomer(customer): CurrentCustomer,
    Json(input): Json<CheckoutInput>,
) -> Result<Response, ServiceError> {
    let identity = CartIdentity::Customer(customer.id);
    let order = state
        .services
        .checkout
        .checkout(&identity, customer.id, input)
        .await?;
    Ok(created_response(order))
}
