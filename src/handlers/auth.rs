use axum::{
    extract::{Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentCustomer,
    entities::CustomerModel,
    errors::ServiceError,
    handlers::common::{created_response, success_response, PaginatedResponse, PaginationParams},
    services::customers::RegisterInput,
    AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/me", get(profile))
        .route("/me/orders", get(order_history))
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    customer: CustomerModel,
    token: String,
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<Response, ServiceError> {
    let customer = state.services.customers.register(input).await?;
    let token = state.auth.issue_token(&customer)?;
    Ok(created_response(AuthResponse { customer, token }))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ServiceError> {
    let (customer, token) = state
        .services
        .customers
        .login(&body.email, &body.password)
        .await?;
    Ok(success_response(AuthResponse { customer, token }))
}

async fn profile(CurrentCustomer(customer): CurrentCustomer) -> Response {
    success_response(customer)
}

async fn order_history(
    State(state): State<AppState>,
    CurrentCustomer(customer): CurrentCustomer,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let (orders, total) = state
        .services
        .orders
        .list_orders_for_customer(customer.id, pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        orders,
        total,
        &pagination,
    )))
}
