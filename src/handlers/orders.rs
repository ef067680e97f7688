use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::StaffCustomer,
    entities::OrderStatus,
    errors::ServiceError,
    handlers::common::{success_response, PaginatedResponse, PaginationParams},
    AppState,
};

/// Admin back-office order management.
pub fn admin_order_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/:id", get(get_order))
        .route("/admin/orders/:id/status", put(update_status))
        .route("/admin/orders/confirm", post(confirm_orders))
        .route("/admin/orders/cancel", post(cancel_orders))
}

#[derive(Debug, Deserialize)]
struct OrderFilter {
    status: Option<OrderStatus>,
}

async fn list_orders(
    State(state): State<AppState>,
    StaffCustomer(_staff): StaffCustomer,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<OrderFilter>,
) -> Result<Response, ServiceError> {
    let (orders, total) = state
        .services
        .orders
        .list_orders(pagination.page, pagination.per_page, filter.status)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        orders,
        total,
        &pagination,
    )))
}

async fn get_order(
    State(state): State<AppState>,
    StaffCustomer(_staff): StaffCustomer,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let detail = state.services.orders.get_order_detail(id).await?;
    Ok(success_response(detail))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: OrderStatus,
    admin_comment: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    StaffCustomer(_staff): StaffCustomer,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Response, ServiceError> {
    let order = state
        .services
        .orders
        .update_status(id, body.status, body.admin_comment)
        .await?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
struct BulkOrdersRequest {
    ids: Vec<Uuid>,
    #[serde(default)]
    admin_comment: Option<String>,
}

#[derive(Debug, Serialize)]
struct BulkOrdersResponse {
    transitioned: usize,
}

async fn confirm_orders(
    State(state): State<AppState>,
    StaffCustomer(_staff): StaffCustomer,
    Json(body): Json<BulkOrdersRequest>,
) -> Result<Response, ServiceError> {
    let comment = body
        .admin_comment
        .unwrap_or_else(|| "Подтверждено массово через админку".to_string());
    let transitioned = state
        .services
        .orders
        .confirm_orders(&body.ids, &comment)
        .await?;
    Ok(success_response(BulkOrdersResponse { transitioned }))
}

async fn cancel_orders(
    State(state): State<AppState>,
    StaffCustomer(_staff): StaffCustomer,
    Json(body): Json<BulkOrdersRequest>,
) -> Result<Response, ServiceError> {
    let comment = body
        .admin_comment
        .unwrap_or_else(|| "Отменено массово через админку".to_string());
    let transitioned = state
        .services
        .orders
        .cancel_orders(&body.ids, &comment)
        .await?;
    Ok(success_response(BulkOrdersResponse { transitioned }))
}
