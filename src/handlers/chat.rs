use axum::{
    extract::{Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::CurrentCustomer,
    errors::ServiceError,
    handlers::common::{created_response, success_response, PaginatedResponse, PaginationParams},
    AppState,
};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/messages", get(list_messages).post(post_message))
        .route("/chat/messages/read", post(mark_read))
}

async fn list_messages(
    State(state): State<AppState>,
    CurrentCustomer(customer): CurrentCustomer,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let (messages, total) = state
        .services
        .chat
        .list_messages(customer.id, pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        messages,
        total,
        &pagination,
    )))
}

#[derive(Debug, Deserialize)]
struct PostMessageRequest {
    text: String,
}

async fn post_message(
    State(state): State<AppState>,
    CurrentCustomer(customer): CurrentCustomer,
    Json(body): Json<PostMessageRequest>,
) -> Result<Response, ServiceError> {
    let message = state
        .services
        .chat
        .post_message(customer.id, &body.text)
        .await?;
    Ok(created_response(message))
}

#[derive(Debug, Deserialize)]
struct MarkReadRequest {
    ids: Vec<Uuid>,
}

async fn mark_read(
    State(state): State<AppState>,
    CurrentCustomer(_customer): CurrentCustomer,
    Json(body): Json<MarkReadRequest>,
) -> Result<Response, ServiceError> {
    let updated = state.services.chat.mark_read(&body.ids).await?;
    Ok(success_response(serde_json::json!({ "updated": updated })))
}
