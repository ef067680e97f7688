use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    handlers::common::{success_response, PaginatedResponse, PaginationParams},
    AppState,
};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(storefront))
        .route("/categories", get(list_categories))
        .route("/categories/:slug", get(get_category))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

/// Front page: active categories plus available products.
async fn storefront(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let view = state.services.catalog.storefront().await?;
    Ok(success_response(view))
}

async fn list_categories(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success_response(categories))
}

async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ServiceError> {
    let detail = state.services.catalog.get_category_by_slug(&slug).await?;
    Ok(success_response(detail))
}

#[derive(Debug, Deserialize)]
struct ProductFilter {
    category_id: Option<Uuid>,
}

async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ProductFilter>,
) -> Result<Response, ServiceError> {
    let (products, total) = state
        .services
        .catalog
        .list_products(pagination.page, pagination.per_page, filter.category_id)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        products,
        total,
        &pagination,
    )))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let detail = state.services.catalog.get_product(id).await?;
    Ok(success_response(detail))
}
