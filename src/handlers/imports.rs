use axum::{
    extract::{Multipart, State},
    response::Response,
    routing::post,
    Router,
};

use crate::{
    auth::StaffCustomer, errors::ServiceError, handlers::common::success_response, AppState,
};

pub fn admin_import_routes() -> Router<AppState> {
    Router::new().route("/admin/products/import", post(import_products))
}

/// Accepts a multipart spreadsheet upload and runs the import pipeline.
/// The first field carrying a filename is treated as the workbook.
async fn import_products(
    State(state): State<AppState>,
    StaffCustomer(_staff): StaffCustomer,
    mut multipart: Multipart,
) -> Result<Response, ServiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ValidationError(format!("invalid multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::ValidationError(format!("upload read failed: {e}")))?;

        let outcome = state
            .services
            .import
            .import_products(&filename, bytes.to_vec())
            .await?;
        return Ok(success_response(outcome));
    }

    Err(ServiceError::ValidationError(
        "no file found in the upload".to_string(),
    ))
}
