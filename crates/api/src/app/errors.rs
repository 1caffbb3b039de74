use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use catalog_core::ProductId;
use catalog_products::CatalogError;

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::NotFound(id) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("product {id} not found"),
        ),
        CatalogError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        CatalogError::DataIntegrity(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "data_integrity_error", msg)
        }
        CatalogError::Storage(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Malformed, mistyped or non-JSON request bodies, keeping axum's status
/// (400, 415 or 422).
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(rejection.status(), "invalid_body", rejection.body_text())
}

pub fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse::<ProductId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}
