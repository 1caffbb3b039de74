use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use catalog_products::ProductInput;

use crate::app::dto::CategoryQuery;
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products_by_category))
        .route(
            "/:id",
            get(get_product).patch(update_product).delete(disable_product),
        )
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.products.create_product(body).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.products.find_product_by_id(id).await {
        Ok(Some(view)) => (StatusCode::OK, Json(view)).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("product {id} not found"),
        ),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_products_by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<CategoryQuery>,
) -> axum::response::Response {
    let Some(category) = query.category else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "missing_category",
            "category query parameter is required",
        );
    };

    match services.products.find_products_by_category(&category).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> axum::response::Response {
    let id = match errors::parse_product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.products.update_product(id, body).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn disable_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.products.disable_product(id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
