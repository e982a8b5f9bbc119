//! Products API
//!
//! Every route requires a bearer token carrying the admin role.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRef, Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use super::entity::Product;
use super::service::ProductService;
use crate::auth::{TokenService, ADMIN_ROLE};
use crate::shared::api_common::{json_body, path_param, ApiResponse};
use crate::shared::error::AppError;
use crate::shared::middleware::Authenticated;

#[derive(Clone)]
pub struct ProductsState {
    pub products: Arc<ProductService>,
    pub tokens: Arc<TokenService>,
}

impl FromRef<ProductsState> for Arc<TokenService> {
    fn from_ref(state: &ProductsState) -> Self {
        state.tokens.clone()
    }
}

async fn list_products(
    State(state): State<ProductsState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<Product>>>, AppError> {
    auth.require_role(ADMIN_ROLE)?;
    let products = state.products.list().await?;
    Ok(Json(ApiResponse::list(products)))
}

async fn get_product(
    State(state): State<ProductsState>,
    auth: Authenticated,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    auth.require_role(ADMIN_ROLE)?;
    let id = path_param(id)?;
    let product = state.products.get_by_id(&id).await?;
    Ok(Json(ApiResponse::data(product)))
}

async fn create_product(
    State(state): State<ProductsState>,
    auth: Authenticated,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), AppError> {
    auth.require_role(ADMIN_ROLE)?;
    let input = json_body(body)?;
    let product = state.products.create(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(product).with_message("Producto creado exitosamente")),
    ))
}

async fn delete_product(
    State(state): State<ProductsState>,
    auth: Authenticated,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    auth.require_role(ADMIN_ROLE)?;
    let id = path_param(id)?;
    state.products.delete(&id).await?;
    Ok(Json(ApiResponse::message(format!(
        "Producto con ID {} eliminado exitosamente",
        id
    ))))
}

pub fn products_router(state: ProductsState) -> Router {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/create", post(create_product))
        .route("/api/products/{id}", get(get_product).delete(delete_product))
        .with_state(state)
}
