//! Auth API Endpoints
//!
//! - POST /auth/login - Credential login, returns a bearer token
//! - GET /auth/verify - Echo the identity carried by a valid token

use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use super::auth_service::{AuthService, LoginData};
use super::token_service::{Principal, TokenService};
use crate::shared::api_common::{json_body, ApiResponse};
use crate::shared::error::AppError;
use crate::shared::middleware::Authenticated;

#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<AuthService>,
    pub tokens: Arc<TokenService>,
}

impl FromRef<AuthState> for Arc<TokenService> {
    fn from_ref(state: &AuthState) -> Self {
        state.tokens.clone()
    }
}

async fn login(
    State(state): State<AuthState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginData>>, AppError> {
    let body = json_body(body)?;
    let email = body.get("email").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);

    let data = state.auth_service.login(email, password)?;
    Ok(Json(ApiResponse::data(data).with_message("Autenticación exitosa")))
}

async fn verify(Authenticated(principal): Authenticated) -> Json<ApiResponse<Principal>> {
    Json(ApiResponse::data(principal).with_message("Token válido"))
}

pub fn auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify))
        .with_state(state)
}
