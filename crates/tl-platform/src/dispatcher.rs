//! Request Dispatcher
//!
//! Assembles the HTTP surface: route table, not-found fallback, panic
//! recovery, error translation, request tracing and CORS.
//!
//! Layer order, innermost first:
//! 1. `CatchPanicLayer` turns a handler panic into an internal error
//! 2. [`translate_errors`] renders any [`AppError`] under the run-mode policy
//! 3. `TraceLayer` logs each request and response
//! 4. `CorsLayer` answers preflights and decorates responses

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as AnyOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, error, warn, Level};

use crate::auth::{auth_router, AuthService, AuthState, TokenService};
use crate::product::{products_router, ProductService, ProductsState};
use crate::shared::error::{AppError, ErrorKind, ErrorPolicy};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Services shared by every request, built once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub tokens: Arc<TokenService>,
    pub auth: Arc<AuthService>,
    pub products: Arc<ProductService>,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub error_policy: ErrorPolicy,
    pub cors_origins: Vec<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::production(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Clone)]
struct HealthState {
    storage: &'static str,
}

pub fn build_router(services: AppServices, config: &DispatcherConfig) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health))
        .with_state(HealthState {
            storage: services.products.backend(),
        });

    let auth_routes = auth_router(AuthState {
        auth_service: services.auth.clone(),
        tokens: services.tokens.clone(),
    });

    let product_routes = products_router(ProductsState {
        products: services.products.clone(),
        tokens: services.tokens.clone(),
    });

    Router::new()
        .route("/", get(index))
        .merge(health_routes)
        .merge(auth_routes)
        .merge(product_routes)
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(
            config.error_policy,
            translate_errors,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&config.cors_origins))
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "API de Productos - TechLab",
        "version": API_VERSION,
        "endpoints": {
            "auth": {
                "login": "POST /auth/login",
                "verify": "GET /auth/verify"
            },
            "products": {
                "getAll": "GET /api/products",
                "getById": "GET /api/products/{id}",
                "create": "POST /api/products/create",
                "delete": "DELETE /api/products/{id}"
            }
        }
    }))
}

async fn health(State(state): State<HealthState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "UP",
        "version": API_VERSION,
        "storage": state.storage
    }))
}

async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::route_not_found(method.as_str(), uri.path())
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::internal_with_detail("Error interno del servidor", format!("handler panicked: {}", detail))
        .into_response()
}

/// Final error stage: the only place an [`AppError`] becomes a response body.
pub async fn translate_errors(
    State(policy): State<ErrorPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    let Some(err) = response.extensions_mut().remove::<AppError>() else {
        return response;
    };

    match err.kind() {
        ErrorKind::Internal => error!(
            %method, %path, error = %err, detail = err.detail().unwrap_or(""),
            "Request failed"
        ),
        ErrorKind::AuthMissing | ErrorKind::AuthInvalid | ErrorKind::AuthExpired => {
            warn!(%method, %path, error = %err, "Authentication rejected")
        }
        _ => debug!(%method, %path, error = %err, "Request rejected"),
    }

    err.render(policy)
}

/// `*` (or an empty list) allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AnyOrigin);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
