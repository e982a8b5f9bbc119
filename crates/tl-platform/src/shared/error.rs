//! Platform Error Types
//!
//! Every failure in the platform is an [`AppError`]. Each variant belongs to
//! exactly one [`ErrorKind`], and the kind fixes the HTTP status and the
//! `error` label of the JSON body. Rendering happens in
//! [`crate::dispatcher::translate_errors`]; `IntoResponse` only produces a
//! production-safe fallback and hands the error value along in the response
//! extensions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

/// Shown instead of the real message for internal failures outside dev mode.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Ha ocurrido un error inesperado";

/// The closed set of failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ValidationError,
    AuthMissing,
    AuthInvalid,
    AuthExpired,
    Forbidden,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::AuthMissing | ErrorKind::AuthInvalid | ErrorKind::AuthExpired => {
                StatusCode::UNAUTHORIZED
            }
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "Error de validación",
            ErrorKind::AuthMissing => "Acceso denegado",
            ErrorKind::AuthInvalid => "Token inválido",
            ErrorKind::AuthExpired => "Token expirado",
            ErrorKind::Forbidden => "Acceso prohibido",
            ErrorKind::NotFound => "Recurso no encontrado",
            ErrorKind::Internal => "Error interno del servidor",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, fields: Vec<String> },

    #[error("{message}")]
    AuthMissing { message: String },

    #[error("{message}")]
    AuthInvalid { message: String },

    #[error("Credenciales inválidas")]
    InvalidCredentials,

    #[error("El token ha expirado. Por favor, inicie sesión nuevamente")]
    TokenExpired,

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("La ruta {method} {path} no existe")]
    RouteNotFound { method: String, path: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// `detail` carries the underlying cause and is only rendered in dev mode.
    #[error("{message}")]
    Internal { message: String, detail: Option<String> },
}

impl AppError {
    pub fn validation(message: impl Into<String>, fields: Vec<String>) -> Self {
        Self::Validation { message: message.into(), fields }
    }

    pub fn auth_missing() -> Self {
        Self::AuthMissing {
            message: "No se proporcionó token de autenticación".to_string(),
        }
    }

    pub fn malformed_authorization() -> Self {
        Self::AuthInvalid {
            message: "El formato del token debe ser: Bearer [token]".to_string(),
        }
    }

    pub fn invalid_token() -> Self {
        Self::AuthInvalid {
            message: "El token proporcionado no es válido".to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn route_not_found(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::RouteNotFound {
            method: method.into(),
            path: path.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            detail: None,
        }
    }

    /// Wrap an unclassified failure, keeping its text as dev-only detail.
    pub fn internal_with_detail(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Internal {
            message: message.into(),
            detail: Some(cause.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::ValidationError,
            AppError::AuthMissing { .. } => ErrorKind::AuthMissing,
            AppError::AuthInvalid { .. } | AppError::InvalidCredentials => ErrorKind::AuthInvalid,
            AppError::TokenExpired => ErrorKind::AuthExpired,
            AppError::Forbidden { .. } => ErrorKind::Forbidden,
            AppError::NotFound { .. } | AppError::RouteNotFound { .. } => ErrorKind::NotFound,
            AppError::Configuration { .. } | AppError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    /// Value of the `error` field in the response body.
    pub fn label(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "No autorizado",
            AppError::RouteNotFound { .. } => "Route not found",
            other => other.kind().label(),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            AppError::Internal { detail, .. } => detail.as_deref(),
            AppError::Configuration { message } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn render(&self, policy: ErrorPolicy) -> Response {
        let internal = self.kind() == ErrorKind::Internal;

        let message = if internal && !policy.expose_details {
            GENERIC_INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let detail = if policy.expose_details {
            self.detail().map(String::from)
        } else {
            None
        };

        let fields = match self {
            AppError::Validation { fields, .. } => fields.clone(),
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            error: self.label().to_string(),
            message,
            timestamp: Utc::now().to_rfc3339(),
            fields,
            detail,
        };

        (self.status(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// How much of an error the caller is allowed to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub expose_details: bool,
}

impl ErrorPolicy {
    pub fn production() -> Self {
        Self { expose_details: false }
    }

    pub fn development() -> Self {
        Self { expose_details: true }
    }

    pub fn for_dev_mode(dev_mode: bool) -> Self {
        Self { expose_details: dev_mode }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = self.render(ErrorPolicy::production());
        response.extensions_mut().insert(self);
        response
    }
}
