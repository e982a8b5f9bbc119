//! Authentication Service
//!
//! Credential login against the single configured administrator.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tl_config::AuthConfig;
use tracing::{info, warn};

use super::token_service::{IdentityClaims, TokenService};
use crate::shared::error::{AppError, Result};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Clone)]
pub struct AdminCredentials {
    email: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.admin_email.clone(), config.admin_password.clone())
    }

    /// Both fields are compared in full so timing does not reveal which
    /// one mismatched.
    fn matches(&self, email: &str, password: &str) -> bool {
        let email_ok = email.as_bytes().ct_eq(self.email.as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        (email_ok & password_ok).into()
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginData {
    pub token: String,
    pub user: UserInfo,
}

pub struct AuthService {
    tokens: Arc<TokenService>,
    admin: AdminCredentials,
}

impl AuthService {
    pub fn new(tokens: Arc<TokenService>, admin: AdminCredentials) -> Self {
        Self { tokens, admin }
    }

    pub fn login(&self, email: Option<&str>, password: Option<&str>) -> Result<LoginData> {
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        let password = password.filter(|p| !p.is_empty());

        let (email, password) = match (email, password) {
            (Some(email), Some(password)) => (email, password),
            (email, password) => {
                let missing = [("email", email.is_none()), ("password", password.is_none())]
                    .into_iter()
                    .filter(|(_, missing)| *missing)
                    .map(|(field, _)| field.to_string())
                    .collect();
                return Err(AppError::validation("Email y contraseña son requeridos", missing));
            }
        };

        if !self.admin.matches(email, password) {
            warn!(email = %email, "Rejected login attempt");
            return Err(AppError::InvalidCredentials);
        }

        let claims = IdentityClaims::new(email, ADMIN_ROLE);
        let token = self.tokens.issue(&claims, None)?;

        info!(email = %email, "Login succeeded");
        Ok(LoginData {
            token,
            user: UserInfo {
                email: claims.email,
                role: claims.role,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_service::DEFAULT_TOKEN_TTL;
    use crate::shared::error::ErrorKind;

    fn service_with(secret: Option<&str>) -> (AuthService, Arc<TokenService>) {
        let tokens = Arc::new(TokenService::new(secret, DEFAULT_TOKEN_TTL));
        let admin = AdminCredentials::new("admin@techlab.com", "admin123");
        (AuthService::new(tokens.clone(), admin), tokens)
    }

    #[test]
    fn test_login_issues_verifiable_token() {
        let (auth, tokens) = service_with(Some("secret"));
        let data = auth.login(Some("admin@techlab.com"), Some("admin123")).unwrap();

        assert_eq!(data.user.email, "admin@techlab.com");
        assert_eq!(data.user.role, "admin");
        let principal = tokens.verify(&data.token).unwrap();
        assert_eq!(principal.email, "admin@techlab.com");
    }

    #[test]
    fn test_login_requires_both_fields() {
        let (auth, _) = service_with(Some("secret"));

        match auth.login(None, Some("")) {
            Err(AppError::Validation { message, fields }) => {
                assert_eq!(message, "Email y contraseña son requeridos");
                assert_eq!(fields, vec!["email", "password"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            auth.login(Some("admin@techlab.com"), None),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_wrong_credentials() {
        let (auth, _) = service_with(Some("secret"));

        let err = auth.login(Some("admin@techlab.com"), Some("wrong")).unwrap_err();
        assert_eq!(err, AppError::InvalidCredentials);
        assert_eq!(err.label(), "No autorizado");
        assert!(auth.login(Some("other@techlab.com"), Some("admin123")).is_err());
        assert!(auth.login(Some("admin@techlab.co"), Some("admin1234")).is_err());
    }

    #[test]
    fn test_login_without_secret_is_configuration_error() {
        let (auth, _) = service_with(None);
        let err = auth.login(Some("admin@techlab.com"), Some("admin123")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_debug_redacts_password() {
        let admin = AdminCredentials::new("admin@techlab.com", "admin123");
        assert!(!format!("{:?}", admin).contains("admin123"));
    }
}
