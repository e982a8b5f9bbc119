//! API Middleware
//!
//! Bearer token authentication for Axum handlers. A handler that takes
//! [`Authenticated`] only runs once the request carried a valid token; the
//! verified [`Principal`] is handed to it by value.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderValue},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::error::AppError;
use crate::auth::token_service::{Principal, TokenService};

/// Authenticated user extractor
pub struct Authenticated(pub Principal);

impl std::ops::Deref for Authenticated {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Split `Bearer <token>` into its token. Anything but exactly two
/// space-separated parts with the literal scheme `Bearer` is rejected.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token),
        _ => None,
    }
}

/// Decide whether a request's `Authorization` header admits it.
pub fn authenticate(
    header: Option<&HeaderValue>,
    tokens: &TokenService,
    now: DateTime<Utc>,
) -> Result<Principal, AppError> {
    let header = match header {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AppError::auth_missing()),
    };

    let value = header
        .to_str()
        .map_err(|_| AppError::malformed_authorization())?;
    let token = parse_bearer(value).ok_or_else(AppError::malformed_authorization)?;

    Ok(tokens.verify_at(token, now)?)
}

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);
        authenticate(parts.headers.get(AUTHORIZATION), &tokens, Utc::now()).map(Authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_service::{IdentityClaims, DEFAULT_TOKEN_TTL};
    use crate::shared::error::ErrorKind;

    fn tokens() -> TokenService {
        TokenService::new(Some("middleware-secret"), DEFAULT_TOKEN_TTL)
    }

    fn kind_of(header: Option<&str>, tokens: &TokenService) -> std::result::Result<Principal, ErrorKind> {
        let value = header.map(|h| HeaderValue::from_str(h).unwrap());
        authenticate(value.as_ref(), tokens, Utc::now()).map_err(|e| e.kind())
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("Bearer "), Some(""));
        assert_eq!(parse_bearer("bearer abc"), None);
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("Bearer a b"), None);
        assert_eq!(parse_bearer("Bearer  abc"), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("abc"), None);
    }

    #[test]
    fn test_missing_header() {
        let tokens = tokens();
        assert_eq!(kind_of(None, &tokens), Err(ErrorKind::AuthMissing));
        assert_eq!(kind_of(Some(""), &tokens), Err(ErrorKind::AuthMissing));
    }

    #[test]
    fn test_malformed_header() {
        let tokens = tokens();
        for header in ["Token abc", "Bearer", "Bearer a b", "abc"] {
            assert_eq!(kind_of(Some(header), &tokens), Err(ErrorKind::AuthInvalid), "{header}");
        }

        let err = authenticate(Some(&HeaderValue::from_static("Basic x")), &tokens, Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "El formato del token debe ser: Bearer [token]");
    }

    #[test]
    fn test_non_ascii_header_is_invalid() {
        let tokens = tokens();
        let value = HeaderValue::from_bytes("Bearer tökén".as_bytes()).unwrap();
        let err = authenticate(Some(&value), &tokens, Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthInvalid);
    }

    #[test]
    fn test_bad_and_empty_tokens() {
        let tokens = tokens();
        assert_eq!(kind_of(Some("Bearer not.a.token"), &tokens), Err(ErrorKind::AuthInvalid));
        assert_eq!(kind_of(Some("Bearer "), &tokens), Err(ErrorKind::AuthInvalid));
    }

    #[test]
    fn test_expired_token() {
        let tokens = tokens();
        let issued = Utc::now() - chrono::Duration::hours(25);
        let token = tokens
            .issue_at(&IdentityClaims::new("admin@techlab.com", "admin"), None, issued)
            .unwrap();

        let header = format!("Bearer {}", token);
        assert_eq!(kind_of(Some(&header), &tokens), Err(ErrorKind::AuthExpired));
    }

    #[test]
    fn test_valid_token() {
        let tokens = tokens();
        let token = tokens
            .issue(&IdentityClaims::new("admin@techlab.com", "admin"), None)
            .unwrap();

        let principal = kind_of(Some(&format!("Bearer {}", token)), &tokens).unwrap();
        assert_eq!(principal.email, "admin@techlab.com");
    }
}
