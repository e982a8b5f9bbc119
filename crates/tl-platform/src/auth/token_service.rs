//! Token Service
//!
//! HS256 identity tokens signed with a server-held secret.
//!
//! Expiry is checked here rather than by `jsonwebtoken` so that the clock
//! can be injected (`issue_at` / `verify_at`) and the boundary is exact: a
//! token is expired once `now >= exp`, with no leeway. There is no
//! revocation; a token stays valid until it expires.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tl_config::{AuthConfig, ConfigError};

use crate::shared::error::AppError;

pub const TOKEN_ISSUER: &str = "techlab";
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("no token signing secret is configured")]
    MissingSecret,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret => AppError::configuration(err.to_string()),
            TokenError::Invalid(_) => AppError::invalid_token(),
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Signing(cause) => {
                AppError::internal_with_detail("No se pudo generar el token", cause)
            }
        }
    }
}

/// The caller-supplied part of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: String,
    pub role: String,
}

impl IdentityClaims {
    pub fn new(email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: role.into(),
        }
    }
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub role: String,
    /// Issuance time in milliseconds
    pub timestamp: i64,
    pub iat: i64,
    pub exp: i64,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    pub fn require_role(&self, role: &str) -> Result<(), AppError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AppError::forbidden("No tiene permisos para realizar esta acción"))
        }
    }
}

/// Wire form of the token payload.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    email: String,
    role: String,
    timestamp: i64,
    iat: i64,
    exp: i64,
    iss: String,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

pub struct TokenService {
    keys: Option<SigningKeys>,
    ttl: Duration,
}

impl TokenService {
    /// A blank or absent secret yields a service whose every call fails
    /// with [`TokenError::MissingSecret`].
    pub fn new(secret: Option<&str>, ttl: Duration) -> Self {
        let keys = secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| SigningKeys {
                encoding: EncodingKey::from_secret(s.as_bytes()),
                decoding: DecodingKey::from_secret(s.as_bytes()),
            });
        Self { keys, ttl }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.jwt_secret(), config.token_ttl()?))
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, claims: &IdentityClaims, ttl: Option<Duration>) -> Result<String, TokenError> {
        self.issue_at(claims, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        claims: &IdentityClaims,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingSecret)?;
        let ttl_secs = i64::try_from(ttl.unwrap_or(self.ttl).as_secs())
            .map_err(|_| TokenError::Signing("token lifetime out of range".to_string()))?;

        let iat = now.timestamp();
        let payload = TokenClaims {
            email: claims.email.clone(),
            role: claims.role.clone(),
            timestamp: now.timestamp_millis(),
            iat,
            exp: iat.saturating_add(ttl_secs),
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &payload, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingSecret)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        let claims = decode::<TokenClaims>(token, &keys.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(Principal {
            email: claims.email,
            role: claims.role,
            timestamp: claims.timestamp,
            iat: claims.iat,
            exp: claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "test-secret";

    fn service() -> TokenService {
        TokenService::new(Some(SECRET), DEFAULT_TOKEN_TTL)
    }

    fn admin() -> IdentityClaims {
        IdentityClaims::new("admin@techlab.com", "admin")
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service();
        let now = at(1_700_000_000);
        let token = tokens.issue_at(&admin(), None, now).unwrap();

        let principal = tokens.verify_at(&token, now).unwrap();
        assert_eq!(principal.email, "admin@techlab.com");
        assert_eq!(principal.role, "admin");
        assert_eq!(principal.iat, 1_700_000_000);
        assert_eq!(principal.exp, 1_700_000_000 + 86_400);
        assert_eq!(principal.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_expiry_boundary() {
        let tokens = service();
        let issued = at(1_700_000_000);
        let token = tokens
            .issue_at(&admin(), Some(Duration::from_secs(60)), issued)
            .unwrap();

        assert!(tokens.verify_at(&token, at(1_700_000_059)).is_ok());
        assert_eq!(tokens.verify_at(&token, at(1_700_000_060)), Err(TokenError::Expired));
        assert_eq!(tokens.verify_at(&token, at(1_800_000_000)), Err(TokenError::Expired));
    }

    #[test]
    fn test_default_ttl_applies() {
        let tokens = TokenService::new(Some(SECRET), Duration::from_secs(30));
        let token = tokens.issue_at(&admin(), None, at(1_000)).unwrap();
        assert_eq!(tokens.verify_at(&token, at(1_000)).unwrap().exp, 1_030);
    }

    #[test]
    fn test_foreign_secret_is_invalid() {
        let other = TokenService::new(Some("another-secret"), DEFAULT_TOKEN_TTL);
        let token = other.issue(&admin(), None).unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let tokens = service();
        let token = tokens.issue(&admin(), None).unwrap();
        let forged_payload = tokens
            .issue(&IdentityClaims::new("intruder@techlab.com", "admin"), None)
            .unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let forged: Vec<&str> = forged_payload.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged[1], parts[2]);

        assert!(matches!(tokens.verify(&tampered), Err(TokenError::Invalid(_))));
        assert!(matches!(tokens.verify("not-a-token"), Err(TokenError::Invalid(_))));
        assert!(matches!(tokens.verify(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let payload = TokenClaims {
            email: "admin@techlab.com".to_string(),
            role: "admin".to_string(),
            timestamp: 0,
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
            iss: "someone-else".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_missing_secret() {
        let tokens = TokenService::new(Some("  "), DEFAULT_TOKEN_TTL);
        assert!(!tokens.is_configured());
        assert_eq!(tokens.ttl(), DEFAULT_TOKEN_TTL);
        assert_eq!(tokens.issue(&admin(), None), Err(TokenError::MissingSecret));
        assert_eq!(tokens.verify("x.y.z"), Err(TokenError::MissingSecret));
    }

    #[test]
    fn test_token_errors_classify() {
        use crate::shared::error::ErrorKind;

        assert_eq!(AppError::from(TokenError::Expired).kind(), ErrorKind::AuthExpired);
        assert_eq!(AppError::from(TokenError::Invalid("x".into())).kind(), ErrorKind::AuthInvalid);
        assert_eq!(AppError::from(TokenError::MissingSecret).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_require_role() {
        let principal = Principal {
            email: "viewer@techlab.com".to_string(),
            role: "viewer".to_string(),
            timestamp: 0,
            iat: 0,
            exp: 1,
        };
        assert!(principal.require_role("viewer").is_ok());
        assert!(matches!(
            principal.require_role("admin"),
            Err(AppError::Forbidden { .. })
        ));
    }
}
