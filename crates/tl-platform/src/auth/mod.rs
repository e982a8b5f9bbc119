//! Authentication: token issuance and verification, admin login.

pub mod auth_api;
pub mod auth_service;
pub mod token_service;

pub use auth_api::{auth_router, AuthState};
pub use auth_service::{AdminCredentials, AuthService, LoginData, UserInfo, ADMIN_ROLE};
pub use token_service::{
    IdentityClaims, Principal, TokenError, TokenService, DEFAULT_TOKEN_TTL, TOKEN_ISSUER,
};
