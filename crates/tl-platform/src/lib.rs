//! TechLab Platform
//!
//! Products API behind bearer-token authentication:
//! - Token issuance and verification (HS256)
//! - Admin credential login
//! - Product catalog over a pluggable document store
//! - A closed error taxonomy rendered in one place
//!
//! ## Module Organization
//!
//! - `auth` - tokens, login, and the auth endpoints
//! - `product` - entity, service and REST endpoints
//! - `store` - the `DocumentStore` seam and its backends
//! - `shared` - errors, response envelopes, the auth extractor
//! - `dispatcher` - router assembly and the error translation stage

pub mod auth;
pub mod dispatcher;
pub mod product;
pub mod shared;
pub mod store;

pub use shared::error::{AppError, ErrorKind, ErrorPolicy, Result};
pub use shared::middleware::Authenticated;

pub use auth::{
    AdminCredentials, AuthService, IdentityClaims, Principal, TokenError, TokenService,
};
pub use dispatcher::{build_router, AppServices, DispatcherConfig};
pub use product::{NewProduct, Product, ProductService, Rating};
pub use store::{
    Document, DocumentStore, MemoryDocumentStore, MongoDocumentStore, StoreError, StoreResult,
    UnavailableStore,
};
