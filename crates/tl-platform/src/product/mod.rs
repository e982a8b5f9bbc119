//! Product aggregate

pub mod api;
pub mod entity;
pub mod service;

pub use api::{products_router, ProductsState};
pub use entity::{NewProduct, Product, Rating};
pub use service::{ProductService, DEFAULT_COLLECTION};
