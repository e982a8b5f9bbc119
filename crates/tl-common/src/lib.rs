//! Shared infrastructure for TechLab services.

pub mod logging;

pub use logging::{init_logging, LogFormat};
