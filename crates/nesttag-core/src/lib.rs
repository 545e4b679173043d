/// NestTag Core - Shared library for the NestTag box service
///
/// This crate contains the models, bearer-token authentication, AWS-backed
/// services and utilities used by the API Lambda.
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::BoxError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
