// src/middleware/mod.rs
pub mod auth;
pub mod logging;

pub use auth::auth_middleware;
pub use logging::request_logging_middleware;
