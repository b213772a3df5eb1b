// src/handlers/mod.rs
pub mod assistant;
pub mod auth;
pub mod todos;

pub use assistant::assistant_routes;
pub use auth::auth_routes;
pub use todos::todo_routes;
