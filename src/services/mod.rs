// src/services/mod.rs
pub mod todos;
pub mod user_context;

pub use todos::{PgTodoStore, TodoError, TodoStore};
pub use user_context::{PgUserContextStore, UserContext, UserContextStore};
