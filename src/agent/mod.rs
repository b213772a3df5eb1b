// src/agent/mod.rs
pub mod catalog;
pub mod context;
pub mod executor;
pub mod fallback;
pub mod guard;
pub mod orchestrator;

pub use catalog::{tool_definitions, ToolKind};
pub use executor::{ToolExecutor, ToolOutcome};
pub use fallback::{DegradedCause, FallbackResponder};
pub use guard::{AuthorizationGuard, Denial, ViolationKind};
pub use orchestrator::{AgentOrchestrator, TurnError, TurnOutcome};
