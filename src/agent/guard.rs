// src/agent/guard.rs
//
// Stateless per-call authorization. Runs before the executor for every tool
// call the model requests. Denials are logged with the argument key set only,
// never raw values.

use serde_json::Value;

use super::catalog::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    ValidationError,
    SecurityViolation,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::ValidationError => "validation_error",
            ViolationKind::SecurityViolation => "security_violation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Denial {
    pub kind: ViolationKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizationGuard;

impl AuthorizationGuard {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `acting_user_id` may run `tool_name` with `args`.
    /// Rules are evaluated in order; the first failure wins.
    pub fn authorize(
        &self,
        tool_name: &str,
        acting_user_id: i32,
        args: &Value,
    ) -> Result<ToolKind, Denial> {
        if acting_user_id <= 0 {
            let denial = Denial {
                kind: ViolationKind::ValidationError,
                reason: "invalid acting user id".to_string(),
            };
            self.log_denial(tool_name, acting_user_id, args, &denial);
            return Err(denial);
        }

        // The model is told to echo the acting user's id into every call. A
        // missing id is a malformed call; a mismatch means it tried to act on
        // someone else's data.
        match args.get("user_id") {
            None => {
                let denial = Denial {
                    kind: ViolationKind::ValidationError,
                    reason: "missing user_id argument".to_string(),
                };
                self.log_denial(tool_name, acting_user_id, args, &denial);
                return Err(denial);
            }
            Some(claimed) => {
                let matches = match claimed {
                    Value::String(s) => s.trim() == acting_user_id.to_string(),
                    Value::Number(n) => n.as_i64() == Some(acting_user_id as i64),
                    _ => false,
                };
                if !matches {
                    let denial = Denial {
                        kind: ViolationKind::SecurityViolation,
                        reason: "user_id argument does not match acting user".to_string(),
                    };
                    self.log_denial(tool_name, acting_user_id, args, &denial);
                    return Err(denial);
                }
            }
        }

        match ToolKind::from_name(tool_name) {
            Some(kind) => Ok(kind),
            None => {
                let denial = Denial {
                    kind: ViolationKind::SecurityViolation,
                    reason: format!("unknown tool '{}'", tool_name),
                };
                self.log_denial(tool_name, acting_user_id, args, &denial);
                Err(denial)
            }
        }
    }

    fn log_denial(&self, tool_name: &str, acting_user_id: i32, args: &Value, denial: &Denial) {
        let arg_keys: Vec<&str> = args
            .as_object()
            .map(|obj| obj.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default();
        let user_prefix: String = acting_user_id.to_string().chars().take(8).collect();

        match denial.kind {
            ViolationKind::SecurityViolation => {
                tracing::warn!(
                    tool = tool_name,
                    user_prefix = %user_prefix,
                    violation = denial.kind.as_str(),
                    arg_keys = ?arg_keys,
                    "tool call denied: {}",
                    denial.reason
                );
            }
            ViolationKind::ValidationError => {
                tracing::info!(
                    tool = tool_name,
                    user_prefix = %user_prefix,
                    violation = denial.kind.as_str(),
                    arg_keys = ?arg_keys,
                    "tool call rejected: {}",
                    denial.reason
                );
            }
        }
    }
}
