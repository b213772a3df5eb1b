// src/agent/executor.rs
//
// Executes one authorized tool call against the todo persistence collaborator.
// Never raises to the orchestrator: every failure is folded into an
// error-shaped `ToolOutcome`. Each invocation, success or failure, writes
// exactly one audit row.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use super::catalog::ToolKind;
use crate::models::todo::{NewTodo, Priority, TodoFilter, TodoPatch};
use crate::services::todos::{TodoError, TodoStore};
use crate::services::user_context::UserContextStore;
use crate::storage::audit::{AuditSink, ToolExecutionLog, ToolStatus};

lazy_static! {
    // Defense in depth only; persistence is parameterized regardless.
    static ref SQL_CONTROL: Regex = Regex::new(
        r"(?i)(drop\s+table|truncate\s+table|delete\s+from|insert\s+into|union\s+select|alter\s+table|xp_cmdshell|;\s*--)"
    )
    .expect("sql control regex");
    static ref SPECIAL_RUN: Regex =
        Regex::new(r"[^\w\s]{5,}").expect("special run regex");
}

const GENERIC_FAILURE: &str = "Something went wrong while executing that action.";
const NOT_FOUND: &str = "Task not found.";

/// Uniform result shape for one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub tool_name: String,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl ToolOutcome {
    fn ok(tool_name: &str, data: Value) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(tool_name: &str, message: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Outcome for a call the guard refused. Nothing executed; the model is
    /// told only that the action was not permitted.
    pub fn denied(tool_name: &str, denial: super::guard::Denial) -> Self {
        Self::err(
            tool_name,
            format!("action not permitted: {}", denial.reason),
        )
    }

    pub fn to_json(&self) -> Value {
        match (&self.data, &self.error) {
            (Some(data), _) => json!({ "success": self.success, "data": data }),
            (None, Some(error)) => json!({ "success": false, "error": error }),
            (None, None) => json!({ "success": self.success }),
        }
    }
}

pub struct ToolExecutor {
    todos: Arc<dyn TodoStore>,
    user_context: Arc<dyn UserContextStore>,
    audit: Arc<dyn AuditSink>,
}

impl ToolExecutor {
    pub fn new(
        todos: Arc<dyn TodoStore>,
        user_context: Arc<dyn UserContextStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            todos,
            user_context,
            audit,
        }
    }

    /// Run one authorized tool call. `user_id` is the authenticated caller,
    /// already vetted by the guard; ownership is still re-checked here by
    /// scoping every lookup to `(id, user_id)`.
    pub async fn execute(
        &self,
        kind: ToolKind,
        user_id: i32,
        args: &Value,
        session_uuid: Option<&str>,
    ) -> ToolOutcome {
        let started = Instant::now();
        let outcome = self.dispatch(kind, user_id, args).await;
        let elapsed_ms = started.elapsed().as_millis() as i64;

        let entry = ToolExecutionLog {
            user_id,
            session_uuid: session_uuid.map(String::from),
            tool_name: kind.name().to_string(),
            parameters: redact_arguments(args),
            result: outcome.data.clone(),
            error_message: outcome.error.clone(),
            execution_time_ms: elapsed_ms,
            status: if outcome.success {
                ToolStatus::Success
            } else {
                ToolStatus::Error
            },
        };

        if let Err(e) = self.audit.record(entry).await {
            tracing::error!("Failed to write tool audit entry for {}: {}", kind.name(), e);
        }

        outcome
    }

    /// Record a call the guard refused. Nothing executes, but the attempt
    /// still lands in the audit trail, with status `cancelled`.
    pub async fn deny(
        &self,
        tool_name: &str,
        user_id: i32,
        args: &Value,
        session_uuid: Option<&str>,
        denial: super::guard::Denial,
    ) -> ToolOutcome {
        let outcome = ToolOutcome::denied(tool_name, denial);

        let entry = ToolExecutionLog {
            user_id,
            session_uuid: session_uuid.map(String::from),
            tool_name: tool_name.to_string(),
            parameters: redact_arguments(args),
            result: None,
            error_message: outcome.error.clone(),
            execution_time_ms: 0,
            status: ToolStatus::Cancelled,
        };

        if let Err(e) = self.audit.record(entry).await {
            tracing::error!("Failed to write tool audit entry for {}: {}", tool_name, e);
        }

        outcome
    }

    async fn dispatch(&self, kind: ToolKind, user_id: i32, args: &Value) -> ToolOutcome {
        let name = kind.name();
        match kind {
            ToolKind::ListTodos => self.list_todos(name, user_id, args).await,
            ToolKind::AddTodo => self.add_todo(name, user_id, args).await,
            ToolKind::UpdateTodo => self.update_todo(name, user_id, args).await,
            ToolKind::DeleteTodo => self.delete_todo(name, user_id, args).await,
            ToolKind::CreateReminder => self.create_reminder(name, user_id, args).await,
            ToolKind::AttachNote => self.attach_note(name, user_id, args).await,
            ToolKind::FetchUserContext => self.fetch_user_context(name, user_id).await,
        }
    }

    async fn list_todos(&self, name: &str, user_id: i32, args: &Value) -> ToolOutcome {
        let mut filter = TodoFilter {
            completed: args.get("completed").and_then(Value::as_bool),
            ..Default::default()
        };

        if let Some(raw) = optional_str(args, "priority") {
            match Priority::parse(raw) {
                Some(p) => filter.priority = Some(p.as_str().to_string()),
                None => return ToolOutcome::err(name, "priority must be low, medium, or high"),
            }
        }
        if let Some(raw) = optional_str(args, "search") {
            match sanitize_text(raw, 200) {
                Ok(search) if !search.is_empty() => filter.search = Some(search),
                Ok(_) => {}
                Err(e) => return ToolOutcome::err(name, e),
            }
        }

        match self.todos.list(user_id, filter).await {
            Ok(todos) => ToolOutcome::ok(
                name,
                json!({
                    "count": todos.len(),
                    "todos": todos.iter().map(|t| t.to_json()).collect::<Vec<_>>(),
                }),
            ),
            Err(e) => self.internal_error(name, e),
        }
    }

    async fn add_todo(&self, name: &str, user_id: i32, args: &Value) -> ToolOutcome {
        let title = match required_str(args, "title").and_then(|t| validate_title(t)) {
            Ok(title) => title,
            Err(e) => return ToolOutcome::err(name, e),
        };
        let description = match optional_str(args, "description")
            .map(validate_description)
            .transpose()
        {
            Ok(d) => d,
            Err(e) => return ToolOutcome::err(name, e),
        };
        let priority = match optional_str(args, "priority").map(validate_priority).transpose() {
            Ok(p) => p,
            Err(e) => return ToolOutcome::err(name, e),
        };
        let due_date = match optional_str(args, "due_date").map(parse_date).transpose() {
            Ok(d) => d,
            Err(e) => return ToolOutcome::err(name, e),
        };

        let new_todo = NewTodo {
            title,
            description,
            priority,
            due_date,
        };

        match self.todos.create(user_id, new_todo).await {
            Ok(todo) => ToolOutcome::ok(name, todo.to_json()),
            Err(e) => self.internal_error(name, e),
        }
    }

    async fn update_todo(&self, name: &str, user_id: i32, args: &Value) -> ToolOutcome {
        let todo_id = match required_id(args, "todo_id") {
            Ok(id) => id,
            Err(e) => return ToolOutcome::err(name, e),
        };

        let mut patch = TodoPatch {
            completed: args.get("completed").and_then(Value::as_bool),
            ..Default::default()
        };
        if let Some(raw) = optional_str(args, "title") {
            match validate_title(raw.to_string()) {
                Ok(t) => patch.title = Some(t),
                Err(e) => return ToolOutcome::err(name, e),
            }
        }
        if let Some(raw) = optional_str(args, "description") {
            match validate_description(raw) {
                Ok(d) => patch.description = Some(d),
                Err(e) => return ToolOutcome::err(name, e),
            }
        }
        if let Some(raw) = optional_str(args, "priority") {
            match validate_priority(raw) {
                Ok(p) => patch.priority = Some(p),
                Err(e) => return ToolOutcome::err(name, e),
            }
        }
        if let Some(raw) = optional_str(args, "due_date") {
            match parse_date(raw) {
                Ok(d) => patch.due_date = Some(d),
                Err(e) => return ToolOutcome::err(name, e),
            }
        }

        match self.todos.update(todo_id, user_id, patch).await {
            Ok(todo) => ToolOutcome::ok(name, todo.to_json()),
            Err(TodoError::NotFound) => ToolOutcome::err(name, NOT_FOUND),
            Err(e) => self.internal_error(name, e),
        }
    }

    async fn delete_todo(&self, name: &str, user_id: i32, args: &Value) -> ToolOutcome {
        let todo_id = match required_id(args, "todo_id") {
            Ok(id) => id,
            Err(e) => return ToolOutcome::err(name, e),
        };

        match self.todos.delete(todo_id, user_id).await {
            Ok(todo) => ToolOutcome::ok(name, json!({ "deleted": todo.to_json() })),
            Err(TodoError::NotFound) => ToolOutcome::err(name, NOT_FOUND),
            Err(e) => self.internal_error(name, e),
        }
    }

    async fn create_reminder(&self, name: &str, user_id: i32, args: &Value) -> ToolOutcome {
        let todo_id = match required_id(args, "todo_id") {
            Ok(id) => id,
            Err(e) => return ToolOutcome::err(name, e),
        };
        let remind_at = match required_str(args, "remind_at").and_then(|s| parse_date(&s)) {
            Ok(d) => d,
            Err(e) => return ToolOutcome::err(name, e),
        };

        match self.todos.create_reminder(todo_id, user_id, remind_at).await {
            Ok(reminder) => ToolOutcome::ok(
                name,
                json!({
                    "reminder_id": reminder.id,
                    "todo_id": reminder.todo_id,
                    "remind_at": reminder.remind_at.to_rfc3339(),
                }),
            ),
            Err(TodoError::NotFound) => ToolOutcome::err(name, NOT_FOUND),
            Err(e) => self.internal_error(name, e),
        }
    }

    async fn attach_note(&self, name: &str, user_id: i32, args: &Value) -> ToolOutcome {
        let todo_id = match required_id(args, "todo_id") {
            Ok(id) => id,
            Err(e) => return ToolOutcome::err(name, e),
        };
        let note = match required_str(args, "note").and_then(|n| {
            let note = sanitize_text(&n, 1000)?;
            if note.is_empty() {
                Err("note must not be empty".to_string())
            } else {
                Ok(note)
            }
        }) {
            Ok(n) => n,
            Err(e) => return ToolOutcome::err(name, e),
        };

        match self.todos.attach_note(todo_id, user_id, note).await {
            Ok(todo) => ToolOutcome::ok(name, todo.to_json()),
            Err(TodoError::NotFound) => ToolOutcome::err(name, NOT_FOUND),
            Err(e) => self.internal_error(name, e),
        }
    }

    async fn fetch_user_context(&self, name: &str, user_id: i32) -> ToolOutcome {
        match self.user_context.get_or_default(user_id).await {
            Ok(ctx) => ToolOutcome::ok(
                name,
                json!({
                    "preferred_style": ctx.preferred_style,
                    "language": ctx.language,
                    "temperature_preference": ctx.temperature_preference,
                    "interaction_count": ctx.interaction_count,
                }),
            ),
            Err(e) => {
                tracing::error!("fetch_user_context failed for user {}: {}", user_id, e);
                ToolOutcome::err(name, GENERIC_FAILURE)
            }
        }
    }

    fn internal_error(&self, name: &str, error: TodoError) -> ToolOutcome {
        // Real cause stays in the logs; the caller sees a generic message.
        tracing::error!("Tool {} failed internally: {}", name, error);
        ToolOutcome::err(name, GENERIC_FAILURE)
    }
}

/// Trim free text and reject inputs that look like dangerous payloads.
/// Limits count characters, not bytes.
fn sanitize_text(raw: &str, max_len: usize) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > max_len {
        return Err(format!("text too long (max {} characters)", max_len));
    }
    if SQL_CONTROL.is_match(trimmed) {
        return Err("text contains a disallowed pattern".to_string());
    }
    if SPECIAL_RUN.is_match(trimmed) {
        return Err("text contains a disallowed character sequence".to_string());
    }
    Ok(trimmed.to_string())
}

fn validate_title(raw: String) -> Result<String, String> {
    let title = sanitize_text(&raw, 200)?;
    if title.is_empty() {
        return Err("title must be between 1 and 200 characters".to_string());
    }
    Ok(title)
}

fn validate_description(raw: &str) -> Result<String, String> {
    sanitize_text(raw, 1000)
}

fn validate_priority(raw: &str) -> Result<String, String> {
    Priority::parse(raw)
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| "priority must be low, medium, or high".to_string())
}

fn parse_date(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, String> {
    chrono::DateTime::parse_from_rfc3339(raw.trim())
        .map(|d| d.with_timezone(&chrono::Utc))
        .map_err(|_| format!("'{}' is not a valid ISO-8601 date", raw.trim()))
}

fn required_str(args: &Value, key: &str) -> Result<String, String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| format!("missing required argument '{}'", key))
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn required_id(args: &Value, key: &str) -> Result<i32, String> {
    let value = args
        .get(key)
        .ok_or_else(|| format!("missing required argument '{}'", key))?;
    match value {
        Value::Number(n) => n.as_i64().map(|v| v as i32),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
    .ok_or_else(|| format!("'{}' must be a numeric id", key))
}

/// Argument keys with string values blanked; scalars pass through. Raw free
/// text never reaches the audit table.
fn redact_arguments(args: &Value) -> Value {
    match args.as_object() {
        Some(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| {
                    let redacted = match v {
                        Value::String(_) => Value::String("[redacted]".to_string()),
                        other => other.clone(),
                    };
                    (k.clone(), redacted)
                })
                .collect(),
        ),
        None => json!({}),
    }
}

#[cfg(test)]
pub(crate) fn test_outcome(success: bool) -> ToolOutcome {
    if success {
        ToolOutcome::ok("add_todo", json!({ "id": 1 }))
    } else {
        ToolOutcome::err("delete_todo", NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::todo::{Reminder, Todo};
    use crate::services::user_context::UserContext;
    use crate::storage::conversations::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MemoryTodos {
        rows: Mutex<Vec<Todo>>,
    }

    impl MemoryTodos {
        fn with_rows(rows: Vec<Todo>) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(rows),
            })
        }

        fn todo(id: i32, user_id: i32, title: &str) -> Todo {
            let now = chrono::Utc::now();
            Todo {
                id,
                user_id,
                title: title.to_string(),
                description: None,
                completed: false,
                priority: "medium".to_string(),
                due_date: None,
                notes: sqlx::types::Json(vec![]),
                created_at: now,
                updated_at: now,
            }
        }
    }

    #[async_trait]
    impl TodoStore for MemoryTodos {
        async fn create(&self, user_id: i32, todo: NewTodo) -> Result<Todo, TodoError> {
            let mut rows = self.rows.lock().unwrap();
            let id = rows.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            let mut row = Self::todo(id, user_id, &todo.title);
            row.description = todo.description;
            row.priority = todo.priority.unwrap_or_else(|| "medium".to_string());
            row.due_date = todo.due_date;
            rows.push(row.clone());
            Ok(row)
        }

        async fn get(&self, id: i32, user_id: i32) -> Result<Todo, TodoError> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == id && t.user_id == user_id)
                .cloned()
                .ok_or(TodoError::NotFound)
        }

        async fn list(&self, user_id: i32, _filter: TodoFilter) -> Result<Vec<Todo>, TodoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn update(&self, id: i32, user_id: i32, patch: TodoPatch) -> Result<Todo, TodoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|t| t.id == id && t.user_id == user_id)
                .ok_or(TodoError::NotFound)?;
            if let Some(title) = patch.title {
                row.title = title;
            }
            if let Some(completed) = patch.completed {
                row.completed = completed;
            }
            Ok(row.clone())
        }

        async fn delete(&self, id: i32, user_id: i32) -> Result<Todo, TodoError> {
            let mut rows = self.rows.lock().unwrap();
            let pos = rows
                .iter()
                .position(|t| t.id == id && t.user_id == user_id)
                .ok_or(TodoError::NotFound)?;
            Ok(rows.remove(pos))
        }

        async fn attach_note(&self, id: i32, user_id: i32, note: String) -> Result<Todo, TodoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|t| t.id == id && t.user_id == user_id)
                .ok_or(TodoError::NotFound)?;
            row.notes.0.push(note);
            Ok(row.clone())
        }

        async fn create_reminder(
            &self,
            todo_id: i32,
            user_id: i32,
            remind_at: chrono::DateTime<chrono::Utc>,
        ) -> Result<Reminder, TodoError> {
            self.get(todo_id, user_id).await?;
            Ok(Reminder {
                id: 1,
                todo_id,
                user_id,
                remind_at,
                created_at: chrono::Utc::now(),
            })
        }
    }

    struct MemoryContext;

    #[async_trait]
    impl UserContextStore for MemoryContext {
        async fn get_or_default(&self, user_id: i32) -> Result<UserContext, StoreError> {
            Ok(UserContext {
                user_id,
                preferred_style: "neutral".to_string(),
                language: "en".to_string(),
                temperature_preference: None,
                interaction_count: 0,
                updated_at: chrono::Utc::now(),
            })
        }

        fn record_interaction(&self, _user_id: i32) {}
    }

    #[derive(Default)]
    struct MemoryAudit {
        entries: Mutex<Vec<ToolExecutionLog>>,
    }

    #[async_trait]
    impl AuditSink for MemoryAudit {
        async fn record(&self, entry: ToolExecutionLog) -> Result<(), StoreError> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }
    }

    fn executor_with(
        rows: Vec<Todo>,
    ) -> (ToolExecutor, Arc<MemoryTodos>, Arc<MemoryAudit>) {
        let todos = MemoryTodos::with_rows(rows);
        let audit = Arc::new(MemoryAudit::default());
        let executor = ToolExecutor::new(todos.clone(), Arc::new(MemoryContext), audit.clone());
        (executor, todos, audit)
    }

    #[test]
    fn sanitize_rejects_sql_control_patterns() {
        assert!(sanitize_text("nice title", 200).is_ok());
        assert!(sanitize_text("x'; DROP TABLE todos; --", 200).is_err());
        assert!(sanitize_text("1 UNION SELECT password", 200).is_err());
        assert!(sanitize_text("!!!!!@@@@@", 200).is_err());
    }

    #[test]
    fn sanitize_allows_ordinary_prose_mentioning_update() {
        // Single keywords in prose are fine; only control-statement shapes are blocked.
        assert!(sanitize_text("update the quarterly report", 200).is_ok());
        assert!(sanitize_text("delete old drafts folder", 200).is_ok());
    }

    #[test]
    fn redaction_blanks_strings_and_keeps_scalars() {
        let redacted = redact_arguments(&serde_json::json!({
            "title": "secret text", "todo_id": 4, "completed": true
        }));
        assert_eq!(redacted["title"], "[redacted]");
        assert_eq!(redacted["todo_id"], 4);
        assert_eq!(redacted["completed"], true);
    }

    #[tokio::test]
    async fn add_todo_enforces_title_length() {
        let (executor, _, _) = executor_with(vec![]);
        let args = serde_json::json!({ "title": "x".repeat(201) });
        let outcome = executor.execute(ToolKind::AddTodo, 1, &args, None).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("too long"));
    }

    #[tokio::test]
    async fn title_limit_counts_characters_not_bytes() {
        let (executor, todos, _) = executor_with(vec![]);

        // 120 two-byte characters: well under the limit even though the
        // byte length exceeds 200.
        let args = serde_json::json!({ "title": "é".repeat(120) });
        let outcome = executor.execute(ToolKind::AddTodo, 1, &args, None).await;
        assert!(outcome.success);
        assert_eq!(todos.get(1, 1).await.unwrap().title.chars().count(), 120);

        let args = serde_json::json!({ "title": "é".repeat(201) });
        let outcome = executor.execute(ToolKind::AddTodo, 1, &args, None).await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn add_todo_rejects_bad_due_date() {
        let (executor, _, _) = executor_with(vec![]);
        let args = serde_json::json!({ "title": "Pay rent", "due_date": "next tuesday" });
        let outcome = executor.execute(ToolKind::AddTodo, 1, &args, None).await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn update_against_foreign_todo_reads_as_not_found() {
        let rows = vec![MemoryTodos::todo(10, 2, "Belongs to user 2")];
        let (executor, todos, _) = executor_with(rows);

        let args = serde_json::json!({ "todo_id": 10, "completed": true });
        let outcome = executor.execute(ToolKind::UpdateTodo, 1, &args, None).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some(NOT_FOUND));
        // The foreign row is untouched.
        let row = todos.get(10, 2).await.unwrap();
        assert!(!row.completed);
    }

    #[tokio::test]
    async fn delete_against_foreign_todo_leaves_it_intact() {
        let rows = vec![MemoryTodos::todo(10, 2, "Belongs to user 2")];
        let (executor, todos, audit) = executor_with(rows);

        let args = serde_json::json!({ "todo_id": 10 });
        let outcome = executor.execute(ToolKind::DeleteTodo, 1, &args, None).await;

        assert!(!outcome.success);
        assert!(todos.get(10, 2).await.is_ok());

        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ToolStatus::Error);
    }

    #[tokio::test]
    async fn attach_note_against_foreign_todo_is_denied() {
        let rows = vec![MemoryTodos::todo(10, 2, "Belongs to user 2")];
        let (executor, todos, _) = executor_with(rows);

        let args = serde_json::json!({ "todo_id": 10, "note": "peeking" });
        let outcome = executor.execute(ToolKind::AttachNote, 1, &args, None).await;

        assert!(!outcome.success);
        assert!(todos.get(10, 2).await.unwrap().notes.0.is_empty());
    }

    #[tokio::test]
    async fn every_invocation_writes_exactly_one_audit_row() {
        let (executor, _, audit) = executor_with(vec![]);

        executor
            .execute(ToolKind::AddTodo, 1, &serde_json::json!({ "title": "A" }), None)
            .await;
        executor
            .execute(ToolKind::ListTodos, 1, &serde_json::json!({}), None)
            .await;
        executor
            .execute(ToolKind::DeleteTodo, 1, &serde_json::json!({ "todo_id": 99 }), None)
            .await;

        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].status, ToolStatus::Success);
        assert_eq!(entries[2].status, ToolStatus::Error);
    }

    #[tokio::test]
    async fn fetch_user_context_returns_the_profile() {
        let (executor, _, _) = executor_with(vec![]);
        let outcome = executor
            .execute(ToolKind::FetchUserContext, 1, &serde_json::json!({}), None)
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap()["language"], "en");
    }

    #[tokio::test]
    async fn denied_call_writes_a_cancelled_audit_row() {
        use crate::agent::guard::{Denial, ViolationKind};

        let (executor, todos, audit) = executor_with(vec![]);
        let args = serde_json::json!({ "user_id": "9", "title": "Not yours" });
        let denial = Denial {
            kind: ViolationKind::SecurityViolation,
            reason: "user_id argument does not match acting user".to_string(),
        };

        let outcome = executor.deny("add_todo", 1, &args, None, denial).await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("not permitted"));
        assert!(todos.rows.lock().unwrap().is_empty());

        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ToolStatus::Cancelled);
        assert_eq!(entries[0].execution_time_ms, 0);
        assert_eq!(entries[0].parameters["title"], "[redacted]");
    }

    #[tokio::test]
    async fn audit_parameters_never_contain_raw_text(){
        let (executor, _, audit) = executor_with(vec![]);
        let args = serde_json::json!({ "title": "Call the bank about loan" });
        executor.execute(ToolKind::AddTodo, 1, &args, None).await;

        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries[0].parameters["title"], "[redacted]");
    }
}
