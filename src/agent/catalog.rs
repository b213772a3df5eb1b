// src/agent/catalog.rs
//
// The fixed set of tools the assistant may call. Adding or removing a tool is
// a compile-time change: dispatch is over this enum, never over a name table.

use std::collections::HashMap;

use crate::llm::{InputSchema, PropertyDefinition, ToolDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ListTodos,
    AddTodo,
    UpdateTodo,
    DeleteTodo,
    CreateReminder,
    AttachNote,
    FetchUserContext,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        ToolKind::ListTodos,
        ToolKind::AddTodo,
        ToolKind::UpdateTodo,
        ToolKind::DeleteTodo,
        ToolKind::CreateReminder,
        ToolKind::AttachNote,
        ToolKind::FetchUserContext,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::ListTodos => "list_todos",
            ToolKind::AddTodo => "add_todo",
            ToolKind::UpdateTodo => "update_todo",
            ToolKind::DeleteTodo => "delete_todo",
            ToolKind::CreateReminder => "create_reminder",
            ToolKind::AttachNote => "attach_note",
            ToolKind::FetchUserContext => "fetch_user_context",
        }
    }

    pub fn from_name(name: &str) -> Option<ToolKind> {
        ToolKind::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

fn prop(prop_type: &str, description: &str) -> PropertyDefinition {
    PropertyDefinition {
        prop_type: prop_type.to_string(),
        description: description.to_string(),
    }
}

fn definition(
    kind: ToolKind,
    description: &str,
    mut properties: HashMap<String, PropertyDefinition>,
    mut required: Vec<&str>,
) -> ToolDefinition {
    // Every tool carries the acting user's id; the guard verifies it matches
    // the authenticated caller before anything executes.
    properties.insert(
        "user_id".to_string(),
        prop("string", "Id of the user the operation acts on behalf of"),
    );
    required.insert(0, "user_id");

    ToolDefinition {
        name: kind.name().to_string(),
        description: description.to_string(),
        input_schema: InputSchema {
            schema_type: "object".to_string(),
            properties,
            required: required.into_iter().map(String::from).collect(),
        },
    }
}

/// Declarative descriptions of every callable tool, in the wire shape the
/// model consumes.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        definition(
            ToolKind::ListTodos,
            "List the user's tasks, optionally filtered by completion status, \
             priority, or a search phrase over title and description.",
            HashMap::from([
                ("completed".to_string(), prop("boolean", "Only tasks with this completion state")),
                ("priority".to_string(), prop("string", "Only tasks with this priority: low, medium, or high")),
                ("search".to_string(), prop("string", "Phrase to match against task titles and descriptions")),
            ]),
            vec![],
        ),
        definition(
            ToolKind::AddTodo,
            "Create a new task for the user. Use when the user asks to add, \
             create, or remember something to do.",
            HashMap::from([
                ("title".to_string(), prop("string", "Short task title, 1-200 characters")),
                ("description".to_string(), prop("string", "Optional longer description, up to 1000 characters")),
                ("priority".to_string(), prop("string", "low, medium, or high (default medium)")),
                ("due_date".to_string(), prop("string", "Optional due date in ISO-8601 format")),
            ]),
            vec!["title"],
        ),
        definition(
            ToolKind::UpdateTodo,
            "Update an existing task: title, description, completion state, \
             priority, or due date. Only fields provided are changed.",
            HashMap::from([
                ("todo_id".to_string(), prop("number", "Id of the task to update")),
                ("title".to_string(), prop("string", "New title, 1-200 characters")),
                ("description".to_string(), prop("string", "New description, up to 1000 characters")),
                ("completed".to_string(), prop("boolean", "New completion state")),
                ("priority".to_string(), prop("string", "low, medium, or high")),
                ("due_date".to_string(), prop("string", "New due date in ISO-8601 format")),
            ]),
            vec!["todo_id"],
        ),
        definition(
            ToolKind::DeleteTodo,
            "Permanently delete one of the user's tasks.",
            HashMap::from([
                ("todo_id".to_string(), prop("number", "Id of the task to delete")),
            ]),
            vec!["todo_id"],
        ),
        definition(
            ToolKind::CreateReminder,
            "Attach a reminder to one of the user's tasks at a given time.",
            HashMap::from([
                ("todo_id".to_string(), prop("number", "Id of the task to remind about")),
                ("remind_at".to_string(), prop("string", "When to remind, ISO-8601 format")),
            ]),
            vec!["todo_id", "remind_at"],
        ),
        definition(
            ToolKind::AttachNote,
            "Append a free-text note to one of the user's tasks.",
            HashMap::from([
                ("todo_id".to_string(), prop("number", "Id of the task to annotate")),
                ("note".to_string(), prop("string", "Note text, up to 1000 characters")),
            ]),
            vec!["todo_id", "note"],
        ),
        definition(
            ToolKind::FetchUserContext,
            "Fetch the user's personalization profile: preferred reply style, \
             language, and usage statistics.",
            HashMap::new(),
            vec![],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("drop_table"), None);
    }

    #[test]
    fn catalog_covers_every_kind_and_requires_user_id() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), ToolKind::ALL.len());
        for def in &defs {
            assert!(ToolKind::from_name(&def.name).is_some());
            assert!(def.input_schema.required.contains(&"user_id".to_string()));
            assert!(def.input_schema.properties.contains_key("user_id"));
        }
    }

    #[test]
    fn add_todo_requires_title() {
        let defs = tool_definitions();
        let add = defs.iter().find(|d| d.name == "add_todo").unwrap();
        assert!(add.input_schema.required.contains(&"title".to_string()));
    }
}
