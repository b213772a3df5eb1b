// src/agent/context.rs
//
// Builds the message list for one model call. Builders are pure: each call
// returns a fresh Vec and never mutates shared turn state, so two calls in
// the same turn cannot observe each other's scratch data.

use serde_json::json;

use super::executor::ToolOutcome;
use crate::llm::{ChatContent, ChatMessage, ChatResponse, ContentBlock, ResponseContent};
use crate::models::chat::{MessageRole, StoredMessage};

/// System prompt for one turn. Pins the acting user's id so the model echoes
/// it into every tool call, where the guard verifies it.
pub fn system_prompt(user_id: i32) -> String {
    format!(
        "You are a helpful todo assistant. You manage tasks for exactly one \
         user, whose id is {user_id}. Always pass user_id=\"{user_id}\" to \
         every tool you call, and never act on any other user's data. Use the \
         available tools to list, create, update, and delete tasks, attach \
         notes and reminders, and fetch the user's preferences. After tools \
         run, summarize what happened in plain language. If the user asks for \
         something outside task management, answer briefly and steer back to \
         their tasks."
    )
}

/// Message list for the first model call of a turn: bounded history replayed
/// oldest-first, then the current user message.
pub fn initial_messages(history: &[StoredMessage], current_text: &str) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = history
        .iter()
        .filter_map(|msg| match msg.role {
            MessageRole::User => Some(ChatMessage {
                role: "user".to_string(),
                content: ChatContent::Text(msg.content.clone()),
            }),
            MessageRole::Assistant if !msg.content.is_empty() => Some(ChatMessage {
                role: "assistant".to_string(),
                content: ChatContent::Text(msg.content.clone()),
            }),
            // Tool rows are bookkeeping; their outcome is already reflected
            // in the assistant narration that follows them.
            _ => None,
        })
        .collect();

    messages.push(ChatMessage {
        role: "user".to_string(),
        content: ChatContent::Text(current_text.to_string()),
    });
    messages
}

/// Message list for the narration call: the first call's messages, the
/// assistant's tool-use response verbatim, and one tool_result block per
/// executed call, in execution order.
pub fn with_tool_exchange(
    base: &[ChatMessage],
    response: &ChatResponse,
    outcomes: &[(String, ToolOutcome)],
) -> Vec<ChatMessage> {
    let assistant_blocks: Vec<ContentBlock> = response
        .content
        .iter()
        .map(|c| match c {
            ResponseContent::Text { text } => ContentBlock::Text { text: text.clone() },
            ResponseContent::ToolUse { id, name, input } => ContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
        })
        .collect();

    let result_blocks: Vec<ContentBlock> = outcomes
        .iter()
        .map(|(tool_use_id, outcome)| ContentBlock::ToolResult {
            tool_use_id: tool_use_id.clone(),
            content: outcome.to_json().to_string(),
            is_error: if outcome.success { None } else { Some(true) },
        })
        .collect();

    let mut messages = base.to_vec();
    messages.push(ChatMessage {
        role: "assistant".to_string(),
        content: ChatContent::Blocks(assistant_blocks),
    });
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: ChatContent::Blocks(result_blocks),
    });
    messages
}

/// Serialized form of the model's requested calls, stored alongside the
/// assistant message that triggered them.
pub fn tool_calls_json(uses: &[(String, String, serde_json::Value)]) -> serde_json::Value {
    json!(uses
        .iter()
        .map(|(id, name, input)| json!({ "id": id, "name": name, "input": input }))
        .collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ResponseContent;

    fn stored(role: MessageRole, content: &str) -> StoredMessage {
        StoredMessage {
            id: 0,
            session_id: 1,
            user_id: 7,
            role,
            content: content.to_string(),
            tool_calls: None,
            tool_results: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn system_prompt_pins_the_acting_user() {
        let prompt = system_prompt(42);
        assert!(prompt.contains("user_id=\"42\""));
    }

    #[test]
    fn history_replays_oldest_first_then_current_message() {
        let history = vec![
            stored(MessageRole::User, "Add milk"),
            stored(MessageRole::Assistant, "Done, added 'milk'."),
            stored(MessageRole::Tool, "{\"success\":true}"),
        ];
        let messages = initial_messages(&history, "What's on my list?");

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        match &messages[2].content {
            ChatContent::Text(t) => assert_eq!(t, "What's on my list?"),
            _ => panic!("expected text content"),
        }
    }

    #[test]
    fn tool_exchange_appends_without_mutating_base() {
        let base = initial_messages(&[], "Add a task to buy groceries");
        let response = ChatResponse {
            id: "msg_1".to_string(),
            model: "test".to_string(),
            content: vec![ResponseContent::ToolUse {
                id: "tu_1".to_string(),
                name: "add_todo".to_string(),
                input: json!({"user_id": "7", "title": "Buy groceries"}),
            }],
            stop_reason: Some("tool_use".to_string()),
        };
        let outcome = (
            "tu_1".to_string(),
            super::super::executor::test_outcome(true),
        );

        let extended = with_tool_exchange(&base, &response, &[outcome]);

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 3);
        match &extended[2].content {
            ChatContent::Blocks(blocks) => match &blocks[0] {
                ContentBlock::ToolResult { tool_use_id, is_error, .. } => {
                    assert_eq!(tool_use_id, "tu_1");
                    assert!(is_error.is_none());
                }
                _ => panic!("expected tool_result block"),
            },
            _ => panic!("expected block content"),
        }
    }

    #[test]
    fn failed_outcome_marks_result_block_as_error() {
        let response = ChatResponse {
            id: "msg_1".to_string(),
            model: "test".to_string(),
            content: vec![ResponseContent::ToolUse {
                id: "tu_9".to_string(),
                name: "delete_todo".to_string(),
                input: json!({"user_id": "7", "todo_id": 3}),
            }],
            stop_reason: Some("tool_use".to_string()),
        };
        let outcome = (
            "tu_9".to_string(),
            super::super::executor::test_outcome(false),
        );

        let extended = with_tool_exchange(&[], &response, &[outcome]);
        match &extended[1].content {
            ChatContent::Blocks(blocks) => match &blocks[0] {
                ContentBlock::ToolResult { is_error, .. } => {
                    assert_eq!(*is_error, Some(true));
                }
                _ => panic!("expected tool_result block"),
            },
            _ => panic!("expected block content"),
        }
    }
}
