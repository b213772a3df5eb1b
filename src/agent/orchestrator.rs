// src/agent/orchestrator.rs
//
// Drives one assistant turn end to end: validate, persist the user message,
// call the model, run any requested tools through the guard and executor,
// ask the model to narrate the results, and persist the reply. Invalid input
// is the only way out with an Err; once a turn is accepted it always ends
// with a persisted assistant reply, degraded or not.

use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use super::catalog::tool_definitions;
use super::context;
use super::executor::{ToolExecutor, ToolOutcome};
use super::fallback::{DegradedCause, FallbackResponder};
use super::guard::AuthorizationGuard;
use crate::config::AgentConfig;
use crate::llm::ModelClient;
use crate::models::chat::NewMessage;
use crate::services::user_context::UserContextStore;
use crate::storage::conversations::{ConversationStore, StoreError};

#[derive(Error, Debug)]
pub enum TurnError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message exceeds the maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("invalid user")]
    InvalidUser,
    #[error("session not found")]
    SessionNotFound,
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for TurnError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::SessionNotFound => TurnError::SessionNotFound,
            other => TurnError::Store(other),
        }
    }
}

/// Everything a caller learns about a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub reply_text: String,
    /// Id of the persisted assistant reply message.
    pub message_id: i32,
    pub tool_calls: Vec<Value>,
    pub tool_results: Vec<Value>,
    pub degraded: bool,
}

pub struct AgentOrchestrator {
    config: AgentConfig,
    model: Option<Arc<dyn ModelClient>>,
    conversations: Arc<dyn ConversationStore>,
    user_context: Arc<dyn UserContextStore>,
    executor: ToolExecutor,
    guard: AuthorizationGuard,
    fallback: FallbackResponder,
}

impl AgentOrchestrator {
    pub fn new(
        config: AgentConfig,
        model: Option<Arc<dyn ModelClient>>,
        conversations: Arc<dyn ConversationStore>,
        user_context: Arc<dyn UserContextStore>,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            config,
            model,
            conversations,
            user_context,
            executor,
            guard: AuthorizationGuard::new(),
            fallback: FallbackResponder::new(),
        }
    }

    /// Process one user turn. `session_uuid` of `None` starts a new session;
    /// a session id that does not belong to `user_id` reads as not found.
    pub async fn process_turn(
        &self,
        user_id: i32,
        message_text: &str,
        session_uuid: Option<&str>,
    ) -> Result<TurnOutcome, TurnError> {
        if user_id <= 0 {
            return Err(TurnError::InvalidUser);
        }
        let text = message_text.trim();
        if text.is_empty() {
            return Err(TurnError::EmptyMessage);
        }
        if text.chars().count() > self.config.max_message_length {
            return Err(TurnError::MessageTooLong(self.config.max_message_length));
        }

        let session = match session_uuid {
            Some(uuid) => self
                .conversations
                .get_session(uuid, user_id)
                .await?
                .ok_or(TurnError::SessionNotFound)?,
            None => self.conversations.create_session(user_id).await?,
        };
        let session_uuid = session.session_uuid;

        // History is read before the current message lands so it replays
        // prior turns only.
        let history = self
            .conversations
            .history(&session_uuid, user_id, self.config.history_window)
            .await?;

        // The user message is persisted before anything can fail downstream;
        // degraded turns still leave a complete record.
        self.conversations
            .append_message(&session_uuid, user_id, NewMessage::user(text))
            .await?;

        let model = match (&self.model, self.config.assistant_disabled) {
            (Some(model), false) => model.clone(),
            _ => {
                tracing::info!("Assistant disabled, serving fallback reply");
                return self
                    .degraded_turn(&session_uuid, user_id, text, DegradedCause::Disabled)
                    .await;
            }
        };

        let system = context::system_prompt(user_id);
        let tools = tool_definitions();
        let messages = context::initial_messages(&history, text);

        let response = match model
            .complete(messages.clone(), Some(tools.clone()), Some(system.clone()))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Model call failed, degrading turn: {}", e);
                return self
                    .degraded_turn(
                        &session_uuid,
                        user_id,
                        text,
                        DegradedCause::from_llm_error(&e),
                    )
                    .await;
            }
        };

        let uses = response.tool_uses();
        if uses.is_empty() {
            let reply = response
                .text()
                .unwrap_or_else(|| "I'm not sure how to help with that.".to_string());
            return self
                .finish_turn(&session_uuid, user_id, reply, vec![], vec![], false)
                .await;
        }

        // Requested calls run in model order, duplicates included.
        let mut outcomes: Vec<(String, ToolOutcome)> = Vec::with_capacity(uses.len());
        for (tool_use_id, name, input) in &uses {
            let outcome = match self.guard.authorize(name, user_id, input) {
                Ok(kind) => {
                    self.executor
                        .execute(kind, user_id, input, Some(&session_uuid))
                        .await
                }
                Err(denial) => {
                    self.executor
                        .deny(name, user_id, input, Some(&session_uuid), denial)
                        .await
                }
            };
            outcomes.push((tool_use_id.clone(), outcome));
        }

        self.conversations
            .append_message(
                &session_uuid,
                user_id,
                NewMessage::assistant_tool_calls(
                    response.text().unwrap_or_default(),
                    context::tool_calls_json(&uses),
                ),
            )
            .await?;
        for (_, outcome) in &outcomes {
            self.conversations
                .append_message(
                    &session_uuid,
                    user_id,
                    NewMessage::tool_result(outcome.tool_name.clone(), outcome.to_json()),
                )
                .await?;
        }

        let narration_messages = context::with_tool_exchange(&messages, &response, &outcomes);
        let (reply, degraded) = match model
            .complete(narration_messages, Some(tools), Some(system))
            .await
        {
            Ok(narration) => (
                narration
                    .text()
                    .unwrap_or_else(|| summarize_outcomes(&outcomes)),
                false,
            ),
            Err(e) => {
                tracing::warn!("Narration call failed, degrading reply: {}", e);
                (
                    self.fallback
                        .respond(text, DegradedCause::from_llm_error(&e)),
                    true,
                )
            }
        };

        let tool_calls: Vec<Value> = uses
            .iter()
            .map(|(id, name, input)| json!({ "id": id, "name": name, "input": input }))
            .collect();
        let tool_results: Vec<Value> = outcomes.iter().map(|(_, o)| o.to_json()).collect();

        self.finish_turn(&session_uuid, user_id, reply, tool_calls, tool_results, degraded)
            .await
    }

    /// Persist the assistant reply and assemble the outcome.
    async fn finish_turn(
        &self,
        session_uuid: &str,
        user_id: i32,
        reply: String,
        tool_calls: Vec<Value>,
        tool_results: Vec<Value>,
        degraded: bool,
    ) -> Result<TurnOutcome, TurnError> {
        let stored = self
            .conversations
            .append_message(session_uuid, user_id, NewMessage::assistant(reply.clone()))
            .await?;

        self.user_context.record_interaction(user_id);

        Ok(TurnOutcome {
            session_id: session_uuid.to_string(),
            reply_text: reply,
            message_id: stored.id,
            tool_calls,
            tool_results,
            degraded,
        })
    }

    async fn degraded_turn(
        &self,
        session_uuid: &str,
        user_id: i32,
        text: &str,
        cause: DegradedCause,
    ) -> Result<TurnOutcome, TurnError> {
        let reply = self.fallback.respond(text, cause);
        self.finish_turn(session_uuid, user_id, reply, vec![], vec![], true)
            .await
    }
}

fn summarize_outcomes(outcomes: &[(String, ToolOutcome)]) -> String {
    let succeeded = outcomes.iter().filter(|(_, o)| o.success).count();
    let failed = outcomes.len() - succeeded;
    match (succeeded, failed) {
        (s, 0) => format!("Done. {} action(s) completed.", s),
        (0, f) => format!("I couldn't complete that: {} action(s) failed.", f),
        (s, f) => format!("{} action(s) completed, {} failed.", s, f),
    }
}
