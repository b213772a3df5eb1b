// src/agent/fallback.rs
//
// Deterministic replies for turns that cannot reach the model. No model, no
// network, no randomness: the same message and cause always produce the same
// text, so a degraded assistant still behaves predictably.

use chrono::Timelike;

use crate::llm::LlmError;

/// Why a turn degraded to the fallback responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedCause {
    /// The assistant is switched off by configuration.
    Disabled,
    Timeout,
    Connection,
    Provider,
    Other,
}

impl DegradedCause {
    pub fn from_llm_error(error: &LlmError) -> Self {
        match error {
            LlmError::Timeout => DegradedCause::Timeout,
            LlmError::Connection(_) => DegradedCause::Connection,
            LlmError::Provider { .. } => DegradedCause::Provider,
            LlmError::InvalidResponse(_) => DegradedCause::Other,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn new() -> Self {
        Self
    }

    /// Produce a reply without the model. Keyword matching picks the topic;
    /// the current hour picks the greeting.
    pub fn respond(&self, message_text: &str, cause: DegradedCause) -> String {
        let body = self.topic_reply(message_text);
        match cause {
            DegradedCause::Disabled => body,
            _ => format!(
                "I'm having trouble reaching my assistant service right now, \
                 so I can only help in a limited way. {}",
                body
            ),
        }
    }

    fn topic_reply(&self, message_text: &str) -> String {
        let lowered = message_text.to_lowercase();

        if Self::mentions(&lowered, &["add", "create", "new task", "remember to"]) {
            return format!(
                "{} To add a task, open your todo list and use the add button, \
                 or try asking me again in a bit.",
                self.greeting()
            );
        }
        if Self::mentions(&lowered, &["list", "show", "what's on", "what is on", "my tasks"]) {
            return format!(
                "{} Your full task list is available on the todos page. I'll \
                 be able to read it out for you again shortly.",
                self.greeting()
            );
        }
        if Self::mentions(&lowered, &["delete", "remove", "clear"]) {
            return format!(
                "{} You can delete tasks directly from your todo list. I can't \
                 make changes for you at the moment.",
                self.greeting()
            );
        }
        if Self::mentions(&lowered, &["done", "complete", "finished"]) {
            return format!(
                "{} Nice work! You can mark tasks complete from your todo \
                 list while I'm limited.",
                self.greeting()
            );
        }
        if Self::mentions(&lowered, &["remind", "reminder"]) {
            return format!(
                "{} Reminders can be set from each task's detail view. Ask me \
                 again later and I'll set one up for you.",
                self.greeting()
            );
        }
        if Self::mentions(&lowered, &["hello", "hi", "hey", "good morning", "good evening"]) {
            return format!("{} How can I help with your tasks?", self.greeting());
        }

        format!(
            "{} I can normally help you add, list, update, and complete tasks. \
             Please try again in a moment, or manage your list directly from \
             the todos page.",
            self.greeting()
        )
    }

    fn mentions(lowered: &str, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| lowered.contains(k))
    }

    fn greeting(&self) -> &'static str {
        Self::greeting_for_hour(chrono::Local::now().hour())
    }

    fn greeting_for_hour(hour: u32) -> &'static str {
        match hour {
            5..=11 => "Good morning!",
            12..=16 => "Good afternoon!",
            17..=21 => "Good evening!",
            _ => "Hello!",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_turns_get_no_degraded_preamble() {
        let responder = FallbackResponder::new();
        let reply = responder.respond("hello there", DegradedCause::Disabled);
        assert!(!reply.contains("trouble reaching"));
    }

    #[test]
    fn model_failures_get_a_degraded_preamble() {
        let responder = FallbackResponder::new();
        for cause in [
            DegradedCause::Timeout,
            DegradedCause::Connection,
            DegradedCause::Provider,
            DegradedCause::Other,
        ] {
            let reply = responder.respond("list my tasks", cause);
            assert!(reply.contains("trouble reaching"), "cause {:?}", cause);
        }
    }

    #[test]
    fn same_input_always_yields_same_reply() {
        let responder = FallbackResponder::new();
        let a = responder.respond("add a task to buy groceries", DegradedCause::Timeout);
        let b = responder.respond("add a task to buy groceries", DegradedCause::Timeout);
        assert_eq!(a, b);
    }

    #[test]
    fn keyword_matching_picks_the_topic() {
        let responder = FallbackResponder::new();
        let reply = responder.respond("please add milk to my list of tasks", DegradedCause::Disabled);
        assert!(reply.contains("add"));

        let reply = responder.respond("set a reminder for the dentist", DegradedCause::Disabled);
        assert!(reply.contains("Reminders") || reply.contains("reminder"));
    }

    #[test]
    fn greeting_tracks_the_hour() {
        assert_eq!(FallbackResponder::greeting_for_hour(8), "Good morning!");
        assert_eq!(FallbackResponder::greeting_for_hour(14), "Good afternoon!");
        assert_eq!(FallbackResponder::greeting_for_hour(19), "Good evening!");
        assert_eq!(FallbackResponder::greeting_for_hour(2), "Hello!");
    }

    #[test]
    fn causes_map_from_model_errors() {
        assert_eq!(
            DegradedCause::from_llm_error(&LlmError::Timeout),
            DegradedCause::Timeout
        );
        assert_eq!(
            DegradedCause::from_llm_error(&LlmError::Provider {
                status: 529,
                message: "overloaded".to_string()
            }),
            DegradedCause::Provider
        );
    }
}
