// src/config.rs
//
// All knobs the agent consumes, gathered once at startup and handed to the
// orchestrator as a plain value. Nothing in the agent reads the environment
// directly.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// When true the model is never called and every turn is served by the
    /// fallback responder.
    pub assistant_disabled: bool,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    /// Hard cap on an inbound user message, enforced before anything is persisted.
    pub max_message_length: usize,
    /// How many recent messages are replayed as model context.
    pub history_window: i64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            assistant_disabled: false,
            model: "claude-sonnet-4-5".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            request_timeout: Duration::from_secs(60),
            max_message_length: 4000,
            history_window: 20,
        }
    }
}

impl AgentConfig {
    /// Build from environment variables, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            assistant_disabled: env_flag("ASSISTANT_DISABLED"),
            model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            temperature: env_parse("LLM_TEMPERATURE", defaults.temperature),
            max_tokens: env_parse("LLM_MAX_TOKENS", defaults.max_tokens),
            request_timeout: Duration::from_secs(env_parse(
                "LLM_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            max_message_length: env_parse("AGENT_MAX_MESSAGE_LENGTH", defaults.max_message_length),
            history_window: env_parse("AGENT_HISTORY_WINDOW", defaults.history_window),
        }
    }
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AgentConfig::default();
        assert!(!cfg.assistant_disabled);
        assert!(cfg.max_message_length > 0);
        assert!(cfg.history_window > 0);
        assert!(cfg.request_timeout.as_secs() > 0);
    }

    #[test]
    fn env_flag_accepts_common_truthy_values() {
        std::env::set_var("TEST_CONFIG_FLAG_A", "true");
        std::env::set_var("TEST_CONFIG_FLAG_B", "0");
        assert!(env_flag("TEST_CONFIG_FLAG_A"));
        assert!(!env_flag("TEST_CONFIG_FLAG_B"));
        assert!(!env_flag("TEST_CONFIG_FLAG_MISSING"));
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("TEST_CONFIG_PARSE", "not-a-number");
        assert_eq!(env_parse("TEST_CONFIG_PARSE", 42u32), 42);
    }
}
