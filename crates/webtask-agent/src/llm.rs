//! Language-model client settings.

use std::fmt;

use crate::AgentError;

/// Model parameters handed to the agent.
#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.9,
            max_tokens: 512,
            top_p: 0.9,
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .finish()
    }
}

/// Validated LLM configuration for one attempt.
#[derive(Debug, Clone)]
pub struct LlmClient {
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, AgentError> {
        if settings.api_key.trim().is_empty() {
            return Err(AgentError::MissingApiKey);
        }
        Ok(Self { settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Environment variables an agent process reads its model settings from.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("GEMINI_API_KEY", self.settings.api_key.clone()),
            ("GEMINI_MODEL", self.settings.model.clone()),
            ("GEMINI_TEMPERATURE", self.settings.temperature.to_string()),
            ("GEMINI_MAX_TOKENS", self.settings.max_tokens.to_string()),
            ("GEMINI_TOP_P", self.settings.top_p.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = LlmClient::new(LlmSettings::default()).unwrap_err();
        assert!(matches!(err, AgentError::MissingApiKey));
    }

    #[test]
    fn test_env_vars() {
        let client = LlmClient::new(LlmSettings {
            api_key: "secret".to_string(),
            ..LlmSettings::default()
        })
        .unwrap();

        let env = client.env_vars();
        assert!(env.contains(&("GEMINI_API_KEY", "secret".to_string())));
        assert!(env.contains(&("GEMINI_MODEL", "gemini-2.0-flash-exp".to_string())));
        assert!(env.contains(&("GEMINI_MAX_TOKENS", "512".to_string())));
    }

    #[test]
    fn test_debug_redacts_key() {
        let settings = LlmSettings {
            api_key: "secret".to_string(),
            ..LlmSettings::default()
        };
        assert!(!format!("{:?}", settings).contains("secret"));
    }
}
