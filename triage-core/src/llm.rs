use async_trait::async_trait;
use rig::client::{completion::CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::openai;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: 0.2,
        }
    }
}

impl LlmConfig {
    /// Returns `None` when the named key variable is unset, so callers fall
    /// back to the credential-less generator.
    pub fn from_env() -> Option<Self> {
        let api_key_env =
            std::env::var("LLM_API_KEY_ENV").unwrap_or_else(|_| "OPENAI_API_KEY".into());
        if std::env::var(&api_key_env).is_err() {
            return None;
        }

        Some(Self {
            provider: std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".into()),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            api_key_env,
            temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.2),
        })
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no generation credential configured")]
    MissingCredential,
    #[error("unsupported llm provider '{0}'")]
    UnsupportedProvider(String),
    #[error("llm prompt failed: {0}")]
    Prompt(String),
}

/// Seam over the text-generation service. Classification treats a failure
/// here as fatal; narrative generation absorbs it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, preamble: &str, prompt: &str) -> Result<String, GenerationError>;
}

pub struct RigGenerator {
    config: LlmConfig,
}

impl RigGenerator {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TextGenerator for RigGenerator {
    async fn generate(&self, preamble: &str, prompt: &str) -> Result<String, GenerationError> {
        if self.config.provider.to_lowercase() != "openai" {
            return Err(GenerationError::UnsupportedProvider(
                self.config.provider.clone(),
            ));
        }

        let client = if self.config.api_key_env == "OPENAI_API_KEY" {
            openai::Client::from_env()
        } else {
            let api_key = std::env::var(&self.config.api_key_env)
                .map_err(|_| GenerationError::MissingCredential)?;
            openai::Client::new(&api_key)
                .map_err(|e| GenerationError::Prompt(format!("openai client error: {e}")))?
        };

        let agent = client
            .agent(&self.config.model)
            .preamble(preamble)
            .temperature(self.config.temperature)
            .build();

        agent
            .prompt(prompt)
            .await
            .map_err(|e| GenerationError::Prompt(e.to_string()))
    }
}

/// Stands in when no credential is configured. Every call fails with
/// `MissingCredential`, which classification surfaces and narratives absorb.
pub struct NullGenerator;

#[async_trait]
impl TextGenerator for NullGenerator {
    async fn generate(&self, _preamble: &str, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_generator_reports_missing_credential() {
        let result = NullGenerator.generate("p", "q").await;
        assert!(matches!(result, Err(GenerationError::MissingCredential)));
    }
}
