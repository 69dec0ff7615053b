//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{CrewError, Result};
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates an LLM client from the resolved configuration.
///
/// The OpenAI provider requires an API key (`OPENAI_API_KEY`); the mock
/// provider never does.
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider()? {
        LlmProvider::OpenAi => {
            let key = config.api_key.clone().ok_or_else(|| {
                CrewError::llm("No API key configured. Set OPENAI_API_KEY (or add it to .env).")
            })?;
            let mut openai = OpenAiConfig::new(key, config.model.clone())
                .with_timeout(config.timeout_secs);
            if let Some(base_url) = &config.base_url {
                openai = openai.with_base_url(base_url.clone());
            }
            Ok(Box::new(OpenAiClient::new(openai)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
