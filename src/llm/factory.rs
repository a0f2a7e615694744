//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{ConsoleError, Result};
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Message returned when the OpenAI provider is selected without a key.
pub const MISSING_API_KEY: &str =
    "OpenAI API key not configured. Please add OPENAI_API_KEY to your .env file.";

/// Creates an LLM client for the configured provider.
///
/// The OpenAI provider needs `config.api_key`, which is filled from
/// `OPENAI_API_KEY` when the configuration is loaded.
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider()? {
        LlmProvider::OpenAi => {
            let key = config
                .api_key
                .clone()
                .ok_or_else(|| ConsoleError::llm(MISSING_API_KEY))?;
            Ok(Box::new(OpenAiClient::new(OpenAiConfig::from_llm_config(
                key, config,
            ))?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
