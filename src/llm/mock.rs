//! Mock LLM client for testing and offline use.
//!
//! Provides deterministic responses based on patterns in the question.

use async_trait::async_trait;

use crate::error::{ConsoleError, Result};
use crate::llm::prompt::extract_question;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Error returned instead of any response.
    failure: Option<String>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the question contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into().to_lowercase(), response.into()));
        self
    }

    /// Makes every completion fail with an `Llm` error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Generates a mock response based on the question.
    fn mock_response(&self, question: &str) -> String {
        let question = question.to_lowercase();

        if let Some((_, response)) = self
            .custom_responses
            .iter()
            .find(|(pattern, _)| question.contains(pattern.as_str()))
        {
            return response.clone();
        }

        if question.contains("tables") {
            return "```sql\nSELECT table_name FROM information_schema.tables ORDER BY table_name;\n```"
                .to_string();
        }

        if question.contains("how many") || question.contains("count") {
            return "SELECT COUNT(*) AS count FROM requests".to_string();
        }

        "SELECT 1 AS answer".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> &str {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        if let Some(message) = &self.failure {
            return Err(ConsoleError::llm(message.clone()));
        }
        let question = extract_question(Self::extract_user_input(messages));
        Ok(self.mock_response(question))
    }
}
