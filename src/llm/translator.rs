//! Natural-language to SQL translation.

use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::db::Schema;
use crate::error::{ConsoleError, Result};
use crate::llm::{factory, parser, prompt, LlmClient};

/// Turns a question into SQL text using an [`LlmClient`].
///
/// The returned SQL is untrusted: callers run it through the same executor
/// as hand-written queries.
pub struct Translator {
    client: Box<dyn LlmClient>,
}

impl Translator {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Creates a translator for the configured provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(factory::create_client(config)?))
    }

    /// Translates `question` given the schema of the open database.
    pub async fn translate(&self, question: &str, schema: &Schema) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ConsoleError::llm("Please enter a question to translate"));
        }

        let messages = prompt::build_messages(schema, question);
        debug!(
            tables = schema.tables.len(),
            prompt_chars = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "Sending translation request"
        );

        let response = self.client.complete(&messages).await.map_err(|e| {
            warn!(error = %e, "Translation request failed");
            e
        })?;

        let sql = parser::extract_sql(&response)
            .ok_or_else(|| ConsoleError::llm("The model returned no SQL"))?;

        info!(sql = %sql, "Translated question to SQL");
        Ok(sql)
    }
}
