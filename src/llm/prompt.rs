//! Prompt construction for translation requests.

use crate::db::Schema;
use crate::llm::types::Message;

/// System prompt for the DuckDB translator.
const SYSTEM_PROMPT: &str = r#"You are a DuckDB SQL expert. Translate natural language questions into valid DuckDB SQL queries.

INSTRUCTIONS:
- Use only the tables and columns listed in the database schema
- Use DuckDB date and time functions when dealing with dates or timestamps
- Return ONLY the SQL query, with no explanations, markdown formatting or backticks"#;

/// Marker that precedes the question in the user prompt.
const QUESTION_MARKER: &str = "Natural Language Query:";

/// Builds the user prompt: schema summary, then the question.
pub fn build_user_prompt(schema: &Schema, question: &str) -> String {
    format!(
        "{}\n{}\n{}\n\nTranslate this into a valid DuckDB SQL query:",
        schema.format_for_llm(),
        QUESTION_MARKER,
        question.trim()
    )
}

/// Builds the complete message list for one translation.
pub fn build_messages(schema: &Schema, question: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(build_user_prompt(schema, question)),
    ]
}

/// Recovers the question from a prompt built by [`build_user_prompt`].
///
/// Text without the marker is returned unchanged.
pub fn extract_question(prompt: &str) -> &str {
    match prompt.rfind(QUESTION_MARKER) {
        Some(idx) => {
            let rest = &prompt[idx + QUESTION_MARKER.len()..];
            rest.split("\n\n").next().unwrap_or(rest).trim()
        }
        None => prompt,
    }
}
