//! Response parsing for LLM outputs.
//!
//! Extracts SQL from LLM responses that may contain markdown code blocks.

/// Result of parsing an LLM response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Any explanatory text before or after the SQL.
    pub text: String,
    /// Extracted SQL query, if found.
    pub sql: Option<String>,
}

impl ParsedResponse {
    /// Creates a new parsed response with only text (no SQL).
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: None,
        }
    }

    /// Creates a new parsed response with SQL and optional text.
    pub fn with_sql(text: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: Some(sql.into()),
        }
    }
}

/// Parses an LLM response to extract SQL from markdown code blocks.
///
/// Looks for SQL in the following formats:
/// - ```sql ... ```
/// - ``` ... ``` (no language specified)
///
/// If multiple code blocks are found, uses the first one.
/// If no code block is found, returns the full text with no SQL.
pub fn parse_llm_response(response: &str) -> ParsedResponse {
    for lang in ["sql", "SQL", ""] {
        if let Some((sql, text)) = split_code_block(response, lang) {
            return ParsedResponse::with_sql(text.trim(), sql.trim());
        }
    }

    ParsedResponse::text_only(response.trim())
}

/// Returns the SQL a translation response stands for.
///
/// Models are told to answer with bare SQL, so text without a code block is
/// taken as the query itself after stripping stray fence markers.
pub fn extract_sql(response: &str) -> Option<String> {
    let sql = match parse_llm_response(response).sql {
        Some(sql) => sql,
        None => strip_stray_fences(response.trim()).to_string(),
    };

    if sql.is_empty() {
        None
    } else {
        Some(sql)
    }
}

/// Drops an unterminated opening fence line and a dangling closing fence.
fn strip_stray_fences(text: &str) -> &str {
    let mut text = text;
    if text.starts_with("```") {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => &text[3..],
        };
    }
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Finds the first code block fenced with `lang` and returns (content, text around it).
///
/// Pass an empty string for `lang` to match blocks without a language specifier.
fn split_code_block<'a>(text: &'a str, lang: &str) -> Option<(&'a str, String)> {
    let start_pattern = format!("```{}", lang);
    let start_idx = text.find(&start_pattern)?;
    let after_pattern = start_idx + start_pattern.len();

    let content_start = text[after_pattern..]
        .find('\n')
        .map(|i| after_pattern + i + 1)?;

    // Text after the fence on the same line is a language specifier.
    if !text[after_pattern..content_start - 1].trim().is_empty() {
        return None;
    }

    let end_offset = text[content_start..].find("```")?;
    let content = &text[content_start..content_start + end_offset];

    let before = &text[..start_idx];
    let after = &text[content_start + end_offset + 3..];
    let remaining = format!("{}{}", before.trim_end(), after.trim_start());

    Some((content, remaining))
}
