//! Request handlers for the console API.

use axum::extract::{Multipart, Path, State};
use axum::response::{Html, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::response::{ApiErrorResponse, ApiSuccess, ErrorDetails};
use super::AppState;
use crate::connection::ConnectionStatus;
use crate::db::Column;
use crate::error::ConsoleError;
use crate::llm::factory::MISSING_API_KEY;
use crate::query::{Degradation, DisplayResult, ExecutionResult, QueryExecutor};

type ApiResult<T> = Result<Json<ApiSuccess<T>>, ApiErrorResponse>;

/// Multipart field carrying the uploaded database.
const UPLOAD_FIELD: &str = "db_file";

const INDEX_HTML: &str = include_str!("static/index.html");

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub question: String,
    /// Run the generated SQL and return its result too.
    #[serde(default)]
    pub execute: bool,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub result: DisplayResult,
    pub summary: String,
}

impl From<DisplayResult> for QueryResponse {
    fn from(result: DisplayResult) -> Self {
        Self {
            summary: result.summary(),
            result,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
    pub degraded: Option<Degradation>,
}

#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub table: String,
    pub columns: Vec<Column>,
    pub degraded: Option<Degradation>,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResponse>,
    /// Failure of the generated SQL; the SQL is still returned so it can be edited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn status(State(state): State<AppState>) -> Json<ApiSuccess<ConnectionStatus>> {
    let manager = state.connections.lock().await;
    ApiSuccess::new(manager.status())
}

pub async fn list_tables(State(state): State<AppState>) -> Json<ApiSuccess<TablesResponse>> {
    let mut manager = state.connections.lock().await;
    let tables = QueryExecutor::new(&mut manager).list_tables().await;

    ApiSuccess::new(TablesResponse {
        degraded: tables.degradation(),
        tables: tables.into_value(),
    })
}

pub async fn describe_table(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ApiSuccess<TableResponse>> {
    let mut manager = state.connections.lock().await;
    let columns = QueryExecutor::new(&mut manager).describe_table(&name).await;

    ApiSuccess::new(TableResponse {
        table: name,
        degraded: columns.degradation(),
        columns: columns.into_value(),
    })
}

pub async fn run_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<QueryResponse> {
    let mut manager = state.connections.lock().await;
    match QueryExecutor::new(&mut manager).execute(&request.query).await {
        ExecutionResult::Success(outcome) => {
            Ok(ApiSuccess::new(DisplayResult::from(&outcome).into()))
        }
        ExecutionResult::Error(e) => Err(e.into()),
    }
}

pub async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> ApiResult<TranslateResponse> {
    let translator = state
        .translator
        .clone()
        .ok_or_else(|| ConsoleError::llm(MISSING_API_KEY))?;

    // The lock is released before the model call.
    let schema = {
        let mut manager = state.connections.lock().await;
        QueryExecutor::new(&mut manager).load_schema().await.into_value()
    };

    let sql = translator.translate(&request.question, &schema).await?;

    if !request.execute {
        return Ok(ApiSuccess::new(TranslateResponse {
            sql,
            result: None,
            error: None,
        }));
    }

    let mut manager = state.connections.lock().await;
    let response = match QueryExecutor::new(&mut manager).execute(&sql).await {
        ExecutionResult::Success(outcome) => TranslateResponse {
            result: Some(DisplayResult::from(&outcome).into()),
            error: None,
            sql,
        },
        ExecutionResult::Error(e) => {
            warn!(error = %e, "Generated SQL failed");
            TranslateResponse {
                result: None,
                error: Some(ErrorDetails::from(&e)),
                sql,
            }
        }
    };

    Ok(ApiSuccess::new(response))
}

pub async fn reset(State(state): State<AppState>) -> ApiResult<ConnectionStatus> {
    let mut manager = state.connections.lock().await;
    manager.reconnect().await?;
    Ok(ApiSuccess::new(manager.status()))
}

pub async fn change_database(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<ConnectionStatus> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ConsoleError::upload(format!("Failed to read form data: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ConsoleError::upload("No filename provided"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ConsoleError::upload(format!("Failed to read file data: {e}")))?;
        upload = Some((file_name, bytes));
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ConsoleError::upload("No database file provided"))?;
    let path = state.uploads.save(&file_name, &bytes).await?;

    let mut manager = state.connections.lock().await;
    let previous = manager.target_path().to_path_buf();
    if let Err(e) = manager.connect(&path).await {
        warn!(file = %file_name, error = %e, "Switching to uploaded database failed");
        state.uploads.discard(&path).await;
        return Err(e.into());
    }

    if manager.current_path() != Some(previous.as_path()) {
        state.uploads.discard(&previous).await;
    }

    info!(file = %file_name, "Switched to uploaded database");
    Ok(ApiSuccess::new(manager.status()))
}
