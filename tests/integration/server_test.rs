//! HTTP API integration tests.
//!
//! Each test starts the real router on an ephemeral port and talks to it
//! over HTTP.

use duck_console::error::Result;
use duck_console::llm::{MockLlmClient, Translator};
use duck_console::server::{self, AppState, UploadStore};
use pretty_assertions::assert_eq;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value as Json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{create_database, read_only_manager};

const UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

struct TestServer {
    base: String,
    client: reqwest::Client,
    dir: TempDir,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl TestServer {
    async fn start(translator: Option<Translator>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = create_database(
            dir.path(),
            "app.duckdb",
            "CREATE TABLE requests (id INTEGER, path VARCHAR);
             INSERT INTO requests VALUES (1, '/home'), (2, '/about'), (3, '/home');",
        );

        let mut manager = read_only_manager(&path);
        manager.connect(&path).await.unwrap();
        let state = AppState::new(manager, translator, UploadStore::new().unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::serve(listener, state, UPLOAD_LIMIT, async move {
            let _ = signal.await;
        }));

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            dir,
            shutdown,
            handle,
        }
    }

    async fn with_mock_translator() -> Self {
        Self::start(Some(Translator::new(Box::new(MockLlmClient::new())))).await
    }

    async fn get(&self, path: &str) -> (StatusCode, Json) {
        let response = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Json) -> (StatusCode, Json) {
        let response = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> (StatusCode, Json) {
        let form = Form::new().part("db_file", Part::bytes(bytes).file_name(file_name.to_string()));
        let response = self
            .client
            .post(format!("{}/api/database", self.base))
            .multipart(form)
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        tokio_test::assert_ok!(self.handle.await.unwrap());
    }
}

#[tokio::test]
async fn test_index_serves_console_page() {
    let server = TestServer::start(None).await;

    let response = reqwest::get(format!("{}/", server.base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("DuckDB Console"));

    server.stop().await;
}

#[tokio::test]
async fn test_status_reports_open_file() {
    let server = TestServer::start(None).await;

    let (status, body) = server.get("/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["connected"], true);
    assert_eq!(body["data"]["read_only"], true);
    assert!(body["data"]["path"]
        .as_str()
        .unwrap()
        .ends_with("app.duckdb"));

    server.stop().await;
}

#[tokio::test]
async fn test_query_returns_display_rows() {
    let server = TestServer::start(None).await;

    let (status, body) = server
        .post(
            "/api/query",
            json!({ "query": "SELECT path FROM requests ORDER BY id" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["columns"], json!(["path"]));
    assert_eq!(data["total_rows"], 3);
    assert_eq!(data["truncated"], false);
    assert_eq!(data["attempts"], 1);
    assert_eq!(data["summary"], "3 rows");
    assert_eq!(data["rows"][0][0], json!({ "kind": "scalar", "text": "/home" }));

    server.stop().await;
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let server = TestServer::start(None).await;

    let (status, body) = server.post("/api/query", json!({ "query": "   " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["kind"], "empty_query");
    assert_eq!(body["error"]["reset_suggested"], false);

    server.stop().await;
}

#[tokio::test]
async fn test_failing_statement_reports_query_error() {
    let server = TestServer::start(None).await;

    let (status, body) = server
        .post("/api/query", json!({ "query": "SELECT * FROM nonexistent_table" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "query_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("nonexistent_table"));

    // The connection is still usable afterwards.
    let (status, _) = server
        .post("/api/query", json!({ "query": "SELECT 1" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_tables_and_columns() {
    let server = TestServer::start(None).await;

    let (status, body) = server.get("/api/tables").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tables"], json!(["requests"]));
    assert_eq!(body["data"]["degraded"], Json::Null);

    let (status, body) = server.get("/api/tables/requests").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["id", "path"]);

    server.stop().await;
}

#[tokio::test]
async fn test_reset_reopens_database() {
    let server = TestServer::start(None).await;

    let (status, body) = server.post("/api/reset", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected"], true);

    let (status, _) = server
        .post("/api/query", json!({ "query": "SELECT count(*) FROM requests" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_translate_and_execute() {
    let server = TestServer::with_mock_translator().await;

    let (status, body) = server
        .post(
            "/api/translate",
            json!({ "question": "How many requests are there?", "execute": true }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sql"], "SELECT COUNT(*) AS count FROM requests");
    assert_eq!(body["data"]["result"]["rows"][0][0]["text"], "3");
    assert_eq!(body["data"].get("error"), None);

    server.stop().await;
}

#[tokio::test]
async fn test_translate_returns_sql_when_execution_fails() {
    let client = MockLlmClient::new().with_response("orders", "SELECT * FROM orders");
    let server = TestServer::start(Some(Translator::new(Box::new(client)))).await;

    let (status, body) = server
        .post(
            "/api/translate",
            json!({ "question": "list the orders", "execute": true }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sql"], "SELECT * FROM orders");
    assert_eq!(body["data"]["error"]["kind"], "query_error");
    assert_eq!(body["data"].get("result"), None);

    server.stop().await;
}

#[tokio::test]
async fn test_translate_without_model_fails() {
    let server = TestServer::start(None).await;

    let (status, body) = server
        .post("/api/translate", json!({ "question": "how many requests" }))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "llm_error");

    server.stop().await;
}

#[tokio::test]
async fn test_upload_switches_database() {
    let server = TestServer::start(None).await;
    let source = create_database(
        server.dir.path(),
        "stats.duckdb",
        "CREATE TABLE stats (day DATE, hits INTEGER);",
    );

    let (status, body) = server
        .upload("stats.duckdb", std::fs::read(&source).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["path"]
        .as_str()
        .unwrap()
        .ends_with("stats.duckdb"));

    let (_, body) = server.get("/api/tables").await;
    assert_eq!(body["data"]["tables"], json!(["stats"]));

    server.stop().await;
}

#[tokio::test]
async fn test_second_upload_removes_the_first() {
    let server = TestServer::start(None).await;
    let default_path = server.dir.path().join("app.duckdb");
    let source = create_database(
        server.dir.path(),
        "stats.duckdb",
        "CREATE TABLE stats (day DATE, hits INTEGER);",
    );
    let bytes = std::fs::read(&source).unwrap();

    let (status, body) = server.upload("stats.duckdb", bytes.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let first = std::path::PathBuf::from(body["data"]["path"].as_str().unwrap());
    assert!(first.exists());
    assert!(default_path.exists());

    let (status, body) = server.upload("stats.duckdb", bytes).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let second = std::path::PathBuf::from(body["data"]["path"].as_str().unwrap());

    assert_ne!(first, second);
    assert!(!first.exists());
    assert!(second.exists());

    server.stop().await;
}

#[tokio::test]
async fn test_upload_rejects_other_file_types() {
    let server = TestServer::start(None).await;

    let (status, body) = server.upload("data.csv", b"a,b\n1,2\n".to_vec()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "upload_error");

    let (_, body) = server.get("/api/tables").await;
    assert_eq!(body["data"]["tables"], json!(["requests"]));

    server.stop().await;
}

#[tokio::test]
async fn test_upload_of_invalid_database_keeps_no_handle() {
    let server = TestServer::start(None).await;

    let (status, body) = server
        .upload("broken.duckdb", b"definitely not duckdb".to_vec())
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "open_failed");

    let (_, body) = server.get("/api/status").await;
    assert_eq!(body["data"]["connected"], false);

    server.stop().await;
}
