//! duck-console - a browser SQL console for a single DuckDB file.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use cli::Cli;
use duck_console::config::Config;
use duck_console::connection::ConnectionManager;
use duck_console::db::DuckDbConnector;
use duck_console::llm::Translator;
use duck_console::logging;
use duck_console::server::{self, AppState, UploadStore};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    // Precedence: CLI > environment > config file > defaults
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env();
    cli.apply_to(&mut config);
    let provider = config.llm.provider()?;

    let database_path = config.database_path();
    let connector = Arc::new(DuckDbConnector::new(config.database.read_only));
    let mut manager = ConnectionManager::new(connector, database_path.clone());
    if let Err(e) = manager.connect(&database_path).await {
        warn!(
            path = %database_path.display(),
            error = %e,
            "Database not opened at startup, will retry on first query"
        );
    }

    let translator = match Translator::from_config(&config.llm) {
        Ok(translator) => {
            info!(%provider, model = %config.llm.model, "Translation enabled");
            Some(translator)
        }
        Err(e) => {
            warn!(error = %e, "Translation disabled");
            None
        }
    };

    let uploads = UploadStore::new()?;
    let state = AppState::new(manager, translator, uploads);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    server::serve(
        listener,
        state,
        config.server.upload_limit_bytes(),
        server::shutdown_signal(),
    )
    .await?;

    Ok(())
}
