use std::sync::Arc;

use anyhow::Context;
use scholarship_assist::cli::Dispatcher;
use scholarship_assist::config::AppConfig;
use scholarship_assist::matcher::{JsonFileDataset, ScholarshipFinder};
use scholarship_assist::review::{ApprovalGate, DurableConfirmations};
use scholarship_assist::session::SessionManager;
use scholarship_assist::store::{Database, LibSqlBackend};
use scholarship_assist::tools::{ToolRegistry, register_builtin};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries tool results only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("🎓 Scholarship Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Dataset: {}", config.dataset_path.display());
    eprintln!("   Top K: {}", config.default_top_k);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("opening database at {}", config.db_path.display()))?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    // ── Core services ────────────────────────────────────────────────────
    let sessions = Arc::new(SessionManager::new(Arc::clone(&db)));
    let gate = Arc::new(ApprovalGate::new(Arc::new(DurableConfirmations::new(db))));
    let finder = Arc::new(ScholarshipFinder::new(Arc::new(JsonFileDataset::new(
        config.dataset_path.clone(),
    ))));

    let registry = Arc::new(ToolRegistry::new());
    register_builtin(&registry, finder, gate, config.default_top_k);
    let tools: Vec<String> = registry
        .tool_definitions()
        .await
        .into_iter()
        .map(|d| d.name)
        .collect();
    eprintln!("   Tools: {}\n", tools.join(", "));

    let dispatcher = Dispatcher::new(sessions, registry, config.user_id.clone());
    let handled = dispatcher
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    tracing::info!(invocations = handled, "Input closed, shutting down");
    Ok(())
}
