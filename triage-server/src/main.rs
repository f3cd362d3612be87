use triage_core::analyzer::Analyzer;
use triage_core::config::TriageConfig;
use triage_core::profile::ProfileStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = TriageConfig::from_env();
    if config.llm.is_none() {
        tracing::warn!("no generation credential configured; analysis runs will fail until one is set");
    }

    let analyzer = Analyzer::from_config(config).expect("build analyzer");
    let profiles = ProfileStore::open(
        &std::env::var("TRIAGE_DB_PATH").unwrap_or_else(|_| "triage.db".into()),
    )
    .expect("open profile store");

    let app = triage_server::routes::router(analyzer, profiles);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("bind :8080");

    println!("triage-server listening on :8080");
    axum::serve(listener, app).await.expect("serve");
}
