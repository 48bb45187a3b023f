use anyhow::{Context, Result};
use site_i18n::config::Config;
use site_i18n::db::Database;
use site_i18n::defaults::DefaultsCatalog;
use site_i18n::engine::TranslationEngine;
use site_i18n::i18n::BundleSet;
use site_i18n::pipeline::Pipeline;
use site_i18n::resolver::Resolver;
use site_i18n::server::{build_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_i18n=info".parse()?),
        )
        .init();

    info!("Starting site-i18n service");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, environment = %config.environment, "Configuration loaded");

    let db = Database::new(&config.database_path).context("failed to open database")?;
    let bundles = BundleSet::load(&config.locales_dir).context("failed to load locale bundles")?;
    info!(
        messages = bundles.message_count(site_i18n::Locale::source()),
        "Locale bundles loaded"
    );

    let client = config.http_client()?;
    let engine = Arc::new(TranslationEngine::from_config(client, &config));
    if engine.is_available() {
        info!(providers = ?engine.provider_names(), "Translation providers configured");
    } else {
        info!("No translation provider configured, pipeline will stall until one is");
    }

    let pipeline = Arc::new(Pipeline::new(db.clone(), engine.clone(), &config));
    let resolver = Arc::new(Resolver::new(db.clone(), bundles, DefaultsCatalog::new()));

    let app = build_router(AppState {
        db,
        resolver,
        engine,
        pipeline,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;
    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
