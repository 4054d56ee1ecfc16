use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pdfqa_core::config::{Config, Settings};
use pdfqa_rag::{GeminiGenerator, Services};
use pdfqa_server::{router, AppState};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    let settings = config.settings()?;
    settings.validate_for_server()?;
    info!(env = config.env_name(), "configuration loaded");

    // One dispatcher thread; blocking work goes through the worker pool.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("pdfqa-dispatch")
        .enable_all()
        .build()
        .context("building runtime")?;
    runtime.block_on(serve(settings))
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let services = Services::from_settings(&settings).await?;
    let generator = Arc::new(GeminiGenerator::from_settings(&settings)?);
    info!(model = generator.model(), "generation client ready");

    let state = AppState {
        ingest: Arc::clone(&services.ingest),
        query: Arc::new(services.query(generator)),
        cache: Arc::clone(&services.cache),
    };
    let app = router(state, &settings.server);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", settings.server.host, settings.server.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    } else {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
}
