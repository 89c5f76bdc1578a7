use pdf_chat::api::{create_router, AppState};
use pdf_chat::application::SessionRegistry;
use pdf_chat::infrastructure::{init_tracing, session_services, AppConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("api=debug,pdf_chat=debug,tower_http=debug");

    let config = AppConfig::from_env()?;
    let cfg = &config.config;

    let services = Arc::new(session_services(&config)?);
    let idle_timeout = chrono::Duration::seconds(cfg.session.idle_timeout_seconds as i64);
    let sweep_every = Duration::from_secs(cfg.session.sweep_interval_seconds.max(1));
    let addr = SocketAddr::new(cfg.server.host.parse()?, cfg.server.port);

    let state = AppState::new(config, SessionRegistry::new(services, idle_timeout));
    spawn_idle_sweeper(state.clone(), sweep_every);

    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

fn spawn_idle_sweeper(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let dropped = state.sessions.sweep_idle(chrono::Utc::now()).await;
            if dropped > 0 {
                let remaining = state.sessions.len().await;
                info!(dropped, remaining, "idle sessions swept");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    info!("shutdown requested");
}
