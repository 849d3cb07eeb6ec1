use std::sync::Arc;

use dejamoo::clock::{Clock, SystemClock};
use dejamoo::config::{BackendKind, EngineConfig};
use dejamoo::net::api::Backend;
use dejamoo::net::http::HttpBackend;
use dejamoo::net::memory::MemoryBackend;
use dejamoo::services::{expiration, markers};
use dejamoo::state::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = EngineConfig::from_env().expect("invalid configuration");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let backend: Arc<dyn Backend> = match config.backend {
        BackendKind::Http => Arc::new(HttpBackend::new(&config).expect("http client init failed")),
        BackendKind::Memory => {
            tracing::info!("using seeded in-memory backend");
            Arc::new(MemoryBackend::seeded(clock.now_ms()))
        }
    };
    tracing::info!(backend = ?config.backend, api = %config.api_base_url, "backend configured");

    let state = AppState::new(backend, clock, config);

    match markers::load_markers(&state).await {
        Ok(count) => {
            let countdowns = expiration::active_countdowns(&state).await;
            tracing::info!(count, countdowns, "dejamoo map ready");
        }
        Err(e) => tracing::warn!(error = %e, code = e.error_code(), "initial marker load failed"),
    }

    state.flush_surface().await;
    let mut flush = tokio::time::interval(state.config.expiry_tick);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "failed to listen for shutdown signal");
                }
                break;
            }
            _ = flush.tick() => {
                state.flush_surface().await;
            }
        }
    }

    state.teardown().await;
    tracing::info!("dejamoo stopped");
}
