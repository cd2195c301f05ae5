pub mod error;
pub mod extractors;
pub mod routes;

#[cfg(test)]
mod test_utils;

use axum::{extract::FromRef, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use yatube_core::{cache::PageCache, config::YatubeConfig, Yatube};

#[derive(Clone)]
pub struct AppState {
    pub yatube: Yatube,
}

impl AppState {
    pub fn new(yatube: Yatube) -> Self {
        Self { yatube }
    }
}

impl FromRef<AppState> for Yatube {
    fn from_ref(state: &AppState) -> Self {
        state.yatube.clone()
    }
}

impl FromRef<AppState> for YatubeConfig {
    fn from_ref(state: &AppState) -> Self {
        state.yatube.config.clone()
    }
}

impl FromRef<AppState> for PageCache {
    fn from_ref(state: &AppState) -> Self {
        state.yatube.cache.clone()
    }
}

/// The full application: every route plus request tracing.
pub fn app(state: AppState) -> Router {
    routes::create_router(state).layer(TraceLayer::new_for_http())
}

/// Installs the global subscriber. `RUST_LOG` wins over the `info` default.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
