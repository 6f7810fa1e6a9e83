pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::Runtime;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub runtime: Runtime,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(runtime: Runtime, api_key: &str) -> Self {
        Self {
            runtime,
            api_key: Arc::from(api_key),
        }
    }
}

/// Bearer-protected management API.
pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/tls", get(get_tls))
        .route("/admin/tls/reload", post(reload_tls))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Unauthenticated readiness probe served on the TLS listener.
pub fn setup_health_router(runtime: Runtime) -> Router {
    Router::new()
        .route("/healthz", get(get_health))
        .with_state(runtime)
}
