// src/lib.rs
//
// Multi-tenant hospital resource-lifecycle service: beds, OPD queue tokens, IPD
// admissions and their daily clinical records.

use std::sync::Arc;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod telemetry;

use config::Settings;
use identity::IdentityClient;
use store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Option<IdentityClient>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, identity: Option<IdentityClient>, settings: Settings) -> Self {
        Self { store, identity, settings: Arc::new(settings) }
    }
}

/// Full router with middleware, ready to serve.
pub fn app(state: AppState) -> Router {
    // Very permissive CORS; the service sits behind an authenticating gateway
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::api()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
