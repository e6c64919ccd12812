// src/routes/health.rs

use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::StoreBackend;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResp {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    pub identity_provider: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResp> {
    let store = match state.settings.store.backend {
        StoreBackend::Postgres => "postgres",
        StoreBackend::Memory => "memory",
    };
    Json(HealthResp {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store,
        identity_provider: state.identity.is_some(),
    })
}
