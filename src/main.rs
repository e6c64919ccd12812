// src/main.rs

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use hms_api::config::{Settings, StoreBackend};
use hms_api::identity::IdentityClient;
use hms_api::store::{MemoryStore, PgStore, Store};
use hms_api::{app, db, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env, settings file and HMS__* environment
    let settings = Settings::load().context("loading configuration")?;
    telemetry::init(&settings.log)?;

    let store: Arc<dyn Store> = match settings.store.backend {
        StoreBackend::Postgres => {
            let pool = db::connect(&settings.database).await.context("connecting to postgres")?;
            let store = PgStore::new(pool);
            if settings.database.run_migrations {
                store.migrate().await.context("running migrations")?;
                info!("migrations applied");
            }
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let identity = IdentityClient::from_config(&settings.identity)?;
    if identity.is_none() {
        info!("no identity provider configured; tenant admin provisioning disabled");
    }

    let addr = settings.bind_addr();
    let state = AppState::new(store, identity, settings);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    info!(%addr, "API listening");

    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
