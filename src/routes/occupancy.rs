// src/routes/occupancy.rs

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::services::{OccupancyAudit, OccupancyReport, RepairReport};
use crate::AppState;

pub async fn audit(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
) -> AppResult<Json<OccupancyReport>> {
    Ok(Json(OccupancyAudit::new(state.store.as_ref()).audit(org_id).await?))
}

pub async fn repair(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
) -> AppResult<Json<RepairReport>> {
    Ok(Json(OccupancyAudit::new(state.store.as_ref()).repair(org_id).await?))
}
