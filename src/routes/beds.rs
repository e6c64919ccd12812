// src/routes/beds.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{Bed, BedFilter, BedPatch, BedStatus, Deleted};
use crate::services::{BedPool, CreateBed};
use crate::AppState;

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: BedStatus,
}

pub async fn create_bed(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Json(body): Json<CreateBed>,
) -> AppResult<Json<Bed>> {
    Ok(Json(BedPool::new(state.store.as_ref()).create(org_id, body).await?))
}

/// `?status=&ward=&bed_type=`, ordered by bed number.
pub async fn list_beds(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Query(q): Query<BedFilter>,
) -> AppResult<Json<Vec<Bed>>> {
    Ok(Json(BedPool::new(state.store.as_ref()).list(org_id, &q).await?))
}

pub async fn get_bed(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
) -> AppResult<Json<Bed>> {
    Ok(Json(BedPool::new(state.store.as_ref()).get(org_id, id).await?))
}

pub async fn patch_bed(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
    Json(body): Json<BedPatch>,
) -> AppResult<Json<Bed>> {
    Ok(Json(BedPool::new(state.store.as_ref()).update(org_id, id, body).await?))
}

/// Manual toggle between `available` and `maintenance`.
pub async fn put_bed_status(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
    Json(body): Json<StatusBody>,
) -> AppResult<Json<Bed>> {
    let bed = BedPool::new(state.store.as_ref())
        .change_status_manually(org_id, id, body.status)
        .await?;
    Ok(Json(bed))
}

pub async fn delete_bed(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
) -> AppResult<Json<Deleted>> {
    BedPool::new(state.store.as_ref()).delete(org_id, id).await?;
    Ok(Json(Deleted { deleted: true }))
}
