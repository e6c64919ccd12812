// src/routes/patients.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::error::AppResult;
use crate::models::{Patient, PatientFilter, PatientPatch};
use crate::services::{PatientRegistry, RegisterPatient};
use crate::AppState;

pub async fn register_patient(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Json(body): Json<RegisterPatient>,
) -> AppResult<Json<Patient>> {
    Ok(Json(PatientRegistry::new(state.store.as_ref()).register(org_id, body).await?))
}

/// `?search=&limit=&offset=`
pub async fn list_patients(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Query(q): Query<PatientFilter>,
) -> AppResult<Json<Vec<Patient>>> {
    Ok(Json(PatientRegistry::new(state.store.as_ref()).list(org_id, q).await?))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
) -> AppResult<Json<Patient>> {
    Ok(Json(PatientRegistry::new(state.store.as_ref()).get(org_id, id).await?))
}

pub async fn patch_patient(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
    Json(body): Json<PatientPatch>,
) -> AppResult<Json<Patient>> {
    Ok(Json(PatientRegistry::new(state.store.as_ref()).patch(org_id, id, body).await?))
}
