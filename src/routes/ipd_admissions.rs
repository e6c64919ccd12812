// src/routes/ipd_admissions.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::error::AppResult;
use crate::models::{AdmissionFilter, IpdAdmission, IpdDailyRecord};
use crate::services::{AdmissionLifecycle, AdmitPatient, AppendRecord, DailyRecordLog};
use crate::AppState;

pub async fn admit(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Json(body): Json<AdmitPatient>,
) -> AppResult<Json<IpdAdmission>> {
    Ok(Json(AdmissionLifecycle::new(state.store.as_ref()).admit(org_id, body).await?))
}

/// `?status=&patient_id=&bed_id=`, newest first.
pub async fn list_admissions(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Query(q): Query<AdmissionFilter>,
) -> AppResult<Json<Vec<IpdAdmission>>> {
    Ok(Json(AdmissionLifecycle::new(state.store.as_ref()).list(org_id, &q).await?))
}

pub async fn get_admission(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
) -> AppResult<Json<IpdAdmission>> {
    Ok(Json(AdmissionLifecycle::new(state.store.as_ref()).get(org_id, id).await?))
}

pub async fn discharge(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
) -> AppResult<Json<IpdAdmission>> {
    Ok(Json(AdmissionLifecycle::new(state.store.as_ref()).discharge(org_id, id).await?))
}

pub async fn transfer_out(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
) -> AppResult<Json<IpdAdmission>> {
    Ok(Json(AdmissionLifecycle::new(state.store.as_ref()).transfer_out(org_id, id).await?))
}

pub async fn append_daily_record(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
    Json(body): Json<AppendRecord>,
) -> AppResult<Json<IpdDailyRecord>> {
    Ok(Json(DailyRecordLog::new(state.store.as_ref()).append(org_id, id, body).await?))
}

pub async fn list_daily_records(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
) -> AppResult<Json<Vec<IpdDailyRecord>>> {
    Ok(Json(DailyRecordLog::new(state.store.as_ref()).list(org_id, id).await?))
}
