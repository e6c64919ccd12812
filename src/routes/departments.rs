// src/routes/departments.rs

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::models::Department;
use crate::services::{CreateDepartment, Departments};
use crate::AppState;

pub async fn create_department(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Json(body): Json<CreateDepartment>,
) -> AppResult<Json<Department>> {
    Ok(Json(Departments::new(state.store.as_ref()).create(org_id, body).await?))
}

pub async fn list_departments(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
) -> AppResult<Json<Vec<Department>>> {
    Ok(Json(Departments::new(state.store.as_ref()).list(org_id).await?))
}
