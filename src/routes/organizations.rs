// src/routes/organizations.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{OrgStatus, Organization, OrganizationPatch};
use crate::services::{CreateOrganization, TenantRegistry};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQ {
    pub status: Option<OrgStatus>,
}

fn registry(state: &AppState) -> TenantRegistry<'_> {
    TenantRegistry::new(state.store.as_ref(), state.identity.as_ref())
}

pub async fn list_orgs(
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> AppResult<Json<Vec<Organization>>> {
    Ok(Json(registry(&state).list(q.status).await?))
}

pub async fn get_org(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Organization>> {
    Ok(Json(registry(&state).get(id).await?))
}

pub async fn create_org(
    State(state): State<AppState>,
    Json(body): Json<CreateOrganization>,
) -> AppResult<Json<Organization>> {
    Ok(Json(registry(&state).create(body).await?))
}

pub async fn patch_org(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<OrganizationPatch>,
) -> AppResult<Json<Organization>> {
    Ok(Json(registry(&state).patch(id, body).await?))
}
