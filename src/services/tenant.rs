// src/services/tenant.rs

use crate::error::{AppError, AppResult};
use crate::models::{OrgStatus, Organization};
use crate::store::Store;

/// The organization must exist.
pub async fn require(store: &dyn Store, org_id: i64) -> AppResult<Organization> {
    store
        .get_organization(org_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("organization {org_id}")))
}

/// The organization must exist and accept writes.
pub async fn require_active(store: &dyn Store, org_id: i64) -> AppResult<Organization> {
    let org = require(store, org_id).await?;
    if org.status != OrgStatus::Active {
        return Err(AppError::conflict(format!("organization {} is {}", org.code, org.status)));
    }
    Ok(org)
}
