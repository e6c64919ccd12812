// src/services/beds.rs
//
// Resource pool. Bed status is the single authority on assignability; only the
// admission lifecycle moves a bed into or out of `occupied`.

use serde::Deserialize;
use tracing::{info, instrument};

use super::{required, tenant};
use crate::error::{AppError, AppResult};
use crate::models::{Bed, BedFilter, BedPatch, BedStatus, BedType, NewBed};
use crate::store::Store;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBed {
    #[serde(default)]
    pub bed_number: String,
    #[serde(default)]
    pub ward: String,
    #[serde(default)]
    pub bed_type: BedType,
    pub status: Option<BedStatus>,
    #[serde(default)]
    pub daily_rate: f64,
}

fn check_rate(rate: f64) -> AppResult<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(AppError::validation("daily_rate must be a non-negative number"));
    }
    Ok(())
}

pub struct BedPool<'a> {
    store: &'a dyn Store,
}

impl<'a> BedPool<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn list(&self, org_id: i64, filter: &BedFilter) -> AppResult<Vec<Bed>> {
        tenant::require(self.store, org_id).await?;
        Ok(self.store.list_beds(org_id, filter).await?)
    }

    pub async fn get(&self, org_id: i64, bed_id: i64) -> AppResult<Bed> {
        self.store
            .get_bed(org_id, bed_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("bed {bed_id}")))
    }

    #[instrument(skip(self, req), fields(bed_number = %req.bed_number))]
    pub async fn create(&self, org_id: i64, req: CreateBed) -> AppResult<Bed> {
        let bed_number = required("bed_number", &req.bed_number)?;
        let ward = required("ward", &req.ward)?;
        check_rate(req.daily_rate)?;
        let status = req.status.unwrap_or(BedStatus::Available);
        if status == BedStatus::Occupied {
            return Err(AppError::validation("a bed cannot be created as occupied"));
        }
        tenant::require_active(self.store, org_id).await?;

        let bed = self
            .store
            .insert_bed(NewBed {
                org_id,
                bed_number,
                ward,
                bed_type: req.bed_type,
                status,
                daily_rate: req.daily_rate,
            })
            .await?;
        info!(org_id, bed_id = bed.id, "bed created");
        Ok(bed)
    }

    pub async fn update(&self, org_id: i64, bed_id: i64, mut patch: BedPatch) -> AppResult<Bed> {
        patch.bed_number = patch.bed_number.as_deref().map(|n| required("bed_number", n)).transpose()?;
        patch.ward = patch.ward.as_deref().map(|w| required("ward", w)).transpose()?;
        if let Some(rate) = patch.daily_rate {
            check_rate(rate)?;
        }
        tenant::require_active(self.store, org_id).await?;

        self.store
            .update_bed(org_id, bed_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(format!("bed {bed_id}")))
    }

    /// Plain status write with no cross-check against admissions.
    pub async fn set_status(&self, org_id: i64, bed_id: i64, status: BedStatus) -> AppResult<Bed> {
        self.store
            .set_bed_status(org_id, bed_id, status)
            .await?
            .ok_or_else(|| AppError::not_found(format!("bed {bed_id}")))
    }

    /// Admin toggle between `available` and `maintenance`.
    #[instrument(skip(self))]
    pub async fn change_status_manually(
        &self,
        org_id: i64,
        bed_id: i64,
        status: BedStatus,
    ) -> AppResult<Bed> {
        tenant::require_active(self.store, org_id).await?;
        let bed = self.get(org_id, bed_id).await?;
        if status == BedStatus::Occupied {
            return Err(AppError::conflict("beds become occupied only through an admission"));
        }
        if bed.status == BedStatus::Occupied {
            return Err(AppError::conflict(format!(
                "bed {} is occupied; discharge the patient to release it",
                bed.bed_number
            )));
        }
        let bed = self.set_status(org_id, bed_id, status).await?;
        info!(org_id, bed_id, status = %status, "bed status changed");
        Ok(bed)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, org_id: i64, bed_id: i64) -> AppResult<()> {
        tenant::require_active(self.store, org_id).await?;
        let bed = self.get(org_id, bed_id).await?;
        if bed.status == BedStatus::Occupied {
            return Err(AppError::conflict(format!("bed {} is occupied", bed.bed_number)));
        }
        // the store re-checks status at write time and refuses beds with admission history
        if !self.store.delete_bed(org_id, bed_id).await? {
            return Err(AppError::conflict(format!("bed {} is occupied", bed.bed_number)));
        }
        info!(org_id, bed_id, "bed deleted");
        Ok(())
    }
}
