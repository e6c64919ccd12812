// src/services/admissions.rs
//
// IPD admission lifecycle. The only component that moves a bed into or out of
// `occupied`; every such move is paired with the admission write in one store call.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{optional, tenant, timestamp_suffix, ID_ATTEMPTS};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdmissionFilter, AdmissionStatus, BedStatus, CloseAdmission, IpdAdmission, NewAdmission,
};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct AdmitPatient {
    pub patient_id: Option<i64>,
    pub bed_id: Option<i64>,
    pub department_id: Option<i64>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

pub struct AdmissionLifecycle<'a> {
    store: &'a dyn Store,
}

impl<'a> AdmissionLifecycle<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, req), fields(patient_id = ?req.patient_id, bed_id = ?req.bed_id))]
    pub async fn admit(&self, org_id: i64, req: AdmitPatient) -> AppResult<IpdAdmission> {
        let (Some(patient_id), Some(bed_id)) = (req.patient_id, req.bed_id) else {
            return Err(AppError::validation("patient_id and bed_id are required"));
        };
        tenant::require_active(self.store, org_id).await?;

        if self.store.get_patient(org_id, patient_id).await?.is_none() {
            return Err(AppError::validation(format!(
                "patient {patient_id} does not exist in this organization"
            )));
        }
        let Some(bed) = self.store.get_bed(org_id, bed_id).await? else {
            return Err(AppError::validation(format!(
                "bed {bed_id} does not exist in this organization"
            )));
        };
        if let Some(dept) = req.department_id {
            if self.store.get_department(org_id, dept).await?.is_none() {
                return Err(AppError::validation(format!(
                    "department {dept} does not exist in this organization"
                )));
            }
        }
        if bed.status != BedStatus::Available {
            return Err(AppError::conflict(format!(
                "bed {} not available ({})",
                bed.bed_number, bed.status
            )));
        }

        let diagnosis = optional(req.diagnosis);
        let notes = optional(req.notes);
        let now = Utc::now();
        for attempt in 0..ID_ATTEMPTS {
            let ip_number = format!("IP{}", timestamp_suffix(now, attempt));
            let new = NewAdmission {
                org_id,
                patient_id,
                bed_id,
                department_id: req.department_id,
                ip_number: ip_number.clone(),
                admission_date: now,
                diagnosis: diagnosis.clone(),
                notes: notes.clone(),
            };
            match self.store.commit_admission(new).await {
                Ok(admission) => {
                    info!(org_id, admission_id = admission.id, %ip_number, bed = %bed.bed_number, "patient admitted");
                    return Ok(admission);
                }
                Err(StoreError::Duplicate(_)) => {
                    warn!(org_id, %ip_number, attempt, "ip number collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::conflict("could not allocate a unique ip number; retry the admission"))
    }

    pub async fn discharge(&self, org_id: i64, admission_id: i64) -> AppResult<IpdAdmission> {
        self.close(org_id, admission_id, AdmissionStatus::Discharged).await
    }

    /// Patient leaves for another facility; the bed is released like a discharge.
    pub async fn transfer_out(&self, org_id: i64, admission_id: i64) -> AppResult<IpdAdmission> {
        self.close(org_id, admission_id, AdmissionStatus::Transferred).await
    }

    #[instrument(skip(self))]
    async fn close(
        &self,
        org_id: i64,
        admission_id: i64,
        status: AdmissionStatus,
    ) -> AppResult<IpdAdmission> {
        tenant::require_active(self.store, org_id).await?;
        let closed = self
            .store
            .close_admission(org_id, admission_id, CloseAdmission { status, discharge_date: Utc::now() })
            .await?;
        info!(org_id, admission_id, bed_id = closed.bed_id, status = %closed.status, "admission closed, bed released");
        Ok(closed)
    }

    pub async fn get(&self, org_id: i64, admission_id: i64) -> AppResult<IpdAdmission> {
        self.store
            .get_admission(org_id, admission_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("admission {admission_id}")))
    }

    pub async fn list(&self, org_id: i64, filter: &AdmissionFilter) -> AppResult<Vec<IpdAdmission>> {
        tenant::require(self.store, org_id).await?;
        Ok(self.store.list_admissions(org_id, filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::OrganizationPatch;
    use crate::models::OrgStatus;
    use crate::services::testing::{seed_bed, seed_org, seed_patient};
    use crate::services::BedPool;
    use crate::store::MemoryStore;

    fn admit(patient_id: i64, bed_id: i64) -> AdmitPatient {
        AdmitPatient {
            patient_id: Some(patient_id),
            bed_id: Some(bed_id),
            department_id: None,
            diagnosis: Some("pneumonia".into()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn admit_occupies_bed_and_numbers_the_stay() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let p1 = seed_patient(&store, org.id, "P1").await;
        let a101 = seed_bed(&store, org.id, "A101").await;
        let ipd = AdmissionLifecycle::new(&store);

        let adm = ipd.admit(org.id, admit(p1.id, a101.id)).await.unwrap();
        assert_eq!(adm.status, AdmissionStatus::Admitted);
        assert!(adm.discharge_date.is_none());
        assert!(adm.ip_number.starts_with("IP"));
        assert_eq!(adm.ip_number.len(), 8);
        assert!(adm.ip_number[2..].chars().all(|c| c.is_ascii_digit()));

        let bed = BedPool::new(&store).get(org.id, a101.id).await.unwrap();
        assert_eq!(bed.status, BedStatus::Occupied);
    }

    #[tokio::test]
    async fn admit_into_unavailable_bed_creates_nothing() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let p1 = seed_patient(&store, org.id, "P1").await;
        let bed = seed_bed(&store, org.id, "B1").await;
        BedPool::new(&store).set_status(org.id, bed.id, BedStatus::Maintenance).await.unwrap();
        let ipd = AdmissionLifecycle::new(&store);

        let err = ipd.admit(org.id, admit(p1.id, bed.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "{err:?}");
        assert!(ipd.list(org.id, &AdmissionFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admit_validates_inputs_before_touching_the_bed() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let other = seed_org(&store, "H2").await;
        let p1 = seed_patient(&store, org.id, "P1").await;
        let foreign_bed = seed_bed(&store, other.id, "X1").await;
        let ipd = AdmissionLifecycle::new(&store);

        let missing = AdmitPatient { bed_id: None, ..admit(p1.id, 0) };
        assert!(matches!(ipd.admit(org.id, missing).await, Err(AppError::Validation(_))));

        // a bed from another tenant is not visible here
        let err = ipd.admit(org.id, admit(p1.id, foreign_bed.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let bed = BedPool::new(&store).get(other.id, foreign_bed.id).await.unwrap();
        assert_eq!(bed.status, BedStatus::Available);
    }

    #[tokio::test]
    async fn bed_freed_by_hand_still_holds_its_open_stay() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let p1 = seed_patient(&store, org.id, "P1").await;
        let p2 = seed_patient(&store, org.id, "P2").await;
        let b1 = seed_bed(&store, org.id, "B1").await;
        let ipd = AdmissionLifecycle::new(&store);

        ipd.admit(org.id, admit(p1.id, b1.id)).await.unwrap();
        BedPool::new(&store).set_status(org.id, b1.id, BedStatus::Available).await.unwrap();

        let err = ipd.admit(org.id, admit(p2.id, b1.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "bed not available"), "{err:?}");
        let open = ipd
            .list(org.id, &AdmissionFilter { bed_id: Some(b1.id), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn discharge_releases_bed() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let p1 = seed_patient(&store, org.id, "P1").await;
        let b1 = seed_bed(&store, org.id, "B1").await;
        let ipd = AdmissionLifecycle::new(&store);
        let a1 = ipd.admit(org.id, admit(p1.id, b1.id)).await.unwrap();

        let done = ipd.discharge(org.id, a1.id).await.unwrap();
        assert_eq!(done.status, AdmissionStatus::Discharged);
        assert!(done.discharge_date.is_some());
        let bed = BedPool::new(&store).get(org.id, b1.id).await.unwrap();
        assert_eq!(bed.status, BedStatus::Available);
    }

    #[tokio::test]
    async fn closed_admissions_stay_closed() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let p1 = seed_patient(&store, org.id, "P1").await;
        let b1 = seed_bed(&store, org.id, "B1").await;
        let ipd = AdmissionLifecycle::new(&store);

        let a1 = ipd.admit(org.id, admit(p1.id, b1.id)).await.unwrap();
        ipd.discharge(org.id, a1.id).await.unwrap();
        assert!(matches!(ipd.discharge(org.id, a1.id).await, Err(AppError::Conflict(_))));
        assert!(matches!(ipd.transfer_out(org.id, a1.id).await, Err(AppError::Conflict(_))));

        // the bed was re-let in the meantime; a stale discharge must not free it
        let p2 = seed_patient(&store, org.id, "P2").await;
        ipd.admit(org.id, admit(p2.id, b1.id)).await.unwrap();
        assert!(ipd.discharge(org.id, a1.id).await.is_err());
        let bed = BedPool::new(&store).get(org.id, b1.id).await.unwrap();
        assert_eq!(bed.status, BedStatus::Occupied);
    }

    #[tokio::test]
    async fn transfer_out_is_terminal_and_frees_bed() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let p1 = seed_patient(&store, org.id, "P1").await;
        let b1 = seed_bed(&store, org.id, "B1").await;
        let ipd = AdmissionLifecycle::new(&store);
        let a1 = ipd.admit(org.id, admit(p1.id, b1.id)).await.unwrap();

        let moved = ipd.transfer_out(org.id, a1.id).await.unwrap();
        assert_eq!(moved.status, AdmissionStatus::Transferred);
        assert_eq!(BedPool::new(&store).get(org.id, b1.id).await.unwrap().status, BedStatus::Available);
        assert!(matches!(ipd.discharge(org.id, a1.id).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_admits_on_one_bed_admit_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let org = seed_org(&*store, "H1").await;
        let bed = seed_bed(&*store, org.id, "B2").await;
        let mut patients = Vec::new();
        for i in 0..8 {
            patients.push(seed_patient(&*store, org.id, &format!("P{i}")).await.id);
        }
        let (org_id, bed_id) = (org.id, bed.id);

        let handles: Vec<_> = patients
            .into_iter()
            .map(|patient_id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    AdmissionLifecycle::new(&*store).admit(org_id, admit(patient_id, bed_id)).await
                })
            })
            .collect();

        let mut admitted = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(AppError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(admitted, 1);

        let open = AdmissionLifecycle::new(&*store)
            .list(org_id, &AdmissionFilter { status: Some(AdmissionStatus::Admitted), bed_id: Some(bed_id), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn suspended_tenant_cannot_admit() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let p1 = seed_patient(&store, org.id, "P1").await;
        let b1 = seed_bed(&store, org.id, "B1").await;
        store
            .update_organization(org.id, OrganizationPatch { status: Some(OrgStatus::Suspended), ..Default::default() })
            .await
            .unwrap();

        let err = AdmissionLifecycle::new(&store).admit(org.id, admit(p1.id, b1.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
