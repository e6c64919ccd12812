// src/services/patients.rs

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{optional, required, tenant, timestamp_suffix, ID_ATTEMPTS};
use crate::error::{AppError, AppResult};
use crate::models::{NewPatient, Patient, PatientFilter, PatientPatch};
use crate::store::{Store, StoreError};

const MAX_PAGE: i64 = 500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterPatient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
}

/// 7 to 15 digits, optionally prefixed with `+`.
fn check_mobile(mobile: &str) -> AppResult<String> {
    let m = required("mobile", mobile)?;
    let digits = m.strip_prefix('+').unwrap_or(&m);
    if !(7..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::validation("mobile must be 7 to 15 digits"));
    }
    Ok(m)
}

pub struct PatientRegistry<'a> {
    store: &'a dyn Store,
}

impl<'a> PatientRegistry<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, req))]
    pub async fn register(&self, org_id: i64, req: RegisterPatient) -> AppResult<Patient> {
        let name = required("name", &req.name)?;
        let mobile = check_mobile(&req.mobile)?;
        tenant::require_active(self.store, org_id).await?;

        let now = Utc::now();
        for attempt in 0..ID_ATTEMPTS {
            let patient_code = format!("PAT{}", timestamp_suffix(now, attempt));
            let new = NewPatient {
                org_id,
                patient_code: patient_code.clone(),
                name: name.clone(),
                mobile: mobile.clone(),
                gender: optional(req.gender.clone()),
                date_of_birth: req.date_of_birth,
                email: optional(req.email.clone()),
                address: optional(req.address.clone()),
                blood_group: optional(req.blood_group.clone()),
            };
            match self.store.insert_patient(new).await {
                Ok(p) => {
                    info!(org_id, patient_id = p.id, %patient_code, "patient registered");
                    return Ok(p);
                }
                Err(StoreError::Duplicate(_)) => {
                    warn!(org_id, %patient_code, attempt, "patient code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::conflict("could not allocate a unique patient code; retry the registration"))
    }

    pub async fn get(&self, org_id: i64, patient_id: i64) -> AppResult<Patient> {
        self.store
            .get_patient(org_id, patient_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("patient {patient_id}")))
    }

    /// Newest first. `limit` is clamped to 1..=500.
    pub async fn list(&self, org_id: i64, mut filter: PatientFilter) -> AppResult<Vec<Patient>> {
        tenant::require(self.store, org_id).await?;
        filter.search = optional(filter.search);
        filter.limit = Some(filter.limit.unwrap_or(50).clamp(1, MAX_PAGE));
        filter.offset = Some(filter.offset.unwrap_or(0).max(0));
        Ok(self.store.list_patients(org_id, &filter).await?)
    }

    pub async fn patch(&self, org_id: i64, patient_id: i64, mut patch: PatientPatch) -> AppResult<Patient> {
        patch.name = patch.name.as_deref().map(|n| required("name", n)).transpose()?;
        patch.mobile = patch.mobile.as_deref().map(check_mobile).transpose()?;
        tenant::require_active(self.store, org_id).await?;

        self.store
            .update_patient(org_id, patient_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(format!("patient {patient_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::seed_org;
    use crate::store::MemoryStore;

    fn person(name: &str, mobile: &str) -> RegisterPatient {
        RegisterPatient { name: name.into(), mobile: mobile.into(), ..Default::default() }
    }

    #[test]
    fn mobile_format() {
        assert!(check_mobile("9876543210").is_ok());
        assert!(check_mobile("+919876543210").is_ok());
        assert!(check_mobile("12345").is_err());
        assert!(check_mobile("98765-43210").is_err());
        assert!(check_mobile("").is_err());
    }

    #[tokio::test]
    async fn register_assigns_a_patient_code() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let reg = PatientRegistry::new(&store);

        let p = reg.register(org.id, person("Asha Rao", " 9876543210 ")).await.unwrap();
        assert!(p.patient_code.starts_with("PAT"));
        assert_eq!(p.patient_code.len(), 9);
        assert_eq!(p.mobile, "9876543210");
        assert_eq!(reg.get(org.id, p.id).await.unwrap().name, "Asha Rao");
    }

    #[tokio::test]
    async fn codes_stay_unique_under_burst_registration() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let reg = PatientRegistry::new(&store);

        let mut codes = std::collections::HashSet::new();
        for i in 0..3 {
            let p = reg.register(org.id, person(&format!("P{i}"), "9876543210")).await.unwrap();
            assert!(codes.insert(p.patient_code));
        }
    }

    #[tokio::test]
    async fn search_and_paging() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let reg = PatientRegistry::new(&store);
        for name in ["Ravi Kumar", "Meena Iyer", "Ravindra Das"] {
            reg.register(org.id, person(name, "9000000000")).await.unwrap();
        }

        let ravis = reg
            .list(org.id, PatientFilter { search: Some("ravi".into()), ..Default::default() })
            .await
            .unwrap();
        let names: Vec<_> = ravis.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Ravindra Das", "Ravi Kumar"]);

        let page = reg
            .list(org.id, PatientFilter { limit: Some(0), offset: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Meena Iyer");
    }

    #[tokio::test]
    async fn patch_validates_and_is_tenant_scoped() {
        let store = MemoryStore::new();
        let h1 = seed_org(&store, "H1").await;
        let h2 = seed_org(&store, "H2").await;
        let reg = PatientRegistry::new(&store);
        let p = reg.register(h1.id, person("Old Name", "9876543210")).await.unwrap();

        let bad = PatientPatch { mobile: Some("abc".into()), ..Default::default() };
        assert!(matches!(reg.patch(h1.id, p.id, bad).await, Err(AppError::Validation(_))));

        let rename = PatientPatch { name: Some("New Name".into()), ..Default::default() };
        assert!(matches!(reg.patch(h2.id, p.id, rename.clone()).await, Err(AppError::NotFound(_))));
        assert_eq!(reg.patch(h1.id, p.id, rename).await.unwrap().name, "New Name");
    }

    #[tokio::test]
    async fn register_requires_name() {
        let store = MemoryStore::new();
        let org = seed_org(&store, "H1").await;
        let err = PatientRegistry::new(&store).register(org.id, person(" ", "9876543210")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
