// src/services/testing.rs
//
// Fixtures shared by the service unit tests.

use crate::models::{
    Bed, BedStatus, BedType, NewBed, NewOrganization, NewPatient, OrgStatus, Organization, Patient,
};
use crate::store::Store;

pub async fn seed_org(store: &dyn Store, code: &str) -> Organization {
    store
        .insert_organization(NewOrganization {
            code: code.into(),
            name: format!("{code} Hospital"),
            status: OrgStatus::Active,
            plan: "standard".into(),
            subscription_ends_on: None,
        })
        .await
        .unwrap()
}

pub async fn seed_patient(store: &dyn Store, org_id: i64, name: &str) -> Patient {
    store
        .insert_patient(NewPatient {
            org_id,
            patient_code: format!("PAT-{org_id}-{name}"),
            name: name.into(),
            mobile: "9876543210".into(),
            gender: None,
            date_of_birth: None,
            email: None,
            address: None,
            blood_group: None,
        })
        .await
        .unwrap()
}

pub async fn seed_bed(store: &dyn Store, org_id: i64, bed_number: &str) -> Bed {
    store
        .insert_bed(NewBed {
            org_id,
            bed_number: bed_number.into(),
            ward: "General Ward".into(),
            bed_type: BedType::General,
            status: BedStatus::Available,
            daily_rate: 1200.0,
        })
        .await
        .unwrap()
}
