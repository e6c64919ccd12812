// src/store/mod.rs
//
// Persistence seam. Every read and write is tenant-scoped by `org_id`; a row that
// exists under another organization is indistinguishable from a missing row.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    AdmissionFilter, Bed, BedFilter, BedPatch, BedStatus, CloseAdmission, Department,
    IpdAdmission, IpdDailyRecord, NewAdmission, NewBed, NewDailyRecord, NewDepartment,
    NewOpdToken, NewOrganization, NewPatient, OpdToken, OrgStatus, Organization,
    OrganizationPatch, Patient, PatientFilter, PatientPatch, TokenFilter, TokenStatusUpdate,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// A unique key already exists; carries the offending field name.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// A guarded write found the row in the wrong state.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // organizations (not tenant-scoped: super-admin surface)
    async fn insert_organization(&self, new: NewOrganization) -> StoreResult<Organization>;
    async fn get_organization(&self, id: i64) -> StoreResult<Option<Organization>>;
    async fn list_organizations(&self, status: Option<OrgStatus>) -> StoreResult<Vec<Organization>>;
    async fn update_organization(
        &self,
        id: i64,
        patch: OrganizationPatch,
    ) -> StoreResult<Option<Organization>>;

    // departments
    async fn insert_department(&self, new: NewDepartment) -> StoreResult<Department>;
    async fn get_department(&self, org_id: i64, id: i64) -> StoreResult<Option<Department>>;
    async fn list_departments(&self, org_id: i64) -> StoreResult<Vec<Department>>;

    // patients
    async fn insert_patient(&self, new: NewPatient) -> StoreResult<Patient>;
    async fn get_patient(&self, org_id: i64, id: i64) -> StoreResult<Option<Patient>>;
    async fn list_patients(&self, org_id: i64, filter: &PatientFilter) -> StoreResult<Vec<Patient>>;
    async fn update_patient(
        &self,
        org_id: i64,
        id: i64,
        patch: PatientPatch,
    ) -> StoreResult<Option<Patient>>;

    // beds
    async fn insert_bed(&self, new: NewBed) -> StoreResult<Bed>;
    async fn get_bed(&self, org_id: i64, id: i64) -> StoreResult<Option<Bed>>;
    /// Ordered by `bed_number`.
    async fn list_beds(&self, org_id: i64, filter: &BedFilter) -> StoreResult<Vec<Bed>>;
    async fn update_bed(&self, org_id: i64, id: i64, patch: BedPatch) -> StoreResult<Option<Bed>>;
    /// Unconditional write; callers own the occupancy invariant.
    async fn set_bed_status(
        &self,
        org_id: i64,
        id: i64,
        status: BedStatus,
    ) -> StoreResult<Option<Bed>>;
    /// Conditional repair write: sets `status` only while the bed is still `expected`
    /// and its open admissions still agree (`occupied` iff one is `admitted`).
    async fn reconcile_bed_status(
        &self,
        org_id: i64,
        id: i64,
        expected: BedStatus,
        status: BedStatus,
    ) -> StoreResult<Option<Bed>>;
    /// Deletes only while the bed is not `occupied`. Returns whether a row was removed.
    /// A bed referenced by any admission is a [`StoreError::Conflict`].
    async fn delete_bed(&self, org_id: i64, id: i64) -> StoreResult<bool>;

    // opd tokens
    async fn max_token_number(&self, org_id: i64, date: NaiveDate) -> StoreResult<Option<i32>>;
    /// Assigns `token_number` atomically with the insert.
    async fn issue_token(&self, new: NewOpdToken) -> StoreResult<OpdToken>;
    async fn get_token(&self, org_id: i64, id: i64) -> StoreResult<Option<OpdToken>>;
    /// Ordered by `token_date`, then `token_number`.
    async fn list_tokens(&self, org_id: i64, filter: &TokenFilter) -> StoreResult<Vec<OpdToken>>;
    /// Returns `None` when the token is missing or no longer in `update.expected`.
    async fn update_token_status(
        &self,
        org_id: i64,
        id: i64,
        update: TokenStatusUpdate,
    ) -> StoreResult<Option<OpdToken>>;

    // ipd admissions
    /// Inserts the admission and claims the bed (`available` → `occupied`) as one unit.
    /// Fails with [`StoreError::Conflict`] when the bed is not available at write time
    /// or already holds an `admitted` stay.
    async fn commit_admission(&self, new: NewAdmission) -> StoreResult<IpdAdmission>;
    async fn get_admission(&self, org_id: i64, id: i64) -> StoreResult<Option<IpdAdmission>>;
    async fn list_admissions(
        &self,
        org_id: i64,
        filter: &AdmissionFilter,
    ) -> StoreResult<Vec<IpdAdmission>>;
    /// Ends an `admitted` stay and releases its bed as one unit.
    async fn close_admission(
        &self,
        org_id: i64,
        id: i64,
        close: CloseAdmission,
    ) -> StoreResult<IpdAdmission>;

    // ipd daily records
    /// Appends while the parent admission is `admitted`.
    async fn append_daily_record(&self, new: NewDailyRecord) -> StoreResult<IpdDailyRecord>;
    async fn list_daily_records(
        &self,
        org_id: i64,
        admission_id: i64,
    ) -> StoreResult<Vec<IpdDailyRecord>>;
}
