// src/store/memory.rs
//
// In-process store. One async mutex guards every table, so each trait call is a
// serializable unit; the guarded lifecycle writes behave like their Postgres
// counterparts.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::types::Json;
use tokio::sync::Mutex;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    AdmissionFilter, AdmissionStatus, Bed, BedFilter, BedPatch, BedStatus, CloseAdmission,
    Department, IpdAdmission, IpdDailyRecord, NewAdmission, NewBed, NewDailyRecord,
    NewDepartment, NewOpdToken, NewOrganization, NewPatient, OpdToken, OrgStatus, Organization,
    OrganizationPatch, Patient, PatientFilter, PatientPatch, TokenFilter, TokenStatus,
    TokenStatusUpdate,
};

struct Table<T> {
    seq: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { seq: 0, rows: BTreeMap::new() }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }
}

#[derive(Default)]
struct Tables {
    organizations: Table<Organization>,
    departments: Table<Department>,
    patients: Table<Patient>,
    beds: Table<Bed>,
    tokens: Table<OpdToken>,
    token_counters: HashMap<(i64, NaiveDate), i32>,
    admissions: Table<IpdAdmission>,
    daily_records: Table<IpdDailyRecord>,
}

impl Tables {
    fn has_open_stay(&self, bed_id: i64) -> bool {
        self.admissions
            .rows
            .values()
            .any(|a| a.bed_id == bed_id && a.status == AdmissionStatus::Admitted)
    }

    fn bed_number_taken(&self, org_id: i64, bed_number: &str, except: Option<i64>) -> bool {
        self.beds
            .rows
            .values()
            .any(|b| b.org_id == org_id && b.bed_number == bed_number && Some(b.id) != except)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owned<T: Clone>(row: Option<&T>, org_id: i64, org_of: impl Fn(&T) -> i64) -> Option<T> {
    row.filter(|r| org_of(*r) == org_id).cloned()
}

#[async_trait]
impl Store for MemoryStore {
    // ───────────────────────────────────────
    // organizations
    // ───────────────────────────────────────
    async fn insert_organization(&self, new: NewOrganization) -> StoreResult<Organization> {
        let mut t = self.tables.lock().await;
        if t.organizations.rows.values().any(|o| o.code == new.code) {
            return Err(StoreError::Duplicate("code".into()));
        }
        let now = Utc::now();
        let id = t.organizations.next_id();
        let org = Organization {
            id,
            code: new.code,
            name: new.name,
            status: new.status,
            plan: new.plan,
            subscription_ends_on: new.subscription_ends_on,
            admin_user_id: None,
            created_at: now,
            updated_at: now,
        };
        t.organizations.rows.insert(id, org.clone());
        Ok(org)
    }

    async fn get_organization(&self, id: i64) -> StoreResult<Option<Organization>> {
        let t = self.tables.lock().await;
        Ok(t.organizations.rows.get(&id).cloned())
    }

    async fn list_organizations(&self, status: Option<OrgStatus>) -> StoreResult<Vec<Organization>> {
        let t = self.tables.lock().await;
        Ok(t.organizations
            .rows
            .values()
            .rev()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect())
    }

    async fn update_organization(
        &self,
        id: i64,
        patch: OrganizationPatch,
    ) -> StoreResult<Option<Organization>> {
        let mut t = self.tables.lock().await;
        let Some(org) = t.organizations.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            org.name = name;
        }
        if let Some(plan) = patch.plan {
            org.plan = plan;
        }
        if let Some(status) = patch.status {
            org.status = status;
        }
        if patch.subscription_ends_on.is_some() {
            org.subscription_ends_on = patch.subscription_ends_on;
        }
        if patch.admin_user_id.is_some() {
            org.admin_user_id = patch.admin_user_id;
        }
        org.updated_at = Utc::now();
        Ok(Some(org.clone()))
    }

    // ───────────────────────────────────────
    // departments
    // ───────────────────────────────────────
    async fn insert_department(&self, new: NewDepartment) -> StoreResult<Department> {
        let mut t = self.tables.lock().await;
        if t.departments.rows.values().any(|d| d.org_id == new.org_id && d.code == new.code) {
            return Err(StoreError::Duplicate("code".into()));
        }
        let id = t.departments.next_id();
        let dept = Department {
            id,
            org_id: new.org_id,
            name: new.name,
            code: new.code,
            created_at: Utc::now(),
        };
        t.departments.rows.insert(id, dept.clone());
        Ok(dept)
    }

    async fn get_department(&self, org_id: i64, id: i64) -> StoreResult<Option<Department>> {
        let t = self.tables.lock().await;
        Ok(owned(t.departments.rows.get(&id), org_id, |d| d.org_id))
    }

    async fn list_departments(&self, org_id: i64) -> StoreResult<Vec<Department>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Department> =
            t.departments.rows.values().filter(|d| d.org_id == org_id).cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    // ───────────────────────────────────────
    // patients
    // ───────────────────────────────────────
    async fn insert_patient(&self, new: NewPatient) -> StoreResult<Patient> {
        let mut t = self.tables.lock().await;
        if t.patients
            .rows
            .values()
            .any(|p| p.org_id == new.org_id && p.patient_code == new.patient_code)
        {
            return Err(StoreError::Duplicate("patient_code".into()));
        }
        let now = Utc::now();
        let id = t.patients.next_id();
        let patient = Patient {
            id,
            org_id: new.org_id,
            patient_code: new.patient_code,
            name: new.name,
            mobile: new.mobile,
            gender: new.gender,
            date_of_birth: new.date_of_birth,
            email: new.email,
            address: new.address,
            blood_group: new.blood_group,
            created_at: now,
            updated_at: now,
        };
        t.patients.rows.insert(id, patient.clone());
        Ok(patient)
    }

    async fn get_patient(&self, org_id: i64, id: i64) -> StoreResult<Option<Patient>> {
        let t = self.tables.lock().await;
        Ok(owned(t.patients.rows.get(&id), org_id, |p| p.org_id))
    }

    async fn list_patients(&self, org_id: i64, filter: &PatientFilter) -> StoreResult<Vec<Patient>> {
        let t = self.tables.lock().await;
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let limit = filter.limit.unwrap_or(50).max(0) as usize;
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        Ok(t.patients
            .rows
            .values()
            .rev()
            .filter(|p| p.org_id == org_id)
            .filter(|p| match &needle {
                Some(n) => {
                    p.name.to_lowercase().contains(n)
                        || p.mobile.contains(n.as_str())
                        || p.patient_code.to_lowercase().contains(n)
                }
                None => true,
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_patient(
        &self,
        org_id: i64,
        id: i64,
        patch: PatientPatch,
    ) -> StoreResult<Option<Patient>> {
        let mut t = self.tables.lock().await;
        let Some(p) = t.patients.rows.get_mut(&id).filter(|p| p.org_id == org_id) else {
            return Ok(None);
        };
        if let Some(v) = patch.name {
            p.name = v;
        }
        if let Some(v) = patch.mobile {
            p.mobile = v;
        }
        if patch.gender.is_some() {
            p.gender = patch.gender;
        }
        if patch.date_of_birth.is_some() {
            p.date_of_birth = patch.date_of_birth;
        }
        if patch.email.is_some() {
            p.email = patch.email;
        }
        if patch.address.is_some() {
            p.address = patch.address;
        }
        if patch.blood_group.is_some() {
            p.blood_group = patch.blood_group;
        }
        p.updated_at = Utc::now();
        Ok(Some(p.clone()))
    }

    // ───────────────────────────────────────
    // beds
    // ───────────────────────────────────────
    async fn insert_bed(&self, new: NewBed) -> StoreResult<Bed> {
        let mut t = self.tables.lock().await;
        if t.bed_number_taken(new.org_id, &new.bed_number, None) {
            return Err(StoreError::Duplicate("bed_number".into()));
        }
        let now = Utc::now();
        let id = t.beds.next_id();
        let bed = Bed {
            id,
            org_id: new.org_id,
            bed_number: new.bed_number,
            ward: new.ward,
            bed_type: new.bed_type,
            status: new.status,
            daily_rate: new.daily_rate,
            created_at: now,
            updated_at: now,
        };
        t.beds.rows.insert(id, bed.clone());
        Ok(bed)
    }

    async fn get_bed(&self, org_id: i64, id: i64) -> StoreResult<Option<Bed>> {
        let t = self.tables.lock().await;
        Ok(owned(t.beds.rows.get(&id), org_id, |b| b.org_id))
    }

    async fn list_beds(&self, org_id: i64, filter: &BedFilter) -> StoreResult<Vec<Bed>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Bed> = t
            .beds
            .rows
            .values()
            .filter(|b| b.org_id == org_id)
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| filter.ward.as_deref().map_or(true, |w| b.ward == w))
            .filter(|b| filter.bed_type.map_or(true, |ty| b.bed_type == ty))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.bed_number.cmp(&b.bed_number));
        Ok(rows)
    }

    async fn update_bed(&self, org_id: i64, id: i64, patch: BedPatch) -> StoreResult<Option<Bed>> {
        let mut t = self.tables.lock().await;
        if let Some(number) = patch.bed_number.as_deref() {
            if t.bed_number_taken(org_id, number, Some(id)) {
                return Err(StoreError::Duplicate("bed_number".into()));
            }
        }
        let Some(bed) = t.beds.rows.get_mut(&id).filter(|b| b.org_id == org_id) else {
            return Ok(None);
        };
        if let Some(v) = patch.bed_number {
            bed.bed_number = v;
        }
        if let Some(v) = patch.ward {
            bed.ward = v;
        }
        if let Some(v) = patch.bed_type {
            bed.bed_type = v;
        }
        if let Some(v) = patch.daily_rate {
            bed.daily_rate = v;
        }
        bed.updated_at = Utc::now();
        Ok(Some(bed.clone()))
    }

    async fn set_bed_status(
        &self,
        org_id: i64,
        id: i64,
        status: BedStatus,
    ) -> StoreResult<Option<Bed>> {
        let mut t = self.tables.lock().await;
        let Some(bed) = t.beds.rows.get_mut(&id).filter(|b| b.org_id == org_id) else {
            return Ok(None);
        };
        bed.status = status;
        bed.updated_at = Utc::now();
        Ok(Some(bed.clone()))
    }

    async fn reconcile_bed_status(
        &self,
        org_id: i64,
        id: i64,
        expected: BedStatus,
        status: BedStatus,
    ) -> StoreResult<Option<Bed>> {
        let mut t = self.tables.lock().await;
        let implied = t.has_open_stay(id) == (status == BedStatus::Occupied);
        let Some(bed) = t
            .beds
            .rows
            .get_mut(&id)
            .filter(|b| b.org_id == org_id && b.status == expected)
        else {
            return Ok(None);
        };
        if !implied {
            return Ok(None);
        }
        bed.status = status;
        bed.updated_at = Utc::now();
        Ok(Some(bed.clone()))
    }

    async fn delete_bed(&self, org_id: i64, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        // same rule as the admissions foreign key
        if t.admissions.rows.values().any(|a| a.org_id == org_id && a.bed_id == id) {
            return Err(StoreError::Conflict("bed has admission history".into()));
        }
        let removable = t
            .beds
            .rows
            .get(&id)
            .is_some_and(|b| b.org_id == org_id && b.status != BedStatus::Occupied);
        if removable {
            t.beds.rows.remove(&id);
        }
        Ok(removable)
    }

    // ───────────────────────────────────────
    // opd tokens
    // ───────────────────────────────────────
    async fn max_token_number(&self, org_id: i64, date: NaiveDate) -> StoreResult<Option<i32>> {
        let t = self.tables.lock().await;
        Ok(t.tokens
            .rows
            .values()
            .filter(|tok| tok.org_id == org_id && tok.token_date == date)
            .map(|tok| tok.token_number)
            .max())
    }

    async fn issue_token(&self, new: NewOpdToken) -> StoreResult<OpdToken> {
        let mut t = self.tables.lock().await;
        let key = (new.org_id, new.token_date);
        let seed = t
            .tokens
            .rows
            .values()
            .filter(|tok| tok.org_id == new.org_id && tok.token_date == new.token_date)
            .map(|tok| tok.token_number)
            .max()
            .unwrap_or(0);
        let counter = t.token_counters.entry(key).or_insert(seed);
        *counter += 1;
        let token_number = *counter;

        let id = t.tokens.next_id();
        let token = OpdToken {
            id,
            org_id: new.org_id,
            patient_id: new.patient_id,
            department_id: new.department_id,
            token_number,
            token_date: new.token_date,
            status: TokenStatus::Waiting,
            priority: new.priority,
            symptoms: new.symptoms,
            called_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        t.tokens.rows.insert(id, token.clone());
        Ok(token)
    }

    async fn get_token(&self, org_id: i64, id: i64) -> StoreResult<Option<OpdToken>> {
        let t = self.tables.lock().await;
        Ok(owned(t.tokens.rows.get(&id), org_id, |tok| tok.org_id))
    }

    async fn list_tokens(&self, org_id: i64, filter: &TokenFilter) -> StoreResult<Vec<OpdToken>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<OpdToken> = t
            .tokens
            .rows
            .values()
            .filter(|tok| tok.org_id == org_id)
            .filter(|tok| filter.date.map_or(true, |d| tok.token_date == d))
            .filter(|tok| filter.status.map_or(true, |s| tok.status == s))
            .filter(|tok| filter.department_id.map_or(true, |d| tok.department_id == Some(d)))
            .cloned()
            .collect();
        rows.sort_by_key(|tok| (tok.token_date, tok.token_number));
        Ok(rows)
    }

    async fn update_token_status(
        &self,
        org_id: i64,
        id: i64,
        update: TokenStatusUpdate,
    ) -> StoreResult<Option<OpdToken>> {
        let mut t = self.tables.lock().await;
        let Some(tok) = t
            .tokens
            .rows
            .get_mut(&id)
            .filter(|tok| tok.org_id == org_id && tok.status == update.expected)
        else {
            return Ok(None);
        };
        tok.status = update.status;
        if update.called_at.is_some() {
            tok.called_at = update.called_at;
        }
        if update.completed_at.is_some() {
            tok.completed_at = update.completed_at;
        }
        Ok(Some(tok.clone()))
    }

    // ───────────────────────────────────────
    // ipd admissions
    // ───────────────────────────────────────
    async fn commit_admission(&self, new: NewAdmission) -> StoreResult<IpdAdmission> {
        let mut t = self.tables.lock().await;
        let bed_ok = t
            .beds
            .rows
            .get(&new.bed_id)
            .is_some_and(|b| b.org_id == new.org_id && b.status == BedStatus::Available);
        // mirrors the one-open-stay-per-bed index
        if !bed_ok || t.has_open_stay(new.bed_id) {
            return Err(StoreError::Conflict("bed not available".into()));
        }
        if t.admissions
            .rows
            .values()
            .any(|a| a.org_id == new.org_id && a.ip_number == new.ip_number)
        {
            return Err(StoreError::Duplicate("ip_number".into()));
        }

        let now = Utc::now();
        if let Some(bed) = t.beds.rows.get_mut(&new.bed_id) {
            bed.status = BedStatus::Occupied;
            bed.updated_at = now;
        }
        let id = t.admissions.next_id();
        let admission = IpdAdmission {
            id,
            org_id: new.org_id,
            patient_id: new.patient_id,
            bed_id: new.bed_id,
            department_id: new.department_id,
            ip_number: new.ip_number,
            admission_date: new.admission_date,
            discharge_date: None,
            status: AdmissionStatus::Admitted,
            diagnosis: new.diagnosis,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        t.admissions.rows.insert(id, admission.clone());
        Ok(admission)
    }

    async fn get_admission(&self, org_id: i64, id: i64) -> StoreResult<Option<IpdAdmission>> {
        let t = self.tables.lock().await;
        Ok(owned(t.admissions.rows.get(&id), org_id, |a| a.org_id))
    }

    async fn list_admissions(
        &self,
        org_id: i64,
        filter: &AdmissionFilter,
    ) -> StoreResult<Vec<IpdAdmission>> {
        let t = self.tables.lock().await;
        Ok(t.admissions
            .rows
            .values()
            .rev()
            .filter(|a| a.org_id == org_id)
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .filter(|a| filter.patient_id.map_or(true, |p| a.patient_id == p))
            .filter(|a| filter.bed_id.map_or(true, |b| a.bed_id == b))
            .cloned()
            .collect())
    }

    async fn close_admission(
        &self,
        org_id: i64,
        id: i64,
        close: CloseAdmission,
    ) -> StoreResult<IpdAdmission> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let Some(admission) = t.admissions.rows.get_mut(&id).filter(|a| a.org_id == org_id) else {
            return Err(StoreError::NotFound("admission".into()));
        };
        if !admission.status.is_open() {
            return Err(StoreError::Conflict(format!("admission is already {}", admission.status)));
        }
        admission.status = close.status;
        admission.discharge_date = Some(close.discharge_date);
        admission.updated_at = now;
        let closed = admission.clone();

        if let Some(bed) = t.beds.rows.get_mut(&closed.bed_id).filter(|b| b.org_id == org_id) {
            bed.status = BedStatus::Available;
            bed.updated_at = now;
        }
        Ok(closed)
    }

    // ───────────────────────────────────────
    // ipd daily records
    // ───────────────────────────────────────
    async fn append_daily_record(&self, new: NewDailyRecord) -> StoreResult<IpdDailyRecord> {
        let mut t = self.tables.lock().await;
        let Some(admission) = owned(t.admissions.rows.get(&new.ipd_admission_id), new.org_id, |a| a.org_id)
        else {
            return Err(StoreError::NotFound("admission".into()));
        };
        if !admission.status.is_open() {
            return Err(StoreError::Conflict(format!("admission is {}", admission.status)));
        }
        let id = t.daily_records.next_id();
        let record = IpdDailyRecord {
            id,
            org_id: new.org_id,
            ipd_admission_id: new.ipd_admission_id,
            record_date: new.record_date,
            vital_signs: Json(new.vital_signs),
            chief_complaints: new.chief_complaints,
            examination_notes: new.examination_notes,
            treatment_given: new.treatment_given,
            medications: new.medications,
            diet: new.diet,
            nursing_notes: new.nursing_notes,
            doctor_notes: new.doctor_notes,
            created_at: Utc::now(),
        };
        t.daily_records.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn list_daily_records(
        &self,
        org_id: i64,
        admission_id: i64,
    ) -> StoreResult<Vec<IpdDailyRecord>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<IpdDailyRecord> = t
            .daily_records
            .rows
            .values()
            .filter(|r| r.org_id == org_id && r.ipd_admission_id == admission_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.record_date, r.id));
        Ok(rows)
    }
}
