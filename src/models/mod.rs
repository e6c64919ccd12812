// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

mod status;

pub use status::{AdmissionStatus, BedStatus, BedType, OrgStatus, TokenPriority, TokenStatus};

// ───────────────────────────────────────
// Core tenancy
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub status: OrgStatus,
    pub plan: String,
    pub subscription_ends_on: Option<NaiveDate>,
    pub admin_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: i64,
    pub org_id: i64,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Patients
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub id: i64,
    pub org_id: i64,
    pub patient_code: String,
    pub name: String,
    pub mobile: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Resource pool
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bed {
    pub id: i64,
    pub org_id: i64,
    pub bed_number: String,
    pub ward: String,
    pub bed_type: BedType,
    pub status: BedStatus,
    pub daily_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// OPD queue
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OpdToken {
    pub id: i64,
    pub org_id: i64,
    pub patient_id: i64,
    pub department_id: Option<i64>,
    pub token_number: i32,
    pub token_date: NaiveDate,
    pub status: TokenStatus,
    pub priority: TokenPriority,
    pub symptoms: Option<String>,
    pub called_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// IPD
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IpdAdmission {
    pub id: i64,
    pub org_id: i64,
    pub patient_id: i64,
    pub bed_id: i64,
    pub department_id: Option<i64>,
    pub ip_number: String,
    pub admission_date: DateTime<Utc>,
    pub discharge_date: Option<DateTime<Utc>>,
    pub status: AdmissionStatus,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bedside observations. Every field is optional; nurses record whatever was measured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub temperature: Option<f64>,       // °C
    pub pulse: Option<i32>,             // bpm
    pub blood_pressure: Option<String>, // "120/80"
    pub respiratory_rate: Option<i32>,  // breaths/min
    pub oxygen_saturation: Option<f64>, // %
    pub weight: Option<f64>,            // kg
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IpdDailyRecord {
    pub id: i64,
    pub org_id: i64,
    pub ipd_admission_id: i64,
    pub record_date: NaiveDate,
    pub vital_signs: Json<VitalSigns>,
    pub chief_complaints: Option<String>,
    pub examination_notes: Option<String>,
    pub treatment_given: Option<String>,
    pub medications: Option<String>,
    pub diet: Option<String>,
    pub nursing_notes: Option<String>,
    pub doctor_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Store inputs (already validated, tenant-stamped)
// ───────────────────────────────────────
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub code: String,
    pub name: String,
    pub status: OrgStatus,
    pub plan: String,
    pub subscription_ends_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub plan: Option<String>,
    pub status: Option<OrgStatus>,
    pub subscription_ends_on: Option<NaiveDate>,
    #[serde(skip)]
    pub admin_user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub org_id: i64,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct NewPatient {
    pub org_id: i64,
    pub patient_code: String,
    pub name: String,
    pub mobile: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientPatch {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientFilter {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewBed {
    pub org_id: i64,
    pub bed_number: String,
    pub ward: String,
    pub bed_type: BedType,
    pub status: BedStatus,
    pub daily_rate: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BedPatch {
    pub bed_number: Option<String>,
    pub ward: Option<String>,
    pub bed_type: Option<BedType>,
    pub daily_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BedFilter {
    pub status: Option<BedStatus>,
    pub ward: Option<String>,
    pub bed_type: Option<BedType>,
}

#[derive(Debug, Clone)]
pub struct NewOpdToken {
    pub org_id: i64,
    pub patient_id: i64,
    pub department_id: Option<i64>,
    pub token_date: NaiveDate,
    pub priority: TokenPriority,
    pub symptoms: Option<String>,
}

/// Compare-and-swap status write: only applied while the token is still in `expected`.
#[derive(Debug, Clone)]
pub struct TokenStatusUpdate {
    pub expected: TokenStatus,
    pub status: TokenStatus,
    pub called_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<TokenStatus>,
    pub department_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewAdmission {
    pub org_id: i64,
    pub patient_id: i64,
    pub bed_id: i64,
    pub department_id: Option<i64>,
    pub ip_number: String,
    pub admission_date: DateTime<Utc>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

/// Terminal write for an open stay; the bed goes back to `available` in the same operation.
#[derive(Debug, Clone)]
pub struct CloseAdmission {
    pub status: AdmissionStatus,
    pub discharge_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdmissionFilter {
    pub status: Option<AdmissionStatus>,
    pub patient_id: Option<i64>,
    pub bed_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewDailyRecord {
    pub org_id: i64,
    pub ipd_admission_id: i64,
    pub record_date: NaiveDate,
    pub vital_signs: VitalSigns,
    pub chief_complaints: Option<String>,
    pub examination_notes: Option<String>,
    pub treatment_given: Option<String>,
    pub medications: Option<String>,
    pub diet: Option<String>,
    pub nursing_notes: Option<String>,
    pub doctor_notes: Option<String>,
}

// ───────────────────────────────────────
// DTOs helpful for endpoints
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NextTokenNumber {
    pub token_date: NaiveDate,
    pub next_token_number: i32,
}
