// src/services/mod.rs
//
// Business rules over a `Store`. Handlers stay thin: they extract, call one
// service method, and serialize the result.

pub mod admissions;
pub mod beds;
pub mod daily_records;
pub mod departments;
pub mod occupancy;
pub mod organizations;
pub mod patients;
pub mod tenant;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testing;

pub use admissions::{AdmissionLifecycle, AdmitPatient};
pub use beds::{BedPool, CreateBed};
pub use daily_records::{AppendRecord, DailyRecordLog};
pub use departments::{CreateDepartment, Departments};
pub use occupancy::{MismatchKind, OccupancyAudit, OccupancyMismatch, OccupancyReport, RepairReport};
pub use organizations::{AdminLogin, CreateOrganization, TenantRegistry};
pub use patients::{PatientRegistry, RegisterPatient};
pub use tokens::{IssueToken, TokenQueue};

use chrono::{DateTime, Duration, Utc};

use crate::error::{AppError, AppResult};

/// How many fresh suffixes to try when a generated identifier collides.
pub(crate) const ID_ATTEMPTS: u32 = 5;

/// Last six digits of the millisecond clock, shifted by `attempt` ms on retries.
pub(crate) fn timestamp_suffix(now: DateTime<Utc>, attempt: u32) -> String {
    let at = now + Duration::milliseconds(i64::from(attempt));
    format!("{:06}", at.timestamp_millis().rem_euclid(1_000_000))
}

/// Trimmed, non-empty value or a validation error naming the field.
pub(crate) fn required(field: &str, value: &str) -> AppResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

/// Blank optional text collapses to `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn suffix_is_six_digits_of_millis() {
        let now = Utc.timestamp_millis_opt(1_704_067_200_123).unwrap();
        assert_eq!(timestamp_suffix(now, 0), "200123");
        assert_eq!(timestamp_suffix(now, 2), "200125");
    }

    #[test]
    fn suffix_keeps_leading_zeros() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_042).unwrap();
        assert_eq!(timestamp_suffix(now, 0), "000042");
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("ward", "  A  ").unwrap(), "A");
        assert!(matches!(required("ward", "   "), Err(AppError::Validation(_))));
        assert_eq!(optional(Some("  ".into())), None);
    }
}
