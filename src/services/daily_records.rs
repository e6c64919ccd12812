// src/services/daily_records.rs

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, instrument};

use super::{optional, tenant};
use crate::error::{AppError, AppResult};
use crate::models::{IpdDailyRecord, NewDailyRecord, VitalSigns};
use crate::store::Store;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppendRecord {
    pub record_date: Option<NaiveDate>,
    #[serde(default)]
    pub vital_signs: Option<VitalSigns>,
    pub chief_complaints: Option<String>,
    pub examination_notes: Option<String>,
    pub treatment_given: Option<String>,
    pub medications: Option<String>,
    pub diet: Option<String>,
    pub nursing_notes: Option<String>,
    pub doctor_notes: Option<String>,
}

fn in_range<T: PartialOrd + Copy + std::fmt::Display>(
    field: &str,
    value: Option<T>,
    lo: T,
    hi: T,
) -> AppResult<()> {
    match value {
        Some(v) if v < lo || v > hi => Err(AppError::validation(format!(
            "vital_signs.{field} must be between {lo} and {hi}"
        ))),
        _ => Ok(()),
    }
}

/// Rejects readings no living patient can produce.
fn check_vitals(v: &VitalSigns) -> AppResult<()> {
    in_range("temperature", v.temperature, 25.0, 45.0)?;
    in_range("pulse", v.pulse, 0, 300)?;
    in_range("respiratory_rate", v.respiratory_rate, 0, 100)?;
    in_range("oxygen_saturation", v.oxygen_saturation, 0.0, 100.0)?;
    in_range("weight", v.weight, 0.0, 500.0)?;
    if let Some(bp) = v.blood_pressure.as_deref() {
        let parsed = bp
            .split_once('/')
            .and_then(|(s, d)| Some((s.trim().parse::<u16>().ok()?, d.trim().parse::<u16>().ok()?)));
        match parsed {
            Some((sys, dia)) if sys > 0 && dia > 0 && sys >= dia => {}
            _ => {
                return Err(AppError::validation(
                    "vital_signs.blood_pressure must look like \"120/80\"",
                ))
            }
        }
    }
    Ok(())
}

/// Append-only clinical notes attached to an open admission.
pub struct DailyRecordLog<'a> {
    store: &'a dyn Store,
}

impl<'a> DailyRecordLog<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, req))]
    pub async fn append(
        &self,
        org_id: i64,
        admission_id: i64,
        req: AppendRecord,
    ) -> AppResult<IpdDailyRecord> {
        let record_date = req
            .record_date
            .ok_or_else(|| AppError::validation("record_date is required"))?;
        let vital_signs = req.vital_signs.unwrap_or_default();
        check_vitals(&vital_signs)?;
        tenant::require_active(self.store, org_id).await?;

        let record = self
            .store
            .append_daily_record(NewDailyRecord {
                org_id,
                ipd_admission_id: admission_id,
                record_date,
                vital_signs,
                chief_complaints: optional(req.chief_complaints),
                examination_notes: optional(req.examination_notes),
                treatment_given: optional(req.treatment_given),
                medications: optional(req.medications),
                diet: optional(req.diet),
                nursing_notes: optional(req.nursing_notes),
                doctor_notes: optional(req.doctor_notes),
            })
            .await?;
        info!(org_id, admission_id, record_id = record.id, %record_date, "daily record appended");
        Ok(record)
    }

    pub async fn list(&self, org_id: i64, admission_id: i64) -> AppResult<Vec<IpdDailyRecord>> {
        if self.store.get_admission(org_id, admission_id).await?.is_none() {
            return Err(AppError::not_found(format!("admission {admission_id}")));
        }
        Ok(self.store.list_daily_records(org_id, admission_id).await?)
    }
}
