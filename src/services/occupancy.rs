// src/services/occupancy.rs
//
// Cross-checks bed status against open admissions. Lifecycle writes keep the two
// in step; this catches rows written by anything else.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::tenant;
use crate::error::AppResult;
use crate::models::{AdmissionFilter, AdmissionStatus, Bed, BedFilter, BedStatus, IpdAdmission};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// An admitted stay points at a bed that is not `occupied`.
    AdmissionWithoutOccupiedBed,
    /// An `occupied` bed has no admitted stay.
    OccupiedBedWithoutAdmission,
    /// More than one admitted stay shares the bed. Never auto-repaired.
    BedDoubleBooked,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccupancyMismatch {
    pub kind: MismatchKind,
    pub bed_id: i64,
    pub bed_number: Option<String>,
    /// Status seen by the audit; `None` when the bed row is gone.
    pub bed_status: Option<BedStatus>,
    pub admission_ids: Vec<i64>,
}

impl OccupancyMismatch {
    /// `(expected, target)` for the mismatches repair may fix.
    fn repair(&self) -> Option<(BedStatus, BedStatus)> {
        let seen = self.bed_status?;
        match self.kind {
            MismatchKind::AdmissionWithoutOccupiedBed => Some((seen, BedStatus::Occupied)),
            MismatchKind::OccupiedBedWithoutAdmission => Some((seen, BedStatus::Available)),
            MismatchKind::BedDoubleBooked => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OccupancyReport {
    pub org_id: i64,
    pub checked_beds: usize,
    pub open_admissions: usize,
    pub mismatches: Vec<OccupancyMismatch>,
}

impl OccupancyReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub audit: OccupancyReport,
    pub repaired: Vec<Bed>,
}

/// Compares beds with the `admitted` stays that point at them.
fn compare(org_id: i64, beds: &[Bed], open: &[IpdAdmission]) -> OccupancyReport {
    let mut by_bed: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for a in open.iter().filter(|a| a.status == AdmissionStatus::Admitted) {
        by_bed.entry(a.bed_id).or_default().push(a.id);
    }
    for ids in by_bed.values_mut() {
        ids.sort_unstable();
    }

    let mut mismatches = Vec::new();
    for bed in beds {
        let stays = by_bed.remove(&bed.id).unwrap_or_default();
        let kind = match (bed.status, stays.len()) {
            (_, n) if n > 1 => Some(MismatchKind::BedDoubleBooked),
            (BedStatus::Occupied, 0) => Some(MismatchKind::OccupiedBedWithoutAdmission),
            (BedStatus::Occupied, _) => None,
            (_, 1) => Some(MismatchKind::AdmissionWithoutOccupiedBed),
            _ => None,
        };
        if let Some(kind) = kind {
            mismatches.push(OccupancyMismatch {
                kind,
                bed_id: bed.id,
                bed_number: Some(bed.bed_number.clone()),
                bed_status: Some(bed.status),
                admission_ids: stays,
            });
        }
    }
    // stays whose bed row no longer exists
    for (bed_id, stays) in by_bed {
        let kind = if stays.len() > 1 {
            MismatchKind::BedDoubleBooked
        } else {
            MismatchKind::AdmissionWithoutOccupiedBed
        };
        mismatches.push(OccupancyMismatch {
            kind,
            bed_id,
            bed_number: None,
            bed_status: None,
            admission_ids: stays,
        });
    }

    OccupancyReport {
        org_id,
        checked_beds: beds.len(),
        open_admissions: open.len(),
        mismatches,
    }
}

pub struct OccupancyAudit<'a> {
    store: &'a dyn Store,
}

impl<'a> OccupancyAudit<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn audit(&self, org_id: i64) -> AppResult<OccupancyReport> {
        tenant::require(self.store, org_id).await?;
        let beds = self.store.list_beds(org_id, &BedFilter::default()).await?;
        let open = self
            .store
            .list_admissions(
                org_id,
                &AdmissionFilter { status: Some(AdmissionStatus::Admitted), ..Default::default() },
            )
            .await?;

        let report = compare(org_id, &beds, &open);
        if !report.is_consistent() {
            warn!(org_id, count = report.mismatches.len(), "occupancy mismatches found");
        }
        Ok(report)
    }

    /// Sets each bed to the status its admissions imply. Double bookings and
    /// stays on missing beds are left for a human.
    #[instrument(skip(self))]
    pub async fn repair(&self, org_id: i64) -> AppResult<RepairReport> {
        tenant::require_active(self.store, org_id).await?;
        let audit = self.audit(org_id).await?;
        self.apply(audit).await
    }

    /// Writes are conditional on what `audit` saw; a bed that moved since is skipped.
    async fn apply(&self, audit: OccupancyReport) -> AppResult<RepairReport> {
        let org_id = audit.org_id;
        let mut repaired = Vec::new();
        for m in &audit.mismatches {
            let Some((expected, target)) = m.repair() else {
                continue;
            };
            match self.store.reconcile_bed_status(org_id, m.bed_id, expected, target).await? {
                Some(bed) => {
                    info!(org_id, bed_id = bed.id, status = %target, "bed status repaired");
                    repaired.push(bed);
                }
                None => info!(org_id, bed_id = m.bed_id, "bed changed since audit, skipped"),
            }
        }
        Ok(RepairReport { audit, repaired })
    }
}
