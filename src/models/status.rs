// src/models/status.rs
//
// Status enums are stored as Postgres enum types (see migrations/) and serialized
// as snake_case strings on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! impl_display {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "org_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrgStatus {
    Active,
    Inactive,
    Suspended,
}

impl OrgStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgStatus::Active => "active",
            OrgStatus::Inactive => "inactive",
            OrgStatus::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bed_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BedType {
    General,
    SemiPrivate,
    Private,
    Icu,
    Nicu,
}

impl BedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BedType::General => "general",
            BedType::SemiPrivate => "semi_private",
            BedType::Private => "private",
            BedType::Icu => "icu",
            BedType::Nicu => "nicu",
        }
    }
}

impl Default for BedType {
    fn default() -> Self {
        BedType::General
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bed_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
    Maintenance,
}

impl BedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BedStatus::Available => "available",
            BedStatus::Occupied => "occupied",
            BedStatus::Maintenance => "maintenance",
        }
    }
}

/// OPD queue progression.
///
/// ```text
/// waiting ──► in_progress ──► completed
///    │             │
///    └──────┬──────┘
///           ▼
///       cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "token_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Waiting,
    InProgress,
    Completed,
    Cancelled,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Waiting => "waiting",
            TokenStatus::InProgress => "in_progress",
            TokenStatus::Completed => "completed",
            TokenStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenStatus::Completed | TokenStatus::Cancelled)
    }

    pub fn can_transition_to(&self, target: TokenStatus) -> bool {
        use TokenStatus::*;
        matches!(
            (self, target),
            (Waiting, InProgress) | (Waiting, Cancelled) | (InProgress, Completed) | (InProgress, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "token_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenPriority {
    Normal,
    Urgent,
    Emergency,
}

impl TokenPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPriority::Normal => "normal",
            TokenPriority::Urgent => "urgent",
            TokenPriority::Emergency => "emergency",
        }
    }
}

impl Default for TokenPriority {
    fn default() -> Self {
        TokenPriority::Normal
    }
}

/// An admission is open while `admitted`; both exits are final for the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "admission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Admitted,
    Discharged,
    Transferred,
}

impl AdmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionStatus::Admitted => "admitted",
            AdmissionStatus::Discharged => "discharged",
            AdmissionStatus::Transferred => "transferred",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, AdmissionStatus::Admitted)
    }
}

impl_display!(OrgStatus);
impl_display!(BedType);
impl_display!(BedStatus);
impl_display!(TokenStatus);
impl_display!(TokenPriority);
impl_display!(AdmissionStatus);
