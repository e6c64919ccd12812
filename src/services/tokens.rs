// src/services/tokens.rs
//
// OPD queue ticketing: per-org, per-day sequential token numbers and the
// waiting → in_progress → completed (or cancelled) progression.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, instrument};

use super::{optional, tenant};
use crate::error::{AppError, AppResult};
use crate::models::{
    NewOpdToken, OpdToken, TokenFilter, TokenPriority, TokenStatus, TokenStatusUpdate,
};
use crate::store::Store;

#[derive(Debug, Clone, Deserialize)]
pub struct IssueToken {
    pub patient_id: Option<i64>,
    pub department_id: Option<i64>,
    #[serde(default)]
    pub priority: TokenPriority,
    pub symptoms: Option<String>,
    /// Defaults to today (UTC).
    pub token_date: Option<NaiveDate>,
}

pub struct TokenQueue<'a> {
    store: &'a dyn Store,
}

impl<'a> TokenQueue<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// `max(token_number) + 1` for the org and day, or 1 for an empty day.
    pub async fn next_token_number(&self, org_id: i64, date: NaiveDate) -> AppResult<i32> {
        tenant::require(self.store, org_id).await?;
        let max = self.store.max_token_number(org_id, date).await?;
        Ok(max.map_or(1, |n| n + 1))
    }

    #[instrument(skip(self, req), fields(patient_id = ?req.patient_id))]
    pub async fn issue(&self, org_id: i64, req: IssueToken) -> AppResult<OpdToken> {
        let patient_id = req.patient_id.ok_or_else(|| AppError::validation("patient_id is required"))?;
        tenant::require_active(self.store, org_id).await?;

        if self.store.get_patient(org_id, patient_id).await?.is_none() {
            return Err(AppError::validation(format!(
                "patient {patient_id} does not exist in this organization"
            )));
        }
        if let Some(dept) = req.department_id {
            if self.store.get_department(org_id, dept).await?.is_none() {
                return Err(AppError::validation(format!(
                    "department {dept} does not exist in this organization"
                )));
            }
        }

        let token = self
            .store
            .issue_token(NewOpdToken {
                org_id,
                patient_id,
                department_id: req.department_id,
                token_date: req.token_date.unwrap_or_else(|| Utc::now().date_naive()),
                priority: req.priority,
                symptoms: optional(req.symptoms),
            })
            .await?;
        info!(org_id, token_id = token.id, token_number = token.token_number, "token issued");
        Ok(token)
    }

    pub async fn get(&self, org_id: i64, token_id: i64) -> AppResult<OpdToken> {
        self.store
            .get_token(org_id, token_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("token {token_id}")))
    }

    pub async fn list(&self, org_id: i64, filter: &TokenFilter) -> AppResult<Vec<OpdToken>> {
        tenant::require(self.store, org_id).await?;
        Ok(self.store.list_tokens(org_id, filter).await?)
    }

    /// Move a token along its state machine. Illegal moves, including anything out
    /// of a terminal state, are conflicts.
    #[instrument(skip(self))]
    pub async fn advance(&self, org_id: i64, token_id: i64, target: TokenStatus) -> AppResult<OpdToken> {
        tenant::require_active(self.store, org_id).await?;
        let current = self.get(org_id, token_id).await?;
        if !current.status.can_transition_to(target) {
            return Err(AppError::conflict(format!(
                "token {} cannot move from {} to {}",
                current.token_number, current.status, target
            )));
        }

        let now = Utc::now();
        let update = TokenStatusUpdate {
            expected: current.status,
            status: target,
            called_at: (target == TokenStatus::InProgress).then_some(now),
            completed_at: (target == TokenStatus::Completed).then_some(now),
        };
        match self.store.update_token_status(org_id, token_id, update).await? {
            Some(token) => {
                info!(org_id, token_id, from = %current.status, to = %target, "token advanced");
                Ok(token)
            }
            None => {
                let now_status = self.get(org_id, token_id).await?.status;
                Err(AppError::conflict(format!(
                    "token {} changed concurrently; it is now {}",
                    current.token_number, now_status
                )))
            }
        }
    }
}
