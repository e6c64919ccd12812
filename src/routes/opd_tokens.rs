// src/routes/opd_tokens.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{NextTokenNumber, OpdToken, TokenFilter, TokenStatus};
use crate::services::{IssueToken, TokenQueue};
use crate::AppState;

#[derive(Deserialize)]
pub struct NextNumberQ {
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: TokenStatus,
}

pub async fn issue_token(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Json(body): Json<IssueToken>,
) -> AppResult<Json<OpdToken>> {
    Ok(Json(TokenQueue::new(state.store.as_ref()).issue(org_id, body).await?))
}

/// `?date=&status=&department_id=`, in queue order.
pub async fn list_tokens(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Query(q): Query<TokenFilter>,
) -> AppResult<Json<Vec<OpdToken>>> {
    Ok(Json(TokenQueue::new(state.store.as_ref()).list(org_id, &q).await?))
}

pub async fn next_number(
    State(state): State<AppState>,
    Path(org_id): Path<i64>,
    Query(q): Query<NextNumberQ>,
) -> AppResult<Json<NextTokenNumber>> {
    let token_date = q.date.unwrap_or_else(|| Utc::now().date_naive());
    let next_token_number = TokenQueue::new(state.store.as_ref())
        .next_token_number(org_id, token_date)
        .await?;
    Ok(Json(NextTokenNumber { token_date, next_token_number }))
}

pub async fn get_token(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
) -> AppResult<Json<OpdToken>> {
    Ok(Json(TokenQueue::new(state.store.as_ref()).get(org_id, id).await?))
}

pub async fn advance_token(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(i64, i64)>,
    Json(body): Json<StatusBody>,
) -> AppResult<Json<OpdToken>> {
    Ok(Json(TokenQueue::new(state.store.as_ref()).advance(org_id, id, body.status).await?))
}
