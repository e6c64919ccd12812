// src/routes/mod.rs
//
// HTTP handlers. Each one extracts its inputs, calls a single service method and
// returns JSON; failures render through `AppError`.

pub mod beds;
pub mod departments;
pub mod health;
pub mod ipd_admissions;
pub mod occupancy;
pub mod opd_tokens;
pub mod organizations;
pub mod patients;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::AppState;

/// Tenant-scoped API, mounted under `/api/v1/orgs/:org_id`.
fn tenant_routes() -> Router<AppState> {
    Router::new()
        // departments
        .route(
            "/departments",
            post(departments::create_department).get(departments::list_departments),
        )
        // patients
        .route(
            "/patients",
            post(patients::register_patient).get(patients::list_patients),
        )
        .route(
            "/patients/:id",
            get(patients::get_patient).patch(patients::patch_patient),
        )
        // beds
        .route("/beds", post(beds::create_bed).get(beds::list_beds))
        .route(
            "/beds/:id",
            get(beds::get_bed).patch(beds::patch_bed).delete(beds::delete_bed),
        )
        .route("/beds/:id/status", put(beds::put_bed_status))
        // opd tokens
        .route(
            "/opd-tokens",
            post(opd_tokens::issue_token).get(opd_tokens::list_tokens),
        )
        .route("/opd-tokens/next-number", get(opd_tokens::next_number))
        .route("/opd-tokens/:id", get(opd_tokens::get_token))
        .route("/opd-tokens/:id/status", post(opd_tokens::advance_token))
        // ipd admissions
        .route(
            "/ipd-admissions",
            post(ipd_admissions::admit).get(ipd_admissions::list_admissions),
        )
        .route("/ipd-admissions/:id", get(ipd_admissions::get_admission))
        .route("/ipd-admissions/:id/discharge", post(ipd_admissions::discharge))
        .route("/ipd-admissions/:id/transfer", post(ipd_admissions::transfer_out))
        .route(
            "/ipd-admissions/:id/daily-records",
            post(ipd_admissions::append_daily_record).get(ipd_admissions::list_daily_records),
        )
        // reconciliation
        .route("/occupancy/audit", get(occupancy::audit))
        .route("/occupancy/repair", post(occupancy::repair))
}

pub fn api() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/v1/organizations",
            post(organizations::create_org).get(organizations::list_orgs),
        )
        .route(
            "/api/v1/organizations/:id",
            get(organizations::get_org).patch(organizations::patch_org),
        )
        .nest("/api/v1/orgs/:org_id", tenant_routes())
}
