// src/store/postgres.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{query, query_as, query_scalar, types::Json, PgPool};
use tracing::debug;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    AdmissionFilter, AdmissionStatus, Bed, BedFilter, BedPatch, BedStatus, CloseAdmission,
    Department, IpdAdmission, IpdDailyRecord, NewAdmission, NewBed, NewDailyRecord,
    NewDepartment, NewOpdToken, NewOrganization, NewPatient, OpdToken, OrgStatus, Organization,
    OrganizationPatch, Patient, PatientFilter, PatientPatch, TokenFilter, TokenStatusUpdate,
};

/// Postgres-backed [`Store`]. Guarded lifecycle writes run in one transaction each.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const ONE_OPEN_PER_BED: &str = "ipd_admissions_one_open_per_bed";

// Unique violations surface as `Duplicate(field)` so callers can report the field.
// The one-open-stay-per-bed index is a lost race for the bed, not a key clash.
fn unique_violation(field: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            if db.constraint() == Some(ONE_OPEN_PER_BED) {
                StoreError::Conflict("bed not available".into())
            } else {
                StoreError::Duplicate(field.to_string())
            }
        }
        _ => StoreError::Database(e),
    }
}

fn still_referenced(what: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            StoreError::Conflict(what.into())
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    // ───────────────────────────────────────
    // organizations
    // ───────────────────────────────────────
    async fn insert_organization(&self, new: NewOrganization) -> StoreResult<Organization> {
        let row = query_as::<_, Organization>(
            r#"
            INSERT INTO public.organizations(code, name, status, plan, subscription_ends_on)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(&new.code)
        .bind(&new.name)
        .bind(new.status)
        .bind(&new.plan)
        .bind(new.subscription_ends_on)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation("code"))?;
        Ok(row)
    }

    async fn get_organization(&self, id: i64) -> StoreResult<Option<Organization>> {
        let row = query_as::<_, Organization>(r#"SELECT * FROM public.organizations WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_organizations(&self, status: Option<OrgStatus>) -> StoreResult<Vec<Organization>> {
        let rows = query_as::<_, Organization>(
            r#"SELECT * FROM public.organizations
               WHERE ($1::org_status IS NULL OR status = $1)
               ORDER BY id DESC"#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_organization(
        &self,
        id: i64,
        patch: OrganizationPatch,
    ) -> StoreResult<Option<Organization>> {
        let row = query_as::<_, Organization>(
            r#"
            UPDATE public.organizations SET
                name = COALESCE($2, name),
                plan = COALESCE($3, plan),
                status = COALESCE($4, status),
                subscription_ends_on = COALESCE($5, subscription_ends_on),
                admin_user_id = COALESCE($6, admin_user_id),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.plan)
        .bind(patch.status)
        .bind(patch.subscription_ends_on)
        .bind(patch.admin_user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ───────────────────────────────────────
    // departments
    // ───────────────────────────────────────
    async fn insert_department(&self, new: NewDepartment) -> StoreResult<Department> {
        let row = query_as::<_, Department>(
            r#"INSERT INTO public.departments(org_id, name, code) VALUES ($1,$2,$3) RETURNING *"#,
        )
        .bind(new.org_id)
        .bind(&new.name)
        .bind(&new.code)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation("code"))?;
        Ok(row)
    }

    async fn get_department(&self, org_id: i64, id: i64) -> StoreResult<Option<Department>> {
        let row = query_as::<_, Department>(
            r#"SELECT * FROM public.departments WHERE id = $1 AND org_id = $2"#,
        )
        .bind(id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_departments(&self, org_id: i64) -> StoreResult<Vec<Department>> {
        let rows = query_as::<_, Department>(
            r#"SELECT * FROM public.departments WHERE org_id = $1 ORDER BY name"#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ───────────────────────────────────────
    // patients
    // ───────────────────────────────────────
    async fn insert_patient(&self, new: NewPatient) -> StoreResult<Patient> {
        let row = query_as::<_, Patient>(
            r#"
            INSERT INTO public.patients
                (org_id, patient_code, name, mobile, gender, date_of_birth, email, address, blood_group)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING *
            "#,
        )
        .bind(new.org_id)
        .bind(&new.patient_code)
        .bind(&new.name)
        .bind(&new.mobile)
        .bind(new.gender)
        .bind(new.date_of_birth)
        .bind(new.email)
        .bind(new.address)
        .bind(new.blood_group)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation("patient_code"))?;
        Ok(row)
    }

    async fn get_patient(&self, org_id: i64, id: i64) -> StoreResult<Option<Patient>> {
        let row = query_as::<_, Patient>(
            r#"SELECT * FROM public.patients WHERE id = $1 AND org_id = $2"#,
        )
        .bind(id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_patients(&self, org_id: i64, filter: &PatientFilter) -> StoreResult<Vec<Patient>> {
        let rows = query_as::<_, Patient>(
            r#"SELECT * FROM public.patients
               WHERE org_id = $1
                 AND ($2::text IS NULL
                      OR name ILIKE '%' || $2 || '%'
                      OR mobile LIKE '%' || $2 || '%'
                      OR patient_code ILIKE '%' || $2 || '%')
               ORDER BY id DESC
               LIMIT $3 OFFSET $4"#,
        )
        .bind(org_id)
        .bind(filter.search.as_deref())
        .bind(filter.limit.unwrap_or(50))
        .bind(filter.offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_patient(
        &self,
        org_id: i64,
        id: i64,
        patch: PatientPatch,
    ) -> StoreResult<Option<Patient>> {
        let row = query_as::<_, Patient>(
            r#"
            UPDATE public.patients SET
              name          = COALESCE($3, name),
              mobile        = COALESCE($4, mobile),
              gender        = COALESCE($5, gender),
              date_of_birth = COALESCE($6, date_of_birth),
              email         = COALESCE($7, email),
              address       = COALESCE($8, address),
              blood_group   = COALESCE($9, blood_group),
              updated_at    = now()
            WHERE id = $1 AND org_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(org_id)
        .bind(patch.name)
        .bind(patch.mobile)
        .bind(patch.gender)
        .bind(patch.date_of_birth)
        .bind(patch.email)
        .bind(patch.address)
        .bind(patch.blood_group)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ───────────────────────────────────────
    // beds
    // ───────────────────────────────────────
    async fn insert_bed(&self, new: NewBed) -> StoreResult<Bed> {
        let row = query_as::<_, Bed>(
            r#"
            INSERT INTO public.beds(org_id, bed_number, ward, bed_type, status, daily_rate)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(new.org_id)
        .bind(&new.bed_number)
        .bind(&new.ward)
        .bind(new.bed_type)
        .bind(new.status)
        .bind(new.daily_rate)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation("bed_number"))?;
        Ok(row)
    }

    async fn get_bed(&self, org_id: i64, id: i64) -> StoreResult<Option<Bed>> {
        let row = query_as::<_, Bed>(r#"SELECT * FROM public.beds WHERE id = $1 AND org_id = $2"#)
            .bind(id)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_beds(&self, org_id: i64, filter: &BedFilter) -> StoreResult<Vec<Bed>> {
        let rows = query_as::<_, Bed>(
            r#"SELECT * FROM public.beds
               WHERE org_id = $1
                 AND ($2::bed_status IS NULL OR status = $2)
                 AND ($3::text IS NULL OR ward = $3)
                 AND ($4::bed_type IS NULL OR bed_type = $4)
               ORDER BY bed_number"#,
        )
        .bind(org_id)
        .bind(filter.status)
        .bind(filter.ward.as_deref())
        .bind(filter.bed_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_bed(&self, org_id: i64, id: i64, patch: BedPatch) -> StoreResult<Option<Bed>> {
        let row = query_as::<_, Bed>(
            r#"
            UPDATE public.beds SET
              bed_number = COALESCE($3, bed_number),
              ward       = COALESCE($4, ward),
              bed_type   = COALESCE($5, bed_type),
              daily_rate = COALESCE($6, daily_rate),
              updated_at = now()
            WHERE id = $1 AND org_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(org_id)
        .bind(patch.bed_number)
        .bind(patch.ward)
        .bind(patch.bed_type)
        .bind(patch.daily_rate)
        .fetch_optional(&self.pool)
        .await
        .map_err(unique_violation("bed_number"))?;
        Ok(row)
    }

    async fn set_bed_status(
        &self,
        org_id: i64,
        id: i64,
        status: BedStatus,
    ) -> StoreResult<Option<Bed>> {
        let row = query_as::<_, Bed>(
            r#"UPDATE public.beds SET status = $3, updated_at = now()
               WHERE id = $1 AND org_id = $2
               RETURNING *"#,
        )
        .bind(id)
        .bind(org_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn reconcile_bed_status(
        &self,
        org_id: i64,
        id: i64,
        expected: BedStatus,
        status: BedStatus,
    ) -> StoreResult<Option<Bed>> {
        let row = query_as::<_, Bed>(
            r#"
            UPDATE public.beds b SET status = $4, updated_at = now()
            WHERE b.id = $1 AND b.org_id = $2 AND b.status = $3
              AND ($4 = 'occupied'::bed_status) = EXISTS (
                    SELECT 1 FROM public.ipd_admissions a
                    WHERE a.bed_id = b.id AND a.status = 'admitted')
            RETURNING b.*
            "#,
        )
        .bind(id)
        .bind(org_id)
        .bind(expected)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_bed(&self, org_id: i64, id: i64) -> StoreResult<bool> {
        let res = query(
            r#"DELETE FROM public.beds WHERE id = $1 AND org_id = $2 AND status <> 'occupied'"#,
        )
        .bind(id)
        .bind(org_id)
        .execute(&self.pool)
        .await
        .map_err(still_referenced("bed has admission history"))?;
        Ok(res.rows_affected() > 0)
    }

    // ───────────────────────────────────────
    // opd tokens
    // ───────────────────────────────────────
    async fn max_token_number(&self, org_id: i64, date: NaiveDate) -> StoreResult<Option<i32>> {
        let max = query_scalar::<_, Option<i32>>(
            r#"SELECT MAX(token_number) FROM public.opd_tokens WHERE org_id = $1 AND token_date = $2"#,
        )
        .bind(org_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(max)
    }

    async fn issue_token(&self, new: NewOpdToken) -> StoreResult<OpdToken> {
        let mut tx = self.pool.begin().await?;

        // The counter row lock serializes concurrent check-ins for one org+day.
        let token_number = query_scalar::<_, i32>(
            r#"
            INSERT INTO public.opd_token_counters(org_id, token_date, last_number)
            VALUES (
                $1, $2,
                COALESCE((SELECT MAX(token_number) FROM public.opd_tokens
                          WHERE org_id = $1 AND token_date = $2), 0) + 1
            )
            ON CONFLICT (org_id, token_date)
            DO UPDATE SET last_number = public.opd_token_counters.last_number + 1
            RETURNING last_number
            "#,
        )
        .bind(new.org_id)
        .bind(new.token_date)
        .fetch_one(&mut *tx)
        .await?;

        let row = query_as::<_, OpdToken>(
            r#"
            INSERT INTO public.opd_tokens
                (org_id, patient_id, department_id, token_number, token_date, status, priority, symptoms)
            VALUES ($1,$2,$3,$4,$5,'waiting',$6,$7)
            RETURNING *
            "#,
        )
        .bind(new.org_id)
        .bind(new.patient_id)
        .bind(new.department_id)
        .bind(token_number)
        .bind(new.token_date)
        .bind(new.priority)
        .bind(new.symptoms)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation("token_number"))?;

        tx.commit().await?;
        debug!(org_id = row.org_id, token_number, "token issued");
        Ok(row)
    }

    async fn get_token(&self, org_id: i64, id: i64) -> StoreResult<Option<OpdToken>> {
        let row = query_as::<_, OpdToken>(
            r#"SELECT * FROM public.opd_tokens WHERE id = $1 AND org_id = $2"#,
        )
        .bind(id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_tokens(&self, org_id: i64, filter: &TokenFilter) -> StoreResult<Vec<OpdToken>> {
        let rows = query_as::<_, OpdToken>(
            r#"SELECT * FROM public.opd_tokens
               WHERE org_id = $1
                 AND ($2::date IS NULL OR token_date = $2)
                 AND ($3::token_status IS NULL OR status = $3)
                 AND ($4::bigint IS NULL OR department_id = $4)
               ORDER BY token_date, token_number"#,
        )
        .bind(org_id)
        .bind(filter.date)
        .bind(filter.status)
        .bind(filter.department_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_token_status(
        &self,
        org_id: i64,
        id: i64,
        update: TokenStatusUpdate,
    ) -> StoreResult<Option<OpdToken>> {
        let row = query_as::<_, OpdToken>(
            r#"
            UPDATE public.opd_tokens SET
              status       = $4,
              called_at    = COALESCE($5, called_at),
              completed_at = COALESCE($6, completed_at)
            WHERE id = $1 AND org_id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(org_id)
        .bind(update.expected)
        .bind(update.status)
        .bind(update.called_at)
        .bind(update.completed_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ───────────────────────────────────────
    // ipd admissions
    // ───────────────────────────────────────
    async fn commit_admission(&self, new: NewAdmission) -> StoreResult<IpdAdmission> {
        let mut tx = self.pool.begin().await?;

        let claimed = query(
            r#"UPDATE public.beds SET status = 'occupied', updated_at = now()
               WHERE id = $1 AND org_id = $2 AND status = 'available'"#,
        )
        .bind(new.bed_id)
        .bind(new.org_id)
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            // dropping `tx` rolls back
            return Err(StoreError::Conflict("bed not available".into()));
        }

        let row = query_as::<_, IpdAdmission>(
            r#"
            INSERT INTO public.ipd_admissions
                (org_id, patient_id, bed_id, department_id, ip_number, admission_date, status, diagnosis, notes)
            VALUES ($1,$2,$3,$4,$5,$6,'admitted',$7,$8)
            RETURNING *
            "#,
        )
        .bind(new.org_id)
        .bind(new.patient_id)
        .bind(new.bed_id)
        .bind(new.department_id)
        .bind(&new.ip_number)
        .bind(new.admission_date)
        .bind(new.diagnosis)
        .bind(new.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation("ip_number"))?;

        tx.commit().await?;
        Ok(row)
    }

    async fn get_admission(&self, org_id: i64, id: i64) -> StoreResult<Option<IpdAdmission>> {
        let row = query_as::<_, IpdAdmission>(
            r#"SELECT * FROM public.ipd_admissions WHERE id = $1 AND org_id = $2"#,
        )
        .bind(id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_admissions(
        &self,
        org_id: i64,
        filter: &AdmissionFilter,
    ) -> StoreResult<Vec<IpdAdmission>> {
        let rows = query_as::<_, IpdAdmission>(
            r#"SELECT * FROM public.ipd_admissions
               WHERE org_id = $1
                 AND ($2::admission_status IS NULL OR status = $2)
                 AND ($3::bigint IS NULL OR patient_id = $3)
                 AND ($4::bigint IS NULL OR bed_id = $4)
               ORDER BY id DESC"#,
        )
        .bind(org_id)
        .bind(filter.status)
        .bind(filter.patient_id)
        .bind(filter.bed_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn close_admission(
        &self,
        org_id: i64,
        id: i64,
        close: CloseAdmission,
    ) -> StoreResult<IpdAdmission> {
        let mut tx = self.pool.begin().await?;

        let closed = query_as::<_, IpdAdmission>(
            r#"
            UPDATE public.ipd_admissions SET
              status = $3,
              discharge_date = $4,
              updated_at = now()
            WHERE id = $1 AND org_id = $2 AND status = 'admitted'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(org_id)
        .bind(close.status)
        .bind(close.discharge_date)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(closed) = closed else {
            let current = query_scalar::<_, AdmissionStatus>(
                r#"SELECT status FROM public.ipd_admissions WHERE id = $1 AND org_id = $2"#,
            )
            .bind(id)
            .bind(org_id)
            .fetch_optional(&mut *tx)
            .await?;
            return Err(match current {
                Some(status) => StoreError::Conflict(format!("admission is already {status}")),
                None => StoreError::NotFound("admission".into()),
            });
        };

        query(
            r#"UPDATE public.beds SET status = 'available', updated_at = now()
               WHERE id = $1 AND org_id = $2"#,
        )
        .bind(closed.bed_id)
        .bind(org_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(closed)
    }

    // ───────────────────────────────────────
    // ipd daily records
    // ───────────────────────────────────────
    async fn append_daily_record(&self, new: NewDailyRecord) -> StoreResult<IpdDailyRecord> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE holds off a concurrent discharge until the record is in.
        let status = query_scalar::<_, AdmissionStatus>(
            r#"SELECT status FROM public.ipd_admissions WHERE id = $1 AND org_id = $2 FOR SHARE"#,
        )
        .bind(new.ipd_admission_id)
        .bind(new.org_id)
        .fetch_optional(&mut *tx)
        .await?;
        match status {
            None => return Err(StoreError::NotFound("admission".into())),
            Some(s) if !s.is_open() => return Err(StoreError::Conflict(format!("admission is {s}"))),
            Some(_) => {}
        }

        let row = query_as::<_, IpdDailyRecord>(
            r#"
            INSERT INTO public.ipd_daily_records
                (org_id, ipd_admission_id, record_date, vital_signs, chief_complaints,
                 examination_notes, treatment_given, medications, diet, nursing_notes, doctor_notes)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
            RETURNING *
            "#,
        )
        .bind(new.org_id)
        .bind(new.ipd_admission_id)
        .bind(new.record_date)
        .bind(Json(new.vital_signs))
        .bind(new.chief_complaints)
        .bind(new.examination_notes)
        .bind(new.treatment_given)
        .bind(new.medications)
        .bind(new.diet)
        .bind(new.nursing_notes)
        .bind(new.doctor_notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn list_daily_records(
        &self,
        org_id: i64,
        admission_id: i64,
    ) -> StoreResult<Vec<IpdDailyRecord>> {
        let rows = query_as::<_, IpdDailyRecord>(
            r#"SELECT * FROM public.ipd_daily_records
               WHERE org_id = $1 AND ipd_admission_id = $2
               ORDER BY record_date, id"#,
        )
        .bind(org_id)
        .bind(admission_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
