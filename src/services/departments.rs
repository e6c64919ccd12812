// src/services/departments.rs

use serde::Deserialize;
use tracing::info;

use super::{required, tenant};
use crate::error::AppResult;
use crate::models::{Department, NewDepartment};
use crate::store::Store;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDepartment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
}

pub struct Departments<'a> {
    store: &'a dyn Store,
}

impl<'a> Departments<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn create(&self, org_id: i64, req: CreateDepartment) -> AppResult<Department> {
        let name = required("name", &req.name)?;
        let code = required("code", &req.code)?.to_uppercase();
        tenant::require_active(self.store, org_id).await?;

        let dept = self.store.insert_department(NewDepartment { org_id, name, code }).await?;
        info!(org_id, department_id = dept.id, code = %dept.code, "department created");
        Ok(dept)
    }

    pub async fn list(&self, org_id: i64) -> AppResult<Vec<Department>> {
        tenant::require(self.store, org_id).await?;
        Ok(self.store.list_departments(org_id).await?)
    }
}
