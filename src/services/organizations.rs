// src/services/organizations.rs
//
// Tenant registry. Creating a tenant may also provision its first admin login
// with the identity provider; that second write can fail after the first landed.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::{optional, required};
use crate::error::{AppError, AppResult};
use crate::identity::{IdentityClient, ProvisionUser};
use crate::models::{NewOrganization, OrgStatus, Organization, OrganizationPatch};
use crate::store::Store;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLogin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrganization {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub plan: Option<String>,
    pub status: Option<OrgStatus>,
    pub subscription_ends_on: Option<NaiveDate>,
    pub admin: Option<AdminLogin>,
}

fn check_admin(admin: &AdminLogin) -> AppResult<()> {
    let email = admin.email.trim();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => {}
        _ => return Err(AppError::validation("admin.email is not a valid address")),
    }
    if admin.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "admin.password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub struct TenantRegistry<'a> {
    store: &'a dyn Store,
    identity: Option<&'a IdentityClient>,
}

impl<'a> TenantRegistry<'a> {
    pub fn new(store: &'a dyn Store, identity: Option<&'a IdentityClient>) -> Self {
        Self { store, identity }
    }

    #[instrument(skip(self, req), fields(code = %req.code))]
    pub async fn create(&self, req: CreateOrganization) -> AppResult<Organization> {
        let code = required("code", &req.code)?.to_uppercase();
        let name = required("name", &req.name)?;
        let identity = match &req.admin {
            Some(admin) => {
                check_admin(admin)?;
                let client = self.identity.ok_or_else(|| {
                    AppError::validation("admin login requested but no identity provider is configured")
                })?;
                Some((client, admin))
            }
            None => None,
        };

        let org = self
            .store
            .insert_organization(NewOrganization {
                code,
                name,
                status: req.status.unwrap_or(OrgStatus::Active),
                plan: optional(req.plan).unwrap_or_else(|| "standard".into()),
                subscription_ends_on: req.subscription_ends_on,
            })
            .await?;
        info!(org_id = org.id, code = %org.code, "organization created");

        let Some((client, admin)) = identity else {
            return Ok(org);
        };
        let user = ProvisionUser { email: admin.email.trim(), password: &admin.password, org_id: org.id };
        let user_id = match client.create_user(&user).await {
            Ok(id) => id,
            Err(e) => {
                error!(org_id = org.id, error = %e, "admin provisioning failed after organization insert");
                return Err(AppError::PartialFailure(format!(
                    "organization {} was created but its admin login was not: {e}",
                    org.id
                )));
            }
        };

        let patch = OrganizationPatch { admin_user_id: Some(user_id), ..Default::default() };
        match self.store.update_organization(org.id, patch).await {
            Ok(Some(org)) => Ok(org),
            Ok(None) => Err(AppError::PartialFailure(format!(
                "admin login {user_id} was created but organization {} disappeared",
                org.id
            ))),
            Err(e) => Err(AppError::PartialFailure(format!(
                "admin login {user_id} was created but could not be linked to organization {}: {e}",
                org.id
            ))),
        }
    }

    pub async fn list(&self, status: Option<OrgStatus>) -> AppResult<Vec<Organization>> {
        Ok(self.store.list_organizations(status).await?)
    }

    pub async fn get(&self, org_id: i64) -> AppResult<Organization> {
        self.store
            .get_organization(org_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("organization {org_id}")))
    }

    #[instrument(skip(self, patch))]
    pub async fn patch(&self, org_id: i64, mut patch: OrganizationPatch) -> AppResult<Organization> {
        patch.name = patch.name.as_deref().map(|n| required("name", n)).transpose()?;
        patch.plan = patch.plan.as_deref().map(|p| required("plan", p)).transpose()?;
        // linked only by `create`
        patch.admin_user_id = None;

        let org = self
            .store
            .update_organization(org_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(format!("organization {org_id}")))?;
        info!(org_id, status = %org.status, "organization updated");
        Ok(org)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::store::MemoryStore;

    fn org(code: &str) -> CreateOrganization {
        CreateOrganization { code: code.into(), name: format!("{code} Hospital"), ..Default::default() }
    }

    fn with_admin(code: &str) -> CreateOrganization {
        CreateOrganization {
            admin: Some(AdminLogin { email: "admin@city.example".into(), password: "s3cret-pass".into() }),
            ..org(code)
        }
    }

    #[tokio::test]
    async fn create_defaults_and_unique_code() {
        let store = MemoryStore::new();
        let reg = TenantRegistry::new(&store, None);

        let o = reg.create(org("city")).await.unwrap();
        assert_eq!(o.code, "CITY");
        assert_eq!(o.status, OrgStatus::Active);
        assert_eq!(o.plan, "standard");
        assert!(o.admin_user_id.is_none());

        assert!(matches!(reg.create(org("CITY")).await, Err(AppError::Validation(_))));
        assert!(matches!(reg.create(org(" ")).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn admin_without_provider_writes_nothing() {
        let store = MemoryStore::new();
        let reg = TenantRegistry::new(&store, None);
        assert!(matches!(reg.create(with_admin("CITY")).await, Err(AppError::Validation(_))));
        assert!(reg.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provisioned_admin_is_linked() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(header("authorization", "Bearer svc-token"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "data": { "id": user_id } })))
            .expect(1)
            .mount(&server)
            .await;
        let client = IdentityClient::new(server.uri(), Some("svc-token".into()), Duration::from_secs(5)).unwrap();
        let store = MemoryStore::new();

        let o = TenantRegistry::new(&store, Some(&client)).create(with_admin("CITY")).await.unwrap();
        assert_eq!(o.admin_user_id, Some(user_id));
    }

    #[tokio::test]
    async fn provider_failure_is_a_partial_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let client = IdentityClient::new(server.uri(), None, Duration::from_secs(5)).unwrap();
        let store = MemoryStore::new();
        let reg = TenantRegistry::new(&store, Some(&client));

        let err = reg.create(with_admin("CITY")).await.unwrap_err();
        assert!(matches!(err, AppError::PartialFailure(_)), "{err:?}");
        // the first step stays committed and is visible
        let orgs = reg.list(None).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert!(orgs[0].admin_user_id.is_none());
        assert!(err.to_string().contains(&orgs[0].id.to_string()));
    }

    #[tokio::test]
    async fn weak_admin_credentials_are_rejected() {
        let store = MemoryStore::new();
        let reg = TenantRegistry::new(&store, None);
        let mut req = with_admin("CITY");
        req.admin = Some(AdminLogin { email: "admin@city.example".into(), password: "short".into() });
        assert!(matches!(reg.create(req).await, Err(AppError::Validation(_))));

        let mut req = with_admin("CITY");
        req.admin = Some(AdminLogin { email: "not-an-email".into(), password: "long-enough".into() });
        assert!(matches!(reg.create(req).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn patch_suspends_and_filters() {
        let store = MemoryStore::new();
        let reg = TenantRegistry::new(&store, None);
        let a = reg.create(org("A")).await.unwrap();
        reg.create(org("B")).await.unwrap();

        let patched = reg
            .patch(a.id, OrganizationPatch { status: Some(OrgStatus::Suspended), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(patched.status, OrgStatus::Suspended);

        let suspended = reg.list(Some(OrgStatus::Suspended)).await.unwrap();
        assert_eq!(suspended.len(), 1);
        assert_eq!(suspended[0].code, "A");
        assert!(matches!(reg.get(999).await, Err(AppError::NotFound(_))));
    }
}
