// src/identity.rs
//
// Outbound client for the identity provider that owns login principals.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct ProvisionUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub org_id: i64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct CreatedUser {
    id: Uuid,
}

#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("reqwest build error: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// `None` when no provider is configured.
    pub fn from_config(cfg: &IdentityConfig) -> AppResult<Option<Self>> {
        cfg.base_url
            .as_deref()
            .map(|url| Self::new(url, cfg.token.clone(), Duration::from_secs(cfg.timeout_secs)))
            .transpose()
    }

    /// POST {base}/users; returns the id of the created principal.
    #[instrument(skip(self, user), fields(org_id = user.org_id, email = user.email))]
    pub async fn create_user(&self, user: &ProvisionUser<'_>) -> AppResult<Uuid> {
        let url = format!("{}/users", self.base_url);
        let mut req = self.http.post(&url).json(user);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let created: Envelope<CreatedUser> = req
            .send()
            .await
            .map_err(|e| AppError::Remote(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Remote(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("unexpected response: {e}")))?;

        info!(user_id = %created.data.id, "login principal provisioned");
        Ok(created.data.id)
    }
}
