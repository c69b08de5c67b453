//! Admin sessions: bearer tokens issued at login, kept in the local store.
//!
//! Each login gets its own entry keyed by the token the caller was handed.
//! Admin calls must present that token; an unknown one never reaches the
//! backend. A 401 from any admin call ends that caller's session only.

use serde_json::Value;
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::draft_store::DraftStore;
use crate::errors::{RegistrarError, Result};
use crate::wire::{AdminCall, LoginRequest, LoginResponse};

const ADMIN_SESSION_PREFIX: &str = "admin-session:";

fn session_key(token: &str) -> String {
    format!("{ADMIN_SESSION_PREFIX}{token}")
}

#[derive(Debug, Clone)]
pub struct AdminSession {
    store: DraftStore,
}

impl AdminSession {
    pub fn new(store: DraftStore) -> Self {
        Self { store }
    }

    /// Whether `token` was issued by a login on this registrar and not
    /// yet ended.
    pub async fn is_active(&self, token: &str) -> Result<bool> {
        if token.is_empty() {
            return Ok(false);
        }
        Ok(self.store.get(&session_key(token)).await?.is_some())
    }

    pub async fn login(&self, api: &ApiClient, credentials: &LoginRequest) -> Result<LoginResponse> {
        let response = api.admin_login(credentials).await.map_err(|e| match e {
            RegistrarError::Api { status: 401, .. } => RegistrarError::Unauthorized,
            other => other,
        })?;
        if response.token.is_empty() {
            return Err(RegistrarError::Unauthorized);
        }
        self.store
            .put(&session_key(&response.token), &credentials.email)
            .await?;
        info!("Admin `{}` logged in", credentials.email);
        Ok(response)
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.store.delete(&[session_key(token)]).await
    }

    /// Run an admin call with the caller's bearer token.
    pub async fn call(&self, api: &ApiClient, token: Option<&str>, call: &AdminCall) -> Result<Value> {
        let token = token.ok_or(RegistrarError::Unauthorized)?;
        if !self.is_active(token).await? {
            return Err(RegistrarError::Unauthorized);
        }
        match api.admin(token, call).await {
            Err(RegistrarError::Api { status: 401, .. }) => {
                warn!("Admin token rejected upstream; ending session");
                self.logout(token).await?;
                Err(RegistrarError::Unauthorized)
            }
            other => other,
        }
    }
}
