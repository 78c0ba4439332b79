//! Token-caching authentication layer for the Delifast API.
//!
//! Every partner call goes through [`TokenManager`]: it hands out the cached
//! bearer token while it is comfortably inside its lifetime and performs a
//! username/password login otherwise. A successful login also enriches
//! unset sender-profile fields from the response, once.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value as JsonValue, json};

use crate::config::DelifastConfig;
use crate::error::LifecycleError;
use crate::models::tenant_settings;
use crate::repositories::tenant_settings::{SenderProfile, SettingsRepository};

/// Field spellings under which a login response may carry the bearer token.
const TOKEN_FIELDS: &[&str] = &["token", "Token", "accessToken", "access_token", "ApiToken"];

/// Manages cached partner bearer tokens per tenant.
#[derive(Debug, Clone)]
pub struct TokenManager {
    http: reqwest::Client,
    settings_repo: SettingsRepository,
    api_base: String,
    token_ttl: Duration,
    refresh_window: Duration,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        settings_repo: SettingsRepository,
        config: &DelifastConfig,
    ) -> Self {
        Self {
            http,
            settings_repo,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token_ttl: Duration::hours(config.token_ttl_hours),
            refresh_window: Duration::minutes(config.token_refresh_window_minutes),
        }
    }

    /// Returns the cached token if it is still valid outside the refresh
    /// window. Never returns an expired token.
    pub fn valid_token(&self, settings: &tenant_settings::Model) -> Option<String> {
        let token = settings.api_token.as_deref().filter(|t| !t.is_empty())?;
        let expires_at: DateTime<Utc> = settings.token_expires_at?.into();

        if expires_at - self.refresh_window > Utc::now() {
            Some(token.to_string())
        } else {
            None
        }
    }

    /// Returns a valid bearer token, logging in if the cache is cold or
    /// inside the refresh window.
    pub async fn ensure_token(
        &self,
        settings: &tenant_settings::Model,
    ) -> Result<String, LifecycleError> {
        if let Some(token) = self.valid_token(settings) {
            return Ok(token);
        }
        self.login(settings).await
    }

    /// Clears the cached token and logs in again. Used on 401 responses.
    pub async fn force_refresh(
        &self,
        settings: &tenant_settings::Model,
    ) -> Result<String, LifecycleError> {
        self.settings_repo
            .clear_token(&settings.id)
            .await
            .map_err(|e| LifecycleError::AuthFailed(e.to_string()))?;
        self.login(settings).await
    }

    /// Performs a username/password login against the partner.
    ///
    /// Failures propagate; there is no internal retry. A 2xx response
    /// without a recognizable token field is an authentication failure.
    pub async fn login(
        &self,
        settings: &tenant_settings::Model,
    ) -> Result<String, LifecycleError> {
        if !settings.has_credentials() {
            return Err(LifecycleError::CredentialsMissing);
        }

        let username = settings
            .delifast_username
            .as_deref()
            .ok_or(LifecycleError::CredentialsMissing)?;
        let password = self
            .settings_repo
            .decrypt_password(settings)
            .map_err(|e| LifecycleError::AuthFailed(e.to_string()))?;

        tracing::debug!(shop = %settings.shop_domain, "logging in to Delifast");

        let response = self
            .http
            .post(format!("{}/api/account/login", self.api_base))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let body: JsonValue = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(LifecycleError::AuthFailed(format!(
                    "login rejected with status {}",
                    status.as_u16()
                )));
            }
            Err(err) => return Err(LifecycleError::Http(err)),
        };

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("invalid credentials");
            return Err(LifecycleError::AuthFailed(format!(
                "status {}: {}",
                status.as_u16(),
                message
            )));
        }

        let token = extract_token(&body).ok_or_else(|| {
            LifecycleError::AuthFailed("login response carried no token".to_string())
        })?;

        let expires_at = Utc::now() + self.token_ttl;
        self.settings_repo
            .store_token(&settings.id, &token, expires_at)
            .await
            .map_err(|e| LifecycleError::AuthFailed(e.to_string()))?;

        // One-time enrichment of unset sender fields from the login payload.
        let profile = sender_profile_from_login(&body);
        if let Err(err) = self
            .settings_repo
            .enrich_sender_profile(&settings.id, &profile)
            .await
        {
            tracing::warn!(shop = %settings.shop_domain, error = %err,
                "failed to enrich sender profile from login response");
        }

        metrics::counter!("delifast_logins_total").increment(1);
        tracing::info!(shop = %settings.shop_domain, "Delifast login succeeded");

        Ok(token)
    }
}

fn extract_token(body: &JsonValue) -> Option<String> {
    let probe = |obj: &JsonValue| {
        TOKEN_FIELDS.iter().find_map(|field| {
            obj.get(*field)
                .and_then(|v| v.as_str())
                .filter(|t| !t.is_empty())
                .map(String::from)
        })
    };

    probe(body).or_else(|| body.get("data").and_then(|data| probe(data)))
}

fn sender_profile_from_login(body: &JsonValue) -> SenderProfile {
    let root = body.get("data").unwrap_or(body);

    let text = |fields: &[&str]| {
        fields.iter().find_map(|f| {
            root.get(*f)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
    };
    let int = |fields: &[&str]| {
        fields
            .iter()
            .find_map(|f| root.get(*f).and_then(|v| v.as_i64()).map(|v| v as i32))
    };

    SenderProfile {
        name: text(&["CustomerName", "customerName", "name", "Name"]),
        address: text(&["Address", "address"]),
        mobile: text(&["Mobile", "mobile", "Phone", "phone"]),
        city_id: int(&["CityId", "cityId"]),
        area_id: int(&["AreaId", "areaId"]),
        customer_id: text(&["CustomerId", "customerId"]).or_else(|| {
            root.get("CustomerId")
                .and_then(|v| v.as_i64())
                .map(|v| v.to_string())
        }),
    }
}
