//! Tenant settings repository
//!
//! Encapsulates SeaORM operations for the tenant_settings table: credential
//! decryption, bearer token caching, and one-time sender-profile enrichment
//! from login responses.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::crypto::{CryptoKey, decrypt_string};
use crate::models::tenant_settings::{self, Entity as TenantSettings};

/// Sender-profile fields a partner login response may carry.
#[derive(Debug, Clone, Default)]
pub struct SenderProfile {
    pub name: Option<String>,
    pub address: Option<String>,
    pub mobile: Option<String>,
    pub city_id: Option<i32>,
    pub area_id: Option<i32>,
    pub customer_id: Option<String>,
}

/// Repository for tenant settings database operations
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Crypto key for credential decryption
    pub crypto_key: CryptoKey,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository instance
    pub fn new(db: Arc<DatabaseConnection>, crypto_key: CryptoKey) -> Self {
        Self { db, crypto_key }
    }

    /// Finds a settings row by shop domain
    pub async fn find_by_shop_domain(
        &self,
        shop_domain: &str,
    ) -> Result<Option<tenant_settings::Model>> {
        Ok(TenantSettings::find()
            .filter(tenant_settings::Column::ShopDomain.eq(shop_domain))
            .one(&*self.db)
            .await?)
    }

    /// Finds a settings row by tenant ID
    pub async fn find_by_id(&self, tenant_id: &Uuid) -> Result<Option<tenant_settings::Model>> {
        Ok(TenantSettings::find_by_id(*tenant_id).one(&*self.db).await?)
    }

    /// Lists all tenants that have Delifast credentials configured
    pub async fn find_active(&self) -> Result<Vec<tenant_settings::Model>> {
        let all = TenantSettings::find().all(&*self.db).await?;
        Ok(all.into_iter().filter(|s| s.has_credentials()).collect())
    }

    /// Decrypts the stored Delifast password for a tenant
    pub fn decrypt_password(&self, settings: &tenant_settings::Model) -> Result<String> {
        let ciphertext = settings
            .delifast_password_ciphertext
            .as_deref()
            .ok_or_else(|| anyhow!("no Delifast password stored for {}", settings.shop_domain))?;

        decrypt_string(&self.crypto_key, ciphertext)
            .map_err(|e| anyhow!("password decryption failed for {}: {}", settings.shop_domain, e))
    }

    /// Decrypts the stored Shopify access token for a tenant, if present
    pub fn decrypt_shopify_token(
        &self,
        settings: &tenant_settings::Model,
    ) -> Result<Option<String>> {
        match settings.shopify_access_token_ciphertext.as_deref() {
            Some(ciphertext) if !ciphertext.is_empty() => decrypt_string(&self.crypto_key, ciphertext)
                .map(Some)
                .map_err(|e| {
                    anyhow!(
                        "Shopify token decryption failed for {}: {}",
                        settings.shop_domain,
                        e
                    )
                }),
            _ => Ok(None),
        }
    }

    /// Persists a freshly issued partner bearer token and its expiry,
    /// overwriting any previous token.
    pub async fn store_token(
        &self,
        tenant_id: &Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<tenant_settings::Model> {
        let settings = self
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| anyhow!("settings row {} not found", tenant_id))?;

        let mut active: tenant_settings::ActiveModel = settings.into();
        active.api_token = Set(Some(token.to_string()));
        active.token_expires_at = Set(Some(expires_at.into()));
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&*self.db).await?)
    }

    /// Clears the cached bearer token, forcing re-login on the next call.
    pub async fn clear_token(&self, tenant_id: &Uuid) -> Result<tenant_settings::Model> {
        let settings = self
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| anyhow!("settings row {} not found", tenant_id))?;

        let mut active: tenant_settings::ActiveModel = settings.into();
        active.api_token = Set(None);
        active.token_expires_at = Set(None);
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&*self.db).await?)
    }

    /// Fills sender-profile fields from a login response, but only fields
    /// that are currently unset. User edits are never overwritten.
    pub async fn enrich_sender_profile(
        &self,
        tenant_id: &Uuid,
        profile: &SenderProfile,
    ) -> Result<tenant_settings::Model> {
        let settings = self
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| anyhow!("settings row {} not found", tenant_id))?;

        let mut changed = false;
        let mut active: tenant_settings::ActiveModel = settings.clone().into();

        if is_unset(&settings.sender_name)
            && let Some(name) = non_empty(&profile.name)
        {
            active.sender_name = Set(Some(name));
            changed = true;
        }
        if is_unset(&settings.sender_address)
            && let Some(address) = non_empty(&profile.address)
        {
            active.sender_address = Set(Some(address));
            changed = true;
        }
        if is_unset(&settings.sender_mobile)
            && let Some(mobile) = non_empty(&profile.mobile)
        {
            active.sender_mobile = Set(Some(mobile));
            changed = true;
        }
        if settings.sender_city_id.is_none()
            && let Some(city_id) = profile.city_id
        {
            active.sender_city_id = Set(Some(city_id));
            changed = true;
        }
        if settings.sender_area_id.is_none()
            && let Some(area_id) = profile.area_id
        {
            active.sender_area_id = Set(Some(area_id));
            changed = true;
        }
        if is_unset(&settings.delifast_customer_id)
            && let Some(customer_id) = non_empty(&profile.customer_id)
        {
            active.delifast_customer_id = Set(Some(customer_id));
            changed = true;
        }

        if !changed {
            return Ok(settings);
        }

        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&*self.db).await?)
    }
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.is_empty())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(String::from)
}
