//! Best-effort Shopify order annotation.
//!
//! After a status change the bridge tags the order (`delifast-{status}`) and
//! appends a timeline note through the Admin API. Annotation is advisory:
//! failures are logged and swallowed, never surfaced to the caller.

use serde_json::json;

use crate::delifast::status::ShipmentStatus;
use crate::models::tenant_settings;
use crate::repositories::SettingsRepository;

const ADMIN_API_VERSION: &str = "2024-10";

/// Annotates Shopify orders with shipment status tags and notes.
#[derive(Debug, Clone)]
pub struct OrderAnnotator {
    http: reqwest::Client,
    settings_repo: SettingsRepository,
    /// Test override; production talks to `https://{shop_domain}`.
    api_base_override: Option<String>,
}

impl OrderAnnotator {
    pub fn new(
        http: reqwest::Client,
        settings_repo: SettingsRepository,
        api_base_override: Option<String>,
    ) -> Self {
        Self {
            http,
            settings_repo,
            api_base_override,
        }
    }

    /// Tags the order with `delifast-{status}` and records a note. Returns
    /// nothing: any failure is logged and dropped.
    pub async fn annotate_order(
        &self,
        settings: &tenant_settings::Model,
        order_id: i64,
        status: ShipmentStatus,
        note: &str,
    ) {
        let token = match self.settings_repo.decrypt_shopify_token(settings) {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!(shop = %settings.shop_domain, order_id,
                    "no Shopify token configured, skipping order annotation");
                return;
            }
            Err(err) => {
                tracing::warn!(shop = %settings.shop_domain, order_id, error = %err,
                    "Shopify token decryption failed, skipping order annotation");
                return;
            }
        };

        let base = self
            .api_base_override
            .clone()
            .unwrap_or_else(|| format!("https://{}", settings.shop_domain));
        let url = format!(
            "{}/admin/api/{}/orders/{}.json",
            base, ADMIN_API_VERSION, order_id
        );

        let body = json!({
            "order": {
                "id": order_id,
                "tags": status.tag(),
                "note": note,
            }
        });

        let result = self
            .http
            .put(&url)
            .header("X-Shopify-Access-Token", token)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(shop = %settings.shop_domain, order_id, status = %status,
                    "order annotated");
            }
            Ok(response) => {
                tracing::warn!(shop = %settings.shop_domain, order_id,
                    status = response.status().as_u16(),
                    "Shopify order annotation rejected");
            }
            Err(err) => {
                tracing::warn!(shop = %settings.shop_domain, order_id, error = %err,
                    "Shopify order annotation failed");
            }
        }
    }
}
