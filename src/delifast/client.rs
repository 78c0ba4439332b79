//! Delifast HTTP client.
//!
//! All partner calls flow through [`DelifastClient::request`], which attaches
//! the bearer token and the fixed `Accept-Language` header and performs the
//! single 401 re-login retry. Endpoint wrappers add the partner's quirks on
//! top: the status query-parameter fallback and the two-endpoint order
//! lookup.

use reqwest::Method;
use serde_json::Value as JsonValue;

use crate::config::DelifastConfig;
use crate::delifast::auth::TokenManager;
use crate::delifast::extract::{extract_shipment_id, extract_status_value};
use crate::delifast::ids::is_temporary_id;
use crate::delifast::status::{ShipmentStatus, map_status_value};
use crate::error::LifecycleError;
use crate::mapper::ShipmentPayload;
use crate::models::tenant_settings;

/// Result of a status fetch, canonical plus the raw partner details.
#[derive(Debug, Clone)]
pub struct StatusResult {
    pub status: ShipmentStatus,
    pub details: Option<String>,
    pub is_temporary: bool,
}

/// Client for the Delifast partner API.
#[derive(Debug, Clone)]
pub struct DelifastClient {
    http: reqwest::Client,
    auth: TokenManager,
    api_base: String,
    language: String,
}

impl DelifastClient {
    pub fn new(http: reqwest::Client, auth: TokenManager, config: &DelifastConfig) -> Self {
        Self {
            http,
            auth,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        }
    }

    pub fn auth(&self) -> &TokenManager {
        &self.auth
    }

    /// Single call-site for authenticated partner requests.
    ///
    /// On 401 the cached token is cleared, a re-login performed, and the
    /// request retried exactly once; a second 401 is an authentication
    /// failure. Any other non-2xx or malformed JSON becomes `PartnerApi`.
    pub async fn request(
        &self,
        settings: &tenant_settings::Model,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<JsonValue, LifecycleError> {
        let token = self.auth.ensure_token(settings).await?;

        match self
            .execute(&token, method.clone(), path, body, query)
            .await
        {
            Err(LifecycleError::PartnerApi { status: 401, .. }) => {
                tracing::debug!(shop = %settings.shop_domain, path,
                    "partner returned 401, refreshing token and retrying once");
                let token = self.auth.force_refresh(settings).await?;
                match self.execute(&token, method, path, body, query).await {
                    Err(LifecycleError::PartnerApi { status: 401, body }) => {
                        Err(LifecycleError::AuthFailed(format!(
                            "still unauthorized after re-login: {}",
                            body
                        )))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn execute(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<JsonValue, LifecycleError> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(token)
            .header("Accept-Language", &self.language);

        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(LifecycleError::PartnerApi {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|_| LifecycleError::PartnerApi {
            status: status.as_u16(),
            body: text,
        })
    }

    /// Submits a shipment to the partner, returning the raw response for
    /// defensive ID extraction by the caller.
    pub async fn create_shipment(
        &self,
        settings: &tenant_settings::Model,
        payload: &ShipmentPayload,
    ) -> Result<JsonValue, LifecycleError> {
        let body = serde_json::to_value(payload).map_err(|e| LifecycleError::PartnerApi {
            status: 0,
            body: format!("payload serialization failed: {}", e),
        })?;

        self.request(settings, Method::POST, "/api/shipments", Some(&body), None)
            .await
    }

    /// Fetches the current status of a shipment.
    ///
    /// Temporary IDs short-circuit to a synthetic awaiting-ID result without
    /// any HTTP call. The partner sometimes rejects the query-string form of
    /// this endpoint, so a partner-side failure is retried once without the
    /// query parameter.
    pub async fn get_shipment_status(
        &self,
        settings: &tenant_settings::Model,
        shipment_id: &str,
    ) -> Result<StatusResult, LifecycleError> {
        if is_temporary_id(shipment_id) {
            return Ok(StatusResult {
                status: ShipmentStatus::New,
                details: Some("awaiting partner shipment ID".to_string()),
                is_temporary: true,
            });
        }

        let path = format!("/api/shipments/{}/status", shipment_id);

        let response = match self
            .request(
                settings,
                Method::GET,
                &path,
                None,
                Some(&[("shipmentNo", shipment_id)]),
            )
            .await
        {
            Ok(response) => response,
            // Auth and transport errors propagate; only a partner-side
            // rejection triggers the no-query fallback.
            Err(LifecycleError::PartnerApi { status, .. }) => {
                tracing::debug!(shipment_id, status,
                    "status query with parameter failed, retrying without it");
                self.request(settings, Method::GET, &path, None, None).await?
            }
            Err(other) => return Err(other),
        };

        Ok(status_result_from_response(&response))
    }

    /// Looks up the real shipment ID for an order number: primary endpoint
    /// first, then the alternate search endpoint. A 404 from either is a
    /// miss, not a failure.
    pub async fn lookup_by_order_number(
        &self,
        settings: &tenant_settings::Model,
        order_number: &str,
    ) -> Result<Option<String>, LifecycleError> {
        let primary = format!("/api/shipments/by-order/{}", order_number);
        match self
            .request(settings, Method::GET, &primary, None, None)
            .await
        {
            Ok(response) => {
                if let Some(id) = extract_shipment_id(&response)
                    && !is_temporary_id(&id)
                {
                    return Ok(Some(id));
                }
            }
            Err(LifecycleError::PartnerApi { status: 404, .. }) => {}
            Err(other) => return Err(other),
        }

        match self
            .request(
                settings,
                Method::GET,
                "/api/shipments/search",
                None,
                Some(&[("orderNo", order_number)]),
            )
            .await
        {
            Ok(response) => Ok(extract_shipment_id(&response).filter(|id| !is_temporary_id(id))),
            Err(LifecycleError::PartnerApi { status: 404, .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Cancels a shipment at the partner.
    pub async fn cancel_shipment(
        &self,
        settings: &tenant_settings::Model,
        shipment_id: &str,
    ) -> Result<JsonValue, LifecycleError> {
        let path = format!("/api/shipments/{}/cancel", shipment_id);
        self.request(settings, Method::POST, &path, None, None).await
    }

    /// Lists the partner's cities (used by settings surfaces).
    pub async fn list_cities(
        &self,
        settings: &tenant_settings::Model,
    ) -> Result<JsonValue, LifecycleError> {
        self.request(settings, Method::GET, "/api/cities", None, None)
            .await
    }

    /// Lists the areas of a city.
    pub async fn list_areas(
        &self,
        settings: &tenant_settings::Model,
        city_id: i32,
    ) -> Result<JsonValue, LifecycleError> {
        let path = format!("/api/cities/{}/areas", city_id);
        self.request(settings, Method::GET, &path, None, None).await
    }
}

fn status_result_from_response(response: &JsonValue) -> StatusResult {
    let raw = extract_status_value(response);

    let status = raw
        .as_ref()
        .map(map_status_value)
        .unwrap_or(ShipmentStatus::Unknown);

    let details = raw.map(|v| match v {
        JsonValue::String(s) => s,
        other => other.to_string(),
    });

    StatusResult {
        status,
        details,
        is_temporary: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_result_from_numeric_response() {
        let result = status_result_from_response(&json!({ "Status": 5 }));
        assert_eq!(result.status, ShipmentStatus::Completed);
        assert_eq!(result.details.as_deref(), Some("5"));
        assert!(!result.is_temporary);
    }

    #[test]
    fn test_status_result_from_text_response() {
        let result = status_result_from_response(&json!({ "statusName": "Out for Delivery" }));
        assert_eq!(result.status, ShipmentStatus::InTransit);
        assert_eq!(result.details.as_deref(), Some("Out for Delivery"));
    }

    #[test]
    fn test_status_result_without_status_field() {
        let result = status_result_from_response(&json!({ "message": "ok" }));
        assert_eq!(result.status, ShipmentStatus::Unknown);
        assert_eq!(result.details, None);
    }
}
