//! Shopify order webhook payload types.
//!
//! Only the fields the bridge consumes are modeled; everything else in the
//! webhook body is ignored by serde.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shopify order as delivered by the orders webhooks and the Admin API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    /// Numeric Shopify order ID
    pub id: i64,
    /// Display name, e.g. "#1001"
    #[serde(default)]
    pub name: Option<String>,
    /// Bare order number
    #[serde(default)]
    pub order_number: Option<i64>,
    /// Order total as a decimal string
    #[serde(default)]
    pub total_price: Option<String>,
    /// "pending", "paid", "partially_paid", "refunded", ...
    #[serde(default)]
    pub financial_status: Option<String>,
    /// Primary payment gateway
    #[serde(default)]
    pub gateway: Option<String>,
    /// All gateways that participated in payment
    #[serde(default)]
    pub payment_gateway_names: Vec<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Order {
    /// Display order number: the `name` field, falling back to the bare
    /// number, falling back to the numeric ID.
    pub fn display_number(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.trim_start_matches('#').to_string();
        }
        if let Some(number) = self.order_number {
            return number.to_string();
        }
        self.id.to_string()
    }

    /// The gateway names joined for keyword inspection.
    pub fn gateway_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(gateway) = self.gateway.as_deref() {
            parts.push(gateway);
        }
        parts.extend(self.payment_gateway_names.iter().map(String::as_str));
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Address {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Address {
    /// Street address with both lines joined.
    pub fn street(&self) -> String {
        [self.address1.as_deref(), self.address2.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_number_prefers_name() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 123, "name": "#1001", "order_number": 1001
        }))
        .unwrap();
        assert_eq!(order.display_number(), "1001");
    }

    #[test]
    fn test_display_number_falls_back() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 123, "order_number": 1001
        }))
        .unwrap();
        assert_eq!(order.display_number(), "1001");

        let order: Order = serde_json::from_value(serde_json::json!({ "id": 123 })).unwrap();
        assert_eq!(order.display_number(), "123");
    }

    #[test]
    fn test_gateway_text_joins_all_sources() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 1,
            "gateway": "manual",
            "payment_gateway_names": ["Cash on Delivery (COD)"]
        }))
        .unwrap();
        assert!(order.gateway_text().contains("manual"));
        assert!(order.gateway_text().contains("Cash on Delivery"));
    }
}
