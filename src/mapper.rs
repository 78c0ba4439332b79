//! Shopify order to Delifast shipment payload mapping.
//!
//! Pure, deterministic translation: address fallback, province-to-city
//! resolution, variant title parsing, and the three-way payment branch.
//! Quantity fields are serialized as JSON strings because the partner's
//! parser rejects bare numbers.

use serde::{Deserialize, Serialize};

use crate::delifast::cities::map_province_to_city;
use crate::models::tenant_settings;
use crate::shopify::order::{Address, Order};

/// Shipment creation payload in the partner's wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentPayload {
    #[serde(rename = "CustomerId", skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(rename = "OrderNo")]
    pub order_no: String,
    #[serde(rename = "ConsigneeName")]
    pub consignee_name: String,
    #[serde(rename = "ConsigneeMobile")]
    pub consignee_mobile: String,
    #[serde(rename = "ConsigneeAddress")]
    pub consignee_address: String,
    #[serde(rename = "CityId")]
    pub city_id: i32,
    #[serde(rename = "AreaId", skip_serializing_if = "Option::is_none")]
    pub area_id: Option<i32>,
    #[serde(rename = "SenderName", skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(rename = "SenderAddress", skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<String>,
    #[serde(rename = "SenderMobile", skip_serializing_if = "Option::is_none")]
    pub sender_mobile: Option<String>,
    #[serde(rename = "SenderCityId", skip_serializing_if = "Option::is_none")]
    pub sender_city_id: Option<i32>,
    #[serde(rename = "SenderAreaId", skip_serializing_if = "Option::is_none")]
    pub sender_area_id: Option<i32>,
    #[serde(rename = "Weight")]
    pub weight: f64,
    #[serde(rename = "Length")]
    pub length: f64,
    #[serde(rename = "Width")]
    pub width: f64,
    #[serde(rename = "Height")]
    pub height: f64,
    /// Total piece count, as a string per the partner's parser
    #[serde(rename = "Pieces")]
    pub pieces: String,
    /// Order value declared to the partner; 0 for prepaid orders
    #[serde(rename = "TotalPrice")]
    pub total_price: f64,
    /// COD amount to collect; 0 for prepaid orders
    #[serde(rename = "CodAmount")]
    pub cod_amount: f64,
    /// 0 = cash on delivery, 1 = prepaid
    #[serde(rename = "PaymentMethodId")]
    pub payment_method_id: i32,
    #[serde(rename = "FeesOnSender")]
    pub fees_on_sender: bool,
    #[serde(rename = "FeesPaid")]
    pub fees_paid: bool,
    #[serde(rename = "Notes", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "Items")]
    pub items: Vec<PayloadItem>,
}

/// Line item in the partner's wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadItem {
    #[serde(rename = "Name")]
    pub name: String,
    /// Quantity as a string per the partner's parser
    #[serde(rename = "Qty")]
    pub qty: String,
    #[serde(rename = "Price", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(rename = "Sku", skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(rename = "Color", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "Size", skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// Builds the partner payload for an order using the tenant's settings.
pub fn prepare_shipment_payload(
    settings: &tenant_settings::Model,
    order: &Order,
) -> ShipmentPayload {
    let address = order
        .billing_address
        .as_ref()
        .or(order.shipping_address.as_ref());

    let consignee_name = address
        .and_then(|a| a.name.clone())
        .filter(|n| !n.is_empty())
        .or_else(|| order.customer.as_ref().map(|c| c.full_name()))
        .unwrap_or_default();

    let consignee_mobile = address
        .and_then(|a| a.phone.clone())
        .filter(|p| !p.is_empty())
        .or_else(|| order.customer.as_ref().and_then(|c| c.phone.clone()))
        .unwrap_or_default();

    let consignee_address = address.map(Address::street).unwrap_or_default();

    let city_id = address
        .and_then(|a| a.province.as_deref())
        .map(|province| map_province_to_city(province, settings.default_city_id))
        .unwrap_or(settings.default_city_id);

    let (total_price, cod_amount, payment_method_id, fees_on_sender, fees_paid) =
        payment_fields(settings, order);

    let total_pieces: i64 = order
        .line_items
        .iter()
        .map(|item| item.quantity.max(0))
        .sum();

    let items = order
        .line_items
        .iter()
        .map(|item| {
            let (color, size) = parse_variant(item.variant_title.as_deref().unwrap_or(""));
            PayloadItem {
                name: item.title.clone().unwrap_or_default(),
                qty: item.quantity.to_string(),
                price: item.price.clone(),
                sku: item.sku.clone(),
                color,
                size,
            }
        })
        .collect();

    ShipmentPayload {
        customer_id: settings.delifast_customer_id.clone(),
        order_no: order.display_number(),
        consignee_name,
        consignee_mobile,
        consignee_address,
        city_id,
        area_id: None,
        sender_name: settings.sender_name.clone(),
        sender_address: settings.sender_address.clone(),
        sender_mobile: settings.sender_mobile.clone(),
        sender_city_id: settings.sender_city_id,
        sender_area_id: settings.sender_area_id,
        weight: settings.default_weight,
        length: settings.default_length,
        width: settings.default_width,
        height: settings.default_height,
        pieces: total_pieces.max(1).to_string(),
        total_price,
        cod_amount,
        payment_method_id,
        fees_on_sender,
        fees_paid,
        notes: order.note.clone().filter(|n| !n.is_empty()),
        items,
    }
}

/// The three-way payment branch, in precedence order:
/// 1. COD gateway: declare and collect the order total, payment method 0,
///    fee flags forced false (the courier collects, fee handling is settled
///    in cash)
/// 2. electronically (partially) paid: declare and collect nothing, payment
///    method 1, fee flags from settings
/// 3. anything else is treated as COD
///
/// Returns (total_price, cod_amount, payment_method_id, fees_on_sender,
/// fees_paid).
fn payment_fields(
    settings: &tenant_settings::Model,
    order: &Order,
) -> (f64, f64, i32, bool, bool) {
    let total: f64 = order
        .total_price
        .as_deref()
        .and_then(|t| t.parse().ok())
        .unwrap_or(0.0);

    let gateway = order.gateway_text().to_lowercase();
    if gateway.contains("cod") || gateway.contains("cash") {
        return (total, total, 0, false, false);
    }

    let financial = order.financial_status.as_deref().unwrap_or("");
    if matches!(financial, "paid" | "partially_paid") {
        return (0.0, 0.0, 1, settings.fees_on_sender, settings.fees_paid);
    }

    (total, total, 0, false, false)
}

/// Parses a slash-delimited variant title into (color, size).
///
/// Keyword-labeled parts win ("Color: Red", "لون: أحمر"); otherwise a single
/// part is the size and two parts are color then size.
pub fn parse_variant(variant_title: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = variant_title
        .split('/')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        return (None, None);
    }

    let mut color = None;
    let mut size = None;
    let mut positional: Vec<&str> = Vec::new();

    for part in &parts {
        let lowered = part.to_lowercase();
        if lowered.contains("color") || part.contains("لون") {
            color = Some(keyword_value(part));
        } else if lowered.contains("size") || part.contains("مقاس") {
            size = Some(keyword_value(part));
        } else {
            positional.push(part);
        }
    }

    if color.is_none() && size.is_none() {
        return match positional.len() {
            1 => (None, Some(positional[0].to_string())),
            _ => (
                Some(positional[0].to_string()),
                Some(positional[1].to_string()),
            ),
        };
    }

    (color, size)
}

fn keyword_value(part: &str) -> String {
    part.split_once(':')
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_else(|| part.trim().to_string())
}
