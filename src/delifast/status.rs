//! Canonical shipment status vocabulary and partner status mapping.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// Canonical shipment status.
///
/// `new -> in_transit -> {completed|cancelled|returned}` with the last three
/// terminal. `error` is recoverable; `not_found` and `unknown` are
/// diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    New,
    InTransit,
    Completed,
    Cancelled,
    Returned,
    Error,
    NotFound,
    Unknown,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::New => "new",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Completed => "completed",
            ShipmentStatus::Cancelled => "cancelled",
            ShipmentStatus::Returned => "returned",
            ShipmentStatus::Error => "error",
            ShipmentStatus::NotFound => "not_found",
            ShipmentStatus::Unknown => "unknown",
        }
    }

    /// Parse a stored status string. Unrecognized values map to `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "new" => ShipmentStatus::New,
            "in_transit" => ShipmentStatus::InTransit,
            "completed" => ShipmentStatus::Completed,
            "cancelled" => ShipmentStatus::Cancelled,
            "returned" => ShipmentStatus::Returned,
            "error" => ShipmentStatus::Error,
            "not_found" => ShipmentStatus::NotFound,
            _ => ShipmentStatus::Unknown,
        }
    }

    /// Terminal statuses are never re-polled by the status-sync sweep.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::Completed | ShipmentStatus::Cancelled | ShipmentStatus::Returned
        )
    }

    /// Shopify order tag for this status, e.g. `delifast-in_transit`.
    pub fn tag(&self) -> String {
        format!("delifast-{}", self.as_str())
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Keyword tables scanned in category order; English and Arabic variants.
const NEW_KEYWORDS: &[&str] = &["new", "pending", "created", "جديد", "قيد الانتظار"];
const IN_TRANSIT_KEYWORDS: &[&str] = &[
    "transit",
    "picked",
    "pickup",
    "collected",
    "out for delivery",
    "on the way",
    "shipped",
    "في الطريق",
    "تم الاستلام",
    "قيد التوصيل",
];
const COMPLETED_KEYWORDS: &[&str] = &["delivered", "completed", "success", "تم التسليم", "مكتمل"];
const CANCELLED_KEYWORDS: &[&str] = &["cancel", "rejected", "ملغي", "مرفوض"];
const RETURNED_KEYWORDS: &[&str] = &["return", "rto", "مرتجع", "إرجاع"];

/// Map a raw partner status value (numeric or textual) to the canonical
/// vocabulary.
///
/// Numeric codes take precedence; anything else falls through to a
/// case-insensitive keyword scan in the order new, in_transit, completed,
/// cancelled, returned.
pub fn map_status_value(raw: &JsonValue) -> ShipmentStatus {
    if let Some(code) = numeric_code(raw) {
        return match code {
            0 => ShipmentStatus::New,
            1..=4 | 20 => ShipmentStatus::InTransit,
            5 | 100 => ShipmentStatus::Completed,
            6 | 101 => ShipmentStatus::Cancelled,
            7 | 102 => ShipmentStatus::Returned,
            _ => map_status_text(&raw_text(raw)),
        };
    }

    map_status_text(&raw_text(raw))
}

fn numeric_code(raw: &JsonValue) -> Option<i64> {
    match raw {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn raw_text(raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn map_status_text(text: &str) -> ShipmentStatus {
    let lowered = text.to_lowercase();

    let categories: [(&[&str], ShipmentStatus); 5] = [
        (NEW_KEYWORDS, ShipmentStatus::New),
        (IN_TRANSIT_KEYWORDS, ShipmentStatus::InTransit),
        (COMPLETED_KEYWORDS, ShipmentStatus::Completed),
        (CANCELLED_KEYWORDS, ShipmentStatus::Cancelled),
        (RETURNED_KEYWORDS, ShipmentStatus::Returned),
    ];

    for (keywords, status) in categories {
        if keywords.iter().any(|kw| lowered.contains(kw)) {
            return status;
        }
    }

    ShipmentStatus::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_codes() {
        assert_eq!(map_status_value(&json!(0)), ShipmentStatus::New);
        for code in [1, 2, 3, 4, 20] {
            assert_eq!(map_status_value(&json!(code)), ShipmentStatus::InTransit);
        }
        assert_eq!(map_status_value(&json!(5)), ShipmentStatus::Completed);
        assert_eq!(map_status_value(&json!(100)), ShipmentStatus::Completed);
        assert_eq!(map_status_value(&json!(6)), ShipmentStatus::Cancelled);
        assert_eq!(map_status_value(&json!(101)), ShipmentStatus::Cancelled);
        assert_eq!(map_status_value(&json!(7)), ShipmentStatus::Returned);
        assert_eq!(map_status_value(&json!(102)), ShipmentStatus::Returned);
    }

    #[test]
    fn test_numeric_strings_treated_as_codes() {
        assert_eq!(map_status_value(&json!("5")), ShipmentStatus::Completed);
        assert_eq!(map_status_value(&json!(" 20 ")), ShipmentStatus::InTransit);
    }

    #[test]
    fn test_english_keywords() {
        assert_eq!(
            map_status_value(&json!("Out for Delivery")),
            ShipmentStatus::InTransit
        );
        assert_eq!(
            map_status_value(&json!("DELIVERED to customer")),
            ShipmentStatus::Completed
        );
        assert_eq!(
            map_status_value(&json!("Cancelled by sender")),
            ShipmentStatus::Cancelled
        );
        assert_eq!(map_status_value(&json!("RTO initiated")), ShipmentStatus::Returned);
    }

    #[test]
    fn test_arabic_keywords() {
        assert_eq!(map_status_value(&json!("تم التسليم")), ShipmentStatus::Completed);
        assert_eq!(map_status_value(&json!("في الطريق")), ShipmentStatus::InTransit);
        assert_eq!(map_status_value(&json!("ملغي")), ShipmentStatus::Cancelled);
        assert_eq!(map_status_value(&json!("مرتجع")), ShipmentStatus::Returned);
    }

    #[test]
    fn test_category_order_wins() {
        // "pending pickup" matches both new and in_transit keyword tables;
        // the new category is scanned first.
        assert_eq!(map_status_value(&json!("pending pickup")), ShipmentStatus::New);
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(map_status_value(&json!("gibberish")), ShipmentStatus::Unknown);
        assert_eq!(map_status_value(&json!(999)), ShipmentStatus::Unknown);
        assert_eq!(map_status_value(&json!(null)), ShipmentStatus::Unknown);
    }

    #[test]
    fn test_terminal_set() {
        assert!(ShipmentStatus::Completed.is_terminal());
        assert!(ShipmentStatus::Cancelled.is_terminal());
        assert!(ShipmentStatus::Returned.is_terminal());
        assert!(!ShipmentStatus::New.is_terminal());
        assert!(!ShipmentStatus::InTransit.is_terminal());
        assert!(!ShipmentStatus::Error.is_terminal());
    }

    #[test]
    fn test_parse_roundtrip() {
        for status in [
            ShipmentStatus::New,
            ShipmentStatus::InTransit,
            ShipmentStatus::Completed,
            ShipmentStatus::Cancelled,
            ShipmentStatus::Returned,
            ShipmentStatus::Error,
            ShipmentStatus::NotFound,
        ] {
            assert_eq!(ShipmentStatus::parse(status.as_str()), status);
        }
        assert_eq!(ShipmentStatus::parse("bogus"), ShipmentStatus::Unknown);
    }

    #[test]
    fn test_order_tag_format() {
        assert_eq!(ShipmentStatus::InTransit.tag(), "delifast-in_transit");
        assert_eq!(ShipmentStatus::Completed.tag(), "delifast-completed");
    }
}
