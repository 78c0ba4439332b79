//! Defensive extraction of shipment IDs and statuses from partner responses.
//!
//! The partner API is loosely typed: the same logical field shows up under
//! several spellings, sometimes nested inside wrapper objects. These helpers
//! centralize the heuristics so callers never poke at raw JSON.

use serde_json::Value as JsonValue;

/// Known spellings of the shipment ID field, in probe order.
const SHIPMENT_ID_FIELDS: &[&str] = &[
    "ShipmentNo",
    "shipmentNo",
    "shipment_no",
    "ShipmentNumber",
    "shipmentNumber",
    "AWB",
    "awb",
    "AwbNo",
    "awbNo",
    "TrackingNo",
    "trackingNo",
    "tracking_no",
    "ShipmentId",
    "shipmentId",
    "shipment_id",
];

/// Known spellings of the status field, in probe order.
const STATUS_FIELDS: &[&str] = &[
    "Status",
    "status",
    "ShipmentStatus",
    "shipmentStatus",
    "StatusName",
    "statusName",
    "State",
    "state",
];

const MAX_SEARCH_DEPTH: usize = 5;

/// Extract a shipment ID from a partner response.
///
/// Probes, in order: the fixed field list at the root, the same list inside
/// an `SH` sub-object, then a recursive search of nested objects (depth 5)
/// for the first scalar whose string form looks like a plausible ID.
pub fn extract_shipment_id(response: &JsonValue) -> Option<String> {
    if let Some(id) = fixed_fields(response, SHIPMENT_ID_FIELDS) {
        return Some(id);
    }

    if let Some(sh) = response.get("SH")
        && let Some(id) = fixed_fields(sh, SHIPMENT_ID_FIELDS)
    {
        return Some(id);
    }

    search_nested(response, 0)
}

/// Extract a raw status value from a partner response.
///
/// Probes the fixed field list first, then any key containing "status"
/// case-insensitively, recursively.
pub fn extract_status_value(response: &JsonValue) -> Option<JsonValue> {
    if let Some(obj) = response.as_object() {
        for field in STATUS_FIELDS {
            if let Some(value) = obj.get(*field)
                && !value.is_null()
            {
                return Some(value.clone());
            }
        }
    }

    find_status_key(response, 0)
}

fn fixed_fields(value: &JsonValue, fields: &[&str]) -> Option<String> {
    let obj = value.as_object()?;
    for field in fields {
        if let Some(v) = obj.get(*field)
            && let Some(s) = scalar_to_string(v)
            && !s.is_empty()
        {
            return Some(s);
        }
    }
    None
}

fn search_nested(value: &JsonValue, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }

    let obj = value.as_object()?;

    // At nested levels any scalar of plausible length counts; the fixed
    // field names already had their chance at the root.
    if depth > 0 {
        for v in obj.values() {
            if let Some(s) = scalar_to_string(v)
                && is_plausible_id(&s)
            {
                return Some(s);
            }
        }
    }

    for v in obj.values() {
        if v.is_object()
            && let Some(found) = search_nested(v, depth + 1)
        {
            return Some(found);
        }
    }

    None
}

fn find_status_key(value: &JsonValue, depth: usize) -> Option<JsonValue> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }

    let obj = value.as_object()?;

    for (key, v) in obj {
        if key.to_lowercase().contains("status") && !v.is_null() && !v.is_object() {
            return Some(v.clone());
        }
    }

    for v in obj.values() {
        if v.is_object()
            && let Some(found) = find_status_key(v, depth + 1)
        {
            return Some(found);
        }
    }

    None
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Real partner IDs sit between short enum-ish codes and long UUIDs.
fn is_plausible_id(s: &str) -> bool {
    s.len() > 4 && s.len() < 29
}
