//! Temporary shipment ID issuance and recognition.
//!
//! When the partner accepts a shipment but returns no usable ID, the bridge
//! issues a placeholder that is recognizable everywhere else in the system
//! and later resolved by the background lookup job.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Prefixes that mark a shipment ID as locally issued.
pub const TEMP_ID_PREFIXES: [&str; 3] = ["DELIFAST-", "PENDING-", "TEMP-"];

static LAST_ISSUED_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Whether the given shipment ID is a locally issued placeholder.
pub fn is_temporary_id(shipment_id: &str) -> bool {
    TEMP_ID_PREFIXES
        .iter()
        .any(|prefix| shipment_id.starts_with(prefix))
}

/// Issue a temporary shipment ID of the form `DELIFAST-{order}-{millis}`.
///
/// The millisecond component is strictly increasing across calls within the
/// process, so two orders sent in the same millisecond still get distinct IDs.
pub fn generate_temporary_id(order_number: &str) -> String {
    let millis = next_millis();
    format!("DELIFAST-{}-{}", order_number, millis)
}

fn next_millis() -> i64 {
    let mut last = LAST_ISSUED_MILLIS.load(Ordering::Relaxed);
    loop {
        let candidate = Utc::now().timestamp_millis().max(last + 1);
        match LAST_ISSUED_MILLIS.compare_exchange_weak(
            last,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(observed) => last = observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_is_recognized_as_temporary() {
        let id = generate_temporary_id("1001");
        assert!(is_temporary_id(&id));
        assert!(id.starts_with("DELIFAST-1001-"));
    }

    #[test]
    fn test_all_prefixes_recognized() {
        assert!(is_temporary_id("DELIFAST-1001-1700000000000"));
        assert!(is_temporary_id("PENDING-1001"));
        assert!(is_temporary_id("TEMP-42"));
    }

    #[test]
    fn test_partner_ids_not_temporary() {
        assert!(!is_temporary_id("SH123456"));
        assert!(!is_temporary_id("1234567890"));
        assert!(!is_temporary_id(""));
    }

    #[test]
    fn test_rapid_issuance_yields_unique_ids() {
        let ids: Vec<String> = (0..100).map(|_| generate_temporary_id("1001")).collect();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn test_millis_component_strictly_increasing() {
        let a = next_millis();
        let b = next_millis();
        assert!(b > a);
    }
}
