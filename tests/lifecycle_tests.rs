//! Lifecycle engine integration tests against a mocked partner API.

mod test_utils;

use chrono::{Duration, Utc};
use delifast_bridge::delifast::status::ShipmentStatus;
use delifast_bridge::error::LifecycleError;
use delifast_bridge::models::log_entry;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use test_utils::{build_harness, sample_order, seed_tenant};

#[tokio::test]
async fn send_order_records_real_shipment_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shipments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ShipmentNo": "SH123" })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;

    let row = harness
        .engine
        .send_order(&settings, &sample_order(1001, "#1001"))
        .await
        .expect("send");

    assert_eq!(row.shipment_id.as_deref(), Some("SH123"));
    assert!(!row.is_temporary);
    assert_eq!(row.status, ShipmentStatus::New.as_str());
    assert!(row.sent_at.is_some());
    assert!(row.next_lookup_at.is_none());
}

#[tokio::test]
async fn send_order_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shipments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ShipmentNo": "SH123" })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;
    let order = sample_order(1001, "#1001");

    let first = harness.engine.send_order(&settings, &order).await.expect("send");
    let second = harness.engine.send_order(&settings, &order).await.expect("resend");

    assert_eq!(first.id, second.id);
    assert_eq!(second.shipment_id.as_deref(), Some("SH123"));
}

#[tokio::test]
async fn send_order_without_id_issues_temporary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shipments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;

    let before = Utc::now();
    let row = harness
        .engine
        .send_order(&settings, &sample_order(1001, "#1001"))
        .await
        .expect("send");

    assert!(row.is_temporary);
    let temp_id = row.shipment_id.expect("temp id");
    assert!(temp_id.starts_with("DELIFAST-1001-"), "got {}", temp_id);

    // First lookup is scheduled roughly initial_lookup_delay_minutes out.
    let next_lookup: chrono::DateTime<Utc> = row.next_lookup_at.expect("schedule").into();
    let delta = next_lookup - before;
    assert!(delta >= Duration::minutes(14), "schedule too soon: {}", delta);
    assert!(delta <= Duration::minutes(16), "schedule too late: {}", delta);
}

#[tokio::test]
async fn send_order_writes_an_audit_log_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shipments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ShipmentNo": "SH123" })))
        .mount(&server)
        .await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;

    harness
        .engine
        .send_order(&settings, &sample_order(1001, "#1001"))
        .await
        .expect("send");

    let entries = log_entry::Entity::find()
        .filter(log_entry::Column::TenantId.eq(settings.id))
        .all(&*harness.db)
        .await
        .expect("query log entries");
    assert!(!entries.is_empty());
    assert!(entries.iter().any(|e| e.message == "shipment sent"));
}

#[tokio::test]
async fn send_order_failure_leaves_error_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shipments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("partner exploded"))
        .mount(&server)
        .await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;

    let err = harness
        .engine
        .send_order(&settings, &sample_order(1001, "#1001"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, LifecycleError::PartnerApi { status: 500, .. }));

    let row = harness
        .shipments
        .find_by_order(&settings.id, 1001)
        .await
        .expect("query")
        .expect("error row recorded");
    assert_eq!(row.status, ShipmentStatus::Error.as_str());
    assert!(row.shipment_id.is_none());
}

#[tokio::test]
async fn failed_send_is_retried_on_next_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shipments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("partner exploded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/shipments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ShipmentNo": "SH456" })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;
    let order = sample_order(1001, "#1001");

    harness.engine.send_order(&settings, &order).await.expect_err("first fails");
    let row = harness.engine.send_order(&settings, &order).await.expect("retry succeeds");

    assert_eq!(row.shipment_id.as_deref(), Some("SH456"));
    assert_eq!(row.status, ShipmentStatus::New.as_str());
}

#[tokio::test]
async fn resend_of_escalated_temporary_row_makes_no_partner_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shipments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ShipmentNo": "SH999" })))
        .expect(0)
        .mount(&server)
        .await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;

    // An aged temporary row with the lookup budget exhausted; the partner
    // accepted this shipment when it was first sent.
    let row = harness
        .shipments
        .upsert(
            &settings.id,
            delifast_bridge::repositories::shipment::NewShipment {
                order_id: 1001,
                order_number: "1001".to_string(),
                shipment_id: Some("DELIFAST-1001-1718000000000".to_string()),
                is_temporary: true,
                status: ShipmentStatus::New,
                status_details: None,
                next_lookup_at: None,
            },
        )
        .await
        .expect("seed row");
    let mut active: delifast_bridge::models::shipment::ActiveModel = row.into();
    active.sent_at = Set(Some((Utc::now() - Duration::hours(48)).into()));
    active.lookup_attempts = Set(3);
    active.update(&*harness.db).await.expect("age row");

    harness.jobs.run_stuck_order_sweep().await;

    // The escalated row still carries its temporary ID, so a resend must
    // not create a duplicate shipment at the partner.
    let row = harness
        .engine
        .send_order(&settings, &sample_order(1001, "#1001"))
        .await
        .expect("resend is a no-op");

    assert!(row.is_temporary);
    assert_eq!(row.status, ShipmentStatus::Error.as_str());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn refresh_retries_once_after_401() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/shipments/SH9/status"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/account/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "fresh-token" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/shipments/SH9/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Status": 2 })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;
    harness
        .shipments
        .upsert(
            &settings.id,
            delifast_bridge::repositories::shipment::NewShipment {
                order_id: 1001,
                order_number: "1001".to_string(),
                shipment_id: Some("SH9".to_string()),
                is_temporary: false,
                status: ShipmentStatus::New,
                status_details: None,
                next_lookup_at: None,
            },
        )
        .await
        .expect("seed row");

    let (row, result) = harness
        .engine
        .refresh_status(&settings, 1001)
        .await
        .expect("refresh");

    assert_eq!(result.status, ShipmentStatus::InTransit);
    assert_eq!(row.status, ShipmentStatus::InTransit.as_str());

    // The re-issued token is persisted for subsequent calls.
    let settings = harness
        .settings_repo
        .find_by_id(&settings.id)
        .await
        .expect("reload")
        .expect("row");
    assert_eq!(settings.api_token.as_deref(), Some("fresh-token"));
}

#[tokio::test]
async fn refresh_with_temporary_id_makes_no_partner_call() {
    let server = MockServer::start().await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;
    harness
        .shipments
        .upsert(
            &settings.id,
            delifast_bridge::repositories::shipment::NewShipment {
                order_id: 1001,
                order_number: "1001".to_string(),
                shipment_id: Some("DELIFAST-1001-1718000000000".to_string()),
                is_temporary: true,
                status: ShipmentStatus::New,
                status_details: Some("awaiting partner shipment ID".to_string()),
                next_lookup_at: Some(Utc::now() + Duration::minutes(15)),
            },
        )
        .await
        .expect("seed row");

    let (_, result) = harness
        .engine
        .refresh_status(&settings, 1001)
        .await
        .expect("refresh");

    assert!(result.is_temporary);
    assert_eq!(result.status, ShipmentStatus::New);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn manual_shipment_id_resets_and_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/shipments/SH77/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "statusName": "Delivered" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = build_harness(&server.uri(), None).await;
    let settings = seed_tenant(&harness.db, "acme.myshopify.com").await;
    let row = harness
        .shipments
        .upsert(
            &settings.id,
            delifast_bridge::repositories::shipment::NewShipment {
                order_id: 1001,
                order_number: "1001".to_string(),
                shipment_id: Some("DELIFAST-1001-1718000000000".to_string()),
                is_temporary: true,
                status: ShipmentStatus::New,
                status_details: None,
                next_lookup_at: None,
            },
        )
        .await
        .expect("seed row");

    // Simulate an exhausted lookup budget before the operator steps in.
    let mut active: delifast_bridge::models::shipment::ActiveModel = row.into();
    active.lookup_attempts = Set(3);
    active.update(&*harness.db).await.expect("set attempts");

    let (updated, result) = harness
        .engine
        .update_shipment_id(&settings, 1001, "SH77")
        .await
        .expect("update");

    assert_eq!(result.status, ShipmentStatus::Completed);
    assert_eq!(updated.shipment_id.as_deref(), Some("SH77"));
    assert!(!updated.is_temporary);
    assert_eq!(updated.lookup_attempts, 0);
    assert_eq!(updated.status, ShipmentStatus::Completed.as_str());
}
