//! Test utilities: in-memory database setup, tenant fixtures, and engine
//! wiring against a wiremock partner server.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{Duration, Utc};
use delifast_bridge::config::{DelifastConfig, SyncJobConfig};
use delifast_bridge::crypto::{CryptoKey, encrypt_string};
use delifast_bridge::delifast::auth::TokenManager;
use delifast_bridge::delifast::client::DelifastClient;
use delifast_bridge::jobs::ReconciliationJobs;
use delifast_bridge::lifecycle::LifecycleEngine;
use delifast_bridge::models::tenant_settings;
use delifast_bridge::repositories::{LogRepository, SettingsRepository, ShipmentRepository};
use delifast_bridge::shopify::annotate::OrderAnnotator;
use delifast_bridge::shopify::order::Order;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<Arc<DatabaseConnection>> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(Arc::new(db))
}

pub fn test_crypto_key() -> CryptoKey {
    CryptoKey::new(vec![7u8; 32]).expect("test key")
}

/// Fast-running sync configuration for tests: no inter-call delays,
/// three lookup attempts, 15 minute initial delay, hourly reschedule.
pub fn test_sync_config() -> SyncJobConfig {
    SyncJobConfig {
        batch_size: 100,
        call_delay_ms: 0,
        lookup_delay_ms: 0,
        max_lookup_attempts: 3,
        lookup_interval_minutes: 60,
        initial_lookup_delay_minutes: 15,
        stale_after_hours: 24,
        error_retry_window_hours: 24,
        self_schedule: false,
        status_sync_interval_seconds: 3600,
        lookup_interval_seconds: 3600,
        stuck_interval_seconds: 14400,
    }
}

pub struct TestHarness {
    pub db: Arc<DatabaseConnection>,
    pub engine: LifecycleEngine,
    pub jobs: ReconciliationJobs,
    pub settings_repo: SettingsRepository,
    pub shipments: ShipmentRepository,
}

/// Wires an engine and jobs against the given partner base URL.
///
/// `shopify_base` overrides the annotation target; `None` leaves annotation
/// pointed at `https://{shop_domain}`, which is unreachable in tests, and
/// annotation failures are swallowed by design.
pub async fn build_harness(partner_base: &str, shopify_base: Option<String>) -> TestHarness {
    let db = setup_test_db().await.expect("db setup");

    let delifast_config = DelifastConfig {
        api_base: partner_base.to_string(),
        http_timeout_seconds: 5,
        language: "en".to_string(),
        token_ttl_hours: 24,
        token_refresh_window_minutes: 30,
    };
    let sync = test_sync_config();

    let http = reqwest::Client::builder()
        .timeout(StdDuration::from_secs(5))
        .build()
        .expect("http client");

    let settings_repo = SettingsRepository::new(Arc::clone(&db), test_crypto_key());
    let shipments = ShipmentRepository::new(Arc::clone(&db));
    let logs = LogRepository::new(Arc::clone(&db));

    let token_manager = TokenManager::new(http.clone(), settings_repo.clone(), &delifast_config);
    let client = DelifastClient::new(http.clone(), token_manager, &delifast_config);
    let annotator = OrderAnnotator::new(http, settings_repo.clone(), shopify_base);

    let engine = LifecycleEngine::new(
        client,
        shipments.clone(),
        logs.clone(),
        annotator,
        sync.clone(),
    );
    let jobs = ReconciliationJobs::new(
        engine.clone(),
        settings_repo.clone(),
        shipments.clone(),
        logs,
        sync,
    );

    TestHarness {
        db,
        engine,
        jobs,
        settings_repo,
        shipments,
    }
}

/// Inserts a tenant with encrypted credentials and a still-valid cached
/// partner token, so partner calls skip the login roundtrip.
pub async fn seed_tenant(db: &DatabaseConnection, shop_domain: &str) -> tenant_settings::Model {
    let key = test_crypto_key();
    let password_ciphertext = encrypt_string(&key, "s3cret").expect("encrypt password");
    let now = Utc::now();

    let active = tenant_settings::ActiveModel {
        id: Set(Uuid::new_v4()),
        shop_domain: Set(shop_domain.to_string()),
        delifast_username: Set(Some("acme".to_string())),
        delifast_password_ciphertext: Set(Some(password_ciphertext)),
        delifast_customer_id: Set(Some("CUST-1".to_string())),
        mode: Set("auto".to_string()),
        auto_send_trigger: Set("created".to_string()),
        sender_name: Set(Some("Acme Warehouse".to_string())),
        sender_address: Set(Some("Industrial Area 2".to_string())),
        sender_mobile: Set(Some("0501111111".to_string())),
        sender_city_id: Set(Some(5)),
        sender_area_id: Set(None),
        default_weight: Set(0.5),
        default_length: Set(10.0),
        default_width: Set(10.0),
        default_height: Set(10.0),
        default_city_id: Set(13),
        payment_method_id: Set(0),
        fees_on_sender: Set(false),
        fees_paid: Set(false),
        shopify_access_token_ciphertext: Set(None),
        api_token: Set(Some("cached-token".to_string())),
        token_expires_at: Set(Some((now + Duration::hours(12)).into())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    active.insert(db).await.expect("seed tenant")
}

/// A minimal order fixture; callers adjust fields through serde overrides.
pub fn sample_order(order_id: i64, order_name: &str) -> Order {
    serde_json::from_value(serde_json::json!({
        "id": order_id,
        "name": order_name,
        "total_price": "120.00",
        "financial_status": "pending",
        "gateway": "Cash on Delivery (COD)",
        "billing_address": {
            "name": "Jane Doe",
            "address1": "12 Marina Walk",
            "city": "Dubai",
            "province": "Dubai",
            "phone": "0502222222"
        },
        "line_items": [
            { "title": "T-Shirt", "quantity": 1, "variant_title": "Red / XL", "price": "120.00" }
        ]
    }))
    .expect("order fixture")
}
