//! # Server Configuration
//!
//! Application state wiring, the Axum router, and the server entry point
//! for the Delifast bridge API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::delifast::auth::TokenManager;
use crate::delifast::client::DelifastClient;
use crate::handlers;
use crate::jobs::ReconciliationJobs;
use crate::lifecycle::LifecycleEngine;
use crate::repositories::{LogRepository, SettingsRepository, ShipmentRepository};
use crate::shopify::annotate::OrderAnnotator;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub settings_repo: SettingsRepository,
    pub engine: LifecycleEngine,
    pub jobs: ReconciliationJobs,
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Wires repositories, the partner client, and the lifecycle engine into
/// shared application state.
pub fn build_state(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<AppState> {
    let config = Arc::new(config);
    let db = Arc::new(db);

    let key_bytes = config
        .crypto_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("BRIDGE_CRYPTO_KEY is required"))?;
    let crypto_key = CryptoKey::new(key_bytes)?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.delifast.http_timeout_seconds))
        .build()?;

    let settings_repo = SettingsRepository::new(Arc::clone(&db), crypto_key);
    let shipments = ShipmentRepository::new(Arc::clone(&db));
    let logs = LogRepository::new(Arc::clone(&db));

    let token_manager = TokenManager::new(http.clone(), settings_repo.clone(), &config.delifast);
    let client = DelifastClient::new(http.clone(), token_manager, &config.delifast);
    let annotator = OrderAnnotator::new(http, settings_repo.clone(), config.shopify_api_base.clone());

    let engine = LifecycleEngine::new(
        client,
        shipments.clone(),
        logs.clone(),
        annotator,
        config.sync.clone(),
    );
    let jobs = ReconciliationJobs::new(
        engine.clone(),
        settings_repo.clone(),
        shipments,
        logs,
        config.sync.clone(),
    );

    Ok(AppState {
        config,
        db,
        settings_repo,
        engine,
        jobs,
    })
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let operator_routes = Router::new()
        .route("/shipments/send", post(handlers::shipments::send_shipment))
        .route(
            "/shipments/{order_id}",
            get(handlers::shipments::get_shipment),
        )
        .route(
            "/shipments/{order_id}/refresh",
            post(handlers::shipments::refresh_shipment),
        )
        .route(
            "/shipments/{order_id}/shipment-id",
            put(handlers::shipments::update_shipment_id),
        )
        .route("/jobs/status-sync", post(handlers::jobs::trigger_status_sync))
        .route(
            "/jobs/temp-id-resolution",
            post(handlers::jobs::trigger_temp_id_resolution),
        )
        .route("/jobs/stuck-orders", post(handlers::jobs::trigger_stuck_orders))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/webhooks/shopify/orders",
            post(handlers::webhooks::shopify_orders),
        )
        .merge(operator_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server, optionally alongside the self-scheduling
/// reconciliation loop, and serves until shutdown.
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let state = build_state(config, db)?;
    let addr = state
        .config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("invalid server address: {}", e))?;

    let shutdown = CancellationToken::new();
    let mut scheduler_handle = None;
    if state.config.sync.self_schedule {
        let jobs = state.jobs.clone();
        scheduler_handle = Some(tokio::spawn(jobs.run(shutdown.clone())));
    }

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler_handle {
        let _ = handle.await;
    }

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
    shutdown.cancel();
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::shipments::send_shipment,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::refresh_shipment,
        crate::handlers::shipments::update_shipment_id,
        crate::handlers::jobs::trigger_status_sync,
        crate::handlers::jobs::trigger_temp_id_resolution,
        crate::handlers::jobs::trigger_stuck_orders,
        crate::handlers::webhooks::shopify_orders,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::jobs::JobSummary,
            crate::handlers::shipments::SendShipmentRequest,
            crate::handlers::shipments::UpdateShipmentIdRequest,
            crate::handlers::shipments::ShipmentInfo,
            crate::shopify::order::Order,
            crate::delifast::status::ShipmentStatus,
        )
    ),
    info(
        title = "Delifast Bridge API",
        description = "Shopify to Delifast last-mile delivery bridge",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
