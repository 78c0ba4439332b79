//! Background reconciliation jobs.
//!
//! Three sweeps keep the ledger converged with the partner: status sync for
//! rows with real IDs, temporary-ID resolution for rows still awaiting one,
//! and the stuck-order sweep that escalates exhausted rows and retries
//! recent errors. Each sweep iterates active tenants independently; one
//! tenant's failure never stops the others.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::config::SyncJobConfig;
use crate::delifast::status::ShipmentStatus;
use crate::lifecycle::LifecycleEngine;
use crate::models::tenant_settings;
use crate::repositories::{LogRepository, SettingsRepository, ShipmentRepository};

/// Outcome counts for one job run, returned to manual trigger callers.
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct JobSummary {
    /// Rows examined
    pub processed: u64,
    /// Rows whose ledger state changed
    pub updated: u64,
    /// Rows that errored and were skipped
    pub failed: u64,
}

impl JobSummary {
    fn absorb(&mut self, other: JobSummary) {
        self.processed += other.processed;
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

/// Driver for the periodic reconciliation sweeps.
#[derive(Debug, Clone)]
pub struct ReconciliationJobs {
    engine: LifecycleEngine,
    settings_repo: SettingsRepository,
    shipments: ShipmentRepository,
    logs: LogRepository,
    sync: SyncJobConfig,
}

impl ReconciliationJobs {
    pub fn new(
        engine: LifecycleEngine,
        settings_repo: SettingsRepository,
        shipments: ShipmentRepository,
        logs: LogRepository,
        sync: SyncJobConfig,
    ) -> Self {
        Self {
            engine,
            settings_repo,
            shipments,
            logs,
            sync,
        }
    }

    /// Polls the partner for every in-flight shipment with a real ID and
    /// persists status changes.
    pub async fn run_status_sync(&self) -> JobSummary {
        let mut summary = JobSummary::default();

        for settings in self.active_tenants().await {
            match self.status_sync_for_tenant(&settings).await {
                Ok(tenant_summary) => summary.absorb(tenant_summary),
                Err(err) => {
                    tracing::warn!(shop = %settings.shop_domain, error = %err,
                        "status sync failed for tenant");
                    summary.failed += 1;
                }
            }
        }

        metrics::counter!("bridge_job_runs_total", "job" => "status_sync").increment(1);
        tracing::info!(processed = summary.processed, updated = summary.updated,
            failed = summary.failed, "status sync finished");
        summary
    }

    async fn status_sync_for_tenant(
        &self,
        settings: &tenant_settings::Model,
    ) -> anyhow::Result<JobSummary> {
        let mut summary = JobSummary::default();
        let batch = self
            .shipments
            .find_pollable(&settings.id, self.sync.batch_size)
            .await?;

        for row in batch {
            summary.processed += 1;
            let Some(shipment_id) = row.shipment_id.clone() else {
                continue;
            };
            let previous_status = row.status.clone();

            match self
                .engine
                .client()
                .get_shipment_status(settings, &shipment_id)
                .await
            {
                Ok(result) if result.is_temporary => {}
                Ok(result) => match self.engine.apply_status(settings, row, &result).await {
                    Ok(updated) => {
                        if updated.status != previous_status {
                            summary.updated += 1;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(shop = %settings.shop_domain, shipment_id,
                            error = %err, "failed to persist status");
                        summary.failed += 1;
                    }
                },
                Err(err) => {
                    tracing::warn!(shop = %settings.shop_domain, shipment_id,
                        error = %err, "status fetch failed");
                    summary.failed += 1;
                }
            }

            tokio::time::sleep(Duration::from_millis(self.sync.call_delay_ms)).await;
        }

        Ok(summary)
    }

    /// Resolves temporary IDs whose lookup schedule is due, promoting rows
    /// the partner now knows and recording misses for the rest.
    pub async fn run_temp_id_resolution(&self) -> JobSummary {
        let mut summary = JobSummary::default();

        for settings in self.active_tenants().await {
            match self.resolution_for_tenant(&settings).await {
                Ok(tenant_summary) => summary.absorb(tenant_summary),
                Err(err) => {
                    tracing::warn!(shop = %settings.shop_domain, error = %err,
                        "temporary ID resolution failed for tenant");
                    summary.failed += 1;
                }
            }
        }

        metrics::counter!("bridge_job_runs_total", "job" => "temp_id_resolution").increment(1);
        tracing::info!(processed = summary.processed, updated = summary.updated,
            failed = summary.failed, "temporary ID resolution finished");
        summary
    }

    async fn resolution_for_tenant(
        &self,
        settings: &tenant_settings::Model,
    ) -> anyhow::Result<JobSummary> {
        let mut summary = JobSummary::default();
        let due = self
            .shipments
            .find_due_for_lookup(&settings.id, self.sync.max_lookup_attempts)
            .await?;

        for row in due {
            summary.processed += 1;

            match self
                .engine
                .client()
                .lookup_by_order_number(settings, &row.order_number)
                .await
            {
                Ok(Some(real_id)) => {
                    let order_number = row.order_number.clone();
                    self.shipments.promote(row, &real_id).await?;
                    summary.updated += 1;
                    metrics::counter!("bridge_temp_ids_resolved_total").increment(1);
                    self.logs
                        .info(
                            &settings.id,
                            "temporary ID resolved",
                            Some(json!({
                                "order_number": order_number,
                                "shipment_id": real_id,
                            })),
                        )
                        .await;
                }
                Ok(None) => {
                    self.shipments
                        .record_lookup_miss(
                            row,
                            self.sync.max_lookup_attempts,
                            self.sync.lookup_interval_minutes,
                        )
                        .await?;
                }
                Err(err) => {
                    tracing::warn!(shop = %settings.shop_domain,
                        order_number = %row.order_number, error = %err,
                        "ID lookup failed");
                    summary.failed += 1;
                }
            }

            tokio::time::sleep(Duration::from_millis(self.sync.lookup_delay_ms)).await;
        }

        Ok(summary)
    }

    /// Escalates exhausted temporary rows to `error` and resets recent
    /// error rows so the next status sync retries them.
    pub async fn run_stuck_order_sweep(&self) -> JobSummary {
        let mut summary = JobSummary::default();

        for settings in self.active_tenants().await {
            match self.sweep_for_tenant(&settings).await {
                Ok(tenant_summary) => summary.absorb(tenant_summary),
                Err(err) => {
                    tracing::warn!(shop = %settings.shop_domain, error = %err,
                        "stuck order sweep failed for tenant");
                    summary.failed += 1;
                }
            }
        }

        metrics::counter!("bridge_job_runs_total", "job" => "stuck_sweep").increment(1);
        tracing::info!(processed = summary.processed, updated = summary.updated,
            failed = summary.failed, "stuck order sweep finished");
        summary
    }

    async fn sweep_for_tenant(
        &self,
        settings: &tenant_settings::Model,
    ) -> anyhow::Result<JobSummary> {
        let mut summary = JobSummary::default();

        let stuck = self
            .shipments
            .find_stuck(
                &settings.id,
                self.sync.stale_after_hours,
                self.sync.max_lookup_attempts,
            )
            .await?;
        for row in stuck {
            summary.processed += 1;
            let order_number = row.order_number.clone();
            self.shipments
                .update_status(
                    row,
                    ShipmentStatus::Error,
                    Some("stuck without a partner shipment ID; manual intervention required"
                        .to_string()),
                )
                .await?;
            summary.updated += 1;
            metrics::counter!("bridge_stuck_shipments_total").increment(1);
            self.logs
                .error(
                    &settings.id,
                    "shipment stuck without partner ID",
                    Some(json!({ "order_number": order_number })),
                )
                .await;
        }

        let errored = self
            .shipments
            .find_recent_errors(&settings.id, self.sync.error_retry_window_hours)
            .await?;
        for row in errored {
            summary.processed += 1;
            self.shipments
                .update_status(row, ShipmentStatus::New, None)
                .await?;
            summary.updated += 1;
        }

        Ok(summary)
    }

    async fn active_tenants(&self) -> Vec<tenant_settings::Model> {
        match self.settings_repo.find_active().await {
            Ok(tenants) => tenants,
            Err(err) => {
                tracing::error!(error = %err, "failed to list active tenants");
                Vec::new()
            }
        }
    }

    /// Self-scheduling loop, enabled by configuration. Each sweep runs on
    /// its own interval until the token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut status_tick =
            tokio::time::interval(Duration::from_secs(self.sync.status_sync_interval_seconds));
        let mut lookup_tick =
            tokio::time::interval(Duration::from_secs(self.sync.lookup_interval_seconds));
        let mut stuck_tick =
            tokio::time::interval(Duration::from_secs(self.sync.stuck_interval_seconds));

        // The first tick of each interval fires immediately; consume them so
        // startup does not hammer the partner.
        status_tick.tick().await;
        lookup_tick.tick().await;
        stuck_tick.tick().await;

        tracing::info!(
            status_interval = self.sync.status_sync_interval_seconds,
            lookup_interval = self.sync.lookup_interval_seconds,
            stuck_interval = self.sync.stuck_interval_seconds,
            "reconciliation scheduler started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("reconciliation scheduler stopping");
                    break;
                }
                _ = status_tick.tick() => {
                    self.run_status_sync().await;
                }
                _ = lookup_tick.tick() => {
                    self.run_temp_id_resolution().await;
                }
                _ = stuck_tick.tick() => {
                    self.run_stuck_order_sweep().await;
                }
            }
        }
    }
}
