//! Audit log repository

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::log_entry;

/// Repository for the write-only audit trail
#[derive(Debug, Clone)]
pub struct LogRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl LogRepository {
    /// Creates a new LogRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Appends an audit entry. Failures are the caller's to swallow; the
    /// audit trail must never abort lifecycle work.
    pub async fn append(
        &self,
        tenant_id: &Uuid,
        level: &str,
        message: &str,
        context: Option<JsonValue>,
    ) -> Result<log_entry::Model> {
        let active = log_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(*tenant_id),
            level: Set(level.to_string()),
            message: Set(message.to_string()),
            context: Set(context),
            created_at: Set(Utc::now().into()),
        };

        Ok(active.insert(&*self.db).await?)
    }

    /// Appends an info entry, logging instead of failing.
    pub async fn info(&self, tenant_id: &Uuid, message: &str, context: Option<JsonValue>) {
        if let Err(err) = self.append(tenant_id, "info", message, context).await {
            tracing::warn!(%tenant_id, error = %err, "failed to write audit log entry");
        }
    }

    /// Appends an error entry, logging instead of failing.
    pub async fn error(&self, tenant_id: &Uuid, message: &str, context: Option<JsonValue>) {
        if let Err(err) = self.append(tenant_id, "error", message, context).await {
            tracing::warn!(%tenant_id, error = %err, "failed to write audit log entry");
        }
    }
}
