//! State management with SQLite persistence.
//!
//! The StateManager is the opaque keyed record store for deployments.
//! Resolved variables and rendered configuration are written exactly once,
//! at creation time; reads return the stored values verbatim and never
//! re-render anything.

use crate::error::{Result, StackdError};
use crate::types::{Deployment, DeploymentStatus, ResourceHandle};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Row};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use tracing::{info, instrument};

pub mod migrations;

#[cfg(test)]
mod tests;

/// State manager for persistent storage.
#[derive(Clone)]
pub struct StateManager {
    pool: SqlitePool,
}

impl StateManager {
    /// Create a new StateManager with an in-memory database (for tests).
    pub async fn new_in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }

    /// Get a reference to the underlying SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a new StateManager with a database at the specified path.
    #[instrument(skip(db_path))]
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        info!("Initializing state manager at {:?}", db_path);

        // Create parent directory if it doesn't exist (but not for :memory:)
        if db_path != Path::new(":memory:") {
            if let Some(parent) = db_path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StackdError::InvalidConfig {
                        reason: format!("Failed to create directory {}: {}", parent.display(), e),
                    }
                })?;
            }
        }

        let mut options = SqliteConnectOptions::from_str(db_path.to_str().ok_or_else(|| {
            StackdError::InvalidConfig { reason: "Invalid database path".to_string() }
        })?)
        .map_err(|e| StackdError::DatabaseError(e.to_string()))?;

        options = options.create_if_missing(true).log_statements(tracing::log::LevelFilter::Debug);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StackdError::DatabaseError(e.to_string()))?;

        let manager = Self { pool };

        manager.run_migrations().await?;

        info!("State manager initialized successfully");
        Ok(manager)
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");
        migrations::run(&self.pool).await?;
        info!("Database migrations complete");
        Ok(())
    }

    // ========================
    // Deployment Operations
    // ========================

    /// Insert a new deployment.
    ///
    /// This is the single write of the deployment's resolved variables and
    /// rendered configuration; neither is ever updated afterwards.
    #[instrument(skip(self), fields(deployment_id = %deployment.id))]
    pub async fn insert_deployment(&self, deployment: &Deployment) -> Result<()> {
        let variables = serde_json::to_string(&deployment.variables).map_err(|e| {
            StackdError::DatabaseError(format!("Failed to serialize variables: {}", e))
        })?;
        let configuration = serde_json::to_string(&deployment.configuration).map_err(|e| {
            StackdError::DatabaseError(format!("Failed to serialize configuration: {}", e))
        })?;
        let handles = serde_json::to_string(&deployment.handles).map_err(|e| {
            StackdError::DatabaseError(format!("Failed to serialize handles: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO deployments (
                id, stack_id, stack_name, stack_version, target_id, target_kind,
                status, variables, configuration, handles, error_detail,
                created_at, started_at, stopped_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&deployment.id)
        .bind(&deployment.stack_id)
        .bind(&deployment.stack_name)
        .bind(&deployment.stack_version)
        .bind(&deployment.target_id)
        .bind(&deployment.target_kind)
        .bind(deployment.status.to_string())
        .bind(variables)
        .bind(configuration)
        .bind(handles)
        .bind(&deployment.error_detail)
        .bind(epoch_secs(deployment.created_at))
        .bind(deployment.started_at.map(epoch_secs))
        .bind(deployment.stopped_at.map(epoch_secs))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            metrics::counter!("stackd_db_errors_total", "operation" => "insert_deployment")
                .increment(1);
            StackdError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    /// Get a deployment by ID (supports partial ID matching like Docker).
    #[instrument(skip(self), fields(deployment_id = %id))]
    pub async fn get_deployment(&self, id: &str) -> Result<Deployment> {
        // Try exact match first
        if let Some(row) = sqlx::query("SELECT * FROM deployments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                metrics::counter!("stackd_db_errors_total", "operation" => "get_deployment")
                    .increment(1);
                StackdError::DatabaseError(e.to_string())
            })?
        {
            return self.row_to_deployment(row);
        }

        // Try prefix match (like Docker)
        let pattern = format!("{}%", id);
        let rows = sqlx::query("SELECT * FROM deployments WHERE id LIKE ?")
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StackdError::DatabaseError(e.to_string()))?;

        match rows.len() {
            0 => Err(StackdError::DeploymentNotFound { deployment_id: id.to_string() }),
            1 => self.row_to_deployment(rows.into_iter().next().ok_or_else(|| {
                StackdError::Internal("prefix match row vanished".to_string())
            })?),
            _ => Err(StackdError::InvalidConfig {
                reason: format!(
                    "Ambiguous deployment ID '{}': matches {} deployments. Please use a longer prefix.",
                    id,
                    rows.len()
                ),
            }),
        }
    }

    /// List all deployments, newest first.
    #[instrument(skip(self))]
    pub async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        let rows = sqlx::query("SELECT * FROM deployments ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StackdError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(|row| self.row_to_deployment(row)).collect()
    }

    /// Update deployment status and error detail.
    ///
    /// `error_detail` replaces the stored detail: `Some` records a failure,
    /// `None` clears it. Reaching `Stopped` records the stop timestamp.
    #[instrument(skip(self), fields(deployment_id = %id, status = %status))]
    pub async fn update_deployment_status(
        &self,
        id: &str,
        status: DeploymentStatus,
        error_detail: Option<&str>,
    ) -> Result<()> {
        let stopped_at =
            (status == DeploymentStatus::Stopped).then(|| epoch_secs(SystemTime::now()));

        let result = sqlx::query(
            "UPDATE deployments SET status = ?, error_detail = ?, stopped_at = COALESCE(?, stopped_at) WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(error_detail)
        .bind(stopped_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            metrics::counter!("stackd_db_errors_total", "operation" => "update_deployment_status")
                .increment(1);
            StackdError::DatabaseError(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(StackdError::DeploymentNotFound { deployment_id: id.to_string() });
        }

        Ok(())
    }

    /// Mark a deployment Running with the handles returned by provisioning.
    #[instrument(skip(self, handles), fields(deployment_id = %id))]
    pub async fn set_deployment_running(
        &self,
        id: &str,
        handles: &[ResourceHandle],
    ) -> Result<()> {
        let handles_json = serde_json::to_string(handles).map_err(|e| {
            StackdError::DatabaseError(format!("Failed to serialize handles: {}", e))
        })?;

        let result = sqlx::query(
            "UPDATE deployments SET status = ?, handles = ?, error_detail = NULL, started_at = ? WHERE id = ?",
        )
        .bind(DeploymentStatus::Running.to_string())
        .bind(handles_json)
        .bind(epoch_secs(SystemTime::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            metrics::counter!("stackd_db_errors_total", "operation" => "set_deployment_running")
                .increment(1);
            StackdError::DatabaseError(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(StackdError::DeploymentNotFound { deployment_id: id.to_string() });
        }

        Ok(())
    }

    fn row_to_deployment(&self, row: sqlx::sqlite::SqliteRow) -> Result<Deployment> {
        let variables_json: String = row.get("variables");
        let variables = serde_json::from_str(&variables_json).map_err(|e| {
            StackdError::DatabaseError(format!("Failed to deserialize variables: {}", e))
        })?;

        let configuration_json: String = row.get("configuration");
        let configuration = serde_json::from_str(&configuration_json).map_err(|e| {
            StackdError::DatabaseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        let handles_json: String = row.get("handles");
        let handles = serde_json::from_str(&handles_json).map_err(|e| {
            StackdError::DatabaseError(format!("Failed to deserialize handles: {}", e))
        })?;

        let status_str: String = row.get("status");
        let status = status_str.parse()?;

        Ok(Deployment {
            id: row.get("id"),
            stack_id: row.get("stack_id"),
            stack_name: row.get("stack_name"),
            stack_version: row.get("stack_version"),
            target_id: row.get("target_id"),
            target_kind: row.get("target_kind"),
            status,
            variables,
            configuration,
            handles,
            error_detail: row.get("error_detail"),
            created_at: from_epoch_secs(row.get("created_at")),
            started_at: row.get::<Option<i64>, _>("started_at").map(from_epoch_secs),
            stopped_at: row.get::<Option<i64>, _>("stopped_at").map(from_epoch_secs),
        })
    }
}

fn epoch_secs(t: SystemTime) -> i64 {
    t.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn from_epoch_secs(secs: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)
}
