//! Deployment lifecycle orchestration.
//!
//! The orchestrator drives `Pending -> Provisioning -> {Running | Failed}`
//! and `Running -> Stopping -> Stopped`, with `destroy` permitted out of
//! `Running` and `Failed`. Rendering happens synchronously inside `create`
//! and its result is persisted before any provisioning side effect begins,
//! so resolved secrets survive a provisioning failure. The only suspension
//! point is the connector call, always under a bounded timeout.

use indexmap::IndexMap;
use stackd_core::connector::{ConnectorRegistry, TargetConnector};
use stackd_core::error::{Result, StackdError};
use stackd_core::render::{render, resolve_variables};
use stackd_core::state::StateManager;
use stackd_core::types::{
    Deployment, DeploymentRequest, DeploymentStatus, StackTemplate, Target,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Deployment orchestrator.
///
/// Each deployment's transitions are serialized through a per-deployment
/// lock, so concurrent `start`/`destroy` invocations on the same id never
/// race and the connector's `provision` runs at most once per deployment.
/// Distinct deployments provision fully concurrently.
pub struct Orchestrator {
    state: Arc<StateManager>,
    connectors: Arc<ConnectorRegistry>,
    provision_timeout: Duration,
    teardown_timeout: Duration,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    /// * `state` - State manager for persistence
    /// * `connectors` - Registry of target connectors, keyed by target kind
    /// * `config` - Engine configuration (connector timeouts)
    pub fn new(
        state: Arc<StateManager>,
        connectors: Arc<ConnectorRegistry>,
        config: &stackd_core::Config,
    ) -> Self {
        Self {
            state,
            connectors,
            provision_timeout: config.provision_timeout(),
            teardown_timeout: config.teardown_timeout(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a deployment from a stack template, a target, and a request.
    ///
    /// Resolves variables and renders the configuration synchronously; any
    /// validation failure surfaces here and nothing is persisted. On success
    /// the deployment is persisted in `Pending` (resolved variables and
    /// rendered configuration included) and `start` is scheduled on the
    /// runtime. The caller observes progress via `get_status`.
    #[instrument(skip(self, template, target, request), fields(template_id = %template.id, target_id = %target.id))]
    pub async fn create(
        self: &Arc<Self>,
        template: &StackTemplate,
        target: &Target,
        request: &DeploymentRequest,
    ) -> Result<Deployment> {
        if request.template_id != template.id {
            return Err(StackdError::InvalidConfig {
                reason: format!(
                    "Request references template '{}' but template '{}' was supplied",
                    request.template_id, template.id
                ),
            });
        }
        if request.target_id != target.id {
            return Err(StackdError::InvalidConfig {
                reason: format!(
                    "Request references target '{}' but target '{}' was supplied",
                    request.target_id, target.id
                ),
            });
        }

        // Fail before persisting anything if no connector can serve the target.
        self.connectors.get(&target.kind)?;

        let variables = resolve_variables(template, &request.variables)?;
        let configuration = render(&template.configuration, &variables)?;

        let deployment = Deployment {
            id: Uuid::new_v4().to_string(),
            stack_id: template.id.clone(),
            stack_name: template.name.clone(),
            stack_version: template.version.clone(),
            target_id: target.id.clone(),
            target_kind: target.kind.clone(),
            status: DeploymentStatus::Pending,
            variables,
            configuration,
            handles: vec![],
            error_detail: None,
            created_at: SystemTime::now(),
            started_at: None,
            stopped_at: None,
        };

        self.state.insert_deployment(&deployment).await?;
        info!(deployment_id = %deployment.id, stack = %deployment.stack_name, "Deployment created");

        // Schedule provisioning; the caller returns immediately.
        let this = Arc::clone(self);
        let deployment_id = deployment.id.clone();
        tokio::spawn(async move {
            if let Err(e) = this.start(&deployment_id).await {
                error!(deployment_id = %deployment_id, error = %e, "Scheduled start failed");
            }
        });

        Ok(deployment)
    }

    /// Begin provisioning a pending deployment.
    ///
    /// No-op (returns the current status) unless the deployment is
    /// `Pending`; combined with the per-deployment lock this makes repeated
    /// or concurrent `start` calls invoke the connector's `provision` at
    /// most once. Provisioning failures and timeouts are recorded as
    /// `Failed` with error detail, never returned as errors.
    #[instrument(skip(self), fields(deployment_id = %id))]
    pub async fn start(&self, id: &str) -> Result<DeploymentStatus> {
        let deployment = self.state.get_deployment(id).await?;
        let lock = self.deployment_lock(&deployment.id).await;
        let result = {
            let _guard = lock.lock().await;
            self.start_locked(&deployment.id).await
        };
        drop(lock);
        self.prune_lock(&deployment.id).await;
        result
    }

    async fn start_locked(&self, id: &str) -> Result<DeploymentStatus> {
        // Re-read under the lock: a concurrent start may have already moved
        // the deployment past Pending.
        let deployment = self.state.get_deployment(id).await?;
        if deployment.status != DeploymentStatus::Pending {
            debug!(status = %deployment.status, "Start is a no-op outside Pending");
            return Ok(deployment.status);
        }

        let connector = self.connectors.get(&deployment.target_kind)?;
        self.state
            .update_deployment_status(&deployment.id, DeploymentStatus::Provisioning, None)
            .await?;
        info!(connector = connector.name(), "Provisioning deployment");

        match timeout(self.provision_timeout, connector.provision(&deployment.configuration))
            .await
        {
            Ok(Ok(handles)) => {
                self.state.set_deployment_running(&deployment.id, &handles).await?;
                metrics::counter!("stackd_provision_total", "outcome" => "success").increment(1);
                info!(handles = handles.len(), "Deployment running");
                Ok(DeploymentStatus::Running)
            }
            Ok(Err(e)) => {
                let detail = StackdError::ProvisioningFailed {
                    deployment_id: deployment.id.clone(),
                    reason: e.to_string(),
                }
                .to_string();
                self.fail_provisioning(&deployment.id, connector.as_ref(), detail).await
            }
            Err(_) => {
                let detail = StackdError::ProvisioningTimeout {
                    deployment_id: deployment.id.clone(),
                    timeout_secs: self.provision_timeout.as_secs(),
                }
                .to_string();
                self.fail_provisioning(&deployment.id, connector.as_ref(), detail).await
            }
        }
    }

    /// Record a provisioning failure and run best-effort cleanup.
    async fn fail_provisioning(
        &self,
        id: &str,
        connector: &dyn TargetConnector,
        detail: String,
    ) -> Result<DeploymentStatus> {
        error!(error = %detail, "Provisioning failed");
        metrics::counter!("stackd_provision_total", "outcome" => "failure").increment(1);
        self.state
            .update_deployment_status(id, DeploymentStatus::Failed, Some(&detail))
            .await?;

        // Cleanup failures are logged and never change the recorded status.
        match timeout(self.teardown_timeout, connector.cleanup()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "Cleanup after failed provisioning reported an error")
            }
            Err(_) => warn!("Cleanup after failed provisioning timed out"),
        }

        Ok(DeploymentStatus::Failed)
    }

    /// Tear down a deployment's resources.
    ///
    /// Permitted only from `Running` or `Failed`. On success the deployment
    /// reaches `Stopped`; on teardown failure or timeout it returns to its
    /// prior status with error detail recorded and `destroy` may be retried.
    #[instrument(skip(self), fields(deployment_id = %id))]
    pub async fn destroy(&self, id: &str) -> Result<DeploymentStatus> {
        let deployment = self.state.get_deployment(id).await?;
        let lock = self.deployment_lock(&deployment.id).await;
        let result = {
            let _guard = lock.lock().await;
            self.destroy_locked(&deployment.id).await
        };
        drop(lock);
        self.prune_lock(&deployment.id).await;
        result
    }

    async fn destroy_locked(&self, id: &str) -> Result<DeploymentStatus> {
        let deployment = self.state.get_deployment(id).await?;
        if !deployment.status.destroyable() {
            return Err(StackdError::InvalidTransition {
                operation: "destroy".to_string(),
                from: deployment.status.to_string(),
            });
        }
        let prior = deployment.status;

        let connector = self.connectors.get(&deployment.target_kind)?;
        self.state
            .update_deployment_status(&deployment.id, DeploymentStatus::Stopping, None)
            .await?;
        info!(connector = connector.name(), handles = deployment.handles.len(), "Tearing down deployment");

        match timeout(self.teardown_timeout, connector.teardown(&deployment.handles)).await {
            Ok(Ok(())) => {
                self.state
                    .update_deployment_status(&deployment.id, DeploymentStatus::Stopped, None)
                    .await?;
                metrics::counter!("stackd_teardown_total", "outcome" => "success").increment(1);
                info!("Deployment stopped");
                Ok(DeploymentStatus::Stopped)
            }
            Ok(Err(e)) => {
                let detail = StackdError::TeardownFailed {
                    deployment_id: deployment.id.clone(),
                    reason: e.to_string(),
                }
                .to_string();
                self.fail_teardown(&deployment.id, prior, detail).await
            }
            Err(_) => {
                let detail = StackdError::TeardownTimeout {
                    deployment_id: deployment.id.clone(),
                    timeout_secs: self.teardown_timeout.as_secs(),
                }
                .to_string();
                self.fail_teardown(&deployment.id, prior, detail).await
            }
        }
    }

    /// Record a teardown failure, restoring the deployment's prior status.
    async fn fail_teardown(
        &self,
        id: &str,
        prior: DeploymentStatus,
        detail: String,
    ) -> Result<DeploymentStatus> {
        warn!(error = %detail, prior = %prior, "Teardown failed; deployment remains destroyable");
        metrics::counter!("stackd_teardown_total", "outcome" => "failure").increment(1);
        self.state.update_deployment_status(id, prior, Some(&detail)).await?;
        Ok(prior)
    }

    /// Get a deployment's current state.
    ///
    /// Pure read: never mutates state and never re-renders. Returns exactly
    /// the stored resolved variables and configuration.
    #[instrument(skip(self), fields(deployment_id = %id))]
    pub async fn get_status(&self, id: &str) -> Result<Deployment> {
        self.state.get_deployment(id).await
    }

    /// List all deployments, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Deployment>> {
        self.state.list_deployments().await
    }

    /// Probe the connector serving a target.
    #[instrument(skip(self, target), fields(target_id = %target.id, kind = %target.kind))]
    pub async fn check_target(&self, target: &Target) -> Result<()> {
        let connector = self.connectors.get(&target.kind)?;
        match timeout(self.teardown_timeout, connector.health_check()).await {
            Ok(result) => result,
            Err(_) => Err(StackdError::ConnectorFailed {
                reason: format!("health check for target '{}' timed out", target.id),
            }),
        }
    }

    /// Resolve a template's variables against overrides without persisting
    /// anything, for preview/validation by external callers.
    pub fn preview(
        template: &StackTemplate,
        overrides: &IndexMap<String, serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let variables = resolve_variables(template, overrides)?;
        render(&template.configuration, &variables)
    }

    /// Get or create the serialization lock for a deployment id.
    async fn deployment_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Remove a deployment's lock entry once no task holds or waits on it.
    ///
    /// Keeps the lock map bounded by in-flight operations rather than
    /// growing with every deployment ever seen. `deployment_lock` recreates
    /// the entry on demand, so serialization is unaffected.
    async fn prune_lock(&self, id: &str) {
        let mut locks = self.locks.lock().await;
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use stackd_core::types::ResourceHandle;

    struct NoopConnector;

    #[async_trait::async_trait]
    impl TargetConnector for NoopConnector {
        async fn provision(&self, _configuration: &Value) -> Result<Vec<ResourceHandle>> {
            Ok(vec![])
        }

        async fn cleanup(&self) -> Result<()> {
            Ok(())
        }

        async fn teardown(&self, _handles: &[ResourceHandle]) -> Result<()> {
            Ok(())
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "noop"
        }
    }

    async fn orchestrator() -> Arc<Orchestrator> {
        let state = Arc::new(StateManager::new_in_memory().await.unwrap());
        let mut registry = ConnectorRegistry::new();
        registry.register("docker", Arc::new(NoopConnector));
        Arc::new(Orchestrator::new(state, Arc::new(registry), &stackd_core::Config::default()))
    }

    fn template() -> StackTemplate {
        StackTemplate {
            id: "tpl-1".to_string(),
            name: "noop".to_string(),
            version: "1.0.0".to_string(),
            configuration: json!({}),
            variables: IndexMap::new(),
        }
    }

    fn target() -> Target {
        Target {
            id: "target-1".to_string(),
            name: "local".to_string(),
            kind: "docker".to_string(),
            connection: json!({}),
        }
    }

    fn request() -> DeploymentRequest {
        DeploymentRequest {
            template_id: "tpl-1".to_string(),
            target_id: "target-1".to_string(),
            variables: IndexMap::new(),
        }
    }

    #[tokio::test]
    async fn lock_map_does_not_accumulate_entries() {
        let orchestrator = orchestrator().await;
        let deployment =
            orchestrator.create(&template(), &target(), &request()).await.unwrap();

        // The scheduled start prunes its lock entry once it releases it.
        for _ in 0..500 {
            let done = {
                let status =
                    orchestrator.get_status(&deployment.id).await.unwrap().status;
                status == DeploymentStatus::Running
                    && orchestrator.locks.lock().await.is_empty()
            };
            if done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(orchestrator.locks.lock().await.is_empty());

        // Destroy recreates the entry transiently and removes it on return.
        orchestrator.destroy(&deployment.id).await.unwrap();
        assert!(orchestrator.locks.lock().await.is_empty());
    }
}
