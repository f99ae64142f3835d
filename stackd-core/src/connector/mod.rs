//! Target connector abstraction.
//!
//! A connector is the pluggable driver for one target kind (e.g. a Docker
//! host, a Kubernetes cluster). The core never performs provisioning itself;
//! it hands a fully rendered configuration to the connector selected for the
//! deployment's target and interprets nothing beyond the returned handles.

use crate::error::Result;
use crate::types::ResourceHandle;
use async_trait::async_trait;
use serde_json::Value;

mod registry;

pub use registry::ConnectorRegistry;

/// Provisioning driver for one target kind.
///
/// All backend integrations must implement this trait. Every method the
/// orchestrator calls runs under a bounded timeout; implementations should
/// still avoid unbounded internal waits.
#[async_trait]
pub trait TargetConnector: Send + Sync {
    /// Provision the resources described by a rendered configuration.
    ///
    /// Returns one handle per created resource. On failure the orchestrator
    /// will invoke `cleanup` for partially created resources.
    async fn provision(&self, configuration: &Value) -> Result<Vec<ResourceHandle>>;

    /// Best-effort removal of partially created resources after a failed
    /// `provision`. Failures are logged by the caller and never escalate.
    async fn cleanup(&self) -> Result<()>;

    /// Tear down previously provisioned resources.
    async fn teardown(&self, handles: &[ResourceHandle]) -> Result<()>;

    /// Probe backend reachability.
    async fn health_check(&self) -> Result<()>;

    /// Connector name (for logging/metrics).
    fn name(&self) -> &str;
}
