//! Deployment domain types.

use crate::error::StackdError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::SystemTime;

/// Request to instantiate a stack template on a target.
///
/// Immutable once accepted; `variables` are the caller's overrides for the
/// template's declared variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// Template to instantiate
    pub template_id: String,

    /// Target to deploy onto
    pub target_id: String,

    /// User-supplied variable overrides (used verbatim, never rendered)
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
}

/// One instantiation of a stack template against a specific target.
///
/// Created in `Pending` by the orchestrator; all further mutation goes
/// through the lifecycle transitions. `variables` and `configuration` are
/// computed exactly once at creation time and never re-evaluated on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Unique deployment identifier (UUID v4)
    pub id: String,

    /// Source template identifier
    pub stack_id: String,

    /// Source template name (denormalized for display)
    pub stack_name: String,

    /// Source template version (denormalized for display)
    pub stack_version: String,

    /// Target identifier
    pub target_id: String,

    /// Target kind, keys connector selection
    pub target_kind: String,

    /// Current lifecycle status
    pub status: DeploymentStatus,

    /// Resolved variables, persisted verbatim at creation time
    pub variables: IndexMap<String, Value>,

    /// Fully rendered configuration tree with no remaining placeholders
    pub configuration: Value,

    /// Resource handles returned by the connector's provision call
    pub handles: Vec<ResourceHandle>,

    /// Detail of the most recent provisioning or teardown failure
    pub error_detail: Option<String>,

    /// Creation timestamp
    pub created_at: SystemTime,

    /// Timestamp of reaching Running
    pub started_at: Option<SystemTime>,

    /// Timestamp of reaching Stopped
    pub stopped_at: Option<SystemTime>,
}

/// Deployment lifecycle status.
///
/// Transitions: `Pending -> Provisioning -> {Running | Failed}` and
/// `Running -> Stopping -> Stopped`. `Failed` and `Stopped` are terminal
/// except for the explicit destroy path out of `Running`/`Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Persisted, provisioning not yet begun
    Pending,

    /// Connector provision call in flight
    Provisioning,

    /// Provisioned successfully
    Running,

    /// Connector teardown call in flight
    Stopping,

    /// Torn down successfully (terminal)
    Stopped,

    /// Provisioning failed (terminal, destroy still permitted)
    Failed,
}

impl DeploymentStatus {
    /// Whether destroy is permitted from this status.
    pub fn destroyable(&self) -> bool {
        matches!(self, Self::Running | Self::Failed)
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Provisioning => write!(f, "provisioning"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for DeploymentStatus {
    type Err = StackdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "provisioning" => Ok(Self::Provisioning),
            "running" => Ok(Self::Running),
            "stopping" => Ok(Self::Stopping),
            "stopped" => Ok(Self::Stopped),
            "failed" => Ok(Self::Failed),
            other => {
                Err(StackdError::DatabaseError(format!("unknown deployment status '{}'", other)))
            }
        }
    }
}

/// Opaque handle to a resource created by a connector.
///
/// Returned by `provision` and passed back to `teardown`; the core never
/// interprets `detail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Backend-assigned resource identifier
    pub id: String,

    /// Resource kind (e.g. "container", "volume", "network")
    pub kind: String,

    /// Backend-specific detail
    pub detail: Option<String>,
}
