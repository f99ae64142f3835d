//! Deployment target domain types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One infrastructure backend a stack can be deployed onto.
///
/// Beyond selecting a connector implementation by `kind`, the target is
/// opaque to the core; `connection` is passed through to the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Unique target identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Target kind, keys connector selection (e.g. "docker", "kubernetes")
    pub kind: String,

    /// Backend connection configuration (opaque to the core)
    pub connection: Value,
}
