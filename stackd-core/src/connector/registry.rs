//! Connector registry keyed by target kind.

use crate::connector::TargetConnector;
use crate::error::{Result, StackdError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Registry of connector implementations, keyed by `Target.kind`.
///
/// Populated at startup by the embedding application, then shared immutably
/// (typically behind an `Arc`); lookups are cheap clones of the registered
/// `Arc`s.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn TargetConnector>>,
}

impl ConnectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector for a target kind, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, connector: Arc<dyn TargetConnector>) {
        let kind = kind.into();
        info!(kind = %kind, connector = connector.name(), "Registered target connector");
        self.connectors.insert(kind, connector);
    }

    /// Look up the connector for a target kind.
    pub fn get(&self, kind: &str) -> Result<Arc<dyn TargetConnector>> {
        self.connectors.get(kind).cloned().ok_or_else(|| {
            let mut known: Vec<&str> = self.connectors.keys().map(String::as_str).collect();
            known.sort_unstable();
            StackdError::ConnectorNotFound { kind: kind.to_string(), known: known.join(", ") }
        })
    }

    /// Registered target kinds.
    pub fn kinds(&self) -> Vec<String> {
        self.connectors.keys().cloned().collect()
    }
}
