//! Error types for STACKD.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error
//! chains. Each variant maps to a stable machine-readable kind (see
//! [`StackdError::kind`]) so external surfaces can classify failures without
//! parsing messages.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for STACKD operations.
pub type Result<T> = std::result::Result<T, StackdError>;

/// Main error type for STACKD.
#[derive(Error, Debug)]
pub enum StackdError {
    // Variable resolution errors
    #[error("Required variable '{name}' has no override and no default")]
    MissingRequiredVariable { name: String },

    #[error("Unknown variable '{name}' in overrides: not declared by the stack template")]
    UnknownVariable { name: String },

    #[error("Unresolved variable reference: {name}")]
    UnresolvedVariable { name: String },

    // Macro errors
    #[error("Malformed placeholder syntax: {reason}")]
    MacroSyntax { reason: String },

    #[error("Unknown macro: {name}")]
    UnknownMacro { name: String },

    #[error("Invalid arguments for macro '{name}': {reason}")]
    MacroArgument { name: String, reason: String },

    // Deployment lifecycle errors
    #[error("Deployment not found: {deployment_id}")]
    DeploymentNotFound { deployment_id: String },

    #[error("Operation '{operation}' not permitted from status '{from}'")]
    InvalidTransition { operation: String, from: String },

    #[error("Provisioning failed for deployment {deployment_id}: {reason}")]
    ProvisioningFailed { deployment_id: String, reason: String },

    #[error("Provisioning timed out for deployment {deployment_id} after {timeout_secs}s")]
    ProvisioningTimeout { deployment_id: String, timeout_secs: u64 },

    #[error("Teardown failed for deployment {deployment_id}: {reason}")]
    TeardownFailed { deployment_id: String, reason: String },

    #[error("Teardown timed out for deployment {deployment_id} after {timeout_secs}s")]
    TeardownTimeout { deployment_id: String, timeout_secs: u64 },

    // Connector errors
    #[error("No connector registered for target kind '{kind}'. Known kinds: {known}")]
    ConnectorNotFound { kind: String, known: String },

    #[error("Connector error: {reason}")]
    ConnectorFailed { reason: String },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Database migration failed: {reason}")]
    MigrationFailed { reason: String },

    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // File system errors
    #[error("I/O error at {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StackdError {
    /// Stable machine-readable kind for external surfacing.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingRequiredVariable { .. } => "missing_required_variable",
            Self::UnknownVariable { .. } => "unknown_variable",
            Self::UnresolvedVariable { .. } => "unresolved_variable",
            Self::MacroSyntax { .. } => "macro_syntax_error",
            Self::UnknownMacro { .. } => "unknown_macro",
            Self::MacroArgument { .. } => "argument_error",
            Self::DeploymentNotFound { .. } => "deployment_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ProvisioningFailed { .. } => "provisioning_failed",
            Self::ProvisioningTimeout { .. } => "provisioning_timeout",
            Self::TeardownFailed { .. } => "teardown_failed",
            Self::TeardownTimeout { .. } => "teardown_timeout",
            Self::ConnectorNotFound { .. } => "connector_not_found",
            Self::ConnectorFailed { .. } => "connector_failed",
            Self::DatabaseError(_) => "database_error",
            Self::MigrationFailed { .. } => "migration_failed",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::IoError { .. } => "io_error",
            Self::Internal(_) => "internal",
            Self::Other(_) => "internal",
        }
    }

    /// True for errors raised synchronously by variable resolution or
    /// template rendering, before anything is persisted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredVariable { .. }
                | Self::UnknownVariable { .. }
                | Self::UnresolvedVariable { .. }
                | Self::MacroSyntax { .. }
                | Self::UnknownMacro { .. }
                | Self::MacroArgument { .. }
        )
    }

    /// Create an Internal error from any error type.
    pub fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(err.to_string())
    }
}
