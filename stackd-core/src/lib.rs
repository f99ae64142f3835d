//! STACKD Core Library
//!
//! Shared types, rendering, connector abstraction, and persistence for the
//! STACKD stack deployment engine.

pub mod config;
pub mod connector;
pub mod error;
pub mod observability;
pub mod paths;
pub mod render;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use config::Config;
pub use connector::{ConnectorRegistry, TargetConnector};
pub use error::{Result, StackdError};
pub use render::{render, resolve_variables};
pub use state::StateManager;
pub use types::{
    Deployment, DeploymentRequest, DeploymentStatus, ResourceHandle, StackTemplate, Target,
    VariableSpec, VariableType,
};
