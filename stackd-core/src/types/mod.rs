//! Domain types for STACKD.

pub mod deployment;
pub mod target;
pub mod template;

pub use deployment::{Deployment, DeploymentRequest, DeploymentStatus, ResourceHandle};
pub use target::Target;
pub use template::{StackTemplate, VariableSpec, VariableType};
