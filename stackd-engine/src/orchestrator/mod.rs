//! Deployment orchestration module.
//!
//! Owns the deployment lifecycle state machine and the per-deployment
//! serialization discipline that guarantees at-most-once provisioning.

pub mod deployment;

pub use deployment::Orchestrator;
