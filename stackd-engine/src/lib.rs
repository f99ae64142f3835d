//! STACKD Engine
//!
//! Deployment lifecycle orchestration: consumes rendered configuration plus
//! a chosen target, drives state transitions through the target's connector,
//! and persists status and resource handles via the core state manager.

pub mod orchestrator;

pub use orchestrator::Orchestrator;
