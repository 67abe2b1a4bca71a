//! # Rollout Adapters
//!
//! Target-system adapters implementing the `SystemAdapter` contract from
//! rollout-core. Only the in-memory sandbox simulator ships here; a real
//! protocol adapter would slot in next to it behind the same contract.

pub mod sandbox;

pub use sandbox::{SandboxAdapter, SandboxAdapterFactory, SandboxConfig};
