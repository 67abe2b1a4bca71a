//! # Rollout Core
//!
//! Core abstractions and deterministic logic for the rollout pipeline.
//!
//! This crate contains:
//! - Project model / job / result / summary definitions
//! - Configuration parser (document -> validated model)
//! - Execution planner (model -> ordered job graph)
//! - Job handler and system adapter contracts
//! - The sequential, fail-fast job executor
//!
//! This crate does NOT care about:
//! - How a target system is actually reached (see rollout-adapters)
//! - Where artifacts are persisted (see rollout-stores)
//! - How runs are triggered over the network (see rollout-server)

pub mod adapter;
pub mod executor;
pub mod handler;
pub mod parser;
pub mod planner;
pub mod store;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::adapter::{
        AdapterError, AdapterFactory, ApiResponse, ApiStatus, DataLoadResult, SystemAdapter,
        TableOpResult,
    };
    pub use crate::executor::{ExecutionError, JobExecutor, ProgressReporter};
    pub use crate::handler::{HandlerContext, HandlerRegistry, JobHandler, SharedState};
    pub use crate::parser::{ConfigError, ConfigParser};
    pub use crate::planner::{ExecutionPlanner, PlanningError};
    pub use crate::store::{ArtifactInfo, RunStore, StoreError};
    pub use crate::types::{
        JobCategory, JobDefinition, JobGraph, JobResult, JobStatus, LogEntry, ProjectModel,
        RunStatus, RunSummary,
    };
}

// Re-export key types at crate root
pub use adapter::{AdapterFactory, SystemAdapter};
pub use executor::JobExecutor;
pub use handler::{HandlerContext, HandlerRegistry, JobHandler};
pub use parser::ConfigParser;
pub use planner::ExecutionPlanner;
pub use store::RunStore;
pub use types::{JobDefinition, JobGraph, JobResult, ProjectModel, RunSummary};
