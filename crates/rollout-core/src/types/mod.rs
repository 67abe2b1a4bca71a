//! Domain types shared across the pipeline.

mod job;
mod model;

pub use job::{
    JobCategory, JobDefinition, JobGraph, JobResult, JobStatus, LogEntry, RunStatus, RunSummary,
};
pub use model::{
    CompanyCode, CustomizingConfig, CustomizingPackage, CustomizingStep, Landscape,
    MigrationConfig, MigrationObject, OrgConfig, Plant, ProjectInfo, ProjectModel, Scope,
    SystemConfig, TestCase, TestSuite, TestingConfig,
};
