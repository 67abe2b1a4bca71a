//! # Rollout Stores
//!
//! Durable artifact storage implementing the `RunStore` contract from
//! rollout-core. JSON files on disk, one directory per run:
//!
//! ```text
//! <base>/
//!     <run_id>/
//!         plan.json           execution plan
//!         state.json          intermediate state snapshot
//!         summary.json        final run summary
//!         customizing/        per-job artifacts
//!         migration/
//!         testing/
//! ```

mod file_store;

pub use file_store::FileRunStore;
