//! `sheetsplit_io_fs` v1:
//! Sandboxed job staging for generated files.
//!
//! - `staging` : job store, opaque handles, parallel file commit
//! - `archive` : in-memory ZIP assembly
//! - `spec`    : enums/options/errors
//! - `report`  : run-time report model
//! - `util`    : path-safety helpers

pub mod archive;
pub mod report;
pub mod spec;
pub mod staging;
mod util;

pub use archive::build_zip_archive;
pub use report::{ReportStage, ReportStageBuilder};
pub use spec::{
    ArchiveError, EnumStageConflictStrategy, JobHandle, SpecStageError, SpecStageOptions,
    StagingError,
};
pub use staging::{JobStore, JobWorkspace};
