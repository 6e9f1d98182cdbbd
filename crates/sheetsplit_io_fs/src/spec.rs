//! Staging specification models and top-level error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Existing staged file conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumStageConflictStrategy {
    /// Keep the staged file and skip the incoming one.
    Skip,
    /// Replace the staged file.
    #[default]
    Overwrite,
    /// Record an error and skip this file.
    Error,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Opaque identifier of one staged job.
///
/// Only canonical UUID text parses, so a handle never carries path syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(Uuid);

impl JobHandle {
    /// Fresh random handle.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, StagingError> {
        Uuid::try_parse(value.trim())
            .map(Self)
            .map_err(|_| StagingError::InvalidHandle(value.to_string()))
    }

    /// Directory name used under the store root.
    pub fn as_dir_name(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Input options for [`crate::JobWorkspace::commit_files`].
#[derive(Debug, Clone)]
pub struct SpecStageOptions {
    /// Conflict behavior for files already present in the job directory.
    pub rule_conflict_file: EnumStageConflictStrategy,
    /// Maximum worker threads for the write stage.
    pub num_workers_max: Option<usize>,
}

impl Default for SpecStageOptions {
    fn default() -> Self {
        Self {
            rule_conflict_file: EnumStageConflictStrategy::Overwrite,
            num_workers_max: None,
        }
    }
}

/// One staging failure item with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecStageError {
    /// Failed destination path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// Store setup and lookup failures.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Invalid job handle: {0:?}")]
    InvalidHandle(String),
    #[error("Invalid staged file name: {0:?}")]
    InvalidFileName(String),
    #[error("Job not found: {0}")]
    JobNotFound(JobHandle),
    #[error("Staged file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Unsafe staging path: {0}")]
    UnsafePath(String),
    #[error("Failed to initialize staging root {}: {message}", path.display())]
    RootInitFailed { path: PathBuf, message: String },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// ZIP assembly failures.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),
    #[error("Invalid archive entry name: {0:?}")]
    InvalidEntryName(String),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
