//! Split options, partition models and error types.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use polars::prelude::PolarsError;
use sheetsplit_io_fs::{SpecStageOptions, StagingError};
use sheetsplit_io_xlsx::{
    SpecAutofitCellsPolicy, SpecXlsxWriteOptions, Table, XlsxDecodeError, XlsxSerializeError,
    parse_cell_reference,
};
use thiserror::Error;

use crate::conf::{
    C_ARCHIVE_PREFIX_DEFAULT, C_DATE_CELL_REF_DEFAULT, C_EMAIL_SIGNOFF_DEFAULT,
    C_EMAIL_SUBJECT_PREFIX_DEFAULT, C_KEY_COLUMN_LABEL_DEFAULT, C_RESULTS_LABEL_NAME_DEFAULT,
    C_RESULTS_LABEL_OUTLET_DEFAULT, C_RESULTS_LABEL_ROLE_DEFAULT, C_VOUCHER_ARCHIVE_PREFIX_DEFAULT,
    C_VOUCHER_COMPANY_CELL_DEFAULT, C_VOUCHER_EMAIL_CELL_DEFAULT, C_VOUCHER_NUMBER_CELL_DEFAULT,
    N_EMAIL_SUBJECT_IDS_MAX, N_KEY_COLUMN_INDEX_DEFAULT, N_ROSTER_COL_ID_DEFAULT,
    N_ROSTER_COL_NAME_DEFAULT, N_ROSTER_COL_OUTLET_DEFAULT, N_ROSTER_COL_ROLE_DEFAULT,
    N_ROSTER_HEADER_SCAN_ROWS, TUP_COLS_DELETE_DEFAULT,
};

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// What the date stamp falls back to when the date cell has no usable date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumDateFallback {
    /// Current local date.
    #[default]
    Today,
    /// A caller-chosen date.
    Fixed(NaiveDate),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Options for one key split.
#[derive(Debug, Clone)]
pub struct SpecSplitOptions {
    /// Columns dropped from every output (1-based, source positions).
    pub cols_delete: BTreeSet<usize>,
    /// Exact text of the key column in the header row.
    pub key_column_label: String,
    /// Key column (1-based, source position).
    pub key_column_index: usize,
    /// A1 reference of the cell the date stamp is read from.
    pub date_cell_ref: String,
    pub rule_date_fallback: EnumDateFallback,
    /// Width recomputation for emitted tables.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Archive name is `<prefix>_<yyyymmdd>.zip`.
    pub archive_prefix: String,
    pub opts_write: SpecXlsxWriteOptions,
    pub opts_stage: SpecStageOptions,
}

impl Default for SpecSplitOptions {
    fn default() -> Self {
        Self {
            cols_delete: TUP_COLS_DELETE_DEFAULT.into_iter().collect(),
            key_column_label: C_KEY_COLUMN_LABEL_DEFAULT.to_string(),
            key_column_index: N_KEY_COLUMN_INDEX_DEFAULT,
            date_cell_ref: C_DATE_CELL_REF_DEFAULT.to_string(),
            rule_date_fallback: EnumDateFallback::Today,
            policy_autofit: SpecAutofitCellsPolicy::default(),
            archive_prefix: C_ARCHIVE_PREFIX_DEFAULT.to_string(),
            opts_write: SpecXlsxWriteOptions::default(),
            opts_stage: SpecStageOptions::default(),
        }
    }
}

impl SpecSplitOptions {
    pub fn validate(&self) -> Result<(), SplitError> {
        if self.key_column_index == 0 {
            return Err(SplitError::InvalidOptions(
                "key_column_index must be >= 1.".to_string(),
            ));
        }
        if self.cols_delete.contains(&0) {
            return Err(SplitError::InvalidOptions(
                "cols_delete holds 1-based column indices; 0 is not a column.".to_string(),
            ));
        }
        parse_cell_reference(&self.date_cell_ref).map_err(SplitError::InvalidOptions)?;
        self.policy_autofit
            .validate()
            .map_err(SplitError::InvalidOptions)?;
        validate_archive_prefix(&self.archive_prefix)
    }
}

/// Options for splitting every sheet of a voucher workbook.
#[derive(Debug, Clone)]
pub struct SpecVoucherOptions {
    pub company_cell_ref: String,
    pub number_cell_ref: String,
    pub email_cell_ref: String,
    /// Archive name is `<prefix>_<yyyymmdd>_<hhmmss>.zip`.
    pub archive_prefix: String,
    /// Wording of the drafts planned for sheets with an email address.
    pub opts_email: SpecEmailOptions,
    pub opts_write: SpecXlsxWriteOptions,
    pub opts_stage: SpecStageOptions,
}

impl Default for SpecVoucherOptions {
    fn default() -> Self {
        Self {
            company_cell_ref: C_VOUCHER_COMPANY_CELL_DEFAULT.to_string(),
            number_cell_ref: C_VOUCHER_NUMBER_CELL_DEFAULT.to_string(),
            email_cell_ref: C_VOUCHER_EMAIL_CELL_DEFAULT.to_string(),
            archive_prefix: C_VOUCHER_ARCHIVE_PREFIX_DEFAULT.to_string(),
            opts_email: SpecEmailOptions::default(),
            opts_write: SpecXlsxWriteOptions::default(),
            opts_stage: SpecStageOptions::default(),
        }
    }
}

impl SpecVoucherOptions {
    pub fn validate(&self) -> Result<(), SplitError> {
        for c_ref in [
            &self.company_cell_ref,
            &self.number_cell_ref,
            &self.email_cell_ref,
        ] {
            parse_cell_reference(c_ref).map_err(SplitError::InvalidOptions)?;
        }
        validate_archive_prefix(&self.archive_prefix)
    }
}

fn validate_archive_prefix(archive_prefix: &str) -> Result<(), SplitError> {
    let if_safe = !archive_prefix.is_empty()
        && archive_prefix
            .chars()
            .all(|chr| chr.is_alphanumeric() || chr == '-' || chr == '_');
    if if_safe {
        Ok(())
    } else {
        Err(SplitError::InvalidOptions(format!(
            "archive_prefix must be non-empty and use only letters, digits, '-' or '_': {archive_prefix:?}"
        )))
    }
}

/// Email draft wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEmailOptions {
    pub subject_prefix: String,
    /// Last line of every body.
    pub signoff: String,
    /// Document ids listed in the subject before `...`.
    pub n_subject_ids_max: usize,
}

impl Default for SpecEmailOptions {
    fn default() -> Self {
        Self {
            subject_prefix: C_EMAIL_SUBJECT_PREFIX_DEFAULT.to_string(),
            signoff: C_EMAIL_SIGNOFF_DEFAULT.to_string(),
            n_subject_ids_max: N_EMAIL_SUBJECT_IDS_MAX,
        }
    }
}

/// Roster/results layout for role reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRoleCheckOptions {
    /// Roster columns, 1-based.
    pub col_name: usize,
    pub col_id: usize,
    pub col_role: usize,
    pub col_outlet: usize,
    /// Rows searched for the roster header.
    pub n_header_scan_rows: usize,
    /// Results header labels.
    pub label_name: String,
    pub label_role: String,
    pub label_outlet: String,
}

impl Default for SpecRoleCheckOptions {
    fn default() -> Self {
        Self {
            col_name: N_ROSTER_COL_NAME_DEFAULT,
            col_id: N_ROSTER_COL_ID_DEFAULT,
            col_role: N_ROSTER_COL_ROLE_DEFAULT,
            col_outlet: N_ROSTER_COL_OUTLET_DEFAULT,
            n_header_scan_rows: N_ROSTER_HEADER_SCAN_ROWS,
            label_name: C_RESULTS_LABEL_NAME_DEFAULT.to_string(),
            label_role: C_RESULTS_LABEL_ROLE_DEFAULT.to_string(),
            label_outlet: C_RESULTS_LABEL_OUTLET_DEFAULT.to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Partitions

/// Data rows sharing one key, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPartition {
    /// Trimmed key text.
    pub key: String,
    /// Source row indices (1-based).
    pub rows: Vec<usize>,
}

/// Result of partitioning the rows below a header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecPartitionSet {
    /// Partitions in first-occurrence order of their key.
    pub partitions: Vec<SpecPartition>,
    /// Rows after the header holding at least one cell.
    pub cnt_rows_data: usize,
    /// Data rows with a blank key.
    pub cnt_rows_excluded: usize,
}

impl SpecPartitionSet {
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Rows covered by some partition.
    pub fn cnt_rows_partitioned(&self) -> usize {
        self.partitions.iter().map(|p| p.rows.len()).sum()
    }
}

/// One emitted partition table.
#[derive(Debug, Clone)]
pub struct SpecEmittedPartition {
    pub key: String,
    pub cnt_rows: usize,
    pub table: Table,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Invalid projection input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Column {col} is out of range 1..={max_column}")]
    ColumnOutOfRange { col: usize, max_column: usize },
}

/// Split run failures.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(transparent)]
    Decode(#[from] XlsxDecodeError),

    #[error("Could not find '{label}' header row in column {col}")]
    HeaderNotFound { label: String, col: usize },

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("Cannot {step} while run is {state}")]
    InvalidState {
        step: &'static str,
        state: &'static str,
    },

    #[error("Invalid split options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Serialize(#[from] XlsxSerializeError),

    #[error("Workbook has no worksheets")]
    NoSheets,
}

/// Notifier payload failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification target is empty")]
    EmptyTarget,
    #[error("Notification message is empty")]
    EmptyMessage,
    #[error("Failed to build share link: {0}")]
    Link(String),
}

/// Role reconciliation failures.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Decode(#[from] XlsxDecodeError),

    #[error("Results sheet has no '{0}' column")]
    MissingColumn(String),

    #[error("Roster has no employee rows")]
    EmptyRoster,

    #[error(transparent)]
    Frame(#[from] PolarsError),

    #[error(transparent)]
    Serialize(#[from] XlsxSerializeError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_options_defaults() {
        let spec_options = SpecSplitOptions::default();
        assert_eq!(
            spec_options.cols_delete.iter().copied().collect::<Vec<_>>(),
            vec![2, 3, 5, 6, 8, 9, 13, 16, 19, 20, 21]
        );
        assert_eq!(spec_options.key_column_label, "Supplier");
        assert_eq!(spec_options.key_column_index, 4);
        assert_eq!(spec_options.date_cell_ref, "G3");
        assert_eq!(spec_options.archive_prefix, "IM_Split");
        assert_eq!(spec_options.rule_date_fallback, EnumDateFallback::Today);
        assert!(spec_options.validate().is_ok());
    }

    #[test]
    fn test_split_options_validate_rejects_bad_values() {
        let spec_bad_key = SpecSplitOptions {
            key_column_index: 0,
            ..Default::default()
        };
        assert!(matches!(
            spec_bad_key.validate(),
            Err(SplitError::InvalidOptions(_))
        ));

        let spec_bad_ref = SpecSplitOptions {
            date_cell_ref: "not a cell".to_string(),
            ..Default::default()
        };
        assert!(spec_bad_ref.validate().is_err());

        let spec_bad_prefix = SpecSplitOptions {
            archive_prefix: "../x".to_string(),
            ..Default::default()
        };
        assert!(spec_bad_prefix.validate().is_err());
    }

    #[test]
    fn test_partition_set_counts() {
        let spec_set = SpecPartitionSet {
            partitions: vec![
                SpecPartition {
                    key: "A".to_string(),
                    rows: vec![4, 5],
                },
                SpecPartition {
                    key: "B".to_string(),
                    rows: vec![6],
                },
            ],
            cnt_rows_data: 4,
            cnt_rows_excluded: 1,
        };
        assert_eq!(spec_set.len(), 2);
        assert_eq!(spec_set.cnt_rows_partitioned(), 3);
    }
}
