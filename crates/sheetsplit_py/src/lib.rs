use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::NaiveDate;
use pyo3::exceptions::{PyFileNotFoundError, PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;
use sheetsplit_io_fs::{
    EnumStageConflictStrategy, JobHandle, JobStore, SpecStageOptions, StagingError,
};
use sheetsplit_io_xlsx::{EnumAutofitColumnsRule, SpecAutofitCellsPolicy, load_table};
use sheetsplit_split::{
    EnumDateFallback, ReconcileError, ReportRoleCheck, ReportSplit, SpecContactBook,
    SpecRoleCheckOptions, SpecSplitContacts, SpecSplitOptions, SpecVoucherOptions, SplitError,
    check_roles, derive_fatal_report, inspect_roster_layout, split_by_key, split_sheets,
    write_mismatch_report,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "sheetsplit.split.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

////////////////////////////////////////////////////////////////////////////////
// #region Classes

#[pyclass(name = "JobStore")]
struct PyJobStore {
    inner: JobStore,
}

#[pymethods]
impl PyJobStore {
    #[new]
    fn new(dir_root: String) -> PyResult<Self> {
        let inner = JobStore::open(dir_root).map_err(map_staging_error)?;
        Ok(Self { inner })
    }

    #[getter]
    fn root(&self) -> String {
        self.inner.root().to_string_lossy().to_string()
    }

    /// Absolute path of a staged file.
    fn resolve_file(&self, job_id: &str, file_name: &str) -> PyResult<String> {
        let handle = JobHandle::parse(job_id).map_err(map_staging_error)?;
        let path_file = self
            .inner
            .resolve_file(handle, file_name)
            .map_err(map_staging_error)?;
        Ok(path_file.to_string_lossy().to_string())
    }

    fn remove_job(&self, job_id: &str) -> PyResult<bool> {
        let handle = JobHandle::parse(job_id).map_err(map_staging_error)?;
        self.inner.remove_job(handle).map_err(map_staging_error)
    }

    fn purge_expired(&self, py: Python<'_>, max_age_seconds: u64) -> PyResult<usize> {
        let store = &self.inner;
        py.allow_threads(|| store.purge_expired(Duration::from_secs(max_age_seconds)))
            .map_err(map_staging_error)
    }
}

#[pyclass(name = "ReportSplit")]
#[derive(Debug, Clone)]
struct PyReportSplit {
    inner: ReportSplit,
}

#[pymethods]
impl PyReportSplit {
    #[getter]
    fn job_id(&self) -> String {
        self.inner.job_id.clone()
    }

    #[getter]
    fn date_stamp(&self) -> String {
        self.inner.date_stamp.clone()
    }

    #[getter]
    fn archive_file_name(&self) -> String {
        self.inner.archive_file_name.clone()
    }

    #[getter]
    fn cnt_partitions(&self) -> usize {
        self.inner.cnt_partitions
    }

    #[getter]
    fn cnt_rows_data(&self) -> usize {
        self.inner.cnt_rows_data
    }

    #[getter]
    fn cnt_rows_excluded(&self) -> usize {
        self.inner.cnt_rows_excluded
    }

    #[getter]
    fn file_names(&self) -> Vec<String> {
        self.inner
            .file_names()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }

    #[getter]
    fn warnings(&self) -> Vec<String> {
        self.inner.warnings.clone()
    }

    #[getter]
    fn errors(&self) -> Vec<String> {
        self.inner.errors.clone()
    }

    #[getter]
    fn fatal(&self) -> Option<String> {
        self.inner.fatal.clone()
    }

    #[getter]
    fn error_count(&self) -> usize {
        self.inner.error_count()
    }

    #[getter]
    fn warning_count(&self) -> usize {
        self.inner.warning_count()
    }

    fn to_dict(&self) -> BTreeMap<String, usize> {
        self.inner.to_dict()
    }

    /// Full report, partitions and drafts included, as JSON text.
    fn to_json(&self) -> PyResult<String> {
        self.inner
            .to_json()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    #[pyo3(signature = (prefix = "[SPLIT]"))]
    fn format(&self, prefix: &str) -> String {
        self.inner.format(prefix)
    }

    fn __str__(&self) -> String {
        self.inner.format("[SPLIT]")
    }
}

#[pyclass(name = "ReportRoleCheck")]
#[derive(Debug, Clone)]
struct PyReportRoleCheck {
    inner: ReportRoleCheck,
}

#[pymethods]
impl PyReportRoleCheck {
    #[getter]
    fn header_row(&self) -> usize {
        self.inner.header_row
    }

    #[getter]
    fn cnt_roster(&self) -> usize {
        self.inner.cnt_roster
    }

    #[getter]
    fn cnt_results(&self) -> usize {
        self.inner.cnt_results
    }

    #[getter]
    fn cnt_matched(&self) -> usize {
        self.inner.cnt_matched
    }

    #[getter]
    fn cnt_unmatched(&self) -> usize {
        self.inner.cnt_unmatched
    }

    #[getter]
    fn cnt_mismatches(&self) -> usize {
        self.inner.mismatches.len()
    }

    #[getter]
    fn warnings(&self) -> Vec<String> {
        self.inner.warnings.clone()
    }

    fn to_json(&self) -> PyResult<String> {
        self.inner
            .to_json()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Mismatch list as `.xlsx` bytes.
    fn to_xlsx_bytes<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let report = &self.inner;
        let v_bytes = py
            .allow_threads(|| write_mismatch_report(report))
            .map_err(map_reconcile_error)?;
        Ok(PyBytes::new(py, &v_bytes))
    }

    #[pyo3(signature = (prefix = "[ROLES]"))]
    fn format(&self, prefix: &str) -> String {
        self.inner.format(prefix)
    }

    fn __str__(&self) -> String {
        self.inner.format("[ROLES]")
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Parsers

fn parse_rule_autofit_columns(value: &str) -> PyResult<EnumAutofitColumnsRule> {
    match value {
        "none" => Ok(EnumAutofitColumnsRule::None),
        "header" => Ok(EnumAutofitColumnsRule::Header),
        "body" => Ok(EnumAutofitColumnsRule::Body),
        "all" => Ok(EnumAutofitColumnsRule::All),
        _ => Err(PyValueError::new_err(format!(
            "Invalid autofit rule: `{value}`. Expected one of: ['none', 'header', 'body', 'all']"
        ))),
    }
}

fn parse_rule_conflict_file(value: &str) -> PyResult<EnumStageConflictStrategy> {
    match value {
        "skip" => Ok(EnumStageConflictStrategy::Skip),
        "overwrite" => Ok(EnumStageConflictStrategy::Overwrite),
        "error" => Ok(EnumStageConflictStrategy::Error),
        _ => Err(PyValueError::new_err(format!(
            "Invalid file conflict strategy: `{value}`. Expected one of: ['skip', 'overwrite', 'error']"
        ))),
    }
}

/// `None` -> today; `"YYYY-MM-DD"` -> that date.
fn parse_rule_date_fallback(value: Option<&str>) -> PyResult<EnumDateFallback> {
    match value {
        None => Ok(EnumDateFallback::Today),
        Some(c_date) => NaiveDate::parse_from_str(c_date.trim(), "%Y-%m-%d")
            .map(EnumDateFallback::Fixed)
            .map_err(|_| {
                PyValueError::new_err(format!(
                    "Invalid fallback date: `{c_date}`. Expected YYYY-MM-DD."
                ))
            }),
    }
}

fn parse_contact_book(data: Option<&Bound<'_, PyBytes>>) -> PyResult<Option<SpecContactBook>> {
    let Some(data) = data else {
        return Ok(None);
    };
    let table = load_table(data.as_bytes())
        .map_err(|e| PyValueError::new_err(format!("Unreadable mapping workbook: {e}")))?;
    Ok(Some(SpecContactBook::from_table(&table)))
}

fn map_staging_error(exception: StagingError) -> PyErr {
    match exception {
        StagingError::InvalidHandle(_)
        | StagingError::InvalidFileName(_)
        | StagingError::UnsafePath(_) => PyValueError::new_err(exception.to_string()),
        StagingError::JobNotFound(_) | StagingError::FileNotFound(_) => {
            PyFileNotFoundError::new_err(exception.to_string())
        }
        StagingError::RootInitFailed { .. } | StagingError::Archive(_) | StagingError::Io(_) => {
            PyOSError::new_err(exception.to_string())
        }
    }
}

fn map_split_error(exception: SplitError) -> PyErr {
    match exception {
        SplitError::Staging(e) => map_staging_error(e),
        SplitError::Serialize(e) => PyRuntimeError::new_err(e.to_string()),
        SplitError::InvalidState { .. } => PyRuntimeError::new_err(exception.to_string()),
        SplitError::Decode(_)
        | SplitError::HeaderNotFound { .. }
        | SplitError::Projection(_)
        | SplitError::InvalidOptions(_)
        | SplitError::NoSheets => PyValueError::new_err(exception.to_string()),
    }
}

fn map_reconcile_error(exception: ReconcileError) -> PyErr {
    match exception {
        ReconcileError::Decode(_)
        | ReconcileError::MissingColumn(_)
        | ReconcileError::EmptyRoster => PyValueError::new_err(exception.to_string()),
        ReconcileError::Frame(_) | ReconcileError::Serialize(_) => {
            PyRuntimeError::new_err(exception.to_string())
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Functions

#[pyfunction(name = "split_by_key")]
#[pyo3(signature = (
    store,
    data,
    mapping_whatsapp = None,
    mapping_email = None,
    cols_delete = None,
    key_column_label = None,
    key_column_index = None,
    date_cell_ref = None,
    date_fallback = None,
    rule_autofit_columns = "all",
    archive_prefix = None,
    rule_conflict_file = "overwrite",
    num_workers_max = None
))]
#[allow(clippy::too_many_arguments)]
fn split_by_key_py(
    py: Python<'_>,
    store: PyRef<'_, PyJobStore>,
    data: &Bound<'_, PyBytes>,
    mapping_whatsapp: Option<&Bound<'_, PyBytes>>,
    mapping_email: Option<&Bound<'_, PyBytes>>,
    cols_delete: Option<Vec<usize>>,
    key_column_label: Option<String>,
    key_column_index: Option<usize>,
    date_cell_ref: Option<String>,
    date_fallback: Option<&str>,
    rule_autofit_columns: &str,
    archive_prefix: Option<String>,
    rule_conflict_file: &str,
    num_workers_max: Option<usize>,
) -> PyResult<PyReportSplit> {
    let spec_defaults = SpecSplitOptions::default();
    let spec_options = SpecSplitOptions {
        cols_delete: cols_delete
            .map(|l_cols| l_cols.into_iter().collect::<BTreeSet<usize>>())
            .unwrap_or(spec_defaults.cols_delete),
        key_column_label: key_column_label.unwrap_or(spec_defaults.key_column_label),
        key_column_index: key_column_index.unwrap_or(spec_defaults.key_column_index),
        date_cell_ref: date_cell_ref.unwrap_or(spec_defaults.date_cell_ref),
        rule_date_fallback: parse_rule_date_fallback(date_fallback)?,
        policy_autofit: SpecAutofitCellsPolicy {
            rule_columns: parse_rule_autofit_columns(rule_autofit_columns)?,
            ..spec_defaults.policy_autofit
        },
        archive_prefix: archive_prefix.unwrap_or(spec_defaults.archive_prefix),
        opts_write: spec_defaults.opts_write,
        opts_stage: SpecStageOptions {
            rule_conflict_file: parse_rule_conflict_file(rule_conflict_file)?,
            num_workers_max,
        },
    };
    let contacts = SpecSplitContacts {
        whatsapp: parse_contact_book(mapping_whatsapp)?,
        email: parse_contact_book(mapping_email)?,
    };

    let v_bytes = data.as_bytes();
    let job_store = &store.inner;
    let res_report =
        py.allow_threads(|| split_by_key(v_bytes, &contacts, job_store, &spec_options));
    let report = match res_report {
        Ok(report) => report,
        Err(e @ SplitError::HeaderNotFound { .. }) => derive_fatal_report(&e),
        Err(e) => return Err(map_split_error(e)),
    };
    Ok(PyReportSplit { inner: report })
}

#[pyfunction(name = "split_sheets")]
#[pyo3(signature = (
    store,
    data,
    company_cell_ref = None,
    number_cell_ref = None,
    email_cell_ref = None,
    archive_prefix = None,
    rule_conflict_file = "overwrite",
    num_workers_max = None
))]
#[allow(clippy::too_many_arguments)]
fn split_sheets_py(
    py: Python<'_>,
    store: PyRef<'_, PyJobStore>,
    data: &Bound<'_, PyBytes>,
    company_cell_ref: Option<String>,
    number_cell_ref: Option<String>,
    email_cell_ref: Option<String>,
    archive_prefix: Option<String>,
    rule_conflict_file: &str,
    num_workers_max: Option<usize>,
) -> PyResult<PyReportSplit> {
    let spec_defaults = SpecVoucherOptions::default();
    let spec_options = SpecVoucherOptions {
        company_cell_ref: company_cell_ref.unwrap_or(spec_defaults.company_cell_ref),
        number_cell_ref: number_cell_ref.unwrap_or(spec_defaults.number_cell_ref),
        email_cell_ref: email_cell_ref.unwrap_or(spec_defaults.email_cell_ref),
        archive_prefix: archive_prefix.unwrap_or(spec_defaults.archive_prefix),
        opts_email: spec_defaults.opts_email,
        opts_write: spec_defaults.opts_write,
        opts_stage: SpecStageOptions {
            rule_conflict_file: parse_rule_conflict_file(rule_conflict_file)?,
            num_workers_max,
        },
    };

    let v_bytes = data.as_bytes();
    let job_store = &store.inner;
    let report = py
        .allow_threads(|| split_sheets(v_bytes, job_store, &spec_options))
        .map_err(map_split_error)?;
    Ok(PyReportSplit { inner: report })
}

#[pyfunction(name = "compare_roles")]
#[pyo3(signature = (roster, results, n_header_scan_rows = None))]
fn compare_roles_py(
    py: Python<'_>,
    roster: &Bound<'_, PyBytes>,
    results: &Bound<'_, PyBytes>,
    n_header_scan_rows: Option<usize>,
) -> PyResult<PyReportRoleCheck> {
    let spec_defaults = SpecRoleCheckOptions::default();
    let spec_options = SpecRoleCheckOptions {
        n_header_scan_rows: n_header_scan_rows.unwrap_or(spec_defaults.n_header_scan_rows),
        ..spec_defaults
    };
    let (v_roster, v_results) = (roster.as_bytes(), results.as_bytes());
    let report = py
        .allow_threads(|| check_roles(v_roster, v_results, &spec_options))
        .map_err(map_reconcile_error)?;
    Ok(PyReportRoleCheck { inner: report })
}

/// Layout findings of a roster workbook as JSON text.
#[pyfunction(name = "inspect_roster_layout")]
#[pyo3(signature = (roster, n_rows_max = 100))]
fn inspect_roster_layout_py(
    py: Python<'_>,
    roster: &Bound<'_, PyBytes>,
    n_rows_max: usize,
) -> PyResult<String> {
    let v_roster = roster.as_bytes();
    let table = py
        .allow_threads(|| load_table(v_roster))
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let layout = inspect_roster_layout(&table, n_rows_max, &SpecRoleCheckOptions::default());
    serde_json::to_string(&layout).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[pymodule]
fn _sheetsplit_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyJobStore>()?;
    module.add_class::<PyReportSplit>()?;
    module.add_class::<PyReportRoleCheck>()?;
    module.add_function(wrap_pyfunction!(split_by_key_py, module)?)?;
    module.add_function(wrap_pyfunction!(split_sheets_py, module)?)?;
    module.add_function(wrap_pyfunction!(compare_roles_py, module)?)?;
    module.add_function(wrap_pyfunction!(inspect_roster_layout_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
