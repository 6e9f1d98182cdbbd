//! Split run report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::notify::SpecEmailDraft;

/// Outcome of one key partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecPartitionOutcome {
    pub key: String,
    /// Cleaned partition name.
    pub name_clean: String,
    /// Staged file name; empty when serialization failed.
    pub file_name: String,
    pub cnt_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one voucher sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSheetOutcome {
    pub sheet_name: String,
    pub company_name: String,
    pub voucher_number: String,
    pub email: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// User-visible summary of a split run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSplit {
    /// Job directory handle holding the outputs.
    pub job_id: String,
    pub date_stamp: String,
    /// Staged archive; empty when no file was produced.
    pub archive_file_name: String,
    pub cnt_partitions: usize,
    pub cnt_rows_data: usize,
    pub cnt_rows_excluded: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<SpecPartitionOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sheets: Vec<SpecSheetOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_drafts: Vec<SpecEmailDraft>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl ReportSplit {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Staged output file names, in output order.
    pub fn file_names(&self) -> Vec<&str> {
        self.partitions
            .iter()
            .map(|outcome| outcome.file_name.as_str())
            .chain(self.sheets.iter().map(|outcome| outcome.file_name.as_str()))
            .filter(|c_name| !c_name.is_empty())
            .collect()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, usize> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_partitions".to_string(), self.cnt_partitions);
        dict_counts.insert("cnt_sheets".to_string(), self.sheets.len());
        dict_counts.insert("cnt_files".to_string(), self.file_names().len());
        dict_counts.insert("cnt_rows_data".to_string(), self.cnt_rows_data);
        dict_counts.insert("cnt_rows_excluded".to_string(), self.cnt_rows_excluded);
        dict_counts.insert("cnt_errors".to_string(), self.error_count());
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count());
        dict_counts
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        let mut txt = format!(
            "{prefix} partitions={} sheets={} files={} rows={} excluded={} errors={} warnings={}",
            dict_counts["cnt_partitions"],
            dict_counts["cnt_sheets"],
            dict_counts["cnt_files"],
            dict_counts["cnt_rows_data"],
            dict_counts["cnt_rows_excluded"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        );
        if let Some(c_fatal) = &self.fatal {
            txt.push_str(&format!(" fatal={c_fatal:?}"));
        }
        txt
    }
}

impl fmt::Display for ReportSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[SPLIT]"))
    }
}

/// Mutable accumulator for split statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportSplitBuilder {
    pub job_id: String,
    pub date_stamp: String,
    pub archive_file_name: String,
    pub cnt_rows_data: usize,
    pub cnt_rows_excluded: usize,
    pub partitions: Vec<SpecPartitionOutcome>,
    pub sheets: Vec<SpecSheetOutcome>,
    pub email_drafts: Vec<SpecEmailDraft>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub fatal: Option<String>,
}

impl ReportSplitBuilder {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Default::default()
        }
    }

    pub fn set_date_stamp(&mut self, date_stamp: impl Into<String>) {
        self.date_stamp = date_stamp.into();
    }

    pub fn set_archive(&mut self, file_name: impl Into<String>) {
        self.archive_file_name = file_name.into();
    }

    pub fn add_rows(&mut self, cnt_data: usize, cnt_excluded: usize) {
        self.cnt_rows_data += cnt_data;
        self.cnt_rows_excluded += cnt_excluded;
    }

    /// Record one partition; its error (if any) also lands in `errors`.
    pub fn add_partition(&mut self, outcome: SpecPartitionOutcome) {
        if let Some(c_error) = &outcome.error {
            self.errors.push(format!("{}: {c_error}", outcome.key));
        }
        self.partitions.push(outcome);
    }

    /// Record one voucher sheet; its error (if any) also lands in `errors`.
    pub fn add_sheet(&mut self, outcome: SpecSheetOutcome) {
        if let Some(c_error) = &outcome.error {
            self.errors.push(format!("{}: {c_error}", outcome.sheet_name));
        }
        self.sheets.push(outcome);
    }

    pub fn set_email_drafts(&mut self, email_drafts: Vec<SpecEmailDraft>) {
        self.email_drafts = email_drafts;
    }

    /// Attach `error` to the outcome that produced `file_name`, unless it already has one.
    pub fn mark_file_error(&mut self, file_name: &str, error: &str) {
        let opt_error = self
            .partitions
            .iter_mut()
            .filter(|outcome| outcome.file_name == file_name)
            .map(|outcome| &mut outcome.error)
            .chain(
                self.sheets
                    .iter_mut()
                    .filter(|outcome| outcome.file_name == file_name)
                    .map(|outcome| &mut outcome.error),
            )
            .next();
        if let Some(opt_error) = opt_error
            && opt_error.is_none()
        {
            *opt_error = Some(error.to_string());
        }
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn extend_warnings<I: IntoIterator<Item = String>>(&mut self, warnings: I) {
        self.warnings.extend(warnings);
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn set_fatal(&mut self, message: impl Into<String>) {
        self.fatal = Some(message.into());
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportSplit {
        ReportSplit {
            job_id: self.job_id,
            date_stamp: self.date_stamp,
            archive_file_name: self.archive_file_name,
            cnt_partitions: self.partitions.len(),
            cnt_rows_data: self.cnt_rows_data,
            cnt_rows_excluded: self.cnt_rows_excluded,
            partitions: self.partitions,
            sheets: self.sheets,
            email_drafts: self.email_drafts,
            warnings: self.warnings,
            errors: self.errors,
            fatal: self.fatal,
        }
    }
}
