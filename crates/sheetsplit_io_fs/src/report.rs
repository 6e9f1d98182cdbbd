//! Stage report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::SpecStageError;

/// Aggregate counters and diagnostics for one `commit_files` run.
#[derive(Debug, Default, Clone)]
pub struct ReportStage {
    /// Number of files handed to the stage.
    pub cnt_requested: u64,
    /// Number of files written successfully.
    pub cnt_written: u64,
    /// Number of files skipped by conflict policy.
    pub cnt_skipped: u64,
    /// Total bytes written.
    pub cnt_bytes: u64,
    /// Names of written files, in input order.
    pub files_written: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Per-file failures.
    pub errors: Vec<SpecStageError>,
}

impl ReportStage {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_requested".to_string(), self.cnt_requested);
        dict_counts.insert("cnt_written".to_string(), self.cnt_written);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_bytes".to_string(), self.cnt_bytes);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} requested={} written={} skipped={} bytes={} errors={} warnings={}",
            dict_counts["cnt_requested"],
            dict_counts["cnt_written"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_bytes"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[STAGE]"))
    }
}

/// Mutable accumulator for stage statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportStageBuilder {
    pub cnt_requested: u64,
    pub cnt_written: u64,
    pub cnt_skipped: u64,
    pub cnt_bytes: u64,
    pub files_written: Vec<String>,
    pub errors: Vec<SpecStageError>,
    pub warnings: Vec<String>,
}

impl ReportStageBuilder {
    pub fn add_requested(&mut self, value: u64) {
        self.cnt_requested += value;
    }

    /// Record one written file and its size.
    pub fn add_written(&mut self, file_name: String, n_bytes: u64) {
        self.cnt_written += 1;
        self.cnt_bytes += n_bytes;
        self.files_written.push(file_name);
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        self.errors.push(SpecStageError { path, exception });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportStage {
        ReportStage {
            cnt_requested: self.cnt_requested,
            cnt_written: self.cnt_written,
            cnt_skipped: self.cnt_skipped,
            cnt_bytes: self.cnt_bytes,
            files_written: self.files_written,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_stage_to_dict_and_format() {
        let mut builder = ReportStageBuilder::default();
        builder.add_requested(3);
        builder.add_written("a.xlsx".to_string(), 10);
        builder.add_written("b.xlsx".to_string(), 5);
        builder.add_skipped();
        builder.add_warning("w".to_string());
        let report = builder.build();

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_requested"], 3);
        assert_eq!(dict_counts["cnt_written"], 2);
        assert_eq!(dict_counts["cnt_bytes"], 15);
        assert_eq!(dict_counts["cnt_errors"], 0);
        assert_eq!(report.files_written, vec!["a.xlsx", "b.xlsx"]);

        let txt = report.format("[STAGE]");
        assert_eq!(
            txt,
            "[STAGE] requested=3 written=2 skipped=1 bytes=15 errors=0 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }
}
