//! Roster reconciliation: compare reported roles against the employee roster.
//!
//! Both sheets are lifted into polars `DataFrame`s with string columns; the
//! comparison walks the results frame and looks names up in the roster frame.

use std::collections::HashMap;
use std::fmt;

use polars::prelude::{Column, DataFrame};
use serde::{Deserialize, Serialize};
use sheetsplit_io_xlsx::{SpecAutofitCellsPolicy, Table, XlsxFrameWriter};

use crate::conf::{TUP_ROSTER_ID_MARKERS, TUP_ROSTER_NAME_MARKERS};
use crate::spec::{ReconcileError, SpecRoleCheckOptions};

const C_COL_ROW: &str = "row";
const C_COL_NAME: &str = "name";
const C_COL_ID: &str = "employee_id";
const C_COL_ROLE: &str = "role";
const C_COL_OUTLET: &str = "outlet";

////////////////////////////////////////////////////////////////////////////////
// #region ReportModels

/// One results row whose role differs from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRoleMismatch {
    /// Results sheet row (1-based).
    pub row: usize,
    pub name: String,
    /// Role on the roster.
    pub role_expected: String,
    /// Role in the results sheet.
    pub role_got: String,
    /// First roster employee holding the reported role.
    pub role_owner: Option<String>,
    pub outlet_expected: String,
    pub outlet_got: String,
}

/// Outcome of one role comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRoleCheck {
    /// Roster header row used (1-based).
    pub header_row: usize,
    pub cnt_roster: usize,
    pub cnt_results: usize,
    pub cnt_matched: usize,
    /// Results rows whose name is not on the roster.
    pub cnt_unmatched: usize,
    pub mismatches: Vec<SpecRoleMismatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ReportRoleCheck {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} roster={} results={} matched={} unmatched={} mismatches={} warnings={}",
            self.cnt_roster,
            self.cnt_results,
            self.cnt_matched,
            self.cnt_unmatched,
            self.mismatches.len(),
            self.warnings.len()
        )
    }

    /// Mismatches as a frame, one row per mismatch.
    pub fn to_frame(&self) -> Result<DataFrame, ReconcileError> {
        let mut l_rows = Vec::with_capacity(self.mismatches.len());
        let mut l_names = Vec::with_capacity(self.mismatches.len());
        let mut l_roles_expected = Vec::with_capacity(self.mismatches.len());
        let mut l_roles_got = Vec::with_capacity(self.mismatches.len());
        let mut l_owners = Vec::with_capacity(self.mismatches.len());
        let mut l_outlets_expected = Vec::with_capacity(self.mismatches.len());
        let mut l_outlets_got = Vec::with_capacity(self.mismatches.len());
        for mismatch in &self.mismatches {
            l_rows.push(mismatch.row as u32);
            l_names.push(mismatch.name.clone());
            l_roles_expected.push(mismatch.role_expected.clone());
            l_roles_got.push(mismatch.role_got.clone());
            l_owners.push(mismatch.role_owner.clone());
            l_outlets_expected.push(mismatch.outlet_expected.clone());
            l_outlets_got.push(mismatch.outlet_got.clone());
        }
        Ok(DataFrame::new(vec![
            Column::new("Row".into(), l_rows),
            Column::new("Employee Name".into(), l_names),
            Column::new("Roster Role".into(), l_roles_expected),
            Column::new("Reported Role".into(), l_roles_got),
            Column::new("Reported Role Owner".into(), l_owners),
            Column::new("Roster Outlet".into(), l_outlets_expected),
            Column::new("Reported Outlet".into(), l_outlets_got),
        ])?)
    }
}

impl fmt::Display for ReportRoleCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[ROLES]"))
    }
}

/// Layout findings over the top of a roster sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRosterLayout {
    /// Rows that look like a header.
    pub header_rows: Vec<usize>,
    /// Rows with empty name, id and role cells.
    pub blank_rows: Vec<usize>,
    /// Merged ranges starting within the inspected rows, A1 notation.
    pub merged_ranges: Vec<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RosterFrames

fn read_text(table: &Table, row: usize, col: usize) -> String {
    table.cell_at(row, col).value.to_text().trim().to_string()
}

fn is_roster_header_row(table: &Table, row: usize, spec_options: &SpecRoleCheckOptions) -> bool {
    let c_name = read_text(table, row, spec_options.col_name).to_lowercase();
    let c_id = read_text(table, row, spec_options.col_id).to_lowercase();
    TUP_ROSTER_NAME_MARKERS
        .iter()
        .any(|marker| c_name.contains(marker))
        || TUP_ROSTER_ID_MARKERS.iter().any(|marker| c_id.contains(marker))
}

/// First header-like row within the scan window, or `None`.
pub fn locate_roster_header(table: &Table, spec_options: &SpecRoleCheckOptions) -> Option<usize> {
    let n_row_last = spec_options.n_header_scan_rows.min(table.max_row());
    (1..=n_row_last).find(|row| is_roster_header_row(table, *row, spec_options))
}

/// Roster rows below `header_row` with a non-empty name.
pub fn build_roster_frame(
    table: &Table,
    header_row: usize,
    spec_options: &SpecRoleCheckOptions,
) -> Result<DataFrame, ReconcileError> {
    let mut l_names = Vec::new();
    let mut l_ids = Vec::new();
    let mut l_roles = Vec::new();
    let mut l_outlets = Vec::new();
    for (n_row, _) in table.iter_rows().filter(|(n_row, _)| *n_row > header_row) {
        let c_name = read_text(table, n_row, spec_options.col_name);
        if c_name.is_empty() {
            continue;
        }
        l_names.push(c_name);
        l_ids.push(read_text(table, n_row, spec_options.col_id));
        l_roles.push(read_text(table, n_row, spec_options.col_role));
        l_outlets.push(read_text(table, n_row, spec_options.col_outlet));
    }
    Ok(DataFrame::new(vec![
        Column::new(C_COL_NAME.into(), l_names),
        Column::new(C_COL_ID.into(), l_ids),
        Column::new(C_COL_ROLE.into(), l_roles),
        Column::new(C_COL_OUTLET.into(), l_outlets),
    ])?)
}

fn locate_results_column(table: &Table, label: &str) -> Option<usize> {
    (1..=table.max_column()).find(|col| read_text(table, 1, *col) == label.trim())
}

/// Results rows below the label row with a non-empty name.
///
/// Name and role columns are required; a missing outlet column reads as empty.
pub fn build_results_frame(
    table: &Table,
    spec_options: &SpecRoleCheckOptions,
) -> Result<(DataFrame, Vec<String>), ReconcileError> {
    let col_name = locate_results_column(table, &spec_options.label_name)
        .ok_or_else(|| ReconcileError::MissingColumn(spec_options.label_name.clone()))?;
    let col_role = locate_results_column(table, &spec_options.label_role)
        .ok_or_else(|| ReconcileError::MissingColumn(spec_options.label_role.clone()))?;
    let col_outlet = locate_results_column(table, &spec_options.label_outlet);

    let mut l_warnings = Vec::new();
    if col_outlet.is_none() {
        l_warnings.push(format!(
            "Results sheet has no '{}' column; outlets left empty.",
            spec_options.label_outlet
        ));
    }

    let mut l_rows = Vec::new();
    let mut l_names = Vec::new();
    let mut l_roles = Vec::new();
    let mut l_outlets = Vec::new();
    for (n_row, _) in table.iter_rows().filter(|(n_row, _)| *n_row > 1) {
        let c_name = read_text(table, n_row, col_name);
        if c_name.is_empty() {
            continue;
        }
        l_rows.push(n_row as u32);
        l_names.push(c_name);
        l_roles.push(read_text(table, n_row, col_role));
        l_outlets.push(
            col_outlet
                .map(|col| read_text(table, n_row, col))
                .unwrap_or_default(),
        );
    }
    let df = DataFrame::new(vec![
        Column::new(C_COL_ROW.into(), l_rows),
        Column::new(C_COL_NAME.into(), l_names),
        Column::new(C_COL_ROLE.into(), l_roles),
        Column::new(C_COL_OUTLET.into(), l_outlets),
    ])?;
    Ok((df, l_warnings))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Compare

/// Match each results row to the roster by trimmed name and report role differences.
pub fn compare_roles(
    roster: &Table,
    results: &Table,
    spec_options: &SpecRoleCheckOptions,
) -> Result<ReportRoleCheck, ReconcileError> {
    let mut l_warnings = Vec::new();
    let header_row = match locate_roster_header(roster, spec_options) {
        Some(n_row) => n_row,
        None => {
            let c_warning = format!(
                "No roster header found in the first {} rows; assuming row 1.",
                spec_options.n_header_scan_rows
            );
            log::warn!("{c_warning}");
            l_warnings.push(c_warning);
            1
        }
    };

    let df_roster = build_roster_frame(roster, header_row, spec_options)?;
    if df_roster.height() == 0 {
        return Err(ReconcileError::EmptyRoster);
    }
    let (df_results, l_results_warnings) = build_results_frame(results, spec_options)?;
    l_warnings.extend(l_results_warnings);

    let ca_roster_names = df_roster.column(C_COL_NAME)?.str()?;
    let ca_roster_roles = df_roster.column(C_COL_ROLE)?.str()?;
    let ca_roster_outlets = df_roster.column(C_COL_OUTLET)?.str()?;

    let mut dict_idx_by_name: HashMap<&str, usize> = HashMap::new();
    let mut dict_owner_by_role: HashMap<&str, &str> = HashMap::new();
    for n_idx in 0..df_roster.height() {
        let c_name = ca_roster_names.get(n_idx).unwrap_or_default();
        dict_idx_by_name.entry(c_name).or_insert(n_idx);
        let c_role = ca_roster_roles.get(n_idx).unwrap_or_default();
        if !c_role.is_empty() {
            dict_owner_by_role.entry(c_role).or_insert(c_name);
        }
    }

    let ca_rows = df_results.column(C_COL_ROW)?.u32()?;
    let ca_names = df_results.column(C_COL_NAME)?.str()?;
    let ca_roles = df_results.column(C_COL_ROLE)?.str()?;
    let ca_outlets = df_results.column(C_COL_OUTLET)?.str()?;

    let mut report = ReportRoleCheck {
        header_row,
        cnt_roster: df_roster.height(),
        cnt_results: df_results.height(),
        ..Default::default()
    };
    for n_idx in 0..df_results.height() {
        let c_name = ca_names.get(n_idx).unwrap_or_default();
        let Some(&n_idx_roster) = dict_idx_by_name.get(c_name) else {
            log::debug!("Results name {c_name:?} is not on the roster");
            report.cnt_unmatched += 1;
            continue;
        };
        report.cnt_matched += 1;

        let c_role_got = ca_roles.get(n_idx).unwrap_or_default();
        let c_role_expected = ca_roster_roles.get(n_idx_roster).unwrap_or_default();
        if c_role_got == c_role_expected {
            continue;
        }
        report.mismatches.push(SpecRoleMismatch {
            row: ca_rows.get(n_idx).unwrap_or_default() as usize,
            name: c_name.to_string(),
            role_expected: c_role_expected.to_string(),
            role_got: c_role_got.to_string(),
            role_owner: dict_owner_by_role
                .get(c_role_got)
                .map(|c_owner| c_owner.to_string()),
            outlet_expected: ca_roster_outlets
                .get(n_idx_roster)
                .unwrap_or_default()
                .to_string(),
            outlet_got: ca_outlets.get(n_idx).unwrap_or_default().to_string(),
        });
    }
    report.warnings = l_warnings;

    log::info!("{}", report.format("[ROLES]"));
    Ok(report)
}

/// Header-like rows, blank rows and merged ranges within the first `n_rows_max` rows.
pub fn inspect_roster_layout(
    table: &Table,
    n_rows_max: usize,
    spec_options: &SpecRoleCheckOptions,
) -> SpecRosterLayout {
    let n_row_last = n_rows_max.min(table.max_row());
    let mut layout = SpecRosterLayout::default();
    for n_row in 1..=n_row_last {
        if is_roster_header_row(table, n_row, spec_options) {
            layout.header_rows.push(n_row);
        }
        let if_blank = [
            spec_options.col_name,
            spec_options.col_id,
            spec_options.col_role,
        ]
        .iter()
        .all(|col| table.cell_at(n_row, *col).value.is_blank());
        if if_blank {
            layout.blank_rows.push(n_row);
        }
    }
    layout.merged_ranges = table
        .merged_regions()
        .iter()
        .filter(|region| region.row_start <= n_rows_max)
        .map(|region| region.to_a1_range())
        .collect();
    layout
}

/// Write the mismatch list as a one-sheet `.xlsx` report.
pub fn write_mismatch_report(report: &ReportRoleCheck) -> Result<Vec<u8>, ReconcileError> {
    let df = report.to_frame()?;
    let mut writer = XlsxFrameWriter::default();
    writer.write_sheet(&df, "Role Mismatches", &SpecAutofitCellsPolicy::default())?;
    Ok(writer.into_bytes()?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsplit_io_xlsx::{EnumCellValue, SpecCell, SpecMergedRegion, TableBuilder, load_table};

    fn text(val: &str) -> SpecCell {
        SpecCell::new(EnumCellValue::String(val.to_string()))
    }

    /// Title rows, header at row 3, then employees (name C, id D, role G, outlet AO).
    fn roster_table() -> Table {
        let mut builder = TableBuilder::new("Roster");
        builder
            .set_cell(1, 1, text("EMPLOYEE MASTER"))
            .push_merged_region(SpecMergedRegion::new(1, 1, 1, 7))
            .set_cell(3, 3, text("Nama Karyawan"))
            .set_cell(3, 4, text("Employee ID"))
            .set_cell(3, 7, text("Jabatan"));
        let l_people = [
            ("Ana ", "E1", "Cashier", "Outlet 1"),
            ("Budi", "E2", "Pharmacist", "Outlet 2"),
            ("Citra", "E3", "Store Lead", "Outlet 1"),
            ("Ana", "E9", "Cook", "Outlet 3"),
        ];
        for (n_idx, (c_name, c_id, c_role, c_outlet)) in l_people.iter().enumerate() {
            let n_row = n_idx + 5;
            builder
                .set_cell(n_row, 3, text(c_name))
                .set_cell(n_row, 4, text(c_id))
                .set_cell(n_row, 7, text(c_role))
                .set_cell(n_row, 41, text(c_outlet));
        }
        builder.build()
    }

    fn results_table(l_rows: &[(&str, &str, &str)]) -> Table {
        let mut builder = TableBuilder::new("Results");
        builder
            .set_cell(1, 1, text("Employee Name"))
            .set_cell(1, 2, text("Role"))
            .set_cell(1, 3, text("Outlet"));
        for (n_idx, (c_name, c_role, c_outlet)) in l_rows.iter().enumerate() {
            builder
                .set_cell(n_idx + 2, 1, text(c_name))
                .set_cell(n_idx + 2, 2, text(c_role))
                .set_cell(n_idx + 2, 3, text(c_outlet));
        }
        builder.build()
    }

    #[test]
    fn test_compare_roles_reports_mismatches_with_owner() {
        let results = results_table(&[
            ("Ana", "Cashier", "Outlet 1"),
            (" Budi ", "Store Lead", "Outlet 2"),
            ("Dewi", "Cashier", "Outlet 4"),
            ("Citra", "Manager", "Outlet 1"),
        ]);
        let report =
            compare_roles(&roster_table(), &results, &SpecRoleCheckOptions::default()).unwrap();

        assert_eq!(report.header_row, 3);
        assert_eq!(report.cnt_roster, 4);
        assert_eq!(report.cnt_results, 4);
        assert_eq!(report.cnt_matched, 3);
        assert_eq!(report.cnt_unmatched, 1);
        assert!(report.warnings.is_empty());

        assert_eq!(report.mismatches.len(), 2);
        let mismatch = &report.mismatches[0];
        assert_eq!(mismatch.row, 3);
        assert_eq!(mismatch.name, "Budi");
        assert_eq!(mismatch.role_expected, "Pharmacist");
        assert_eq!(mismatch.role_got, "Store Lead");
        assert_eq!(mismatch.role_owner.as_deref(), Some("Citra"));
        assert_eq!(mismatch.outlet_expected, "Outlet 2");

        assert_eq!(report.mismatches[1].role_owner, None);
        assert_eq!(
            report.to_string(),
            "[ROLES] roster=4 results=4 matched=3 unmatched=1 mismatches=2 warnings=0"
        );
    }

    #[test]
    fn test_compare_roles_falls_back_to_row_one() {
        let mut builder = TableBuilder::new("Roster");
        builder
            .set_cell(2, 3, text("Ana"))
            .set_cell(2, 7, text("Cashier"));
        let roster = builder.build();
        let results = results_table(&[("Ana", "Cook", "")]);

        let report = compare_roles(&roster, &results, &SpecRoleCheckOptions::default()).unwrap();
        assert_eq!(report.header_row, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.mismatches.len(), 1);
    }

    #[test]
    fn test_compare_roles_errors() {
        let results_missing = {
            let mut builder = TableBuilder::new("Results");
            builder.set_cell(1, 1, text("Employee Name"));
            builder.build()
        };
        assert!(matches!(
            compare_roles(&roster_table(), &results_missing, &SpecRoleCheckOptions::default()),
            Err(ReconcileError::MissingColumn(c_label)) if c_label == "Role"
        ));

        let roster_empty = TableBuilder::new("Roster").build();
        assert!(matches!(
            compare_roles(&roster_empty, &results_table(&[]), &SpecRoleCheckOptions::default()),
            Err(ReconcileError::EmptyRoster)
        ));
    }

    #[test]
    fn test_inspect_roster_layout() {
        let layout = inspect_roster_layout(&roster_table(), 100, &SpecRoleCheckOptions::default());
        assert_eq!(layout.header_rows, vec![3]);
        assert_eq!(layout.blank_rows, vec![1, 2, 4]);
        assert_eq!(layout.merged_ranges, vec!["A1:G1"]);
    }

    #[test]
    fn test_write_mismatch_report_round_trips_through_decoder() {
        let results = results_table(&[("Budi", "Cook", "Outlet 2")]);
        let report =
            compare_roles(&roster_table(), &results, &SpecRoleCheckOptions::default()).unwrap();
        let v_bytes = write_mismatch_report(&report).unwrap();

        let table = load_table(&v_bytes).unwrap();
        assert_eq!(table.sheet_name(), "Role Mismatches");
        assert_eq!(table.cell_at(1, 2).value.to_text(), "Employee Name");
        assert_eq!(table.cell_at(2, 2).value.to_text(), "Budi");
        assert_eq!(table.cell_at(2, 4).value.to_text(), "Cook");

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["mismatches"][0]["role_expected"], "Pharmacist");
    }
}
