//! Entry points: key split, per-sheet voucher split and roster check.
//!
//! Each call decodes its input, runs the engine, serializes every output,
//! stages the files plus one ZIP under a fresh job handle and returns a
//! [`ReportSplit`]. Nothing is staged when the run fails before emission.

use std::collections::BTreeSet;

use sheetsplit_io_fs::{JobStore, JobWorkspace, ReportStage, SpecStageOptions};
use sheetsplit_io_xlsx::{load_table, load_workbook, serialize_table};

use crate::contacts::SpecContactBook;
use crate::naming::{
    SpecFileNameRegistry, derive_date_stamp, derive_output_name, derive_partition_name,
};
use crate::notify::{
    LinkNotifier, Notifier, derive_whatsapp_link, derive_whatsapp_message, plan_email_drafts,
};
use crate::pipeline::SplitRun;
use crate::projection::build_index_map;
use crate::reconcile::{ReportRoleCheck, compare_roles};
use crate::report::{ReportSplit, ReportSplitBuilder, SpecPartitionOutcome, SpecSheetOutcome};
use crate::spec::{
    ReconcileError, SpecRoleCheckOptions, SpecSplitOptions, SpecVoucherOptions, SplitError,
};
use crate::voucher::{derive_voucher_archive_name_now, plan_voucher_sheets};

/// Optional contact books consulted per partition.
#[derive(Debug, Clone, Default)]
pub struct SpecSplitContacts {
    pub whatsapp: Option<SpecContactBook>,
    pub email: Option<SpecContactBook>,
}

////////////////////////////////////////////////////////////////////////////////
// #region KeySplit

/// Split the active sheet of `v_bytes` by key and stage one workbook per key.
pub fn split_by_key(
    v_bytes: &[u8],
    contacts: &SpecSplitContacts,
    store: &JobStore,
    spec_options: &SpecSplitOptions,
) -> Result<ReportSplit, SplitError> {
    spec_options.validate()?;

    let workbook = load_workbook(v_bytes)?;
    let l_decode_warnings = workbook.warnings.clone();
    let table = workbook.into_active_table().ok_or(SplitError::NoSheets)?;
    log::info!(
        "Decoded sheet {:?}: rows={} cols={} cells={}",
        table.sheet_name(),
        table.max_row(),
        table.max_column(),
        table.cnt_cells()
    );

    let date_stamp = derive_date_stamp(
        &table,
        &spec_options.date_cell_ref,
        spec_options.rule_date_fallback,
    );

    let mut l_warnings = l_decode_warnings;
    let l_cols_beyond: Vec<usize> = spec_options
        .cols_delete
        .iter()
        .copied()
        .filter(|col| *col > table.max_column())
        .collect();
    if !l_cols_beyond.is_empty() {
        l_warnings.push(format!(
            "Columns {l_cols_beyond:?} to delete lie beyond the last column {}.",
            table.max_column()
        ));
    }
    let n_col_extent = table
        .max_column()
        .max(spec_options.key_column_index)
        .max(l_cols_beyond.last().copied().unwrap_or(0));
    let index_map = build_index_map(&spec_options.cols_delete, n_col_extent)?;

    let mut run = SplitRun::new(
        &table,
        &index_map,
        &spec_options.policy_autofit,
        spec_options.key_column_index,
        spec_options.key_column_label.as_str(),
    );
    let l_emitted = run.run_to_end()?;
    let (cnt_rows_data, cnt_rows_excluded) = run
        .partitions()
        .map(|spec_set| (spec_set.cnt_rows_data, spec_set.cnt_rows_excluded))
        .unwrap_or_default();
    log::info!(
        "Built {} partitions from {cnt_rows_data} data rows ({cnt_rows_excluded} without key)",
        l_emitted.len()
    );

    let job = store.create_job()?;
    let mut builder = ReportSplitBuilder::new(job.handle().to_string());
    builder.set_date_stamp(date_stamp.as_str());
    builder.add_rows(cnt_rows_data, cnt_rows_excluded);
    builder.extend_warnings(l_warnings);

    let notifier = LinkNotifier;
    let mut registry = SpecFileNameRegistry::new();
    let mut l_files: Vec<(String, Vec<u8>)> = Vec::with_capacity(l_emitted.len());
    for emitted in l_emitted {
        let name_clean = derive_partition_name(&emitted.key);
        let contact_whatsapp = contacts
            .whatsapp
            .as_ref()
            .and_then(|book| book.lookup(&emitted.key))
            .map(str::to_string);
        let contact_email = contacts
            .email
            .as_ref()
            .and_then(|book| book.lookup(&emitted.key))
            .map(str::to_string);
        let mut outcome = SpecPartitionOutcome {
            key: emitted.key.clone(),
            name_clean,
            cnt_rows: emitted.cnt_rows,
            contact_whatsapp,
            contact_email,
            ..Default::default()
        };

        match serialize_table(&emitted.table, &spec_options.opts_write) {
            Ok((v_file, report_xlsx)) => {
                let file_name = registry.claim(&derive_output_name(&emitted.key, &date_stamp));
                builder.extend_warnings(
                    report_xlsx
                        .warnings
                        .into_iter()
                        .map(|c_warning| format!("{file_name}: {c_warning}")),
                );
                let message = derive_whatsapp_message(&outcome.name_clean, &file_name);
                let res_link = match &outcome.contact_whatsapp {
                    Some(c_target) => notifier.notify(c_target, &message),
                    None => derive_whatsapp_link(&message),
                };
                match res_link {
                    Ok(c_link) => outcome.whatsapp_link = Some(c_link),
                    Err(e) => builder.add_warning(format!("{file_name}: {e}")),
                }
                log::debug!(
                    "Partition {:?}: rows={} file={file_name} bytes={}",
                    emitted.key,
                    emitted.cnt_rows,
                    v_file.len()
                );
                outcome.file_name = file_name.clone();
                l_files.push((file_name, v_file));
            }
            Err(e) => {
                log::warn!("Partition {:?} failed to serialize: {e}", emitted.key);
                outcome.error = Some(e.to_string());
            }
        }
        builder.add_partition(outcome);
    }

    let c_archive_name = format!("{}_{date_stamp}.zip", spec_options.archive_prefix);
    stage_outputs(
        &job,
        &l_files,
        &c_archive_name,
        &spec_options.opts_stage,
        &mut builder,
    );

    let report = builder.build();
    log::info!("{} job={}", report.format("[SPLIT]"), report.job_id);
    Ok(report)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region VoucherSplit

/// Stage one workbook per sheet of `v_bytes`, plus email drafts per recipient.
pub fn split_sheets(
    v_bytes: &[u8],
    store: &JobStore,
    spec_options: &SpecVoucherOptions,
) -> Result<ReportSplit, SplitError> {
    spec_options.validate()?;

    let workbook = load_workbook(v_bytes)?;
    log::info!("Decoded workbook with {} sheets", workbook.tables.len());
    let l_sheets = plan_voucher_sheets(&workbook, spec_options)?;

    let job = store.create_job()?;
    let mut builder = ReportSplitBuilder::new(job.handle().to_string());
    builder.extend_warnings(workbook.warnings.iter().cloned());

    let mut l_files: Vec<(String, Vec<u8>)> = Vec::with_capacity(l_sheets.len());
    let mut l_mail_entries = Vec::with_capacity(l_sheets.len());
    for sheet in &l_sheets {
        let mut outcome = SpecSheetOutcome {
            sheet_name: sheet.sheet_name.clone(),
            company_name: sheet.fields.company_name.clone(),
            voucher_number: sheet.fields.voucher_number.clone(),
            email: sheet.fields.email.clone(),
            ..Default::default()
        };
        match serialize_table(&sheet.table, &spec_options.opts_write) {
            Ok((v_file, report_xlsx)) => {
                builder.extend_warnings(
                    report_xlsx
                        .warnings
                        .into_iter()
                        .map(|c_warning| format!("{}: {c_warning}", sheet.file_name)),
                );
                outcome.file_name = sheet.file_name.clone();
                l_mail_entries.push(sheet.to_mail_entry());
                l_files.push((sheet.file_name.clone(), v_file));
            }
            Err(e) => {
                log::warn!("Sheet {:?} failed to serialize: {e}", sheet.sheet_name);
                outcome.error = Some(e.to_string());
            }
        }
        builder.add_sheet(outcome);
    }
    builder.set_email_drafts(plan_email_drafts(&l_mail_entries, &spec_options.opts_email));

    let c_archive_name = derive_voucher_archive_name_now(&spec_options.archive_prefix);
    stage_outputs(
        &job,
        &l_files,
        &c_archive_name,
        &spec_options.opts_stage,
        &mut builder,
    );

    let report = builder.build();
    log::info!("{} job={}", report.format("[SPLIT]"), report.job_id);
    Ok(report)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Shared

/// Write `files` and their archive into `job`, folding stage problems into `builder`.
fn stage_outputs(
    job: &JobWorkspace,
    files: &[(String, Vec<u8>)],
    archive_name: &str,
    spec_stage: &SpecStageOptions,
    builder: &mut ReportSplitBuilder,
) {
    if files.is_empty() {
        builder.add_warning("No output files were produced; archive skipped.");
        return;
    }
    let report_stage = job.commit_files(files, spec_stage);
    fold_stage_report(&report_stage, builder);

    match job.commit_archive(archive_name, files) {
        Ok(c_name) => builder.set_archive(c_name),
        Err(e) => {
            log::warn!("Archive {archive_name} failed for job {}: {e}", job.handle());
            builder.add_error(format!("{archive_name}: {e}"));
        }
    }
}

fn fold_stage_report(report_stage: &ReportStage, builder: &mut ReportSplitBuilder) {
    builder.extend_warnings(report_stage.warnings.iter().cloned());
    let set_written: BTreeSet<&str> = report_stage
        .files_written
        .iter()
        .map(String::as_str)
        .collect();
    for spec_error in &report_stage.errors {
        let c_file = spec_error
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if !set_written.contains(c_file) {
            builder.mark_file_error(c_file, &spec_error.exception);
        }
        builder.add_error(format!(
            "{}: {}",
            spec_error.path.display(),
            spec_error.exception
        ));
    }
}

/// Report for a run that failed before anything was staged.
pub fn derive_fatal_report(error: &SplitError) -> ReportSplit {
    let mut builder = ReportSplitBuilder::default();
    builder.set_fatal(error.to_string());
    builder.build()
}

/// Decode both workbooks (active sheets) and compare roles.
pub fn check_roles(
    v_roster: &[u8],
    v_results: &[u8],
    spec_options: &SpecRoleCheckOptions,
) -> Result<ReportRoleCheck, ReconcileError> {
    let roster = load_table(v_roster)?;
    let results = load_table(v_results)?;
    compare_roles(&roster, &results, spec_options)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Cursor, Write};

    use chrono::NaiveDate;
    use rust_xlsxwriter::{Format, Workbook};
    use sheetsplit_io_fs::JobHandle;
    use sheetsplit_io_xlsx::{SpecMergedRegion, load_workbook_from_path};
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use crate::spec::EnumDateFallback;

    /// 22-column IM export: titles, a date in G3, header at row 5 (Supplier in D).
    fn build_im_workbook(l_suppliers: &[&str]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("IM Report").unwrap();
        let fmt_bold = Format::new().set_bold();
        worksheet
            .merge_range(0, 0, 0, 5, "INCOMING MATERIAL", &fmt_bold)
            .unwrap();
        worksheet.write_string(2, 6, "2025-10-24 18:13:33").unwrap();
        for n_idx_col in 0..22u16 {
            let c_label = if n_idx_col == 3 {
                "Supplier".to_string()
            } else {
                format!("H{}", n_idx_col + 1)
            };
            worksheet
                .write_string_with_format(4, n_idx_col, &c_label, &fmt_bold)
                .unwrap();
        }
        for (n_idx, c_supplier) in l_suppliers.iter().enumerate() {
            let n_row = 5 + n_idx as u32;
            worksheet.write_number(n_row, 0, (n_idx + 1) as f64).unwrap();
            if !c_supplier.is_empty() {
                worksheet.write_string(n_row, 3, *c_supplier).unwrap();
            }
            worksheet
                .write_string(n_row, 21, format!("item-{n_idx}"))
                .unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    fn options_fixed_date() -> SpecSplitOptions {
        SpecSplitOptions {
            rule_date_fallback: EnumDateFallback::Fixed(
                NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            ),
            ..Default::default()
        }
    }

    fn read_zip_names(path: &std::path::Path) -> Vec<String> {
        let file = std::fs::File::open(path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        (0..zip.len())
            .map(|n_idx| zip.by_index(n_idx).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_split_by_key_stages_files_and_archive() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::open(dir.path()).unwrap();
        let v_bytes = build_im_workbook(&[
            "0000000008 - PT. INDOCORE PERKASA",
            "ACME",
            "",
            "0000000008 - PT. INDOCORE PERKASA",
        ]);

        let mut book_wa = SpecContactBook::new();
        book_wa.insert("PT. INDOCORE PERKASA", "Grup Indocore");
        let contacts = SpecSplitContacts {
            whatsapp: Some(book_wa),
            email: None,
        };

        let report = split_by_key(&v_bytes, &contacts, &store, &options_fixed_date()).unwrap();
        assert_eq!(report.date_stamp, "20251024");
        assert_eq!(report.cnt_partitions, 2);
        assert_eq!(report.cnt_rows_data, 4);
        assert_eq!(report.cnt_rows_excluded, 1);
        assert!(report.errors.is_empty());
        assert!(report.fatal.is_none());
        assert_eq!(report.archive_file_name, "IM_Split_20251024.zip");

        let outcome = &report.partitions[0];
        assert_eq!(outcome.name_clean, "PT. INDOCORE PERKASA");
        assert_eq!(outcome.file_name, "PT_INDOCORE_PERKASA_20251024.xlsx");
        assert_eq!(outcome.cnt_rows, 2);
        assert_eq!(outcome.contact_whatsapp.as_deref(), Some("Grup Indocore"));
        assert!(
            outcome
                .whatsapp_link
                .as_deref()
                .unwrap()
                .starts_with("https://web.whatsapp.com/send?text=")
        );
        assert_eq!(report.partitions[1].contact_whatsapp, None);
        assert!(report.partitions[1].whatsapp_link.is_some());

        let handle = JobHandle::parse(&report.job_id).unwrap();
        let path_file = store.resolve_file(handle, &outcome.file_name).unwrap();
        let workbook = load_workbook_from_path(&path_file).unwrap();
        let table = &workbook.tables[0];
        assert_eq!(table.sheet_name(), "IM Report");
        // 22 columns minus 11 deleted; Supplier moves from D to B.
        assert_eq!(table.max_column(), 11);
        assert_eq!(table.cell_at(5, 2).value.to_text(), "Supplier");
        assert_eq!(table.cell_at(6, 2).value.to_text(), "0000000008 - PT. INDOCORE PERKASA");
        assert_eq!(table.cell_at(7, 11).value.to_text(), "item-3");
        assert_eq!(table.max_row(), 7);
        // A1:F1 loses B, C and E.
        assert!(table.merged_regions().contains(&SpecMergedRegion::new(1, 1, 1, 3)));

        let path_zip = store
            .resolve_file(handle, &report.archive_file_name)
            .unwrap();
        assert_eq!(
            read_zip_names(&path_zip),
            vec!["PT_INDOCORE_PERKASA_20251024.xlsx", "ACME_20251024.xlsx"]
        );
    }

    /// Hand-built package: Supplier header in D1, one row per key, and an
    /// oversized text cell in column V for `key_oversized`.
    fn build_raw_workbook(l_keys: &[&str], key_oversized: &str) -> Vec<u8> {
        let mut c_rows = String::from(
            r#"<row r="1"><c r="D1" t="inlineStr"><is><t>Supplier</t></is></c></row>"#,
        );
        for (n_idx, c_key) in l_keys.iter().enumerate() {
            let n_row = n_idx + 2;
            let c_text = if *c_key == key_oversized {
                "x".repeat(40_000)
            } else {
                format!("item-{n_idx}")
            };
            c_rows.push_str(&format!(
                r#"<row r="{n_row}"><c r="D{n_row}" t="inlineStr"><is><t>{c_key}</t></is></c><c r="V{n_row}" t="inlineStr"><is><t>{c_text}</t></is></c></row>"#
            ));
        }
        let c_sheet = format!(
            r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{c_rows}</sheetData></worksheet>"#
        );
        let c_workbook = r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="IM Report" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let c_rels = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (c_name, c_body) in [
            ("xl/workbook.xml", c_workbook),
            ("xl/_rels/workbook.xml.rels", c_rels),
            ("xl/worksheets/sheet1.xml", c_sheet.as_str()),
        ] {
            zip.start_file(c_name, SimpleFileOptions::default()).unwrap();
            zip.write_all(c_body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_split_by_key_isolates_partition_serialize_failure() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::open(dir.path()).unwrap();
        let v_bytes = build_raw_workbook(&["ALPHA", "BETA", "ALPHA"], "BETA");

        let report = split_by_key(
            &v_bytes,
            &SpecSplitContacts::default(),
            &store,
            &options_fixed_date(),
        )
        .unwrap();
        assert_eq!(report.cnt_partitions, 2);
        assert!(report.fatal.is_none());

        let outcome_ok = &report.partitions[0];
        assert_eq!(outcome_ok.key, "ALPHA");
        assert_eq!(outcome_ok.cnt_rows, 2);
        assert_eq!(outcome_ok.file_name, "ALPHA_20200102.xlsx");
        assert!(outcome_ok.error.is_none());

        let outcome_failed = &report.partitions[1];
        assert_eq!(outcome_failed.key, "BETA");
        assert!(outcome_failed.error.is_some());
        assert!(outcome_failed.file_name.is_empty());
        assert!(outcome_failed.whatsapp_link.is_none());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("BETA: "));
        assert_eq!(report.file_names(), vec!["ALPHA_20200102.xlsx"]);

        let handle = JobHandle::parse(&report.job_id).unwrap();
        let path_file = store.resolve_file(handle, "ALPHA_20200102.xlsx").unwrap();
        let table = load_workbook_from_path(&path_file).unwrap().tables.remove(0);
        assert_eq!(table.max_row(), 3);
        assert_eq!(table.cell_at(3, 11).value.to_text(), "item-2");

        assert_eq!(report.archive_file_name, "IM_Split_20200102.zip");
        let path_zip = store
            .resolve_file(handle, &report.archive_file_name)
            .unwrap();
        assert_eq!(read_zip_names(&path_zip), vec!["ALPHA_20200102.xlsx"]);
    }

    #[test]
    fn test_split_by_key_header_missing_stages_nothing() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::open(dir.path()).unwrap();
        let v_bytes = build_im_workbook(&["ACME"]);
        let spec_options = SpecSplitOptions {
            key_column_label: "Vendor".to_string(),
            ..options_fixed_date()
        };

        let error = split_by_key(&v_bytes, &SpecSplitContacts::default(), &store, &spec_options)
            .unwrap_err();
        assert!(matches!(error, SplitError::HeaderNotFound { col: 4, .. }));
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 0);

        let report = derive_fatal_report(&error);
        assert_eq!(
            report.fatal.as_deref(),
            Some("Could not find 'Vendor' header row in column 4")
        );
        assert_eq!(report.cnt_partitions, 0);
    }

    #[test]
    fn test_split_by_key_rejects_garbage_bytes() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::open(dir.path()).unwrap();
        let error = split_by_key(
            b"not a workbook",
            &SpecSplitContacts::default(),
            &store,
            &options_fixed_date(),
        )
        .unwrap_err();
        assert!(matches!(error, SplitError::Decode(_)));
    }

    #[test]
    fn test_split_sheets_stages_one_file_per_sheet() {
        let mut workbook = Workbook::new();
        for (c_sheet, c_company, c_voucher, c_email) in [
            ("S1", "PT. MAJU", "PV/001/2024", "maju@x.com"),
            ("S2", "PT. MAJU", "PV/002/2024", "maju@x.com"),
            ("S3", "", "", ""),
        ] {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(c_sheet).unwrap();
            worksheet.write_string(0, 0, "PAYMENT VOUCHER").unwrap();
            if !c_company.is_empty() {
                worksheet.write_string(8, 3, c_company).unwrap();
                worksheet.write_string(8, 17, c_voucher).unwrap();
                worksheet.write_string(11, 3, c_email).unwrap();
            }
        }
        let v_bytes = workbook.save_to_buffer().unwrap();

        let dir = TempDir::new().unwrap();
        let store = JobStore::open(dir.path()).unwrap();
        let report = split_sheets(&v_bytes, &store, &SpecVoucherOptions::default()).unwrap();

        let l_names: Vec<&str> = report.sheets.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(
            l_names,
            vec![
                "PT MAJU PV-001-2024.xlsx",
                "PT MAJU PV-002-2024.xlsx",
                "Sheet_S3 NO_PV.xlsx"
            ]
        );
        assert!(report.archive_file_name.starts_with("pv_split_"));
        assert!(report.archive_file_name.ends_with(".zip"));

        assert_eq!(report.email_drafts.len(), 1);
        let draft = &report.email_drafts[0];
        assert_eq!(draft.to, "maju@x.com");
        assert_eq!(draft.subject, "PV Documents - PV/001/2024, PV/002/2024");
        assert_eq!(draft.files.len(), 2);

        let handle = JobHandle::parse(&report.job_id).unwrap();
        let path_file = store.resolve_file(handle, "Sheet_S3 NO_PV.xlsx").unwrap();
        let workbook_out = load_workbook_from_path(path_file).unwrap();
        assert_eq!(workbook_out.tables.len(), 1);
        assert_eq!(workbook_out.tables[0].sheet_name(), "S3");
    }

    #[test]
    fn test_check_roles_from_bytes() {
        let mut workbook_roster = Workbook::new();
        let worksheet = workbook_roster.add_worksheet();
        worksheet.write_string(0, 2, "Nama").unwrap();
        worksheet.write_string(0, 3, "Employee ID").unwrap();
        worksheet.write_string(0, 6, "Role").unwrap();
        worksheet.write_string(1, 2, "Ana").unwrap();
        worksheet.write_string(1, 3, "E1").unwrap();
        worksheet.write_string(1, 6, "Cashier").unwrap();
        let v_roster = workbook_roster.save_to_buffer().unwrap();

        let mut workbook_results = Workbook::new();
        let worksheet = workbook_results.add_worksheet();
        worksheet.write_string(0, 0, "Employee Name").unwrap();
        worksheet.write_string(0, 1, "Role").unwrap();
        worksheet.write_string(1, 0, "Ana").unwrap();
        worksheet.write_string(1, 1, "Cook").unwrap();
        let v_results = workbook_results.save_to_buffer().unwrap();

        let report = check_roles(&v_roster, &v_results, &SpecRoleCheckOptions::default()).unwrap();
        assert_eq!(report.header_row, 1);
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].role_expected, "Cashier");
        // Outlet column absent from the results sheet.
        assert_eq!(report.warnings.len(), 1);
    }
}
