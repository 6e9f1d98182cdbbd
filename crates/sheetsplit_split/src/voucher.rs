//! Per-sheet voucher splitting: one single-sheet workbook per source sheet.

use chrono::{Local, NaiveDateTime};
use sheetsplit_io_xlsx::{SpecWorkbook, Table, parse_cell_reference};

use crate::conf::{C_NAME_UNKNOWN, C_VOUCHER_NUMBER_MISSING};
use crate::naming::{SpecFileNameRegistry, filter_file_name_chars};
use crate::notify::SpecMailEntry;
use crate::projection::{IndexMap, project_table};
use crate::spec::{SpecVoucherOptions, SplitError};

/// Header fields read from one voucher sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecVoucherFields {
    pub company_name: String,
    pub voucher_number: String,
    /// Empty when the sheet carries no address.
    pub email: String,
}

/// One planned voucher output.
#[derive(Debug, Clone)]
pub struct SpecVoucherSheet {
    pub sheet_name: String,
    pub fields: SpecVoucherFields,
    /// Unique within the run.
    pub file_name: String,
    pub table: Table,
}

impl SpecVoucherSheet {
    pub fn to_mail_entry(&self) -> SpecMailEntry {
        SpecMailEntry {
            email: self.fields.email.clone(),
            name: self.fields.company_name.clone(),
            document_id: self.fields.voucher_number.clone(),
            file_name: self.file_name.clone(),
        }
    }
}

fn read_cell_text(table: &Table, cell_ref: &str) -> Result<String, SplitError> {
    let (row, col) = parse_cell_reference(cell_ref).map_err(SplitError::InvalidOptions)?;
    Ok(table.cell_at(row, col).value.to_text().trim().to_string())
}

/// Company, voucher number and email of `table`, with fallbacks applied.
pub fn extract_voucher_fields(
    table: &Table,
    spec_options: &SpecVoucherOptions,
) -> Result<SpecVoucherFields, SplitError> {
    let mut company_name = read_cell_text(table, &spec_options.company_cell_ref)?;
    if company_name.is_empty() {
        company_name = format!("Sheet_{}", table.sheet_name());
    }
    let mut voucher_number = read_cell_text(table, &spec_options.number_cell_ref)?;
    if voucher_number.is_empty() {
        voucher_number = C_VOUCHER_NUMBER_MISSING.to_string();
    }
    let email = read_cell_text(table, &spec_options.email_cell_ref)?;
    Ok(SpecVoucherFields {
        company_name,
        voucher_number,
        email,
    })
}

/// `"<safe company> <safe voucher>.xlsx"`; `/` in the voucher becomes `-`.
pub fn derive_voucher_file_name(company_name: &str, voucher_number: &str) -> String {
    let mut c_company = filter_file_name_chars(company_name, &[]);
    if c_company.is_empty() {
        c_company = C_NAME_UNKNOWN.to_string();
    }
    let mut c_voucher = filter_file_name_chars(&voucher_number.replace('/', "-"), &[]);
    if c_voucher.is_empty() {
        c_voucher = C_VOUCHER_NUMBER_MISSING.to_string();
    }
    format!("{c_company} {c_voucher}.xlsx")
}

/// Plan one output per sheet, in workbook order.
pub fn plan_voucher_sheets(
    workbook: &SpecWorkbook,
    spec_options: &SpecVoucherOptions,
) -> Result<Vec<SpecVoucherSheet>, SplitError> {
    if workbook.tables.is_empty() {
        return Err(SplitError::NoSheets);
    }
    let mut registry = SpecFileNameRegistry::new();
    let mut l_sheets = Vec::with_capacity(workbook.tables.len());
    for table in &workbook.tables {
        let fields = extract_voucher_fields(table, spec_options)?;
        let file_name = registry.claim(&derive_voucher_file_name(
            &fields.company_name,
            &fields.voucher_number,
        ));
        log::debug!(
            "Sheet {:?} -> {file_name:?} (email {:?})",
            table.sheet_name(),
            fields.email
        );
        l_sheets.push(SpecVoucherSheet {
            sheet_name: table.sheet_name().to_string(),
            fields,
            file_name,
            table: project_table(table, &IndexMap::identity(table.max_column())),
        });
    }
    Ok(l_sheets)
}

/// `<prefix>_<yyyymmdd>_<hhmmss>.zip`.
pub fn derive_voucher_archive_name(archive_prefix: &str, dt_now: NaiveDateTime) -> String {
    format!("{archive_prefix}_{}.zip", dt_now.format("%Y%m%d_%H%M%S"))
}

pub fn derive_voucher_archive_name_now(archive_prefix: &str) -> String {
    derive_voucher_archive_name(archive_prefix, Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sheetsplit_io_xlsx::{EnumCellValue, SpecCell, TableBuilder};

    fn text(val: &str) -> SpecCell {
        SpecCell::new(EnumCellValue::String(val.to_string()))
    }

    fn voucher_table(sheet_name: &str, company: &str, number: &str, email: &str) -> Table {
        let mut builder = TableBuilder::new(sheet_name);
        builder
            .set_cell(1, 1, text("PAYMENT VOUCHER"))
            .set_cell(9, 4, text(company))
            .set_cell(9, 18, text(number))
            .set_cell(12, 4, text(email));
        builder.build()
    }

    #[test]
    fn test_extract_fields_with_fallbacks() {
        let spec_options = SpecVoucherOptions::default();
        let fields = extract_voucher_fields(
            &voucher_table("S1", " PT. MAJU ", "PV/001/2024", "a@x.com "),
            &spec_options,
        )
        .unwrap();
        assert_eq!(fields.company_name, "PT. MAJU");
        assert_eq!(fields.voucher_number, "PV/001/2024");
        assert_eq!(fields.email, "a@x.com");

        let fields_empty =
            extract_voucher_fields(&TableBuilder::new("Sheet3").build(), &spec_options).unwrap();
        assert_eq!(fields_empty.company_name, "Sheet_Sheet3");
        assert_eq!(fields_empty.voucher_number, "NO_PV");
        assert_eq!(fields_empty.email, "");
    }

    #[test]
    fn test_voucher_file_name_rules() {
        assert_eq!(
            derive_voucher_file_name("PT. MAJU", "PV/001/2024"),
            "PT MAJU PV-001-2024.xlsx"
        );
        assert_eq!(derive_voucher_file_name("***", "///"), "UNKNOWN ---.xlsx");
        assert_eq!(derive_voucher_file_name("A&B", "#"), "AB NO_PV.xlsx");
    }

    #[test]
    fn test_plan_voucher_sheets_dedups_names() {
        let workbook = SpecWorkbook {
            tables: vec![
                voucher_table("S1", "ACME", "PV-1", "a@x.com"),
                voucher_table("S2", "ACME", "PV-1", "a@x.com"),
                voucher_table("S3", "BETA", "PV-2", ""),
            ],
            n_idx_active: 0,
            warnings: vec![],
        };
        let l_sheets = plan_voucher_sheets(&workbook, &SpecVoucherOptions::default()).unwrap();

        let l_names: Vec<&str> = l_sheets.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(l_names, vec!["ACME PV-1.xlsx", "ACME PV-1_2.xlsx", "BETA PV-2.xlsx"]);
        assert_eq!(l_sheets[1].table, workbook.tables[1]);
        assert_eq!(l_sheets[2].to_mail_entry().email, "");
    }

    #[test]
    fn test_plan_voucher_sheets_rejects_empty_workbook() {
        let workbook = SpecWorkbook {
            tables: vec![],
            n_idx_active: 0,
            warnings: vec![],
        };
        assert!(matches!(
            plan_voucher_sheets(&workbook, &SpecVoucherOptions::default()),
            Err(SplitError::NoSheets)
        ));
    }

    #[test]
    fn test_voucher_archive_name() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        assert_eq!(
            derive_voucher_archive_name("pv_split", dt),
            "pv_split_20240305_070809.zip"
        );
    }
}
