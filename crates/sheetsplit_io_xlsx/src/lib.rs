//! `sheetsplit_io_xlsx` v1:
//! Workbook model, decoder and serializers.
//!
//! Modules:
//! - `conf`   : constants and default presets
//! - `spec`   : cell values, styles, merges, options, reports
//! - `table`  : immutable worksheet model and its builder
//! - `reader` : `.xlsx` bytes -> tables
//! - `writer` : table -> `.xlsx` bytes, DataFrame report writer
//! - `util`   : pure helper functions
pub mod conf;
pub mod reader;
pub mod spec;
pub mod table;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
    derive_default_autofit_policy,
};
pub use reader::{XlsxDecodeError, load_table, load_workbook, load_workbook_from_path};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumColor, SpecAlignmentStyle, SpecAutofitCellsPolicy,
    SpecBorderSide, SpecBorderStyle, SpecCell, SpecCellFormat, SpecCellStyle, SpecFillStyle,
    SpecFontStyle, SpecMergedRegion, SpecProtectionStyle, SpecXlsxReport, SpecXlsxWriteOptions,
};
pub use table::{SpecRow, SpecWorkbook, Table, TableBuilder};
pub use util::{
    convert_character_width_to_stored_width, convert_col_index_to_letters,
    convert_letters_to_col_index, convert_serial_to_datetime,
    convert_stored_width_to_character_width, derive_contiguous_ranges,
    estimate_unicode_string_width, format_cell_reference, format_column_ranges,
    parse_cell_reference, sanitize_sheet_name,
};
pub use writer::{XlsxFrameWriter, XlsxSerializeError, serialize_table};
