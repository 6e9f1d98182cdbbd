//! XLSX constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecCellFormat};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Day offset between the 1904 and the 1900 date systems.
pub const N_DAYS_DATE1904_OFFSET: f64 = 1462.0;

/// Padding added to the longest observed content when autosizing columns.
pub const N_WIDTH_CELL_PADDING_DEFAULT: usize = 2;
/// Upper bound for autosized column widths.
pub const N_WIDTH_CELL_MAX_DEFAULT: usize = 50;

/// Built-in number format ids that Excel renders as dates or times.
pub const TUP_BUILTIN_DATE_FORMAT_IDS: [u32; 12] = [14, 15, 16, 17, 18, 19, 20, 21, 22, 45, 46, 47];

/// Number format given to date cells whose own style carries none.
pub const C_NUM_FORMAT_DATETIME_DEFAULT: &str = "yyyy-mm-dd hh:mm:ss";

/// Legacy indexed palette (`indexed="0".."63"`) as `RRGGBB`.
pub const TUP_INDEXED_COLORS: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, //
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, //
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, //
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, //
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, //
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333, //
];
/// Indexed slot meaning "system foreground".
pub const N_INDEXED_COLOR_SYSTEM_FG: u32 = 64;

/// Format code for a built-in number format id (`None` for General/unknown).
pub fn derive_builtin_num_format(num_fmt_id: u32) -> Option<&'static str> {
    let c_code = match num_fmt_id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(c_code)
}

/// Build default named format presets used by [`crate::writer::XlsxFrameWriter`].
pub fn derive_default_xlsx_formats() -> BTreeMap<String, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        border: Some(1),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert("text".to_string(), cfg_base_fmt_spec.clone());
    dict_fmt.insert(
        "header".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            bg_color: Some("#D9E1F2".to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}

/// Autofit policy used for split outputs: every cell counts, `len + 2`, capped at 50.
pub fn derive_default_autofit_policy() -> SpecAutofitCellsPolicy {
    SpecAutofitCellsPolicy {
        rule_columns: EnumAutofitColumnsRule::All,
        height_body_inferred_max: None,
        width_cell_min: 1,
        width_cell_max: N_WIDTH_CELL_MAX_DEFAULT,
        width_cell_padding: N_WIDTH_CELL_PADDING_DEFAULT,
    }
}
