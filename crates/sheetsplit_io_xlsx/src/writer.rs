//! XLSX serializers.
//!
//! [`serialize_table`] writes one [`Table`] as a single-sheet workbook with
//! styles, merges and dimensions. [`XlsxFrameWriter`] writes polars
//! `DataFrame`s as plain report sheets with a styled header row.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use polars::prelude::{AnyValue, DataFrame, PolarsError};
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatPattern, FormatUnderline, Workbook, Worksheet,
    XlsxError,
};
use thiserror::Error;

use crate::conf::{
    C_NUM_FORMAT_DATETIME_DEFAULT, N_INDEXED_COLOR_SYSTEM_FG, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_INDEXED_COLORS,
    derive_default_xlsx_formats,
};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumColor, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecCellStyle, SpecMergedRegion, SpecXlsxReport, SpecXlsxWriteOptions,
};
use crate::table::Table;
use crate::util::{
    convert_stored_width_to_character_width, create_sheet_identifier,
    estimate_unicode_string_width, is_date_format_code, sanitize_sheet_name,
};

/// Errors raised while producing workbook bytes.
#[derive(Debug, Error)]
pub enum XlsxSerializeError {
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{axis} index out of worksheet range: {value}")]
    IndexOverflow { axis: &'static str, value: usize },

    #[error("DataFrame access error: {0}")]
    Frame(#[from] PolarsError),

    #[error("Invalid write options: {0}")]
    InvalidOptions(String),
}

////////////////////////////////////////////////////////////////////////////////
// #region TableSerializer

/// Serialize `table` into `.xlsx` bytes holding exactly one sheet.
pub fn serialize_table(
    table: &Table,
    options: &SpecXlsxWriteOptions,
) -> Result<(Vec<u8>, SpecXlsxReport), XlsxSerializeError> {
    let mut workbook = Workbook::new();
    let mut report = SpecXlsxReport::default();

    let c_sheet_name = sanitize_sheet_name(table.sheet_name(), &options.sheet_name_replace_to);
    if c_sheet_name != table.sheet_name() {
        report.warn(format!(
            "Sheet name {:?} sanitized to {c_sheet_name:?}.",
            table.sheet_name()
        ));
    }

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&c_sheet_name)?;
    write_table(worksheet, table, options, &mut report)?;
    report.sheets.push(c_sheet_name);

    let v_bytes = workbook.save_to_buffer()?;
    log::debug!(
        "Serialized sheet {:?}: cells={} merges={} bytes={}",
        table.sheet_name(),
        report.cnt_cells,
        report.cnt_merges,
        v_bytes.len()
    );
    Ok((v_bytes, report))
}

fn write_table(
    worksheet: &mut Worksheet,
    table: &Table,
    options: &SpecXlsxWriteOptions,
    report: &mut SpecXlsxReport,
) -> Result<(), XlsxSerializeError> {
    let mut cache = SpecFormatCache::default();

    if options.if_write_dimensions {
        for (n_col, n_width) in table.col_widths() {
            worksheet.set_column_width(
                cast_col_num(*n_col)?,
                convert_stored_width_to_character_width(*n_width),
            )?;
        }
        for (n_row, n_height) in table.row_heights() {
            worksheet.set_row_height(cast_row_num(*n_row)?, *n_height)?;
        }
    }

    if options.if_write_merges {
        let mut l_regions_written: Vec<SpecMergedRegion> = Vec::new();
        for region in table.merged_regions() {
            // Excel rejects single-cell merges.
            if region.is_single_cell() {
                continue;
            }
            if l_regions_written.iter().any(|other| other.overlaps(region)) {
                report.warn(format!(
                    "Merged range {} overlaps an earlier range; skipped.",
                    region.to_a1_range()
                ));
                continue;
            }

            let cell_anchor = table.cell_at(region.row_start, region.col_start);
            let format = cache.derive(cell_anchor.style.as_ref(), report);
            worksheet.merge_range(
                cast_row_num(region.row_start)?,
                cast_col_num(region.col_start)?,
                cast_row_num(region.row_end)?,
                cast_col_num(region.col_end)?,
                "",
                format,
            )?;
            l_regions_written.push(*region);
            report.cnt_merges += 1;
        }
    }

    for (n_row, spec_row) in table.iter_rows() {
        for (n_col, cell) in spec_row.iter() {
            let format = match cell.value {
                EnumCellValue::DateTime(_) => cache.derive_datetime(cell.style.as_ref(), report),
                _ => cache.derive(cell.style.as_ref(), report),
            };
            write_cell_with_format(worksheet, n_row, n_col, &cell.value, format)?;
            report.cnt_cells += 1;
        }
    }

    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StyleTranslation

/// Formats keyed by shared style identity.
///
/// Date cells get their own entries: a style without a date number format is
/// extended with [`C_NUM_FORMAT_DATETIME_DEFAULT`] so the value reads back as a date.
struct SpecFormatCache {
    dict_formats: HashMap<*const SpecCellStyle, Format>,
    dict_formats_datetime: HashMap<*const SpecCellStyle, Format>,
    fmt_default: Format,
    fmt_datetime_default: Format,
}

impl Default for SpecFormatCache {
    fn default() -> Self {
        Self {
            dict_formats: HashMap::new(),
            dict_formats_datetime: HashMap::new(),
            fmt_default: Format::new(),
            fmt_datetime_default: Format::new().set_num_format(C_NUM_FORMAT_DATETIME_DEFAULT),
        }
    }
}

impl SpecFormatCache {
    fn derive(&mut self, style: Option<&Arc<SpecCellStyle>>, report: &mut SpecXlsxReport) -> &Format {
        let Some(style) = style else {
            return &self.fmt_default;
        };
        self.dict_formats
            .entry(Arc::as_ptr(style))
            .or_insert_with(|| derive_style_format(style, report))
    }

    fn derive_datetime(
        &mut self,
        style: Option<&Arc<SpecCellStyle>>,
        report: &mut SpecXlsxReport,
    ) -> &Format {
        let Some(style) = style else {
            return &self.fmt_datetime_default;
        };
        if has_date_num_format(style) {
            return self.derive(Some(style), report);
        }
        self.dict_formats_datetime
            .entry(Arc::as_ptr(style))
            .or_insert_with(|| {
                derive_style_format(style, report).set_num_format(C_NUM_FORMAT_DATETIME_DEFAULT)
            })
    }
}

fn has_date_num_format(style: &SpecCellStyle) -> bool {
    style
        .num_format
        .as_deref()
        .is_some_and(is_date_format_code)
}

/// Translate a decoded cell style into a writer format.
///
/// Unknown facet names are skipped with a warning; the cell value is kept.
fn derive_style_format(style: &SpecCellStyle, report: &mut SpecXlsxReport) -> Format {
    let mut format = Format::new();
    let mut set_unknown: BTreeSet<String> = BTreeSet::new();

    let font = &style.font;
    if let Some(val) = &font.name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = font.size {
        format = format.set_font_size(val);
    }
    if font.bold {
        format = format.set_bold();
    }
    if font.italic {
        format = format.set_italic();
    }
    if font.strike {
        format = format.set_font_strikethrough();
    }
    if let Some(val) = &font.underline {
        match derive_format_underline(val) {
            Some(underline) => format = format.set_underline(underline),
            None => {
                set_unknown.insert(format!("underline={val}"));
            }
        }
    }
    if let Some(color) = font.color.as_ref().and_then(derive_color) {
        format = format.set_font_color(color);
    }

    let border = &style.border;
    for (side, enum_side) in [
        (&border.left, "left"),
        (&border.right, "right"),
        (&border.top, "top"),
        (&border.bottom, "bottom"),
    ] {
        let Some(c_line) = &side.style else {
            continue;
        };
        let Some(n_border) = derive_border_index(c_line) else {
            set_unknown.insert(format!("border={c_line}"));
            continue;
        };
        let format_border = derive_format_border(n_border);
        let color = side.color.as_ref().and_then(derive_color);
        format = match enum_side {
            "left" => {
                let format = format.set_border_left(format_border);
                match color {
                    Some(color) => format.set_border_left_color(color),
                    None => format,
                }
            }
            "right" => {
                let format = format.set_border_right(format_border);
                match color {
                    Some(color) => format.set_border_right_color(color),
                    None => format,
                }
            }
            "top" => {
                let format = format.set_border_top(format_border);
                match color {
                    Some(color) => format.set_border_top_color(color),
                    None => format,
                }
            }
            _ => {
                let format = format.set_border_bottom(format_border);
                match color {
                    Some(color) => format.set_border_bottom_color(color),
                    None => format,
                }
            }
        };
    }

    let fill = &style.fill;
    if let Some(c_pattern) = &fill.pattern {
        match derive_format_pattern(c_pattern) {
            Some(FormatPattern::None) => {}
            Some(FormatPattern::Solid) => {
                format = format.set_pattern(FormatPattern::Solid);
                if let Some(color) = fill.fg_color.as_ref().and_then(derive_color) {
                    format = format.set_background_color(color);
                }
            }
            Some(pattern) => {
                format = format.set_pattern(pattern);
                if let Some(color) = fill.fg_color.as_ref().and_then(derive_color) {
                    format = format.set_foreground_color(color);
                }
                if let Some(color) = fill.bg_color.as_ref().and_then(derive_color) {
                    format = format.set_background_color(color);
                }
            }
            None => {
                set_unknown.insert(format!("pattern={c_pattern}"));
            }
        }
    }

    if let Some(val) = &style.num_format
        && !val.eq_ignore_ascii_case("general")
    {
        format = format.set_num_format(val.clone());
    }

    if !style.protection.locked {
        format = format.set_unlocked();
    }
    if style.protection.hidden {
        format = format.set_hidden();
    }

    let alignment = &style.alignment;
    if let Some(val) = &alignment.horizontal {
        let c_align = if val == "centerContinuous" {
            "center_across"
        } else {
            val.as_str()
        };
        match derive_format_align(c_align) {
            Some(align) => format = format.set_align(align),
            None => {
                set_unknown.insert(format!("horizontal={val}"));
            }
        }
    }
    if let Some(val) = &alignment.vertical {
        match derive_format_valign(val) {
            Some(align) => format = format.set_align(align),
            None => {
                set_unknown.insert(format!("vertical={val}"));
            }
        }
    }
    if alignment.wrap_text {
        format = format.set_text_wrap();
    }
    if let Some(val) = alignment.indent
        && val > 0
    {
        format = format.set_indent(val);
    }
    if let Some(val) = alignment.text_rotation
        && val != 0
    {
        format = format.set_rotation(val);
    }
    if alignment.shrink_to_fit {
        format = format.set_shrink();
    }

    if !set_unknown.is_empty() {
        report.warn(format!(
            "Unsupported style facets skipped: {}",
            set_unknown.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }

    format
}

fn derive_color(color: &EnumColor) -> Option<Color> {
    match color {
        EnumColor::Rgb(val) => Some(Color::RGB(*val)),
        EnumColor::Theme { index, tint } => {
            let n_index = u8::try_from(*index).ok().filter(|n| *n <= 9)?;
            Some(Color::Theme(n_index, derive_theme_shade(*tint)))
        }
        EnumColor::Indexed(val) if *val == N_INDEXED_COLOR_SYSTEM_FG => Some(Color::Automatic),
        EnumColor::Indexed(val) => TUP_INDEXED_COLORS
            .get(*val as usize)
            .map(|rgb| Color::RGB(*rgb)),
        EnumColor::Auto => Some(Color::Automatic),
    }
}

/// Nearest Excel palette shade (0 = base, 1..3 lighter, 4..5 darker) for a tint.
fn derive_theme_shade(tint: f64) -> u8 {
    if tint >= 0.7 {
        1
    } else if tint >= 0.5 {
        2
    } else if tint > 0.0 {
        3
    } else if tint == 0.0 {
        0
    } else if tint > -0.375 {
        4
    } else {
        5
    }
}

fn derive_format_underline(kind: &str) -> Option<FormatUnderline> {
    match kind {
        "single" => Some(FormatUnderline::Single),
        "double" => Some(FormatUnderline::Double),
        "singleAccounting" => Some(FormatUnderline::SingleAccounting),
        "doubleAccounting" => Some(FormatUnderline::DoubleAccounting),
        _ => None,
    }
}

fn derive_format_pattern(pattern: &str) -> Option<FormatPattern> {
    let enum_pattern = match pattern {
        "none" => FormatPattern::None,
        "solid" => FormatPattern::Solid,
        "mediumGray" => FormatPattern::MediumGray,
        "darkGray" => FormatPattern::DarkGray,
        "lightGray" => FormatPattern::LightGray,
        "darkHorizontal" => FormatPattern::DarkHorizontal,
        "darkVertical" => FormatPattern::DarkVertical,
        "darkDown" => FormatPattern::DarkDown,
        "darkUp" => FormatPattern::DarkUp,
        "darkGrid" => FormatPattern::DarkGrid,
        "darkTrellis" => FormatPattern::DarkTrellis,
        "lightHorizontal" => FormatPattern::LightHorizontal,
        "lightVertical" => FormatPattern::LightVertical,
        "lightDown" => FormatPattern::LightDown,
        "lightUp" => FormatPattern::LightUp,
        "lightGrid" => FormatPattern::LightGrid,
        "lightTrellis" => FormatPattern::LightTrellis,
        "gray125" => FormatPattern::Gray125,
        "gray0625" => FormatPattern::Gray0625,
        _ => return None,
    };
    Some(enum_pattern)
}

/// Border line name to the numeric style index used by [`derive_format_border`].
fn derive_border_index(line: &str) -> Option<i64> {
    let n_index = match line {
        "none" => 0,
        "thin" => 1,
        "medium" => 2,
        "dashed" => 3,
        "dotted" => 4,
        "thick" => 5,
        "double" => 6,
        "hair" => 7,
        "mediumDashed" => 8,
        "dashDot" => 9,
        "mediumDashDot" => 10,
        "dashDotDot" => 11,
        "mediumDashDotDot" => 12,
        "slantDashDot" => 13,
        _ => return None,
    };
    Some(n_index)
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        0 => FormatBorder::None,
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        "vjustify" | "vertical_justify" => Some(FormatAlign::VerticalJustify),
        "vdistributed" | "vertical_distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

/// Vertical alignment names as they appear in the styles part.
fn derive_format_valign(valign: &str) -> Option<FormatAlign> {
    match valign {
        "top" => Some(FormatAlign::Top),
        "center" => Some(FormatAlign::VerticalCenter),
        "bottom" => Some(FormatAlign::Bottom),
        "justify" => Some(FormatAlign::VerticalJustify),
        "distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FrameWriter

/// Stateful workbook writer for DataFrame-shaped reports.
///
/// The workbook is buffered in memory until [`Self::into_bytes`] is called.
pub struct XlsxFrameWriter {
    workbook: Workbook,
    fmt_text: SpecCellFormat,
    fmt_header: SpecCellFormat,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
}

impl Default for XlsxFrameWriter {
    fn default() -> Self {
        let dict_fmt = derive_default_xlsx_formats();
        Self::new(
            dict_fmt.get("text").cloned().unwrap_or_default(),
            dict_fmt.get("header").cloned().unwrap_or_default(),
        )
    }
}

impl XlsxFrameWriter {
    pub fn new(fmt_text: SpecCellFormat, fmt_header: SpecCellFormat) -> Self {
        Self {
            workbook: Workbook::new(),
            fmt_text,
            fmt_header,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
        }
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Write `df` as one sheet: a header row of column names, then one row per record.
    pub fn write_sheet(
        &mut self,
        df: &DataFrame,
        sheet_name: &str,
        policy_autofit: &SpecAutofitCellsPolicy,
    ) -> Result<(), XlsxSerializeError> {
        policy_autofit
            .validate()
            .map_err(XlsxSerializeError::InvalidOptions)?;

        let l_colnames: Vec<String> = df
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        let n_width_df = l_colnames.len();
        let n_height_df = df.height();
        if n_width_df > N_NCOLS_EXCEL_MAX || n_height_df + 1 > N_NROWS_EXCEL_MAX {
            return Err(XlsxSerializeError::InvalidOptions(format!(
                "DataFrame shape {n_height_df}x{n_width_df} exceeds worksheet limits."
            )));
        }

        let mut report = SpecXlsxReport::default();
        let sheet_name_unique =
            self.derive_unique_sheet_name(&sanitize_sheet_name(sheet_name, "_"));
        let fmt_header = derive_rust_xlsx_format(&self.fmt_header);
        let fmt_text = derive_rust_xlsx_format(&self.fmt_text);

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet_name_unique)?;

        let mut l_width_by_col_header = vec![0usize; n_width_df];
        let mut l_width_by_col_body = vec![0usize; n_width_df];

        for (n_idx_col, c_name) in l_colnames.iter().enumerate() {
            worksheet.write_string_with_format(0, cast_col_num(n_idx_col + 1)?, c_name, &fmt_header)?;
            l_width_by_col_header[n_idx_col] = estimate_unicode_string_width(c_name);
        }
        worksheet.set_freeze_panes(1, 0)?;

        let n_rows_inferred_max = policy_autofit
            .height_body_inferred_max
            .unwrap_or(usize::MAX);
        for (n_idx_col, col) in df.get_columns().iter().enumerate() {
            for n_idx_row in 0..n_height_df {
                let value = derive_cell_value_from_any_value(col.get(n_idx_row)?);
                if n_idx_row < n_rows_inferred_max {
                    l_width_by_col_body[n_idx_col] = usize::max(
                        l_width_by_col_body[n_idx_col],
                        estimate_unicode_string_width(&value.to_text()),
                    );
                }
                write_cell_with_format(worksheet, n_idx_row + 2, n_idx_col + 1, &value, &fmt_text)?;
                report.cnt_cells += 1;
            }
        }

        if policy_autofit.is_enabled() {
            for n_idx_col in 0..n_width_df {
                let n_width_recorded = match policy_autofit.rule_columns {
                    EnumAutofitColumnsRule::Header => l_width_by_col_header[n_idx_col],
                    EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
                    EnumAutofitColumnsRule::All | EnumAutofitColumnsRule::None => usize::max(
                        l_width_by_col_header[n_idx_col],
                        l_width_by_col_body[n_idx_col],
                    ),
                };
                worksheet.set_column_width(
                    cast_col_num(n_idx_col + 1)?,
                    policy_autofit.derive_width(n_width_recorded) as f64,
                )?;
            }
        }

        report.sheets.push(sheet_name_unique);
        self.l_reports.push(report);
        Ok(())
    }

    /// Finish the workbook and return its bytes.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, XlsxSerializeError> {
        if self.l_reports.is_empty() {
            self.workbook.add_worksheet();
        }
        Ok(self.workbook.save_to_buffer()?)
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let mut n_idx = 2usize;
        loop {
            let candidate = create_sheet_identifier(name, n_idx);
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::Empty,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) if val.is_finite() => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) if val.is_finite() => EnumCellValue::Number(val),
        AnyValue::Float32(_) | AnyValue::Float64(_) => EnumCellValue::Empty,
        _ => EnumCellValue::String(value.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellWrite

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row: usize,
    col: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), XlsxSerializeError> {
    let n_row = cast_row_num(row)?;
    let n_col = cast_col_num(col)?;
    match value {
        EnumCellValue::Empty => worksheet.write_blank(n_row, n_col, format)?,
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?
        }
        EnumCellValue::Number(val) | EnumCellValue::DateTime(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)?
        }
    };
    Ok(())
}

/// 1-based row to the writer's 0-based row number.
fn cast_row_num(value: usize) -> Result<u32, XlsxSerializeError> {
    value
        .checked_sub(1)
        .filter(|n_row| *n_row < N_NROWS_EXCEL_MAX)
        .and_then(|n_row| u32::try_from(n_row).ok())
        .ok_or(XlsxSerializeError::IndexOverflow { axis: "row", value })
}

/// 1-based column to the writer's 0-based column number.
fn cast_col_num(value: usize) -> Result<u16, XlsxSerializeError> {
    value
        .checked_sub(1)
        .filter(|n_col| *n_col < N_NCOLS_EXCEL_MAX)
        .and_then(|n_col| u16::try_from(n_col).ok())
        .ok_or(XlsxSerializeError::IndexOverflow {
            axis: "column",
            value,
        })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use polars::prelude::Column;

    use super::*;
    use crate::reader::load_workbook;
    use crate::spec::{SpecBorderSide, SpecCell, SpecFontStyle};
    use crate::table::TableBuilder;

    fn create_styled_table() -> Table {
        let style_header = Arc::new(SpecCellStyle {
            font: SpecFontStyle {
                bold: true,
                ..Default::default()
            },
            ..Default::default()
        });
        let style_date = Arc::new(SpecCellStyle {
            num_format: Some("yyyy-mm-dd".to_string()),
            ..Default::default()
        });

        let mut builder = TableBuilder::new("Supplier: A/B");
        builder
            .set_cell(
                1,
                1,
                SpecCell::new(EnumCellValue::String("Header".to_string()))
                    .with_style(Arc::clone(&style_header)),
            )
            .set_cell(
                1,
                2,
                SpecCell::new(EnumCellValue::Empty).with_style(Arc::clone(&style_header)),
            )
            .set_cell(
                2,
                1,
                SpecCell::new(EnumCellValue::DateTime(45306.0)).with_style(style_date),
            )
            .set_cell(2, 2, SpecCell::new(EnumCellValue::Number(7.0)))
            .set_cell(2, 3, SpecCell::new(EnumCellValue::Boolean(true)))
            .push_merged_region(SpecMergedRegion::new(1, 1, 1, 2))
            .push_merged_region(SpecMergedRegion::new(2, 3, 2, 3))
            .set_col_width(1, 20.7109375)
            .set_row_height(2, 28.0);
        builder.build()
    }

    #[test]
    fn test_serialize_table_round_trips_through_decoder() {
        let table = create_styled_table();
        let (v_bytes, report) = serialize_table(&table, &SpecXlsxWriteOptions::default()).unwrap();

        assert_eq!(report.sheets, vec!["Supplier_ A_B".to_string()]);
        assert_eq!(report.cnt_merges, 1);
        assert_eq!(report.cnt_cells, 5);
        assert_eq!(report.warnings.len(), 1);

        let workbook = load_workbook(&v_bytes).unwrap();
        let table_back = &workbook.tables[0];
        assert_eq!(table_back.cell_at(1, 1).value.to_text(), "Header");
        assert!(table_back.cell_at(1, 1).style.as_ref().unwrap().font.bold);
        assert_eq!(table_back.cell_at(2, 1).value, EnumCellValue::DateTime(45306.0));
        assert_eq!(table_back.cell_at(2, 2).value, EnumCellValue::Number(7.0));
        assert_eq!(table_back.cell_at(2, 3).value, EnumCellValue::Boolean(true));
        assert_eq!(
            table_back.merged_regions(),
            &[SpecMergedRegion::new(1, 1, 1, 2)]
        );
        let n_width = table_back.col_widths().get(&1).copied().unwrap();
        assert!((n_width - 20.7109375).abs() < 0.01);
        assert_eq!(table_back.row_heights().get(&2), Some(&28.0));
    }

    #[test]
    fn test_datetime_without_date_format_reads_back_as_date() {
        let style_bold = Arc::new(SpecCellStyle {
            font: SpecFontStyle {
                bold: true,
                ..Default::default()
            },
            ..Default::default()
        });
        let mut builder = TableBuilder::new("Dates");
        builder
            .set_cell(1, 1, SpecCell::new(EnumCellValue::DateTime(45306.0)))
            .set_cell(
                1,
                2,
                SpecCell::new(EnumCellValue::DateTime(45306.5)).with_style(Arc::clone(&style_bold)),
            )
            .set_cell(
                1,
                3,
                SpecCell::new(EnumCellValue::Number(45306.0)).with_style(style_bold),
            );
        let (v_bytes, _) = serialize_table(&builder.build(), &SpecXlsxWriteOptions::default()).unwrap();

        let table_back = load_workbook(&v_bytes).unwrap().tables.remove(0);
        assert_eq!(table_back.cell_at(1, 1).value, EnumCellValue::DateTime(45306.0));
        assert_eq!(table_back.cell_at(1, 2).value, EnumCellValue::DateTime(45306.5));
        let style_back = table_back.cell_at(1, 2).style.as_ref().unwrap();
        assert!(style_back.font.bold);
        assert_eq!(style_back.num_format.as_deref(), Some(C_NUM_FORMAT_DATETIME_DEFAULT));
        assert_eq!(table_back.cell_at(1, 3).value, EnumCellValue::Number(45306.0));
    }

    #[test]
    fn test_serialize_table_skips_overlapping_merges() {
        let mut builder = TableBuilder::new("Data");
        builder
            .set_cell(1, 1, SpecCell::new(EnumCellValue::String("x".to_string())))
            .push_merged_region(SpecMergedRegion::new(1, 1, 2, 2))
            .push_merged_region(SpecMergedRegion::new(2, 2, 3, 3));
        let (_, report) = serialize_table(&builder.build(), &SpecXlsxWriteOptions::default()).unwrap();
        assert_eq!(report.cnt_merges, 1);
        assert!(report.warnings[0].contains("B2:C3"));
    }

    #[test]
    fn test_unknown_style_facets_fall_back_with_warning() {
        let style = Arc::new(SpecCellStyle {
            border: crate::spec::SpecBorderStyle {
                left: SpecBorderSide {
                    style: Some("wobbly".to_string()),
                    color: None,
                },
                ..Default::default()
            },
            ..Default::default()
        });
        let mut builder = TableBuilder::new("Data");
        builder.set_cell(
            1,
            1,
            SpecCell::new(EnumCellValue::Number(1.0)).with_style(style),
        );
        let (v_bytes, report) =
            serialize_table(&builder.build(), &SpecXlsxWriteOptions::default()).unwrap();
        assert!(report.warnings[0].contains("border=wobbly"));
        let table_back = load_workbook(&v_bytes).unwrap().tables.remove(0);
        assert_eq!(table_back.cell_at(1, 1).value, EnumCellValue::Number(1.0));
    }

    #[test]
    fn test_stored_width_conversion_is_stable() {
        let n_char = convert_stored_width_to_character_width(20.7109375);
        assert!((n_char - 20.0).abs() < 0.01);
        assert_eq!(convert_stored_width_to_character_width(0.0), 0.0);
    }

    #[test]
    fn test_color_translation() {
        assert_eq!(derive_color(&EnumColor::Rgb(0x123456)), Some(Color::RGB(0x123456)));
        assert_eq!(derive_color(&EnumColor::Indexed(2)), Some(Color::RGB(0xFF0000)));
        assert_eq!(derive_color(&EnumColor::Indexed(64)), Some(Color::Automatic));
        assert_eq!(derive_color(&EnumColor::Indexed(80)), None);
        assert_eq!(
            derive_color(&EnumColor::Theme {
                index: 4,
                tint: -0.5
            }),
            Some(Color::Theme(4, 5))
        );
        assert_eq!(
            derive_color(&EnumColor::Theme {
                index: 12,
                tint: 0.0
            }),
            None
        );
    }

    #[test]
    fn test_frame_writer_writes_header_and_unique_sheets() {
        let df = DataFrame::new(vec![
            Column::new("Employee Name".into(), &["Ana", "Budi"]),
            Column::new("Role".into(), &["Cashier", "Cook"]),
        ])
        .unwrap();

        let mut writer = XlsxFrameWriter::default();
        writer
            .write_sheet(&df, "Mismatch", &SpecAutofitCellsPolicy::default())
            .unwrap();
        writer
            .write_sheet(&df, "Mismatch", &SpecAutofitCellsPolicy::default())
            .unwrap();
        let l_reports = writer.report();
        assert_eq!(l_reports[1].sheets, vec!["Mismatch__2".to_string()]);

        let workbook = load_workbook(&writer.into_bytes().unwrap()).unwrap();
        assert_eq!(workbook.tables.len(), 2);
        let table = &workbook.tables[0];
        assert_eq!(table.cell_at(1, 1).value.to_text(), "Employee Name");
        assert_eq!(table.cell_at(3, 2).value.to_text(), "Cook");
        assert!(table.cell_at(1, 1).style.as_ref().unwrap().font.bold);
    }

    #[test]
    fn test_cast_rejects_zero_and_overflow() {
        assert!(cast_row_num(0).is_err());
        assert_eq!(cast_row_num(1).unwrap(), 0);
        assert!(cast_col_num(N_NCOLS_EXCEL_MAX + 1).is_err());
    }
}
