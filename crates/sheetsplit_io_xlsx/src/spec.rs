//! Shared XLSX specification models.

use std::sync::Arc;

use crate::util::{convert_serial_to_datetime, format_cell_reference};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueSpecification

/// Normalized cell value carried through decode, projection and write.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    Empty,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Date/time as an Excel serial number in the 1900 date system.
    DateTime(f64),
    /// Boolean value.
    Boolean(bool),
}

impl EnumCellValue {
    /// `true` for `Empty` and whitespace-only strings.
    pub fn is_blank(&self) -> bool {
        match self {
            EnumCellValue::Empty => true,
            EnumCellValue::String(val) => val.trim().is_empty(),
            _ => false,
        }
    }

    /// Display text of the value, as used for keys, labels and width estimation.
    pub fn to_text(&self) -> String {
        match self {
            EnumCellValue::Empty => String::new(),
            EnumCellValue::String(val) => val.clone(),
            EnumCellValue::Number(val) => format_number_text(*val),
            EnumCellValue::DateTime(val) => match convert_serial_to_datetime(*val) {
                Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                None => format_number_text(*val),
            },
            EnumCellValue::Boolean(val) => if *val { "True" } else { "False" }.to_string(),
        }
    }
}

fn format_number_text(val: f64) -> String {
    if val.is_finite() && val.fract() == 0.0 && val.abs() < 1e15 {
        format!("{}", val as i64)
    } else {
        val.to_string()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellStyleSpecification

/// Color reference as stored in the workbook styles part.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumColor {
    /// Explicit `RRGGBB` value (alpha dropped).
    Rgb(u32),
    /// Theme palette slot with tint in `[-1, 1]`.
    Theme { index: u32, tint: f64 },
    /// Legacy indexed palette slot.
    Indexed(u32),
    /// System automatic color.
    Auto,
}

/// Font facet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecFontStyle {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    /// Underline kind (`single`, `double`, `singleAccounting`, `doubleAccounting`).
    pub underline: Option<String>,
    pub strike: bool,
    pub color: Option<EnumColor>,
}

/// One border side.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecBorderSide {
    /// Line style name (`thin`, `medium`, `dashed`, ...).
    pub style: Option<String>,
    pub color: Option<EnumColor>,
}

/// Border facet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecBorderStyle {
    pub left: SpecBorderSide,
    pub right: SpecBorderSide,
    pub top: SpecBorderSide,
    pub bottom: SpecBorderSide,
}

/// Fill facet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecFillStyle {
    /// Pattern name (`solid`, `gray125`, ...).
    pub pattern: Option<String>,
    pub fg_color: Option<EnumColor>,
    pub bg_color: Option<EnumColor>,
}

/// Alignment facet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecAlignmentStyle {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub indent: Option<u8>,
    pub text_rotation: Option<i16>,
    pub shrink_to_fit: bool,
}

/// Protection facet. Cells are locked unless stated otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecProtectionStyle {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for SpecProtectionStyle {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}

/// Complete cell style. Opaque to the engine; only the serializer reads it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCellStyle {
    pub font: SpecFontStyle,
    pub border: SpecBorderStyle,
    pub fill: SpecFillStyle,
    /// Number format code (`None` = General).
    pub num_format: Option<String>,
    pub protection: SpecProtectionStyle,
    pub alignment: SpecAlignmentStyle,
}

/// A cell: value plus optional shared style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCell {
    pub value: EnumCellValue,
    pub style: Option<Arc<SpecCellStyle>>,
}

impl SpecCell {
    /// Shared blank cell returned for addresses beyond a table's extent.
    pub const EMPTY: SpecCell = SpecCell {
        value: EnumCellValue::Empty,
        style: None,
    };

    pub fn new(value: EnumCellValue) -> Self {
        Self { value, style: None }
    }

    /// Attach a shared style.
    pub fn with_style(mut self, style: Arc<SpecCellStyle>) -> Self {
        self.style = Some(style);
        self
    }

    /// `true` when the cell carries neither a value nor a style.
    pub fn is_void(&self) -> bool {
        matches!(self.value, EnumCellValue::Empty) && self.style.is_none()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MergedRegionSpecification

/// Inclusive, 1-based rectangular merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecMergedRegion {
    pub row_start: usize,
    pub col_start: usize,
    pub row_end: usize,
    pub col_end: usize,
}

impl SpecMergedRegion {
    /// Build a region, normalizing corner order.
    pub fn new(row_start: usize, col_start: usize, row_end: usize, col_end: usize) -> Self {
        Self {
            row_start: row_start.min(row_end),
            col_start: col_start.min(col_end),
            row_end: row_start.max(row_end),
            col_end: col_start.max(col_end),
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_start..=self.row_end).contains(&row)
            && (self.col_start..=self.col_end).contains(&col)
    }

    pub fn overlaps(&self, other: &SpecMergedRegion) -> bool {
        self.row_start <= other.row_end
            && other.row_start <= self.row_end
            && self.col_start <= other.col_end
            && other.col_start <= self.col_end
    }

    pub fn is_single_cell(&self) -> bool {
        self.row_start == self.row_end && self.col_start == self.col_end
    }

    /// A1-style range text, e.g. `B2:D4`.
    pub fn to_a1_range(&self) -> String {
        format!(
            "{}:{}",
            format_cell_reference(self.row_start, self.col_start),
            format_cell_reference(self.row_end, self.col_end)
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Flat cell format preset used by the DataFrame report writer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,
    /// Background fill color.
    pub bg_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit; source widths are kept.
    None,
    /// Infer width from header cells only.
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells (default).
    #[default]
    All,
}

/// Autofit policy for one written sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        crate::conf::derive_default_autofit_policy()
    }
}

impl SpecAutofitCellsPolicy {
    pub fn is_enabled(&self) -> bool {
        !matches!(self.rule_columns, EnumAutofitColumnsRule::None)
    }

    /// Final width for an observed content length.
    pub fn derive_width(&self, n_len_content: usize) -> usize {
        let n_min = usize::max(1, self.width_cell_min);
        let n_max = usize::min(255, usize::max(n_min, self.width_cell_max));
        usize::min(
            n_max,
            usize::max(n_min, n_len_content + self.width_cell_padding),
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.width_cell_min == 0 {
            return Err("policy_autofit.width_cell_min must be >= 1.".to_string());
        }
        if self.width_cell_max < self.width_cell_min {
            return Err(
                "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min."
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Serializer options for writing one [`crate::table::Table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxWriteOptions {
    /// Write merged regions.
    pub if_write_merges: bool,
    /// Write column widths and row heights.
    pub if_write_dimensions: bool,
    /// Replacement for characters illegal in sheet names.
    pub sheet_name_replace_to: String,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            if_write_merges: true,
            if_write_dimensions: true,
            sheet_name_replace_to: "_".to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-write call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Sheet names written by the call.
    pub sheets: Vec<String>,
    /// Number of cells written.
    pub cnt_cells: usize,
    /// Number of merged ranges written.
    pub cnt_merges: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
