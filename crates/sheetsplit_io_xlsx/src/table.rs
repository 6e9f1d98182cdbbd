//! In-memory worksheet model.
//!
//! A [`Table`] is immutable once built; all construction goes through
//! [`TableBuilder`]. Row and column indices are 1-based throughout.

use std::collections::BTreeMap;

use crate::spec::{SpecCell, SpecMergedRegion};

static EMPTY_CELL: SpecCell = SpecCell::EMPTY;

/// One row: cells keyed by 1-based column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRow {
    cells: BTreeMap<usize, SpecCell>,
}

impl SpecRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `cell` at `col`, replacing any previous cell.
    pub fn insert(&mut self, col: usize, cell: SpecCell) {
        self.cells.insert(col, cell);
    }

    pub fn cell(&self, col: usize) -> Option<&SpecCell> {
        self.cells.get(&col)
    }

    /// Cells in column order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SpecCell)> {
        self.cells.iter().map(|(col, cell)| (*col, cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Highest populated column, 0 for an empty row.
    pub fn max_column(&self) -> usize {
        self.cells.keys().next_back().copied().unwrap_or(0)
    }
}

impl FromIterator<(usize, SpecCell)> for SpecRow {
    fn from_iter<T: IntoIterator<Item = (usize, SpecCell)>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// A worksheet: rows, merges, dimensions and a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    sheet_name: String,
    rows: BTreeMap<usize, SpecRow>,
    merged_regions: Vec<SpecMergedRegion>,
    col_widths: BTreeMap<usize, f64>,
    row_heights: BTreeMap<usize, f64>,
    n_row_max: usize,
    n_col_max: usize,
}

impl Table {
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Highest row touched by a cell or a merged region.
    pub fn max_row(&self) -> usize {
        self.n_row_max
    }

    /// Highest column touched by a cell or a merged region.
    pub fn max_column(&self) -> usize {
        self.n_col_max
    }

    /// Cell at `(row, col)`; the shared empty cell when nothing is stored there.
    pub fn cell_at(&self, row: usize, col: usize) -> &SpecCell {
        self.rows
            .get(&row)
            .and_then(|spec_row| spec_row.cell(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn row(&self, row: usize) -> Option<&SpecRow> {
        self.rows.get(&row)
    }

    /// Stored rows in ascending order. Rows without any cell are absent.
    pub fn iter_rows(&self) -> impl Iterator<Item = (usize, &SpecRow)> {
        self.rows.iter().map(|(row, spec_row)| (*row, spec_row))
    }

    pub fn merged_regions(&self) -> &[SpecMergedRegion] {
        &self.merged_regions
    }

    pub fn col_widths(&self) -> &BTreeMap<usize, f64> {
        &self.col_widths
    }

    pub fn row_heights(&self) -> &BTreeMap<usize, f64> {
        &self.row_heights
    }

    /// Number of stored cells.
    pub fn cnt_cells(&self) -> usize {
        self.rows.values().map(SpecRow::len).sum()
    }
}

/// Mutable staging area for a [`Table`].
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    sheet_name: String,
    rows: BTreeMap<usize, SpecRow>,
    merged_regions: Vec<SpecMergedRegion>,
    col_widths: BTreeMap<usize, f64>,
    row_heights: BTreeMap<usize, f64>,
}

impl TableBuilder {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            ..Default::default()
        }
    }

    pub fn set_cell(&mut self, row: usize, col: usize, cell: SpecCell) -> &mut Self {
        if row == 0 || col == 0 {
            return self;
        }
        self.rows.entry(row).or_default().insert(col, cell);
        self
    }

    /// Replace row `row` wholesale; an empty row clears it.
    pub fn set_row(&mut self, row: usize, spec_row: SpecRow) -> &mut Self {
        if row == 0 {
            return self;
        }
        if spec_row.is_empty() {
            self.rows.remove(&row);
        } else {
            self.rows.insert(row, spec_row);
        }
        self
    }

    pub fn push_merged_region(&mut self, region: SpecMergedRegion) -> &mut Self {
        self.merged_regions.push(region);
        self
    }

    pub fn set_col_width(&mut self, col: usize, width: f64) -> &mut Self {
        if col > 0 && width.is_finite() && width >= 0.0 {
            self.col_widths.insert(col, width);
        }
        self
    }

    pub fn set_row_height(&mut self, row: usize, height: f64) -> &mut Self {
        if row > 0 && height.is_finite() && height >= 0.0 {
            self.row_heights.insert(row, height);
        }
        self
    }

    /// Freeze into a [`Table`].
    ///
    /// Extent covers cells and merges; dimensions beyond the extent are dropped.
    pub fn build(self) -> Table {
        let n_row_max_cells = self.rows.keys().next_back().copied().unwrap_or(0);
        let n_col_max_cells = self
            .rows
            .values()
            .map(SpecRow::max_column)
            .max()
            .unwrap_or(0);
        let n_row_max_merges = self
            .merged_regions
            .iter()
            .map(|region| region.row_end)
            .max()
            .unwrap_or(0);
        let n_col_max_merges = self
            .merged_regions
            .iter()
            .map(|region| region.col_end)
            .max()
            .unwrap_or(0);

        let n_row_max = n_row_max_cells.max(n_row_max_merges);
        let n_col_max = n_col_max_cells.max(n_col_max_merges);

        let mut col_widths = self.col_widths;
        col_widths.retain(|col, _| *col <= n_col_max);
        let mut row_heights = self.row_heights;
        row_heights.retain(|row, _| *row <= n_row_max);

        Table {
            sheet_name: self.sheet_name,
            rows: self.rows,
            merged_regions: self.merged_regions,
            col_widths,
            row_heights,
            n_row_max,
            n_col_max,
        }
    }
}

impl From<Table> for TableBuilder {
    /// Reopen a built table for further edits.
    fn from(table: Table) -> Self {
        Self {
            sheet_name: table.sheet_name,
            rows: table.rows,
            merged_regions: table.merged_regions,
            col_widths: table.col_widths,
            row_heights: table.row_heights,
        }
    }
}

/// All worksheets decoded from one workbook, in workbook order.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecWorkbook {
    pub tables: Vec<Table>,
    /// Index of the sheet that was active when the workbook was saved.
    pub n_idx_active: usize,
    /// Recovered decode problems.
    pub warnings: Vec<String>,
}

impl SpecWorkbook {
    pub fn active_table(&self) -> Option<&Table> {
        self.tables
            .get(self.n_idx_active)
            .or_else(|| self.tables.first())
    }

    pub fn table_by_name(&self, sheet_name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.sheet_name() == sheet_name)
    }

    /// Consume and return the active table.
    pub fn into_active_table(mut self) -> Option<Table> {
        if self.tables.is_empty() {
            return None;
        }
        let n_idx = if self.n_idx_active < self.tables.len() {
            self.n_idx_active
        } else {
            0
        };
        Some(self.tables.swap_remove(n_idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::EnumCellValue;

    fn text(val: &str) -> SpecCell {
        SpecCell::new(EnumCellValue::String(val.to_string()))
    }

    #[test]
    fn test_cell_at_returns_shared_empty_beyond_extent() {
        let mut builder = TableBuilder::new("Data");
        builder.set_cell(1, 1, text("a")).set_cell(2, 3, text("b"));
        let table = builder.build();

        assert_eq!(table.max_row(), 2);
        assert_eq!(table.max_column(), 3);
        assert_eq!(table.cell_at(1, 1).value.to_text(), "a");
        assert!(std::ptr::eq(table.cell_at(99, 99), table.cell_at(7, 1)));
        assert!(table.cell_at(99, 99).is_void());
        assert!(table.cell_at(1, 2).is_void());
    }

    #[test]
    fn test_build_extent_includes_merges_and_trims_dimensions() {
        let mut builder = TableBuilder::new("Data");
        builder
            .set_cell(1, 1, text("a"))
            .push_merged_region(SpecMergedRegion::new(1, 1, 3, 4))
            .set_col_width(4, 12.0)
            .set_col_width(200, 9.0)
            .set_row_height(3, 20.0)
            .set_row_height(500, 15.0);
        let table = builder.build();

        assert_eq!(table.max_row(), 3);
        assert_eq!(table.max_column(), 4);
        assert_eq!(table.col_widths().len(), 1);
        assert_eq!(table.row_heights().get(&3), Some(&20.0));
        assert!(!table.row_heights().contains_key(&500));
    }

    #[test]
    fn test_set_row_with_empty_row_clears() {
        let mut builder = TableBuilder::new("Data");
        builder.set_cell(2, 1, text("x"));
        builder.set_row(2, SpecRow::new());
        let table = builder.build();
        assert_eq!(table.iter_rows().count(), 0);
        assert_eq!(table.max_row(), 0);
    }

    #[test]
    fn test_builder_from_table_round_trips() {
        let mut builder = TableBuilder::new("Data");
        builder.set_cell(2, 2, text("x")).set_col_width(2, 11.0);
        let table = builder.build();

        let mut builder_again = TableBuilder::from(table.clone());
        builder_again.set_col_width(1, 5.0);
        let table_again = builder_again.build();
        assert_eq!(table_again.cell_at(2, 2), table.cell_at(2, 2));
        assert_eq!(table_again.col_widths().len(), 2);
    }

    #[test]
    fn test_workbook_active_table_falls_back_to_first() {
        let workbook = SpecWorkbook {
            tables: vec![TableBuilder::new("A").build(), TableBuilder::new("B").build()],
            n_idx_active: 7,
            warnings: vec![],
        };
        assert_eq!(workbook.active_table().map(Table::sheet_name), Some("A"));
        assert!(workbook.table_by_name("B").is_some());
        assert_eq!(
            workbook.into_active_table().map(|t| t.sheet_name().to_string()),
            Some("A".to_string())
        );
    }
}
