//! Column projection: drop a fixed set of columns and shift the rest left.
//!
//! The mapping is computed once per source extent and then applied to rows,
//! merged regions and dimensions alike, so header and data rows always agree.

use std::collections::{BTreeMap, BTreeSet};

use sheetsplit_io_xlsx::{SpecMergedRegion, SpecRow, Table, TableBuilder, format_column_ranges};

use crate::spec::ProjectionError;

/// Old column -> new column (or dropped) for columns `1..=max_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    /// Slot 0 is unused so that `l_targets[col]` addresses 1-based columns.
    l_targets: Vec<Option<usize>>,
    n_col_max_projected: usize,
}

impl IndexMap {
    /// Map that keeps every column in place.
    pub fn identity(max_column: usize) -> Self {
        let mut l_targets = Vec::with_capacity(max_column + 1);
        l_targets.push(None);
        l_targets.extend((1..=max_column).map(Some));
        Self {
            l_targets,
            n_col_max_projected: max_column,
        }
    }

    /// New position of `col`; `None` when dropped or beyond the source extent.
    pub fn map(&self, col: usize) -> Option<usize> {
        self.l_targets.get(col).copied().flatten()
    }

    pub fn is_retained(&self, col: usize) -> bool {
        self.map(col).is_some()
    }

    /// Source extent the map was built for.
    pub fn max_column_source(&self) -> usize {
        self.l_targets.len().saturating_sub(1)
    }

    /// Highest projected column.
    pub fn max_column_projected(&self) -> usize {
        self.n_col_max_projected
    }

    /// Dropped source columns, ascending.
    pub fn deleted_columns(&self) -> Vec<usize> {
        (1..=self.max_column_source())
            .filter(|col| !self.is_retained(*col))
            .collect()
    }

    /// `(old, new)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<usize>)> + '_ {
        self.l_targets
            .iter()
            .enumerate()
            .skip(1)
            .map(|(col, target)| (col, *target))
    }
}

/// Build the index map for `deletion_set` over columns `1..=max_column`.
///
/// A retained column `c` moves to `c - |{d in deletion_set : d < c}|`.
pub fn build_index_map(
    deletion_set: &BTreeSet<usize>,
    max_column: usize,
) -> Result<IndexMap, ProjectionError> {
    if let Some(col) = deletion_set
        .iter()
        .copied()
        .find(|col| *col == 0 || *col > max_column)
    {
        return Err(ProjectionError::ColumnOutOfRange { col, max_column });
    }

    let mut l_targets = Vec::with_capacity(max_column + 1);
    l_targets.push(None);
    let mut n_col_next = 0usize;
    for col in 1..=max_column {
        if deletion_set.contains(&col) {
            l_targets.push(None);
        } else {
            n_col_next += 1;
            l_targets.push(Some(n_col_next));
        }
    }

    if !deletion_set.is_empty() {
        let l_deleted: Vec<usize> = deletion_set.iter().copied().collect();
        log::debug!(
            "Index map over {max_column} columns drops {}",
            format_column_ranges(&l_deleted)
        );
    }

    Ok(IndexMap {
        l_targets,
        n_col_max_projected: n_col_next,
    })
}

/// Move retained cells to their mapped columns; value and style are cloned.
pub fn project_row(row: &SpecRow, index_map: &IndexMap) -> SpecRow {
    row.iter()
        .filter_map(|(col, cell)| index_map.map(col).map(|col_new| (col_new, cell.clone())))
        .collect()
}

/// Shift a region to the first and last retained columns of its span.
///
/// Returns `None` when the whole span is dropped. Rows are unchanged.
pub fn project_merged_region(
    region: &SpecMergedRegion,
    index_map: &IndexMap,
) -> Option<SpecMergedRegion> {
    let n_col_last = region.col_end.min(index_map.max_column_source());
    if region.col_start > n_col_last {
        return None;
    }
    let col_start = (region.col_start..=n_col_last).find_map(|col| index_map.map(col))?;
    let col_end = (region.col_start..=n_col_last)
        .rev()
        .find_map(|col| index_map.map(col))?;
    Some(SpecMergedRegion::new(
        region.row_start,
        col_start,
        region.row_end,
        col_end,
    ))
}

/// Re-key widths through the map; heights pass through.
pub fn project_dimensions(
    widths: &BTreeMap<usize, f64>,
    heights: &BTreeMap<usize, f64>,
    index_map: &IndexMap,
) -> (BTreeMap<usize, f64>, BTreeMap<usize, f64>) {
    let widths_projected = widths
        .iter()
        .filter_map(|(col, width)| index_map.map(*col).map(|col_new| (col_new, *width)))
        .collect();
    (widths_projected, heights.clone())
}

/// Project every row, merge and dimension of `table`.
pub fn project_table(table: &Table, index_map: &IndexMap) -> Table {
    let mut builder = TableBuilder::new(table.sheet_name());
    for (n_row, spec_row) in table.iter_rows() {
        builder.set_row(n_row, project_row(spec_row, index_map));
    }
    for region in table.merged_regions() {
        if let Some(region_new) = project_merged_region(region, index_map) {
            builder.push_merged_region(region_new);
        }
    }
    let (widths, heights) = project_dimensions(table.col_widths(), table.row_heights(), index_map);
    for (col, width) in widths {
        builder.set_col_width(col, width);
    }
    for (row, height) in heights {
        builder.set_row_height(row, height);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsplit_io_xlsx::{EnumCellValue, SpecCell, SpecCellStyle, SpecFontStyle};
    use std::sync::Arc;

    fn set_of(l_cols: &[usize]) -> BTreeSet<usize> {
        l_cols.iter().copied().collect()
    }

    fn text(val: &str) -> SpecCell {
        SpecCell::new(EnumCellValue::String(val.to_string()))
    }

    #[test]
    fn test_index_map_drops_and_shifts() {
        let index_map = build_index_map(&set_of(&[2, 3]), 5).unwrap();
        let l_pairs: Vec<_> = index_map.iter().collect();
        assert_eq!(
            l_pairs,
            vec![
                (1, Some(1)),
                (2, None),
                (3, None),
                (4, Some(2)),
                (5, Some(3))
            ]
        );
        assert_eq!(index_map.max_column_projected(), 3);
        assert_eq!(index_map.deleted_columns(), vec![2, 3]);
        assert_eq!(index_map.map(6), None);
    }

    #[test]
    fn test_index_map_is_order_preserving_and_contiguous() {
        let index_map =
            build_index_map(&set_of(&[2, 3, 5, 6, 8, 9, 13, 16, 19, 20, 21]), 30).unwrap();
        let l_targets: Vec<usize> = index_map.iter().filter_map(|(_, t)| t).collect();

        assert!(l_targets.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(l_targets, (1..=l_targets.len()).collect::<Vec<_>>());
        assert_eq!(l_targets.len(), 19);
        assert_eq!(index_map.map(4), Some(2));
        assert_eq!(index_map.map(22), Some(11));
    }

    #[test]
    fn test_index_map_rejects_out_of_range() {
        assert_eq!(
            build_index_map(&set_of(&[2, 9]), 5),
            Err(ProjectionError::ColumnOutOfRange {
                col: 9,
                max_column: 5
            })
        );
        assert!(build_index_map(&set_of(&[0]), 5).is_err());
        assert_eq!(build_index_map(&set_of(&[]), 0).unwrap().max_column_projected(), 0);
    }

    #[test]
    fn test_project_row_moves_cells_and_keeps_style() {
        let style = Arc::new(SpecCellStyle {
            font: SpecFontStyle {
                bold: true,
                ..Default::default()
            },
            ..Default::default()
        });
        let row: SpecRow = [
            (1, text("a")),
            (2, text("b")),
            (4, text("d").with_style(style.clone())),
            (7, text("beyond")),
        ]
        .into_iter()
        .collect();
        let index_map = build_index_map(&set_of(&[2, 3]), 5).unwrap();

        let row_new = project_row(&row, &index_map);
        assert_eq!(row_new.len(), 2);
        assert_eq!(row_new.cell(1).map(|c| c.value.to_text()), Some("a".to_string()));
        let cell_d = row_new.cell(2).unwrap();
        assert_eq!(cell_d.value.to_text(), "d");
        assert!(Arc::ptr_eq(cell_d.style.as_ref().unwrap(), &style));
    }

    #[test]
    fn test_project_merged_region_shrinks_or_drops() {
        let index_map = build_index_map(&set_of(&[2, 3]), 5).unwrap();

        let region_wide = SpecMergedRegion::new(1, 2, 2, 4);
        assert_eq!(
            project_merged_region(&region_wide, &index_map),
            Some(SpecMergedRegion::new(1, 2, 2, 2))
        );

        let region_deleted = SpecMergedRegion::new(3, 2, 3, 3);
        assert_eq!(project_merged_region(&region_deleted, &index_map), None);

        let region_across = SpecMergedRegion::new(1, 1, 1, 5);
        assert_eq!(
            project_merged_region(&region_across, &index_map),
            Some(SpecMergedRegion::new(1, 1, 1, 3))
        );
    }

    #[test]
    fn test_project_dimensions_rekeys_widths() {
        let widths: BTreeMap<usize, f64> = [(1, 10.0), (2, 20.0), (4, 40.0)].into_iter().collect();
        let heights: BTreeMap<usize, f64> = [(3, 30.0)].into_iter().collect();
        let index_map = build_index_map(&set_of(&[2, 3]), 5).unwrap();

        let (widths_new, heights_new) = project_dimensions(&widths, &heights, &index_map);
        assert_eq!(widths_new, [(1, 10.0), (2, 40.0)].into_iter().collect());
        assert_eq!(heights_new, heights);
    }

    #[test]
    fn test_project_table_identity_is_equal() {
        let mut builder = TableBuilder::new("PV");
        builder
            .set_cell(1, 1, text("h"))
            .set_cell(2, 3, SpecCell::new(EnumCellValue::Number(4.5)))
            .push_merged_region(SpecMergedRegion::new(1, 1, 1, 3))
            .set_col_width(2, 14.0)
            .set_row_height(2, 22.0);
        let table = builder.build();

        let table_projected = project_table(&table, &IndexMap::identity(table.max_column()));
        assert_eq!(table_projected, table);

        let table_empty_set =
            project_table(&table, &build_index_map(&BTreeSet::new(), table.max_column()).unwrap());
        assert_eq!(table_empty_set, table);
    }
}
