//! Header location, key partitioning and per-partition table emission.

use std::collections::{BTreeMap, HashMap};

use sheetsplit_io_xlsx::{
    EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecMergedRegion, Table, TableBuilder,
    convert_character_width_to_stored_width, estimate_unicode_string_width,
};

use crate::projection::{IndexMap, project_dimensions, project_merged_region, project_row};
use crate::spec::{SpecPartition, SpecPartitionSet, SplitError};

/// First row whose `key_col` cell text equals `key_label` exactly.
pub fn locate_header_row(
    table: &Table,
    key_col: usize,
    key_label: &str,
) -> Result<usize, SplitError> {
    table
        .iter_rows()
        .find(|(n_row, _)| table.cell_at(*n_row, key_col).value.to_text() == key_label)
        .map(|(n_row, _)| n_row)
        .ok_or_else(|| SplitError::HeaderNotFound {
            label: key_label.to_string(),
            col: key_col,
        })
}

/// Group the rows after `header_row` by trimmed key text.
///
/// Partitions keep first-occurrence order; blank keys are counted as excluded.
pub fn partition_by_key(table: &Table, header_row: usize, key_col: usize) -> SpecPartitionSet {
    let mut spec_set = SpecPartitionSet::default();
    let mut dict_idx_by_key: HashMap<String, usize> = HashMap::new();

    for (n_row, spec_row) in table.iter_rows() {
        if n_row <= header_row || spec_row.iter().all(|(_, cell)| cell.is_void()) {
            continue;
        }
        spec_set.cnt_rows_data += 1;

        let c_key = table.cell_at(n_row, key_col).value.to_text();
        let c_key = c_key.trim();
        if c_key.is_empty() {
            spec_set.cnt_rows_excluded += 1;
            continue;
        }
        match dict_idx_by_key.get(c_key) {
            Some(n_idx) => spec_set.partitions[*n_idx].rows.push(n_row),
            None => {
                dict_idx_by_key.insert(c_key.to_string(), spec_set.partitions.len());
                spec_set.partitions.push(SpecPartition {
                    key: c_key.to_string(),
                    rows: vec![n_row],
                });
            }
        }
    }

    log::debug!(
        "Partitioned {} data rows into {} keys ({} excluded)",
        spec_set.cnt_rows_data,
        spec_set.len(),
        spec_set.cnt_rows_excluded
    );
    spec_set
}

/// Build the output table of one partition.
///
/// Header rows `1..=header_row` keep their indices; partition rows follow in
/// order. Header merges are projected, data merges survive only when all of
/// their rows stay adjacent, and merges crossing the header boundary drop.
pub fn emit_partition(
    table: &Table,
    header_row: usize,
    partition: &SpecPartition,
    index_map: &IndexMap,
    policy_autofit: &SpecAutofitCellsPolicy,
) -> Table {
    let mut builder = TableBuilder::new(table.sheet_name());

    // #region Rows
    for (n_row, spec_row) in table.iter_rows().take_while(|(n_row, _)| *n_row <= header_row) {
        builder.set_row(n_row, project_row(spec_row, index_map));
    }
    let mut dict_row_new_by_src: HashMap<usize, usize> = HashMap::with_capacity(partition.rows.len());
    for (n_offset, n_row_src) in partition.rows.iter().enumerate() {
        let n_row_new = header_row + 1 + n_offset;
        dict_row_new_by_src.insert(*n_row_src, n_row_new);
        if let Some(spec_row) = table.row(*n_row_src) {
            builder.set_row(n_row_new, project_row(spec_row, index_map));
        }
    }
    // #endregion

    // #region Merges
    for region in table.merged_regions() {
        let region_rowed = if region.row_end <= header_row {
            Some(*region)
        } else if region.row_start > header_row {
            derive_data_region(region, &dict_row_new_by_src)
        } else {
            log::debug!(
                "Dropping merge {} crossing header row {header_row}",
                region.to_a1_range()
            );
            None
        };
        if let Some(region_new) = region_rowed.and_then(|r| project_merged_region(&r, index_map)) {
            builder.push_merged_region(region_new);
        }
    }
    // #endregion

    // #region Dimensions
    let (widths, heights_src) = project_dimensions(table.col_widths(), table.row_heights(), index_map);
    for (n_row, n_height) in heights_src {
        if n_row <= header_row {
            builder.set_row_height(n_row, n_height);
        } else if let Some(n_row_new) = dict_row_new_by_src.get(&n_row) {
            builder.set_row_height(*n_row_new, n_height);
        }
    }
    for (n_col, n_width) in &widths {
        builder.set_col_width(*n_col, *n_width);
    }
    // #endregion

    let table_emitted = builder.build();
    if !policy_autofit.is_enabled() {
        return table_emitted;
    }
    apply_autofit_widths(table_emitted, header_row, policy_autofit)
}

/// Renumber a data-area region, or `None` unless every row maps adjacently.
fn derive_data_region(
    region: &SpecMergedRegion,
    dict_row_new_by_src: &HashMap<usize, usize>,
) -> Option<SpecMergedRegion> {
    let n_row_start_new = *dict_row_new_by_src.get(&region.row_start)?;
    for (n_offset, n_row_src) in (region.row_start..=region.row_end).enumerate() {
        if dict_row_new_by_src.get(&n_row_src) != Some(&(n_row_start_new + n_offset)) {
            return None;
        }
    }
    Some(SpecMergedRegion::new(
        n_row_start_new,
        region.col_start,
        n_row_start_new + (region.row_end - region.row_start),
        region.col_end,
    ))
}

/// Recompute every column width from content: `min(max(min, len + pad), max)`.
fn apply_autofit_widths(
    table: Table,
    header_row: usize,
    policy_autofit: &SpecAutofitCellsPolicy,
) -> Table {
    let n_rows_body_max = policy_autofit
        .height_body_inferred_max
        .unwrap_or(usize::MAX);
    let mut dict_len_by_col: BTreeMap<usize, usize> =
        (1..=table.max_column()).map(|col| (col, 0)).collect();

    let mut n_rows_body_seen = 0usize;
    for (n_row, spec_row) in table.iter_rows() {
        let if_header = n_row <= header_row;
        if !if_header {
            n_rows_body_seen += 1;
        }
        let if_counted = match policy_autofit.rule_columns {
            EnumAutofitColumnsRule::Header => if_header,
            EnumAutofitColumnsRule::Body => !if_header && n_rows_body_seen <= n_rows_body_max,
            EnumAutofitColumnsRule::All => if_header || n_rows_body_seen <= n_rows_body_max,
            EnumAutofitColumnsRule::None => false,
        };
        if !if_counted {
            continue;
        }
        for (n_col, cell) in spec_row.iter() {
            let n_len = estimate_unicode_string_width(&cell.value.to_text());
            if let Some(n_len_max) = dict_len_by_col.get_mut(&n_col) {
                *n_len_max = (*n_len_max).max(n_len);
            }
        }
    }

    let mut builder = TableBuilder::from(table);
    for (n_col, n_len) in dict_len_by_col {
        let n_width_char = policy_autofit.derive_width(n_len) as f64;
        builder.set_col_width(n_col, convert_character_width_to_stored_width(n_width_char));
    }
    builder.build()
}
