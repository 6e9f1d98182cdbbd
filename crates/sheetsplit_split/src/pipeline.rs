//! Step-checked driver for one key split.
//!
//! `Idle -> HeaderLocated -> Partitioned -> Emitted`; any failure moves the run
//! to `Errored`, and a step called out of order fails with `InvalidState`.

use sheetsplit_io_xlsx::{SpecAutofitCellsPolicy, Table};

use crate::grouping::{emit_partition, locate_header_row, partition_by_key};
use crate::projection::IndexMap;
use crate::spec::{SpecEmittedPartition, SpecPartitionSet, SplitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSplitRunState {
    Idle,
    HeaderLocated,
    Partitioned,
    Emitted,
    Errored,
}

impl EnumSplitRunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::HeaderLocated => "header_located",
            Self::Partitioned => "partitioned",
            Self::Emitted => "emitted",
            Self::Errored => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Emitted | Self::Errored)
    }
}

/// One split over a borrowed source table.
#[derive(Debug)]
pub struct SplitRun<'a> {
    table: &'a Table,
    index_map: &'a IndexMap,
    policy_autofit: &'a SpecAutofitCellsPolicy,
    key_col: usize,
    key_label: String,
    enum_state: EnumSplitRunState,
    header_row: Option<usize>,
    spec_partitions: Option<SpecPartitionSet>,
}

impl<'a> SplitRun<'a> {
    pub fn new(
        table: &'a Table,
        index_map: &'a IndexMap,
        policy_autofit: &'a SpecAutofitCellsPolicy,
        key_col: usize,
        key_label: impl Into<String>,
    ) -> Self {
        Self {
            table,
            index_map,
            policy_autofit,
            key_col,
            key_label: key_label.into(),
            enum_state: EnumSplitRunState::Idle,
            header_row: None,
            spec_partitions: None,
        }
    }

    pub fn state(&self) -> EnumSplitRunState {
        self.enum_state
    }

    pub fn header_row(&self) -> Option<usize> {
        self.header_row
    }

    pub fn partitions(&self) -> Option<&SpecPartitionSet> {
        self.spec_partitions.as_ref()
    }

    pub fn locate_header(&mut self) -> Result<usize, SplitError> {
        self.expect_state(EnumSplitRunState::Idle, "locate header")?;
        match locate_header_row(self.table, self.key_col, &self.key_label) {
            Ok(n_row) => {
                log::debug!("Header {:?} found at row {n_row}", self.key_label);
                self.header_row = Some(n_row);
                self.enum_state = EnumSplitRunState::HeaderLocated;
                Ok(n_row)
            }
            Err(e) => {
                self.enum_state = EnumSplitRunState::Errored;
                Err(e)
            }
        }
    }

    pub fn partition(&mut self) -> Result<&SpecPartitionSet, SplitError> {
        self.expect_state(EnumSplitRunState::HeaderLocated, "partition")?;
        let Some(header_row) = self.header_row else {
            self.enum_state = EnumSplitRunState::Errored;
            return Err(SplitError::InvalidState {
                step: "partition",
                state: self.enum_state.as_str(),
            });
        };
        self.enum_state = EnumSplitRunState::Partitioned;
        Ok(self
            .spec_partitions
            .insert(partition_by_key(self.table, header_row, self.key_col)))
    }

    /// Emit one projected table per partition, in partition order.
    pub fn emit(&mut self) -> Result<Vec<SpecEmittedPartition>, SplitError> {
        self.expect_state(EnumSplitRunState::Partitioned, "emit")?;
        let (Some(header_row), Some(spec_partitions)) =
            (self.header_row, self.spec_partitions.as_ref())
        else {
            self.enum_state = EnumSplitRunState::Errored;
            return Err(SplitError::InvalidState {
                step: "emit",
                state: self.enum_state.as_str(),
            });
        };

        let l_emitted = spec_partitions
            .partitions
            .iter()
            .map(|partition| SpecEmittedPartition {
                key: partition.key.clone(),
                cnt_rows: partition.rows.len(),
                table: emit_partition(
                    self.table,
                    header_row,
                    partition,
                    self.index_map,
                    self.policy_autofit,
                ),
            })
            .collect();
        self.enum_state = EnumSplitRunState::Emitted;
        Ok(l_emitted)
    }

    /// Run every remaining step.
    pub fn run_to_end(&mut self) -> Result<Vec<SpecEmittedPartition>, SplitError> {
        if self.enum_state == EnumSplitRunState::Idle {
            self.locate_header()?;
        }
        if self.enum_state == EnumSplitRunState::HeaderLocated {
            self.partition()?;
        }
        self.emit()
    }

    fn expect_state(
        &mut self,
        enum_expected: EnumSplitRunState,
        step: &'static str,
    ) -> Result<(), SplitError> {
        if self.enum_state == enum_expected {
            return Ok(());
        }
        let state = self.enum_state.as_str();
        if !self.enum_state.is_terminal() {
            self.enum_state = EnumSplitRunState::Errored;
        }
        Err(SplitError::InvalidState { step, state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsplit_io_xlsx::{EnumCellValue, SpecCell, TableBuilder};

    fn text(val: &str) -> SpecCell {
        SpecCell::new(EnumCellValue::String(val.to_string()))
    }

    fn small_table() -> Table {
        let mut builder = TableBuilder::new("IM");
        builder
            .set_cell(1, 1, text("Supplier"))
            .set_cell(2, 1, text("A"))
            .set_cell(3, 1, text("B"));
        builder.build()
    }

    #[test]
    fn test_run_walks_states_in_order() {
        let table = small_table();
        let index_map = IndexMap::identity(1);
        let policy = SpecAutofitCellsPolicy::default();
        let mut run = SplitRun::new(&table, &index_map, &policy, 1, "Supplier");

        assert_eq!(run.state(), EnumSplitRunState::Idle);
        assert_eq!(run.locate_header().unwrap(), 1);
        assert_eq!(run.state(), EnumSplitRunState::HeaderLocated);
        assert_eq!(run.partition().unwrap().len(), 2);
        let l_emitted = run.emit().unwrap();
        assert_eq!(run.state(), EnumSplitRunState::Emitted);
        assert_eq!(l_emitted.len(), 2);
        assert_eq!(l_emitted[1].key, "B");
        assert_eq!(l_emitted[1].table.cell_at(2, 1).value.to_text(), "B");

        assert!(matches!(
            run.emit(),
            Err(SplitError::InvalidState {
                step: "emit",
                state: "emitted"
            })
        ));
        assert_eq!(run.state(), EnumSplitRunState::Emitted);
    }

    #[test]
    fn test_out_of_order_step_errors_the_run() {
        let table = small_table();
        let index_map = IndexMap::identity(1);
        let policy = SpecAutofitCellsPolicy::default();
        let mut run = SplitRun::new(&table, &index_map, &policy, 1, "Supplier");

        assert!(matches!(
            run.emit(),
            Err(SplitError::InvalidState { state: "idle", .. })
        ));
        assert_eq!(run.state(), EnumSplitRunState::Errored);
        assert!(run.locate_header().is_err());
    }

    #[test]
    fn test_missing_header_errors_the_run() {
        let table = small_table();
        let index_map = IndexMap::identity(1);
        let policy = SpecAutofitCellsPolicy::default();
        let mut run = SplitRun::new(&table, &index_map, &policy, 1, "Vendor");

        assert!(matches!(
            run.run_to_end(),
            Err(SplitError::HeaderNotFound { .. })
        ));
        assert_eq!(run.state(), EnumSplitRunState::Errored);
        assert!(run.partitions().is_none());
    }
}
