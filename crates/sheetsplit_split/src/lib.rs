//! `sheetsplit_split` v1:
//! Key split, voucher split and roster reconciliation over decoded tables.
//!
//! Modules:
//! - `conf`       : constants and default presets
//! - `spec`       : options, partition models, errors
//! - `projection` : column deletion index map and table projection
//! - `grouping`   : header location, key partitioning, partition emission
//! - `pipeline`   : step-checked split run
//! - `naming`     : partition names, file names, date stamps
//! - `contacts`   : key -> contact target lookup
//! - `notify`     : share links and email drafts
//! - `voucher`    : one workbook per sheet
//! - `reconcile`  : roster vs results role comparison
//! - `report`     : run report model
//! - `service`    : staged end-to-end entry points
pub mod conf;
pub mod contacts;
pub mod grouping;
pub mod naming;
pub mod notify;
pub mod pipeline;
pub mod projection;
pub mod reconcile;
pub mod report;
pub mod service;
pub mod spec;
pub mod voucher;

pub use contacts::SpecContactBook;
pub use grouping::{emit_partition, locate_header_row, partition_by_key};
pub use naming::{
    SpecFileNameRegistry, derive_date_stamp, derive_output_name, derive_partition_name,
    derive_safe_file_stem,
};
pub use notify::{
    LinkNotifier, Notifier, SpecEmailDraft, SpecMailEntry, derive_whatsapp_link,
    derive_whatsapp_message, plan_email_drafts,
};
pub use pipeline::{EnumSplitRunState, SplitRun};
pub use projection::{IndexMap, build_index_map, project_merged_region, project_row, project_table};
pub use reconcile::{
    ReportRoleCheck, SpecRoleMismatch, SpecRosterLayout, compare_roles, inspect_roster_layout,
    write_mismatch_report,
};
pub use report::{ReportSplit, ReportSplitBuilder, SpecPartitionOutcome, SpecSheetOutcome};
pub use service::{SpecSplitContacts, check_roles, derive_fatal_report, split_by_key, split_sheets};
pub use spec::{
    EnumDateFallback, NotifyError, ProjectionError, ReconcileError, SpecEmailOptions,
    SpecEmittedPartition, SpecPartition, SpecPartitionSet, SpecRoleCheckOptions,
    SpecSplitOptions, SpecVoucherOptions, SplitError,
};
pub use voucher::{SpecVoucherFields, SpecVoucherSheet, derive_voucher_file_name, plan_voucher_sheets};
