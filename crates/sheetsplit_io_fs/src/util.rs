use std::fs;
use std::io;
use std::path::{Component, Path};

use crate::report::ReportStageBuilder;
use crate::spec::EnumStageConflictStrategy;

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Accept only a single normal path component without separators.
pub(crate) fn validate_file_name(file_name: &str) -> Result<(), String> {
    if file_name.is_empty() || file_name.trim() != file_name {
        return Err(format!("File name is empty or padded: {file_name:?}"));
    }
    if file_name.contains(['/', '\\', '\0']) {
        return Err(format!("File name contains a separator: {file_name:?}"));
    }
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(format!("File name is not a plain name: {file_name:?}")),
    }
}

/// Check that `path_item` stays under `path_dir_root` and touches no symlink.
pub(crate) fn validate_destination_path_safety(
    path_item: &Path,
    path_dir_root: &Path,
) -> Result<(), String> {
    if !path_item.starts_with(path_dir_root) {
        return Err(format!(
            "Path escapes staging root: {} (root={})",
            path_item.display(),
            path_dir_root.display()
        ));
    }

    let path_rel = path_item.strip_prefix(path_dir_root).map_err(|_| {
        format!(
            "Path escapes staging root: {} (root={})",
            path_item.display(),
            path_dir_root.display()
        )
    })?;
    let mut path_cursor = path_dir_root.to_path_buf();
    for part_rel in path_rel.components() {
        let Component::Normal(part) = part_rel else {
            return Err(format!(
                "Path has a non-normal component: {}",
                path_item.display()
            ));
        };
        path_cursor.push(part);
        match fs::symlink_metadata(&path_cursor) {
            Ok(meta_cursor) => {
                if meta_cursor.file_type().is_symlink() {
                    return Err(format!(
                        "Path traverses symlink component: {}",
                        path_cursor.display()
                    ));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(format!(
                    "Failed to inspect path component {} ({e})",
                    path_cursor.display()
                ));
            }
        }
    }
    Ok(())
}

/// Apply conflict policy to an existing file; `true` means do not write.
pub(crate) fn should_skip_file_conflict(
    path_dst: &Path,
    rule_conflict: EnumStageConflictStrategy,
    builder_stage_report: &mut ReportStageBuilder,
) -> bool {
    if !path_dst.exists() {
        return false;
    }
    if path_dst.is_dir() {
        builder_stage_report.add_error(
            path_dst.to_path_buf(),
            format!("Destination is a directory: {}", path_dst.display()),
        );
        return true;
    }

    match rule_conflict {
        EnumStageConflictStrategy::Skip => {
            builder_stage_report.add_skipped();
            true
        }
        EnumStageConflictStrategy::Error => {
            builder_stage_report.add_error(
                path_dst.to_path_buf(),
                format!("Destination exists: {}", path_dst.display()),
            );
            true
        }
        EnumStageConflictStrategy::Overwrite => false,
    }
}

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
