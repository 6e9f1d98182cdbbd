//! Job staging store: one directory per opaque handle under a fixed root.
//!
//! Callers only ever hand in a [`JobHandle`] and a plain file name; every path
//! is derived here and checked against the root before it is touched.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::archive::build_zip_archive;
use crate::report::{ReportStage, ReportStageBuilder};
use crate::spec::{JobHandle, SpecStageOptions, StagingError};
use crate::util::{
    calculate_worker_limit, should_skip_file_conflict, validate_destination_path_safety,
    validate_file_name,
};

#[derive(Debug)]
struct SpecStageTaskFile<'a> {
    name_file: &'a str,
    path_file_dst: PathBuf,
    bytes: &'a [u8],
}

/// Root directory holding all staged jobs.
#[derive(Debug, Clone)]
pub struct JobStore {
    path_dir_root: PathBuf,
}

impl JobStore {
    /// Open (and create if needed) the store at `dir_root`.
    ///
    /// A symlinked root is refused.
    pub fn open<P: AsRef<Path>>(dir_root: P) -> Result<Self, StagingError> {
        let path_dir_root = dir_root.as_ref().to_path_buf();
        let err_init = |message: String| StagingError::RootInitFailed {
            path: path_dir_root.clone(),
            message,
        };

        fs::create_dir_all(&path_dir_root).map_err(|e| err_init(e.to_string()))?;
        let meta_dir_root = fs::symlink_metadata(&path_dir_root).map_err(|e| err_init(e.to_string()))?;
        if meta_dir_root.file_type().is_symlink() {
            return Err(err_init(
                "Staging root path must not be a symbolic link.".to_string(),
            ));
        }
        if !meta_dir_root.is_dir() {
            return Err(err_init("Staging root is not a directory.".to_string()));
        }
        let path_dir_root = fs::canonicalize(&path_dir_root).map_err(|e| err_init(e.to_string()))?;

        Ok(Self { path_dir_root })
    }

    pub fn root(&self) -> &Path {
        &self.path_dir_root
    }

    /// Allocate a fresh job directory.
    pub fn create_job(&self) -> Result<JobWorkspace, StagingError> {
        let handle = JobHandle::new_v4();
        let path_dir_job = self.path_dir_root.join(handle.as_dir_name());
        fs::create_dir(&path_dir_job)?;
        log::debug!("Created job {handle}");
        Ok(JobWorkspace {
            handle,
            path_dir_job,
        })
    }

    /// Path of a staged file, checked for containment, symlinks and existence.
    pub fn resolve_file(
        &self,
        handle: JobHandle,
        file_name: &str,
    ) -> Result<PathBuf, StagingError> {
        validate_file_name(file_name)
            .map_err(|_| StagingError::InvalidFileName(file_name.to_string()))?;
        let path_dir_job = self.derive_job_dir(handle)?;
        let path_file = path_dir_job.join(file_name);
        validate_destination_path_safety(&path_file, &self.path_dir_root)
            .map_err(StagingError::UnsafePath)?;
        if !path_file.is_file() {
            return Err(StagingError::FileNotFound(PathBuf::from(file_name)));
        }
        Ok(path_file)
    }

    /// Delete a job directory. `Ok(false)` when it did not exist.
    pub fn remove_job(&self, handle: JobHandle) -> Result<bool, StagingError> {
        let path_dir_job = self.path_dir_root.join(handle.as_dir_name());
        match fs::symlink_metadata(&path_dir_job) {
            Ok(meta) if meta.is_dir() => {
                fs::remove_dir_all(&path_dir_job)?;
                log::debug!("Removed job {handle}");
                Ok(true)
            }
            Ok(_) => Err(StagingError::UnsafePath(format!(
                "Job path is not a directory: {}",
                path_dir_job.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every job directory older than `max_age`; returns how many went.
    ///
    /// Entries whose name is not a job handle are left alone.
    pub fn purge_expired(&self, max_age: Duration) -> Result<usize, StagingError> {
        let time_now = SystemTime::now();
        let mut n_removed = 0;

        for entry in fs::read_dir(&self.path_dir_root)? {
            let entry = entry?;
            let Some(c_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(handle) = JobHandle::parse(&c_name) else {
                continue;
            };
            if handle.as_dir_name() != c_name {
                continue;
            }
            let Ok(meta) = fs::symlink_metadata(entry.path()) else {
                continue;
            };
            if !meta.is_dir() {
                continue;
            }
            let if_expired = meta
                .modified()
                .ok()
                .and_then(|t| time_now.duration_since(t).ok())
                .is_some_and(|age| age > max_age);
            if !if_expired {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => n_removed += 1,
                Err(e) => log::warn!("Failed to purge job {handle}: {e}"),
            }
        }

        if n_removed > 0 {
            log::info!("Purged {n_removed} expired job(s)");
        }
        Ok(n_removed)
    }

    fn derive_job_dir(&self, handle: JobHandle) -> Result<PathBuf, StagingError> {
        let path_dir_job = self.path_dir_root.join(handle.as_dir_name());
        match fs::symlink_metadata(&path_dir_job) {
            Ok(meta) if meta.is_dir() => Ok(path_dir_job),
            Ok(_) => Err(StagingError::UnsafePath(format!(
                "Job path is not a directory: {}",
                path_dir_job.display()
            ))),
            Err(_) => Err(StagingError::JobNotFound(handle)),
        }
    }
}

/// One job directory ready to receive files.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    handle: JobHandle,
    path_dir_job: PathBuf,
}

impl JobWorkspace {
    pub fn handle(&self) -> JobHandle {
        self.handle
    }

    pub fn path(&self) -> &Path {
        &self.path_dir_job
    }

    /// Write `(file_name, bytes)` pairs into the job directory.
    ///
    /// Per-file failures are recorded in the report; results keep input order.
    pub fn commit_files<S, B>(&self, files: &[(S, B)], spec_options: &SpecStageOptions) -> ReportStage
    where
        S: AsRef<str> + Sync,
        B: AsRef<[u8]> + Sync,
    {
        let mut builder_stage_report = ReportStageBuilder::default();
        builder_stage_report.add_requested(files.len() as u64);

        let mut set_names: HashSet<&str> = HashSet::with_capacity(files.len());
        let mut l_tasks: Vec<SpecStageTaskFile<'_>> = Vec::with_capacity(files.len());
        for (c_name, bytes) in files {
            let name_file = c_name.as_ref();
            let path_file_dst = self.path_dir_job.join(name_file);
            if let Err(message) = validate_file_name(name_file) {
                builder_stage_report.add_error(PathBuf::from(name_file), message);
                continue;
            }
            if !set_names.insert(name_file) {
                builder_stage_report.add_error(
                    path_file_dst,
                    format!("Duplicate file name in batch: {name_file}"),
                );
                continue;
            }
            if should_skip_file_conflict(
                &path_file_dst,
                spec_options.rule_conflict_file,
                &mut builder_stage_report,
            ) {
                continue;
            }
            l_tasks.push(SpecStageTaskFile {
                name_file,
                path_file_dst,
                bytes: bytes.as_ref(),
            });
        }

        let n_workers_max = calculate_worker_limit(spec_options.num_workers_max);
        flush_file_write_tasks(
            l_tasks,
            &self.path_dir_job,
            n_workers_max,
            &mut builder_stage_report,
        );

        let report = builder_stage_report.build();
        log::info!("{}", report.format(&format!("[STAGE] job={}", self.handle)));
        report
    }

    /// Zip `files` and store the archive as `archive_name`; returns the name.
    pub fn commit_archive<S, B>(
        &self,
        archive_name: &str,
        files: &[(S, B)],
    ) -> Result<String, StagingError>
    where
        S: AsRef<str>,
        B: AsRef<[u8]>,
    {
        validate_file_name(archive_name)
            .map_err(|_| StagingError::InvalidFileName(archive_name.to_string()))?;
        let path_archive = self.path_dir_job.join(archive_name);
        validate_destination_path_safety(&path_archive, &self.path_dir_job)
            .map_err(StagingError::UnsafePath)?;

        let bytes = build_zip_archive(files)?;
        fs::write(&path_archive, &bytes)?;
        log::info!(
            "Wrote archive {archive_name} ({} entries, {} bytes) for job {}",
            files.len(),
            bytes.len(),
            self.handle
        );
        Ok(archive_name.to_string())
    }
}

fn write_one(spec_task: &SpecStageTaskFile<'_>, path_dir_job: &Path) -> Result<u64, String> {
    validate_destination_path_safety(&spec_task.path_file_dst, path_dir_job)?;
    fs::write(&spec_task.path_file_dst, spec_task.bytes).map_err(|e| e.to_string())?;
    Ok(spec_task.bytes.len() as u64)
}

fn write_serial(
    l_tasks: &[SpecStageTaskFile<'_>],
    path_dir_job: &Path,
) -> Vec<Result<u64, String>> {
    l_tasks
        .iter()
        .map(|spec_task| write_one(spec_task, path_dir_job))
        .collect()
}

fn apply_write_results(
    l_tasks: &[SpecStageTaskFile<'_>],
    l_results: Vec<Result<u64, String>>,
    builder_stage_report: &mut ReportStageBuilder,
) {
    for (spec_task, res_write) in l_tasks.iter().zip(l_results) {
        match res_write {
            Ok(n_bytes) => builder_stage_report.add_written(spec_task.name_file.to_string(), n_bytes),
            Err(msg) => builder_stage_report.add_error(spec_task.path_file_dst.clone(), msg),
        }
    }
}

fn flush_file_write_tasks(
    l_tasks: Vec<SpecStageTaskFile<'_>>,
    path_dir_job: &Path,
    n_workers_max: usize,
    builder_stage_report: &mut ReportStageBuilder,
) {
    if l_tasks.is_empty() {
        return;
    }

    if n_workers_max <= 1 || l_tasks.len() == 1 {
        let l_results = write_serial(&l_tasks, path_dir_job);
        apply_write_results(&l_tasks, l_results, builder_stage_report);
        return;
    }

    let Ok(thread_pool) = ThreadPoolBuilder::new().num_threads(n_workers_max).build() else {
        builder_stage_report.add_warning(format!(
            "Failed to initialize thread pool (workers={n_workers_max}); fallback to serial write."
        ));
        let l_results = write_serial(&l_tasks, path_dir_job);
        apply_write_results(&l_tasks, l_results, builder_stage_report);
        return;
    };

    let l_results = thread_pool.install(|| {
        l_tasks
            .par_iter()
            .map(|spec_task| write_one(spec_task, path_dir_job))
            .collect::<Vec<_>>()
    });
    apply_write_results(&l_tasks, l_results, builder_stage_report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::EnumStageConflictStrategy;

    fn files(l_pairs: &[(&str, &str)]) -> Vec<(String, Vec<u8>)> {
        l_pairs
            .iter()
            .map(|(c_name, c_body)| (c_name.to_string(), c_body.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn test_create_commit_and_resolve() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::open(tmp.path().join("jobs")).unwrap();
        let workspace = store.create_job().unwrap();

        let report = workspace.commit_files(
            &files(&[("a.xlsx", "aaa"), ("b.xlsx", "bb"), ("c.xlsx", "c")]),
            &SpecStageOptions::default(),
        );
        assert_eq!(report.cnt_written, 3);
        assert_eq!(report.cnt_bytes, 6);
        assert_eq!(report.files_written, vec!["a.xlsx", "b.xlsx", "c.xlsx"]);
        assert_eq!(report.error_count(), 0);

        let path_file = store.resolve_file(workspace.handle(), "b.xlsx").unwrap();
        assert_eq!(std::fs::read(path_file).unwrap(), b"bb");

        let handle = JobHandle::parse(&workspace.handle().to_string()).unwrap();
        assert!(store.resolve_file(handle, "a.xlsx").is_ok());
    }

    #[test]
    fn test_commit_records_bad_names_and_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::open(tmp.path()).unwrap();
        let workspace = store.create_job().unwrap();

        let report = workspace.commit_files(
            &files(&[("../x.xlsx", "x"), ("ok.xlsx", "1"), ("ok.xlsx", "2")]),
            &SpecStageOptions {
                num_workers_max: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(report.cnt_written, 1);
        assert_eq!(report.error_count(), 2);
        assert!(!tmp.path().join("x.xlsx").exists());
        assert_eq!(
            std::fs::read(workspace.path().join("ok.xlsx")).unwrap(),
            b"1"
        );
    }

    #[test]
    fn test_commit_conflict_policies() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::open(tmp.path()).unwrap();
        let workspace = store.create_job().unwrap();
        let l_first = files(&[("a.xlsx", "old")]);
        let l_second = files(&[("a.xlsx", "new")]);
        workspace.commit_files(&l_first, &SpecStageOptions::default());

        let report_skip = workspace.commit_files(
            &l_second,
            &SpecStageOptions {
                rule_conflict_file: EnumStageConflictStrategy::Skip,
                ..Default::default()
            },
        );
        assert_eq!(report_skip.cnt_skipped, 1);
        assert_eq!(std::fs::read(workspace.path().join("a.xlsx")).unwrap(), b"old");

        let report_err = workspace.commit_files(
            &l_second,
            &SpecStageOptions {
                rule_conflict_file: EnumStageConflictStrategy::Error,
                ..Default::default()
            },
        );
        assert_eq!(report_err.error_count(), 1);

        let report_over = workspace.commit_files(&l_second, &SpecStageOptions::default());
        assert_eq!(report_over.cnt_written, 1);
        assert_eq!(std::fs::read(workspace.path().join("a.xlsx")).unwrap(), b"new");
    }

    #[test]
    fn test_commit_parallel_keeps_input_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::open(tmp.path()).unwrap();
        let workspace = store.create_job().unwrap();
        let l_files: Vec<(String, Vec<u8>)> = (0..40)
            .map(|n_idx| (format!("f{n_idx:02}.xlsx"), vec![b'x'; n_idx + 1]))
            .collect();

        let report = workspace.commit_files(
            &l_files,
            &SpecStageOptions {
                num_workers_max: Some(4),
                ..Default::default()
            },
        );
        assert_eq!(report.cnt_written, 40);
        let l_expected: Vec<String> = l_files.iter().map(|(c_name, _)| c_name.clone()).collect();
        assert_eq!(report.files_written, l_expected);
    }

    #[test]
    fn test_commit_archive_and_resolve() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::open(tmp.path()).unwrap();
        let workspace = store.create_job().unwrap();

        let c_name = workspace
            .commit_archive("IM_Split_20240115.zip", &files(&[("a.xlsx", "a")]))
            .unwrap();
        let path_zip = store.resolve_file(workspace.handle(), &c_name).unwrap();
        let archive = zip::ZipArchive::new(std::fs::File::open(path_zip).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);

        assert!(matches!(
            workspace.commit_archive("../evil.zip", &files(&[])),
            Err(StagingError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_resolve_file_rejects_unknown_and_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::open(tmp.path()).unwrap();
        let workspace = store.create_job().unwrap();

        assert!(matches!(
            store.resolve_file(workspace.handle(), "missing.xlsx"),
            Err(StagingError::FileNotFound(_))
        ));
        assert!(matches!(
            store.resolve_file(workspace.handle(), "../../etc/passwd"),
            Err(StagingError::InvalidFileName(_))
        ));
        assert!(matches!(
            store.resolve_file(JobHandle::new_v4(), "a.xlsx"),
            Err(StagingError::JobNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_open_rejects_symlink_root_and_resolve_rejects_symlink_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path_real = tmp.path().join("real");
        std::fs::create_dir_all(&path_real).unwrap();
        let path_link = tmp.path().join("link");
        std::os::unix::fs::symlink(&path_real, &path_link).unwrap();
        assert!(matches!(
            JobStore::open(&path_link),
            Err(StagingError::RootInitFailed { .. })
        ));

        let store = JobStore::open(&path_real).unwrap();
        let workspace = store.create_job().unwrap();
        let path_secret = tmp.path().join("secret.txt");
        std::fs::write(&path_secret, b"s").unwrap();
        std::os::unix::fs::symlink(&path_secret, workspace.path().join("s.xlsx")).unwrap();
        assert!(matches!(
            store.resolve_file(workspace.handle(), "s.xlsx"),
            Err(StagingError::UnsafePath(_))
        ));
    }

    #[test]
    fn test_remove_and_purge() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::open(tmp.path()).unwrap();
        let workspace_a = store.create_job().unwrap();
        let workspace_b = store.create_job().unwrap();
        std::fs::create_dir(tmp.path().join("not-a-job")).unwrap();

        assert!(store.remove_job(workspace_a.handle()).unwrap());
        assert!(!store.remove_job(workspace_a.handle()).unwrap());

        assert_eq!(store.purge_expired(Duration::from_secs(3600)).unwrap(), 0);
        assert!(workspace_b.path().exists());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.purge_expired(Duration::from_millis(1)).unwrap(), 1);
        assert!(!workspace_b.path().exists());
        assert!(tmp.path().join("not-a-job").exists());
    }
}
