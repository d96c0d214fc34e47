//! Batch runs over a directory of source configurations.

use std::path::{Path, PathBuf};

use tracing::{error, info, instrument, warn};

use kbimport_knowledge::SyncOptions;
use kbimport_shared::{ImportError, Result, is_config_file};

use crate::pipeline::{ImportResult, ProgressReporter, import_config_file};

/// Outcome of processing every configuration in a directory.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<(PathBuf, ImportResult)>,
    pub failed: Vec<(PathBuf, ImportError)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Every `.json` / `.toml` file directly inside `dir`, sorted by path.
pub fn list_config_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| ImportError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ImportError::io(dir, e))?.path();
        if path.is_file() && is_config_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Import every configuration in `dir`, one after another.
///
/// A failing configuration is logged and recorded; the next one still runs.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub async fn run_all(
    dir: &Path,
    options: SyncOptions,
    progress: &dyn ProgressReporter,
) -> Result<BatchSummary> {
    let files = list_config_files(dir)?;
    let mut summary = BatchSummary::default();

    if files.is_empty() {
        warn!("no configuration files found");
        return Ok(summary);
    }

    for path in files {
        match import_config_file(&path, options, progress).await {
            Ok(result) => summary.succeeded.push((path, result)),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to process configuration");
                summary.failed.push((path, e));
            }
        }
    }

    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "batch complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;

    #[test]
    fn lists_only_config_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.toml", "a.json", "notes.txt", "c.yaml"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = list_config_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.toml"]);
    }

    #[test]
    fn bundled_configs_build_extractors() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../config");
        let files = list_config_files(&dir).unwrap();
        assert_eq!(files.len(), 3);
        for file in files {
            let config = kbimport_shared::load_source_config(&file).unwrap();
            crate::pipeline::SourceExtractor::from_config(&config).unwrap();
        }
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = list_config_files(Path::new("/nonexistent/kbimport-config")).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[tokio::test]
    async fn failing_configs_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a_unknown.json"),
            r#"{"type": "rss", "data": {}, "openwebui": {"knowledge_name": "x"}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b_broken.json"), "{ not json").unwrap();
        std::fs::write(
            dir.path().join("c_bad_ext.toml"),
            "type = \"csv_excel\"\n\
             [data]\n\
             file_path = \"items.parquet\"\n\
             [openwebui]\n\
             knowledge_name = \"items\"\n",
        )
        .unwrap();

        let summary = run_all(dir.path(), SyncOptions::default(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(summary.total(), 3);
        assert!(summary.succeeded.is_empty());
        assert!(summary.failed.iter().all(|(_, e)| e.is_config()));
    }

    #[tokio::test]
    async fn empty_directory_is_empty_summary() {
        let dir = tempfile::tempdir().unwrap();
        let summary = run_all(dir.path(), SyncOptions::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(summary.total(), 0);
    }
}
