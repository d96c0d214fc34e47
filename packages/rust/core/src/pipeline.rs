//! End-to-end import pipeline: config → extractor → records → knowledge store.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use kbimport_crawler::WebCrawler;
use kbimport_events::EventsApiExtractor;
use kbimport_knowledge::{SyncOptions, SyncProgress, SyncReport, Synchronizer};
use kbimport_shared::{
    DocumentRecord, Extractor, KnowledgeTarget, Result, SourceConfig, SourceKind,
    load_source_config,
};
use kbimport_tabular::TabularExtractor;

// ---------------------------------------------------------------------------
// Extractor dispatch
// ---------------------------------------------------------------------------

/// One extractor per supported source type.
pub enum SourceExtractor {
    Tabular(TabularExtractor),
    Web(WebCrawler),
    EventsApi(EventsApiExtractor),
}

impl SourceExtractor {
    /// Pick and build the extractor for `config.type`.
    ///
    /// Unknown types and invalid `data` blocks are configuration errors.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Ok(match config.kind()? {
            SourceKind::Tabular => Self::Tabular(TabularExtractor::new(config.data_as()?)?),
            SourceKind::Web => Self::Web(WebCrawler::new(config.data_as()?)?),
            SourceKind::EventsApi => Self::EventsApi(EventsApiExtractor::new(config.data_as()?)?),
        })
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Tabular(e) => e.kind(),
            Self::Web(e) => e.kind(),
            Self::EventsApi(e) => e.kind(),
        }
    }

    pub async fn extract(&self) -> Result<Vec<DocumentRecord>> {
        match self {
            Self::Tabular(e) => e.extract().await,
            Self::Web(e) => e.extract().await,
            Self::EventsApi(e) => e.extract().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Result of importing one source configuration.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub source: SourceKind,
    /// Number of records extracted.
    pub records: usize,
    pub report: SyncReport,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each record is uploaded.
    fn document(&self, file_name: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ImportResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document(&self, _file_name: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &ImportResult) {}
}

/// Adapts a `ProgressReporter` to the `SyncProgress` interface.
struct PipelineSyncProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl SyncProgress for PipelineSyncProgress<'_> {
    fn document(&self, current: usize, total: usize, file_name: &str) {
        self.inner.document(file_name, current, total);
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Extract records for `config` and publish them into `target`.
///
/// The extractor is built before anything touches the remote store, so a
/// configuration error never mutates a collection.
#[instrument(skip_all, fields(source = %config.source_type, collection = %target.collection))]
pub async fn run_import(
    config: &SourceConfig,
    target: &KnowledgeTarget,
    options: SyncOptions,
    progress: &dyn ProgressReporter,
) -> Result<ImportResult> {
    let start = Instant::now();

    let extractor = SourceExtractor::from_config(config)?;
    let source = extractor.kind();

    progress.phase(&format!("Extracting {source} data"));
    let records = extractor.extract().await?;
    info!(%source, records = records.len(), "extraction complete");
    if records.is_empty() {
        warn!("extraction produced no records; the collection will still be refreshed");
    }

    progress.phase("Updating knowledge");
    let synchronizer = Synchronizer::new(target, options)?;
    let report = synchronizer
        .sync(&records, &PipelineSyncProgress { inner: progress })
        .await?;

    let result = ImportResult {
        source,
        records: records.len(),
        report,
        elapsed: start.elapsed(),
    };

    info!(
        uploaded = result.report.uploaded,
        skipped = result.report.skipped,
        failed = result.report.failed.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "import complete"
    );
    progress.done(&result);

    Ok(result)
}

/// Load a configuration file and import it, resolving credentials from the
/// process environment.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn import_config_file(
    path: &Path,
    options: SyncOptions,
    progress: &dyn ProgressReporter,
) -> Result<ImportResult> {
    info!("processing configuration");
    let config = load_source_config(path)?;
    let target = config.knowledge_target();
    run_import(&config, &target, options, progress).await
}
