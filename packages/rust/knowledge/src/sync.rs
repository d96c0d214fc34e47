//! Knowledge synchronizer: resolve the collection, then upload and attach
//! every record.
//!
//! Each upload attempt stages the content in its own temporary file, which
//! is removed when the attempt ends. Failures are classified:
//! - success → attach
//! - duplicate content (structured `detail` field) → skip, no retry
//! - HTTP 405 → skip
//! - anything else → retry with exponential backoff, then fail that record

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, error, info, instrument, warn};

use kbimport_shared::{DocumentRecord, ImportError, KnowledgeTarget, Result};

use crate::client::{KnowledgeClient, KnowledgeCollection, UploadedFile};
use crate::tokens::{O200kTokenCounter, TokenAccountant, TokenCounter};

/// Marker the store puts in `detail` when it already holds identical content.
const DUPLICATE_MARKER: &str = "Duplicate content detected";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles after each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after failed attempt number `attempt` (0-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.min(16))
    }
}

/// Tunables for one synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Wait after resetting an existing collection.
    pub reset_settle: Duration,
    pub retry: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            reset_settle: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Final result of uploading one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(UploadedFile),
    /// The store already holds identical content.
    Duplicate,
    /// The store answered 405 Method Not Allowed.
    NotAllowed,
}

/// How a failed attempt should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Duplicate,
    NotAllowed,
    Retryable,
}

fn classify(err: &ImportError) -> Failure {
    match err {
        ImportError::Remote { status: 405, .. } => Failure::NotAllowed,
        ImportError::Remote { message, .. } if is_duplicate(message) => Failure::Duplicate,
        _ => Failure::Retryable,
    }
}

/// Whether an error body's `detail` field reports duplicate content.
fn is_duplicate(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .is_some_and(|detail| detail.contains(DUPLICATE_MARKER))
}

/// Summary of one synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub collection_id: String,
    /// Records uploaded and attached.
    pub uploaded: usize,
    /// Records skipped as duplicate or not allowed.
    pub skipped: usize,
    /// Records that failed (file name, error message).
    pub failed: Vec<(String, String)>,
    /// Mean token count of successfully uploaded records.
    pub average_tokens: f64,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callbacks during synchronization.
pub trait SyncProgress: Send + Sync {
    /// Called before each record is uploaded.
    fn document(&self, current: usize, total: usize, file_name: &str);
}

/// No-op sync progress.
pub struct SilentSyncProgress;

impl SyncProgress for SilentSyncProgress {
    fn document(&self, _current: usize, _total: usize, _file_name: &str) {}
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Publishes records into one named collection.
pub struct Synchronizer<C = O200kTokenCounter> {
    client: KnowledgeClient,
    collection: String,
    file_prefix: Option<String>,
    options: SyncOptions,
    counter: C,
    /// Where upload attempts stage their content; the system temp dir if unset.
    staging_dir: Option<PathBuf>,
}

impl Synchronizer<O200kTokenCounter> {
    /// Build a synchronizer for `target`. Fails on a missing base URL.
    pub fn new(target: &KnowledgeTarget, options: SyncOptions) -> Result<Self> {
        Ok(Self::with_client(
            KnowledgeClient::new(&target.credentials)?,
            target,
            options,
            O200kTokenCounter::new()?,
        ))
    }
}

impl<C: TokenCounter> Synchronizer<C> {
    pub fn with_client(
        client: KnowledgeClient,
        target: &KnowledgeTarget,
        options: SyncOptions,
        counter: C,
    ) -> Self {
        Self {
            client,
            collection: target.collection.clone(),
            file_prefix: target.file_prefix.clone(),
            options,
            counter,
            staging_dir: None,
        }
    }

    /// Stage upload content under `dir` instead of the system temp dir.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn client(&self) -> &KnowledgeClient {
        &self.client
    }

    /// Reset the collection if it exists (then wait), otherwise create it.
    #[instrument(skip_all, fields(collection = %self.collection))]
    pub async fn resolve_collection(&self) -> Result<KnowledgeCollection> {
        if let Some(existing) = self.client.find_collection(&self.collection).await? {
            info!(id = %existing.id, "resetting existing collection");
            self.client.reset_collection(&existing.id).await?;
            if !self.options.reset_settle.is_zero() {
                tokio::time::sleep(self.options.reset_settle).await;
            }
            return Ok(existing);
        }

        info!("collection not found, creating");
        self.client.create_collection(&self.collection).await
    }

    /// Resolve the collection and publish every record into it.
    ///
    /// Only collection resolution errors are returned; per-record failures
    /// are collected in [`SyncReport::failed`].
    #[instrument(skip_all, fields(collection = %self.collection, records = records.len()))]
    pub async fn sync(
        &self,
        records: &[DocumentRecord],
        progress: &dyn SyncProgress,
    ) -> Result<SyncReport> {
        let collection = self.resolve_collection().await?;
        let mut accountant = TokenAccountant::new(&self.counter);
        let mut report = SyncReport {
            collection_id: collection.id.clone(),
            uploaded: 0,
            skipped: 0,
            failed: Vec::new(),
            average_tokens: 0.0,
        };

        let total = records.len();
        for (i, record) in records.iter().enumerate() {
            let file_name = match &self.file_prefix {
                Some(prefix) => format!("{prefix}{}", record.file_name()),
                None => record.file_name().to_string(),
            };
            progress.document(i + 1, total, &file_name);

            let file = match self.upload(record.content(), &file_name).await {
                Ok(UploadOutcome::Uploaded(file)) => file,
                Ok(UploadOutcome::Duplicate | UploadOutcome::NotAllowed) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(%file_name, error = %e, "failed to upload file");
                    report.failed.push((file_name, e.to_string()));
                    continue;
                }
            };

            accountant.record(record.content());

            match self.client.attach_file(&collection.id, &file.id).await {
                Ok(()) => report.uploaded += 1,
                Err(e) if classify(&e) == Failure::Duplicate => {
                    warn!(%file_name, file_id = %file.id, "duplicate content on attach, skipping");
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(%file_name, file_id = %file.id, error = %e, "failed to attach file");
                    report.failed.push((file_name, e.to_string()));
                }
            }
        }

        report.average_tokens = accountant.average();
        info!(
            uploaded = report.uploaded,
            skipped = report.skipped,
            failed = report.failed.len(),
            mean_tokens = report.average_tokens,
            "knowledge updated"
        );
        Ok(report)
    }

    /// Upload one document, retrying transient failures.
    pub async fn upload(&self, content: &str, file_name: &str) -> Result<UploadOutcome> {
        let policy = self.options.retry;
        let mut last_err = None;

        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(policy.delay_after(attempt - 1)).await;
            }

            match self.upload_once(content, file_name).await {
                Ok(file) => {
                    info!(%file_name, file_id = %file.id, "file uploaded");
                    return Ok(UploadOutcome::Uploaded(file));
                }
                Err(e) => match classify(&e) {
                    Failure::Duplicate => {
                        warn!(%file_name, "duplicate content detected, skipping upload");
                        return Ok(UploadOutcome::Duplicate);
                    }
                    Failure::NotAllowed => {
                        error!(%file_name, error = %e, "upload not allowed, skipping");
                        return Ok(UploadOutcome::NotAllowed);
                    }
                    Failure::Retryable => {
                        warn!(%file_name, attempt = attempt + 1, error = %e, "upload attempt failed");
                        last_err = Some(e);
                    }
                },
            }
        }

        error!(%file_name, attempts = policy.max_attempts, "all upload attempts failed");
        Err(ImportError::Upload {
            file_name: file_name.to_string(),
            message: last_err.map_or_else(|| "no attempts made".to_string(), |e| e.to_string()),
        })
    }

    /// Stage `content` in a fresh temporary file and upload it.
    async fn upload_once(&self, content: &str, file_name: &str) -> Result<UploadedFile> {
        let dir = self
            .staging_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let mut staged = NamedTempFile::new_in(&dir).map_err(|e| ImportError::io(&dir, e))?;
        if let Err(e) = staged.write_all(content.as_bytes()) {
            return Err(ImportError::io(staged.path(), e));
        }
        debug!(path = %staged.path().display(), "staged upload");

        // `staged` is deleted on drop, whatever the upload result.
        self.client.upload_file(staged.path(), file_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbimport_shared::RemoteCredentials;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn fast_options() -> SyncOptions {
        SyncOptions {
            reset_settle: Duration::ZERO,
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::ZERO,
            },
        }
    }

    fn synchronizer(server: &MockServer, prefix: Option<&str>) -> Synchronizer {
        let target = KnowledgeTarget {
            collection: "library".into(),
            file_prefix: prefix.map(String::from),
            credentials: RemoteCredentials {
                base_url: Some(server.uri()),
                token: Some("secret".into()),
            },
        };
        Synchronizer::new(&target, fast_options()).unwrap()
    }

    fn records(n: usize) -> Vec<DocumentRecord> {
        (1..=n)
            .map(|i| DocumentRecord::new(format!("document number {i}"), &format!("doc {i}")))
            .collect()
    }

    async fn mount_list(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/v1/knowledge/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_upload_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "file-1"})))
            .mount(server)
            .await;
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_secs(1));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[test]
    fn classifies_failures() {
        let duplicate = ImportError::Remote {
            status: 400,
            message: r#"{"detail":"400: Duplicate content detected. Please provide unique content to proceed."}"#.into(),
        };
        assert_eq!(classify(&duplicate), Failure::Duplicate);

        let not_allowed = ImportError::Remote {
            status: 405,
            message: String::new(),
        };
        assert_eq!(classify(&not_allowed), Failure::NotAllowed);

        let plain_text = ImportError::Remote {
            status: 400,
            message: "Duplicate content detected".into(),
        };
        assert_eq!(classify(&plain_text), Failure::Retryable);

        assert_eq!(classify(&ImportError::Network("reset".into())), Failure::Retryable);
    }

    #[tokio::test]
    async fn retries_until_upload_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "file-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = synchronizer(&server, None).upload("body", "doc.txt").await.unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Uploaded(UploadedFile { id: "file-9".into() })
        );
    }

    #[tokio::test]
    async fn fail_fail_succeed_attaches_once() {
        let server = MockServer::start().await;
        mount_list(&server, json!([])).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "k1", "name": "library"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        mount_upload_ok(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/k1/file/add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "k1"})))
            .expect(1)
            .mount(&server)
            .await;

        let report = synchronizer(&server, None)
            .sync(&records(1), &SilentSyncProgress)
            .await
            .unwrap();

        assert_eq!(report.uploaded, 1);
        assert!(report.failed.is_empty());
        assert!(report.average_tokens > 0.0);
    }

    #[tokio::test]
    async fn duplicate_is_skipped_after_one_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "detail": "400: Duplicate content detected. Please provide unique content to proceed."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = synchronizer(&server, None).upload("same", "dup.txt").await.unwrap();
        assert_eq!(outcome, UploadOutcome::Duplicate);
    }

    #[tokio::test]
    async fn method_not_allowed_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .respond_with(ResponseTemplate::new(405))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = synchronizer(&server, None).upload("x", "x.txt").await.unwrap();
        assert_eq!(outcome, UploadOutcome::NotAllowed);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_only_that_record() {
        let server = MockServer::start().await;
        mount_list(&server, json!([])).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "k1", "name": "library"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .and(body_string_contains("document number 1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .and(body_string_contains("document number 2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "file-2"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/k1/file/add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let report = synchronizer(&server, None)
            .sync(&records(2), &SilentSyncProgress)
            .await
            .unwrap();

        assert_eq!(report.uploaded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "doc_1");
    }

    #[tokio::test]
    async fn fresh_collection_is_created_and_filled() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": "other", "name": "library-old"}])).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "k-new", "name": "library"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/other/reset"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .and(body_string_contains("filename=\"web_doc_"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "f"})))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/k-new/file/add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(3)
            .mount(&server)
            .await;

        let report = synchronizer(&server, Some("web_"))
            .sync(&records(3), &SilentSyncProgress)
            .await
            .unwrap();

        assert_eq!(report.collection_id, "k-new");
        assert_eq!(report.uploaded, 3);
    }

    #[tokio::test]
    async fn existing_collection_is_reset_not_created() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": "k1", "name": "library"}])).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/k1/reset"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "k1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "dup", "name": "library"})))
            .expect(0)
            .mount(&server)
            .await;
        mount_upload_ok(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/k1/file/add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let report = synchronizer(&server, None)
            .sync(&records(2), &SilentSyncProgress)
            .await
            .unwrap();

        assert_eq!(report.collection_id, "k1");
        assert_eq!(report.uploaded, 2);

        // Reset happens before the first upload.
        let requests = server.received_requests().await.unwrap();
        let reset_at = requests
            .iter()
            .position(|r| r.url.path().ends_with("/reset"))
            .unwrap();
        let first_upload = requests
            .iter()
            .position(|r| r.url.path() == "/api/v1/files/")
            .unwrap();
        assert!(reset_at < first_upload);
    }

    #[tokio::test]
    async fn nothing_uploaded_averages_zero() {
        let server = MockServer::start().await;
        mount_list(&server, json!([{"id": "k1", "name": "library"}])).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/k1/reset"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;

        let report = synchronizer(&server, None)
            .sync(&records(2), &SilentSyncProgress)
            .await
            .unwrap();

        assert_eq!(report.uploaded, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.average_tokens, 0.0);
    }

    /// Records how many staged files exist whenever an upload arrives.
    struct StagedFiles {
        dir: PathBuf,
        seen: Arc<Mutex<Vec<usize>>>,
        response: ResponseTemplate,
    }

    impl Respond for StagedFiles {
        fn respond(&self, _request: &Request) -> ResponseTemplate {
            let staged = std::fs::read_dir(&self.dir).map(|d| d.count()).unwrap_or(0);
            self.seen.lock().unwrap().push(staged);
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn staging_is_released_on_every_outcome() {
        let server = MockServer::start().await;
        let staging = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        mount_list(&server, json!([])).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "k1", "name": "library"})))
            .mount(&server)
            .await;
        let outcomes = [
            ("document number 1", ResponseTemplate::new(200).set_body_json(json!({"id": "f1"}))),
            (
                "document number 2",
                ResponseTemplate::new(400)
                    .set_body_json(json!({"detail": "400: Duplicate content detected."})),
            ),
            ("document number 3", ResponseTemplate::new(405)),
            ("document number 4", ResponseTemplate::new(500)),
        ];
        for (body, response) in outcomes {
            Mock::given(method("POST"))
                .and(path("/api/v1/files/"))
                .and(body_string_contains(body))
                .respond_with(StagedFiles {
                    dir: staging.path().to_path_buf(),
                    seen: Arc::clone(&seen),
                    response,
                })
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/k1/file/add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let report = synchronizer(&server, None)
            .with_staging_dir(staging.path())
            .sync(&records(4), &SilentSyncProgress)
            .await
            .unwrap();

        assert_eq!(report.uploaded, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed.len(), 1);

        // One staged file per attempt while it is in flight: 1 + 1 + 1 + 3 retries.
        assert_eq!(*seen.lock().unwrap(), vec![1; 6]);
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn duplicate_on_attach_is_skipped() {
        let server = MockServer::start().await;
        mount_list(&server, json!([])).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "k1", "name": "library"})))
            .mount(&server)
            .await;
        mount_upload_ok(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/knowledge/k1/file/add"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "detail": "400: Duplicate content detected. Please provide unique content to proceed."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let report = synchronizer(&server, None)
            .sync(&records(1), &SilentSyncProgress)
            .await
            .unwrap();

        assert_eq!(report.uploaded, 0);
        assert_eq!(report.skipped, 1);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_aborts_sync() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/knowledge/list"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "f"})))
            .expect(0)
            .mount(&server)
            .await;

        let err = synchronizer(&server, None)
            .sync(&records(1), &SilentSyncProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Remote { status: 401, .. }));
    }
}
