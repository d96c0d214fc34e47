//! The extraction contract shared by every source type.

use std::future::Future;

use crate::config::SourceKind;
use crate::error::Result;
use crate::types::DocumentRecord;

/// Turns one configured source into document records.
///
/// Implementations hold their own validated settings and never touch the
/// knowledge store; the orchestrator hands the records to the synchronizer.
pub trait Extractor {
    /// Source type this extractor handles.
    fn kind(&self) -> SourceKind;

    /// Produce the records for one run.
    fn extract(&self) -> impl Future<Output = Result<Vec<DocumentRecord>>>;
}
