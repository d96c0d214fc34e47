//! Read-only checks for a source configuration.
//!
//! Neither check mutates the remote store. Failures are logged and reported
//! as [`Verification::Fail`], never raised.

use std::fmt;
use std::path::Path;

use tracing::{debug, error, info, instrument};

use kbimport_knowledge::KnowledgeClient;
use kbimport_shared::{ImportError, KnowledgeTarget, Result, SourceConfig, load_source_config};

use crate::pipeline::SourceExtractor;

/// Outcome of a verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Pass,
    Fail,
}

impl Verification {
    pub fn passed(self) -> bool {
        self == Self::Pass
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        })
    }
}

/// Both check results for one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationReport {
    pub collection: Verification,
    pub data: Verification,
}

/// Check that the knowledge store answers a collection listing.
#[instrument(skip_all, fields(collection = %target.collection))]
pub async fn verify_collection(target: &KnowledgeTarget) -> Verification {
    let outcome = match list_collection_ids(target).await {
        Ok(ids) => {
            debug!(entries = ids.len(), "connected to knowledge store");
            match (ids.first(), ids.last()) {
                (Some(first), Some(last)) if ids.len() > 1 => {
                    debug!(%first, %last, "first and last entries");
                }
                _ => info!("no entries found in the knowledge store"),
            }
            Verification::Pass
        }
        Err(e) => {
            error!(error = %e, "failed to verify collection");
            Verification::Fail
        }
    };
    info!(
        "verification for knowledge base {}: {outcome}",
        target.collection
    );
    outcome
}

async fn list_collection_ids(target: &KnowledgeTarget) -> Result<Vec<String>> {
    let client = KnowledgeClient::new(&target.credentials)?;
    Ok(client
        .list_collections()
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect())
}

/// Check that extraction yields at least one record.
#[instrument(skip_all, fields(source = %config.source_type))]
pub async fn verify_data(config: &SourceConfig) -> Verification {
    let outcome = match count_records(config).await {
        Ok(count) => {
            debug!(records = count, "found records");
            Verification::Pass
        }
        Err(e) => {
            error!(error = %e, "failed to verify data");
            Verification::Fail
        }
    };
    info!("verification for data: {outcome}");
    outcome
}

async fn count_records(config: &SourceConfig) -> Result<usize> {
    let records = SourceExtractor::from_config(config)?.extract().await?;
    if records.is_empty() {
        return Err(ImportError::validation("no data found"));
    }
    Ok(records.len())
}

/// Load `path` and run both checks, collection first.
pub async fn verify_config_file(path: &Path) -> Result<VerificationReport> {
    info!(path = %path.display(), "verifying configuration file");
    let config = load_source_config(path)?;
    let target = config.knowledge_target();
    Ok(VerificationReport {
        collection: verify_collection(&target).await,
        data: verify_data(&config).await,
    })
}
