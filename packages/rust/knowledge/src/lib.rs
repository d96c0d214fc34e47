//! Remote knowledge store integration.
//!
//! This crate provides:
//! - [`client`]: typed REST client ([`KnowledgeClient`])
//! - [`sync`]: collection resolution and upload with retry ([`Synchronizer`])
//! - [`tokens`]: token counts for uploaded content ([`TokenAccountant`])

pub mod client;
pub mod sync;
pub mod tokens;

pub use client::{KnowledgeClient, KnowledgeCollection, UploadedFile};
pub use sync::{
    RetryPolicy, SilentSyncProgress, SyncOptions, SyncProgress, SyncReport, Synchronizer,
    UploadOutcome,
};
pub use tokens::{O200kTokenCounter, TokenAccountant, TokenCounter};
