//! Pipeline orchestration for kbimport.
//!
//! This crate ties the source extractors and the knowledge synchronizer into
//! end-to-end workflows: a single import ([`run_import`]), a directory batch
//! ([`run_all`]), and read-only verification ([`verify_collection`],
//! [`verify_data`]).

pub mod batch;
pub mod pipeline;
pub mod verify;

pub use batch::{BatchSummary, list_config_files, run_all};
pub use pipeline::{
    ImportResult, ProgressReporter, SilentProgress, SourceExtractor, import_config_file,
    run_import,
};
pub use verify::{
    Verification, VerificationReport, verify_collection, verify_config_file, verify_data,
};
