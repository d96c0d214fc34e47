//! Web source extractor.
//!
//! This crate provides:
//! - [`engine`]: the prefix-scoped, budgeted crawler ([`WebCrawler`])
//! - [`page`]: selector-driven title/content/file-name extraction

pub mod engine;
pub mod page;

pub use engine::{CrawlResult, SOURCE_URL_KEY, WebCrawler, normalize_url};
pub use page::{ExtractedPage, PageSelectors, UNTITLED, add_space_to_camel_case, resolve_link};
