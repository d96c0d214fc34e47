//! Prefix-scoped web crawler engine.
//!
//! The crawler visits every seed path under `base_url`, optionally follows
//! links that stay under the seed's prefix, and turns each fetched page into
//! a [`DocumentRecord`]. Pages are visited depth-first in document order,
//! one request at a time, and never more than `max_pages` fetches per run.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use kbimport_shared::{
    DocumentRecord, Extractor, ImportError, Result, SourceKind, WebSourceConfig,
    unique_file_name,
};

use crate::page::{PageSelectors, resolve_link};

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("kbimport/", env!("CARGO_PKG_VERSION"));

/// Metadata key holding the page URL.
pub const SOURCE_URL_KEY: &str = "source_url";

// ---------------------------------------------------------------------------
// CrawlResult
// ---------------------------------------------------------------------------

/// Summary of a completed crawl operation.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    /// Number of pages successfully fetched and extracted.
    pub pages_fetched: usize,
    /// Number of queued URLs skipped because they were already visited.
    pub pages_skipped: usize,
    /// Fetch failures (URL, error message).
    pub errors: Vec<(String, String)>,
    /// Whether the crawl stopped at the page budget.
    pub budget_exhausted: bool,
    /// Total duration of the crawl.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// WebCrawler
// ---------------------------------------------------------------------------

/// Web extractor over one or more seed paths of a site.
pub struct WebCrawler {
    config: WebSourceConfig,
    base_url: String,
    selectors: PageSelectors,
    client: Client,
}

impl WebCrawler {
    /// Create a crawler, compiling selectors and building the HTTP client.
    pub fn new(config: WebSourceConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| {
            ImportError::config(format!("invalid base_url '{}': {e}", config.base_url))
        })?;

        let selectors = PageSelectors::new(&config.entry_config, &config.content_selectors)?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ImportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            base_url,
            selectors,
            client,
        })
    }

    /// Crawl every seed path and return the run summary with the records.
    ///
    /// Fetch failures are logged and recorded in [`CrawlResult::errors`];
    /// they never abort the crawl.
    #[instrument(skip_all, fields(base_url = %self.base_url))]
    pub async fn crawl(&self) -> Result<(CrawlResult, Vec<DocumentRecord>)> {
        let start_time = Instant::now();
        let max_pages = self.config.max_pages;

        let mut visited = HashSet::<String>::new();
        let mut fetches: usize = 0;
        let mut result = CrawlResult::default();
        let mut records = Vec::new();

        info!(
            seeds = self.config.paths.len(),
            follow_links = self.config.follow_links,
            max_pages,
            "starting crawl"
        );

        'seeds: for seed in &self.config.paths {
            let scope = CrawlScope::new(&self.base_url, seed);
            let mut stack = vec![scope.prefix.clone()];

            while let Some(url) = stack.pop() {
                if fetches >= max_pages {
                    info!(max_pages, "page budget reached, stopping crawl");
                    result.budget_exhausted = true;
                    break 'seeds;
                }

                if !visited.insert(normalize_url(&url)) {
                    result.pages_skipped += 1;
                    continue;
                }

                fetches += 1;
                let body = match fetch_page(&self.client, &url).await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(%url, error = %e, "failed to fetch page");
                        result.errors.push((url, e.to_string()));
                        continue;
                    }
                };

                let page = self.selectors.extract(&body);

                if self.config.follow_links {
                    // Reverse so the stack pops links in document order.
                    for href in page.links.iter().rev() {
                        match resolve_link(&self.base_url, &url, href) {
                            Some(link) if scope.in_scope(&link) => stack.push(link),
                            Some(link) => debug!(%link, "out of scope, skipping"),
                            None => {}
                        }
                    }
                }

                let file_name = match page.file_name {
                    Some(name) => unique_file_name(&name),
                    None => unique_file_name(&format!("unknown_entry_{}", url.replace('/', "_"))),
                };
                records.push(
                    DocumentRecord::new(page.content, &file_name).with_field(SOURCE_URL_KEY, url),
                );
                result.pages_fetched += 1;
            }
        }

        result.duration = start_time.elapsed();

        info!(
            pages_fetched = result.pages_fetched,
            pages_skipped = result.pages_skipped,
            errors = result.errors.len(),
            duration_ms = result.duration.as_millis(),
            "crawl completed"
        );

        Ok((result, records))
    }
}

impl Extractor for WebCrawler {
    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    async fn extract(&self) -> Result<Vec<DocumentRecord>> {
        let (_, records) = self.crawl().await?;
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Scope checking
// ---------------------------------------------------------------------------

/// Links are followed only while they stay under `base_url + seed_path`.
///
/// The prefix is joined with exactly one `/` and serialized the same way as
/// resolved links, so default ports, host case and non-ASCII paths compare
/// equal.
struct CrawlScope {
    prefix: String,
}

impl CrawlScope {
    fn new(base_url: &str, seed_path: &str) -> Self {
        let joined = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            seed_path.trim_start_matches('/')
        );
        let prefix = match Url::parse(&joined) {
            Ok(url) => url.to_string(),
            Err(_) => joined,
        };
        Self { prefix }
    }

    fn in_scope(&self, url: &str) -> bool {
        url.starts_with(&self.prefix)
    }
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

/// Fetch a single page body.
async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    debug!(%url, "fetching page");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ImportError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ImportError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| ImportError::Network(format!("{url}: body read failed: {e}")))
}

/// Normalize a URL for deduplication: query string and fragment are dropped.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    }
}
