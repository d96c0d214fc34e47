//! Event-listing API extractor.
//!
//! Fetches the listing once, renders one record per event, and fetches an
//! event's detail page only when the listing carries no description. The
//! extraction is all-or-nothing: any failure while processing the list is
//! logged and yields an empty result.

pub mod event;

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, error, info, instrument};

use kbimport_shared::{
    DocumentRecord, EventsApiSourceConfig, Extractor, ImportError, Result, SourceKind,
    unique_file_name,
};

pub use event::{Event, EventListing, NO_DESCRIPTION, parse_event_time};

/// User-Agent string for event API requests.
const USER_AGENT: &str = concat!("kbimport/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for listing and detail requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Metadata key holding the event start time.
pub const START_TIME_KEY: &str = "start_time";

/// Extracts one record per event from a listing endpoint.
pub struct EventsApiExtractor {
    config: EventsApiSourceConfig,
    client: Client,
}

impl EventsApiExtractor {
    pub fn new(config: EventsApiSourceConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            return Err(ImportError::config("events_api source requires 'api_url'"));
        }
        Ok(Self {
            config,
            client: build_client()?,
        })
    }

    /// Fetch and render every event, propagating the first failure.
    #[instrument(skip_all, fields(api_url = %self.config.api_url))]
    pub async fn fetch_events(&self) -> Result<Vec<DocumentRecord>> {
        info!("fetching event listing");

        let body = fetch_text(&self.client, &self.config.api_url).await?;
        let listing: EventListing = serde_json::from_str(&body).map_err(|e| {
            ImportError::parse(format!("{}: invalid listing JSON: {e}", self.config.api_url))
        })?;

        let mut records = Vec::with_capacity(listing.data.len());
        for event in &listing.data {
            records.push(self.event_record(event).await?);
        }
        Ok(records)
    }

    async fn event_record(&self, event: &Event) -> Result<DocumentRecord> {
        let title = event.title();
        let start = event.start()?;
        let end = event.end()?;

        let description = match (event.description(), event.detail_url()) {
            (Some(text), _) => text.to_string(),
            (None, Some(url)) => {
                debug!(%url, "description missing, reading detail page");
                let html = fetch_text(&self.client, url).await?;
                main_text(&html).unwrap_or_else(|| NO_DESCRIPTION.to_string())
            }
            (None, None) => NO_DESCRIPTION.to_string(),
        };

        let content = event::render_event(
            title,
            start,
            end,
            event.location_name(),
            event.street_address(),
            &description,
        );
        let file_name = unique_file_name(&event::file_name_base(title, start));

        info!(%title, "processed event");

        Ok(DocumentRecord::new(content, &file_name).with_field(
            START_TIME_KEY,
            start.format("%Y-%m-%dT%H:%M:%S").to_string(),
        ))
    }
}

impl Extractor for EventsApiExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::EventsApi
    }

    async fn extract(&self) -> Result<Vec<DocumentRecord>> {
        match self.fetch_events().await {
            Ok(records) => Ok(records),
            Err(e) => {
                error!(api_url = %self.config.api_url, error = %e, "failed to fetch or process events");
                Ok(Vec::new())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| ImportError::Network(format!("failed to build HTTP client: {e}")))
}

async fn fetch_text(client: &Client, url: &str) -> Result<String> {
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
        .map_err(|e| ImportError::Network(format!("{url}: failed to read body: {e}")))
}

/// Text of the first `<main>` element, text nodes separated by spaces.
fn main_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("main").ok()?;
    doc.select(&selector)
        .next()
        .map(|main| main.text().collect::<Vec<_>>().join(" "))
}
