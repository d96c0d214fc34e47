//! Event listing model and record rendering.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use kbimport_shared::{ImportError, Result};

pub const NO_TITLE: &str = "No Title";
pub const NO_LOCATION: &str = "No Location";
pub const NO_ADDRESS: &str = "No Address";

/// Description text used when neither the listing nor a detail page has one.
pub const NO_DESCRIPTION: &str = "None";

/// Start/end time used when the listing omits one.
pub const EPOCH: &str = "1970-01-01T00:00:00";

/// Listing response: `{"data": [event, ...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListing {
    #[serde(default)]
    pub data: Vec<Event>,
}

/// One event as published by the listing API. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub name: Option<Localized>,
    #[serde(default)]
    pub description: Option<Localized>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// Multilingual text; only the Finnish variant is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Localized {
    #[serde(default)]
    pub fi: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    /// Detail page URL.
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<Localized>,
    #[serde(default)]
    pub street_address: Option<Localized>,
}

fn finnish(text: &Option<Localized>) -> Option<&str> {
    text.as_ref().and_then(|t| t.fi.as_deref())
}

impl Event {
    pub fn title(&self) -> &str {
        finnish(&self.name).unwrap_or(NO_TITLE)
    }

    pub fn location_name(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|l| finnish(&l.name))
            .unwrap_or(NO_LOCATION)
    }

    pub fn street_address(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|l| finnish(&l.street_address))
            .unwrap_or(NO_ADDRESS)
    }

    /// Listing description; an empty string counts as missing.
    pub fn description(&self) -> Option<&str> {
        finnish(&self.description).filter(|d| !d.is_empty())
    }

    pub fn detail_url(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.id.as_deref())
    }

    pub fn start(&self) -> Result<NaiveDateTime> {
        parse_event_time(self.start_time.as_deref().unwrap_or(EPOCH))
    }

    pub fn end(&self) -> Result<NaiveDateTime> {
        parse_event_time(self.end_time.as_deref().unwrap_or(EPOCH))
    }
}

/// Parse an ISO-8601 timestamp, keeping the wall-clock time of any offset.
pub fn parse_event_time(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ImportError::parse(format!("invalid event time '{raw}'")))
}

/// Render the record body for one event.
pub fn render_event(
    title: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    location: &str,
    address: &str,
    description: &str,
) -> String {
    format!(
        "Tapahtuma: {title}\n\
         Päivämäärä: {}\n\
         Aika: {} - {}\n\
         Paikka: {location}, {address}\n\
         Kuvaus: {description}\n",
        start.format("%d.%m.%Y"),
        start.format("%H:%M"),
        end.format("%H:%M"),
    )
}

/// File-name base: `<YYYY-MM-DD>_<first six characters of the title>`.
pub fn file_name_base(title: &str, start: NaiveDateTime) -> String {
    let short: String = title.chars().take(6).collect();
    format!("{}_{short}", start.format("%Y-%m-%d"))
}
