//! Source configuration for a single import run.
//!
//! One file describes one source: its `type`, a type-specific `data` block
//! and the `openwebui` block naming the target knowledge collection.
//! Credentials in the environment override the ones in the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

/// Environment variable holding the knowledge store API key.
pub const API_KEY_ENV: &str = "OPEN_WEB_UI_API_KEY";

/// Environment variable holding the knowledge store base URL.
pub const BASE_URL_ENV: &str = "OPEN_WEB_UI_BASE_URL";

/// Page budget used when a web source does not set `max_pages`.
const DEFAULT_MAX_PAGES: usize = 100;

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// The declared source type of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// CSV or spreadsheet file (`csv_excel`).
    Tabular,
    /// Recursive web crawl (`web`).
    Web,
    /// Event-listing JSON API (`events_api`).
    EventsApi,
}

impl SourceKind {
    /// The `type` string used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tabular => "csv_excel",
            Self::Web => "web",
            Self::EventsApi => "events_api",
        }
    }
}

impl FromStr for SourceKind {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv_excel" => Ok(Self::Tabular),
            "web" => Ok(Self::Web),
            "events_api" => Ok(Self::EventsApi),
            other => Err(ImportError::config(format!(
                "unsupported configuration type: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Top-level config file
// ---------------------------------------------------------------------------

/// A source configuration file, as deserialized from JSON or TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Declared source type (`csv_excel`, `web`, `events_api`).
    #[serde(rename = "type")]
    pub source_type: String,

    /// Type-specific settings, decoded lazily by [`SourceConfig::data_as`].
    #[serde(default)]
    pub data: serde_json::Value,

    /// Target knowledge collection and remote credentials.
    pub openwebui: OpenWebUiConfig,
}

/// `openwebui` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenWebUiConfig {
    /// Name of the knowledge collection to synchronize.
    pub knowledge_name: String,

    /// Knowledge store base URL (overridden by `OPEN_WEB_UI_BASE_URL`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API token (overridden by `OPEN_WEB_UI_API_KEY`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SourceConfig {
    /// Resolve the declared type string.
    pub fn kind(&self) -> Result<SourceKind> {
        self.source_type.parse()
    }

    /// Decode the `data` block into a type-specific config struct.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            ImportError::config(format!("invalid data block for {}: {e}", self.source_type))
        })
    }

    /// Optional prefix prepended to every uploaded file name.
    pub fn file_prefix(&self) -> Option<&str> {
        self.data.get("prefix").and_then(|v| v.as_str())
    }

    /// Collection name and credentials, resolved against the process environment.
    pub fn knowledge_target(&self) -> KnowledgeTarget {
        self.knowledge_target_with(|key| std::env::var(key).ok())
    }

    /// Same as [`SourceConfig::knowledge_target`] with an explicit variable lookup.
    pub fn knowledge_target_with(&self, lookup: impl Fn(&str) -> Option<String>) -> KnowledgeTarget {
        KnowledgeTarget {
            collection: self.openwebui.knowledge_name.clone(),
            file_prefix: self.file_prefix().map(String::from),
            credentials: RemoteCredentials::resolve_with(&self.openwebui, lookup),
        }
    }
}

// ---------------------------------------------------------------------------
// Type-specific data blocks
// ---------------------------------------------------------------------------

/// `data` block for `csv_excel` sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularSourceConfig {
    /// Path to a `.csv`, `.xlsx` or `.xls` file.
    pub file_path: PathBuf,

    /// Columns rendered into the body as `<field>: <value>`.
    #[serde(default)]
    pub content_fields: Vec<String>,

    /// Title/file-name columns and metadata mappings.
    #[serde(default)]
    pub entry_config: TabularEntryConfig,

    /// Optional single-field equality filter.
    #[serde(default)]
    pub filter_condition: Option<serde_json::Map<String, serde_json::Value>>,
}

/// `entry_config` for tabular sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabularEntryConfig {
    /// Column holding the record title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_field: Option<String>,

    /// Column holding the remote file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name_field: Option<String>,

    /// Any other entries map a column name to a metadata key.
    #[serde(flatten)]
    pub field_map: BTreeMap<String, String>,
}

/// A validated `filter_condition`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    /// Column to compare.
    pub field: String,
    /// Value the column must equal (type-sensitive).
    pub value: serde_json::Value,
}

impl TabularSourceConfig {
    /// Validate the filter condition. An empty or absent condition means no filter.
    pub fn row_filter(&self) -> Result<Option<RowFilter>> {
        let Some(condition) = self.filter_condition.as_ref().filter(|c| !c.is_empty()) else {
            return Ok(None);
        };

        match (condition.get("filter_field"), condition.get("filter_value")) {
            (Some(field), Some(value)) => {
                let field = field.as_str().ok_or_else(|| {
                    ImportError::config("filter_field must be a string")
                })?;
                Ok(Some(RowFilter {
                    field: field.to_string(),
                    value: value.clone(),
                }))
            }
            _ => Err(ImportError::config(
                "filter condition must contain 'filter_field' and 'filter_value'",
            )),
        }
    }
}

/// `data` block for `web` sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSourceConfig {
    /// Site root, e.g. `https://www.example.com`.
    pub base_url: String,

    /// Seed paths appended to `base_url`.
    pub paths: Vec<String>,

    /// CSS selectors whose text forms the body.
    #[serde(default)]
    pub content_selectors: Vec<String>,

    /// Title and file-name selectors.
    #[serde(default)]
    pub entry_config: WebEntryConfig,

    /// Follow links under `base_url + seed_path`.
    #[serde(default)]
    pub follow_links: bool,

    /// Hard ceiling on page fetches for the whole extraction.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

/// `entry_config` for web sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebEntryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name_selector: Option<String>,
}

/// `data` block for `events_api` sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsApiSourceConfig {
    /// Event listing endpoint returning `{"data": [...]}`.
    pub api_url: String,
}

// ---------------------------------------------------------------------------
// Credentials and target
// ---------------------------------------------------------------------------

/// Knowledge store credentials after environment overrides.
///
/// Either field may be absent; nothing is validated until the first remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

impl RemoteCredentials {
    /// Environment wins over the config file.
    pub fn resolve_with(config: &OpenWebUiConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let token = match lookup(API_KEY_ENV) {
            Some(token) => {
                tracing::info!("using API key from environment variable");
                Some(token)
            }
            None => {
                tracing::info!("no API key in environment, using config value");
                config.token.clone()
            }
        };
        if token.is_none() {
            tracing::error!("no API key found in config or environment");
        }

        let base_url = match lookup(BASE_URL_ENV) {
            Some(url) => {
                tracing::info!("using base URL from environment variable");
                Some(url)
            }
            None => config.base_url.clone(),
        };
        if base_url.is_none() {
            tracing::error!("no base URL found in config or environment");
        }

        Self { base_url, token }
    }
}

/// The resolved collection a run synchronizes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeTarget {
    /// Collection name (unique lookup key on the remote).
    pub collection: String,
    /// Optional prefix for uploaded file names.
    pub file_prefix: Option<String>,
    /// Remote credentials.
    pub credentials: RemoteCredentials,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a source configuration from a `.json` or `.toml` file.
pub fn load_source_config(path: &Path) -> Result<SourceConfig> {
    if !path.is_file() {
        return Err(ImportError::config(format!(
            "configuration file not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let content = std::fs::read_to_string(path).map_err(|e| ImportError::io(path, e))?;

    match extension.as_str() {
        "json" => serde_json::from_str(&content).map_err(|e| {
            ImportError::config(format!("failed to parse {}: {e}", path.display()))
        }),
        "toml" => toml::from_str(&content).map_err(|e| {
            ImportError::config(format!("failed to parse {}: {e}", path.display()))
        }),
        _ => Err(ImportError::config(format!(
            "unsupported config file format: {} (use .json or .toml)",
            path.display()
        ))),
    }
}

/// Whether `path` has an extension [`load_source_config`] understands.
pub fn is_config_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("toml")
    )
}
