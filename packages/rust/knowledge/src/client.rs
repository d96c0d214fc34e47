//! HTTP client for the remote knowledge store.
//!
//! All paths are relative to `<base_url>/api/v1`. Non-success responses
//! become [`ImportError::Remote`] carrying the status and raw body so callers
//! can classify them.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use kbimport_shared::{ImportError, RemoteCredentials, Result};

/// User-Agent string for knowledge store requests.
const USER_AGENT: &str = concat!("kbimport/", env!("CARGO_PKG_VERSION"));

/// Timeout for a single knowledge store request.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// A named knowledge collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeCollection {
    pub id: String,
    pub name: String,
}

/// Response of a successful file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
}

#[derive(Serialize)]
struct CreateCollection<'a> {
    name: &'a str,
    description: String,
}

#[derive(Serialize)]
struct AttachFile<'a> {
    file_id: &'a str,
    source_id: &'a str,
}

/// Thin typed wrapper over the knowledge store REST API.
#[derive(Debug, Clone)]
pub struct KnowledgeClient {
    api_base: String,
    token: Option<String>,
    client: Client,
}

impl KnowledgeClient {
    /// Build a client. A missing base URL is a configuration error.
    pub fn new(credentials: &RemoteCredentials) -> Result<Self> {
        let base_url = credentials.base_url.as_deref().ok_or_else(|| {
            ImportError::config("knowledge store base URL is not configured")
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ImportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base: format!("{}/api/v1", base_url.trim_end_matches('/')),
            token: credentials.token.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Attach the bearer token when one is configured.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `GET /knowledge/list`.
    pub async fn list_collections(&self) -> Result<Vec<KnowledgeCollection>> {
        let url = self.url("/knowledge/list");
        let response = send(self.authorized(self.client.get(&url)), &url).await?;
        decode(response, &url).await
    }

    /// First collection whose name matches exactly.
    #[instrument(skip(self))]
    pub async fn find_collection(&self, name: &str) -> Result<Option<KnowledgeCollection>> {
        let found = self
            .list_collections()
            .await?
            .into_iter()
            .find(|c| c.name == name);
        match &found {
            Some(c) => info!(id = %c.id, "knowledge collection found"),
            None => info!("knowledge collection not found"),
        }
        Ok(found)
    }

    /// `POST /knowledge/create`.
    #[instrument(skip(self))]
    pub async fn create_collection(&self, name: &str) -> Result<KnowledgeCollection> {
        let url = self.url("/knowledge/create");
        let body = CreateCollection {
            name,
            description: format!("Knowledge base for {name}"),
        };
        let response = send(self.authorized(self.client.post(&url)).json(&body), &url).await?;
        let created: KnowledgeCollection = decode(response, &url).await?;
        info!(id = %created.id, "knowledge collection created");
        Ok(created)
    }

    /// `POST /knowledge/{id}/reset`.
    #[instrument(skip(self))]
    pub async fn reset_collection(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("/knowledge/{id}/reset"));
        send(self.authorized(self.client.post(&url)), &url).await?;
        info!("knowledge collection reset");
        Ok(())
    }

    /// `POST /files/` with the file at `path` as multipart part `file`.
    pub async fn upload_file(&self, path: &Path, file_name: &str) -> Result<UploadedFile> {
        let url = self.url("/files/");
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ImportError::io(path, e))?;
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));

        debug!(%file_name, "uploading file");
        let response = send(self.authorized(self.client.post(&url)).multipart(form), &url).await?;
        decode(response, &url).await
    }

    /// `POST /knowledge/{id}/file/add`.
    pub async fn attach_file(&self, collection_id: &str, file_id: &str) -> Result<()> {
        let url = self.url(&format!("/knowledge/{collection_id}/file/add"));
        let body = AttachFile {
            file_id,
            source_id: file_id,
        };
        send(self.authorized(self.client.post(&url)).json(&body), &url).await?;
        info!(%collection_id, %file_id, "file added to knowledge");
        Ok(())
    }
}

async fn send(request: RequestBuilder, url: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| ImportError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(ImportError::Remote {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| ImportError::parse(format!("{url}: unexpected response body: {e}")))
}
