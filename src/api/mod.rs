pub mod resource;

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use futures::StreamExt;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_DISPOSITION, USER_AGENT};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{ListPage, Record};

pub use resource::{Column, Resource};

const BODY_SNIPPET_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: Method,
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Connection settings passed to every API call.
#[derive(Clone, Debug)]
pub struct ApiContext {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ApiContext {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(Self {
            base_url,
            token,
            timeout,
        })
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let invalid = |reason: &str| ApiError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("expected an http or https URL"));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: usize,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(page: usize) -> Self {
        Self { page, search: None }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.max(1).to_string())];
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                pairs.push(("search", search.to_string()));
            }
        }
        pairs
    }
}

/// A downloaded export file, generated server side.
#[derive(Clone, Debug)]
pub struct ExportBlob {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    ctx: ApiContext,
}

impl ApiClient {
    pub fn new(ctx: ApiContext) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("stockdesk/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(ctx.timeout)
            .build()
            .map_err(|source| ApiError::ClientBuild { source })?;
        Ok(Self { http, ctx })
    }

    /// Build `{base}/{resource}[/{id}][/{suffix}]`, escaping each segment.
    pub fn endpoint(&self, resource: Resource, id: Option<&str>, suffix: Option<&str>) -> Url {
        let mut url = self.ctx.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(resource.path());
            if let Some(id) = id {
                segments.push(id);
            }
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        url
    }

    pub async fn list(&self, resource: Resource, query: &ListQuery) -> Result<ListPage, ApiError> {
        let url = self.endpoint(resource, None, None);
        let request = self.http.get(url.clone()).query(&query.pairs());
        let response = self.send(Method::GET, &url, request).await?;
        read_json(&Method::GET, &url, response).await
    }

    pub async fn get(&self, resource: Resource, id: &str) -> Result<Record, ApiError> {
        let url = self.endpoint(resource, Some(id), None);
        let request = self.http.get(url.clone());
        let response = self.send(Method::GET, &url, request).await?;
        read_json(&Method::GET, &url, response).await
    }

    pub async fn create(
        &self,
        resource: Resource,
        body: &Map<String, Value>,
    ) -> Result<Record, ApiError> {
        let url = self.endpoint(resource, None, None);
        let request = self.http.post(url.clone()).json(body);
        let response = self.send(Method::POST, &url, request).await?;
        read_optional_record(&Method::POST, &url, response).await
    }

    pub async fn update(
        &self,
        resource: Resource,
        id: &str,
        body: &Map<String, Value>,
    ) -> Result<Record, ApiError> {
        let url = self.endpoint(resource, Some(id), None);
        let request = self.http.put(url.clone()).json(body);
        let response = self.send(Method::PUT, &url, request).await?;
        read_optional_record(&Method::PUT, &url, response).await
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(resource, Some(id), None);
        let request = self.http.delete(url.clone());
        self.send(Method::DELETE, &url, request).await?;
        Ok(())
    }

    /// Download the server-generated export, reporting received byte counts
    /// through `on_chunk`.
    pub async fn export<F>(&self, resource: Resource, mut on_chunk: F) -> Result<ExportBlob, ApiError>
    where
        F: FnMut(usize),
    {
        let url = self.endpoint(resource, None, Some("export"));
        let request = self.http.get(url.clone()).header(ACCEPT, "*/*");
        let response = self.send(Method::GET, &url, request).await?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_filename);

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| ApiError::Transport {
                method: Method::GET,
                url: url.to_string(),
                source,
            })?;
            bytes.extend_from_slice(&chunk);
            on_chunk(bytes.len());
        }
        debug!(%url, size = bytes.len(), "export downloaded");
        Ok(ExportBlob { file_name, bytes })
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let request = match self.ctx.token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        debug!(%method, %url, "sending request");
        let response = request.send().await.map_err(|source| ApiError::Transport {
            method: method.clone(),
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(%method, %url, status = status.as_u16(), "request rejected");
        Err(ApiError::Status {
            method,
            url: url.to_string(),
            status: status.as_u16(),
            body: snippet(&body),
        })
    }
}

async fn read_text(
    method: &Method,
    url: &Url,
    response: reqwest::Response,
) -> Result<String, ApiError> {
    response.text().await.map_err(|source| ApiError::Transport {
        method: method.clone(),
        url: url.to_string(),
        source,
    })
}

async fn read_json<T: DeserializeOwned>(
    method: &Method,
    url: &Url,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let text = read_text(method, url, response).await?;
    serde_json::from_str(&text).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

// create/update endpoints may answer 201/204 with an empty body
async fn read_optional_record(
    method: &Method,
    url: &Url,
    response: reqwest::Response,
) -> Result<Record, ApiError> {
    let text = read_text(method, url, response).await?;
    if text.trim().is_empty() {
        return Ok(Record::default());
    }
    let value: Value = serde_json::from_str(&text).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(Record(map)),
        _ => Ok(Record::default()),
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_SNIPPET_LEN {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_SNIPPET_LEN).collect();
    out.push('…');
    out
}

/// Extract a bare file name from a `Content-Disposition` header value.
///
/// An RFC 5987 `filename*` parameter wins over a plain `filename`.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    static FILENAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = FILENAME_RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|;)\s*filename(\*)?\s*=\s*(?:"([^"]*)"|([^;]*))"#)
            .expect("content-disposition pattern is valid")
    });

    let mut plain = None;
    let mut extended = None;
    for caps in re.captures_iter(header) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if caps.get(1).is_some() {
            // charset'language'percent-encoded-name
            let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
            if extended.is_none() {
                extended = urlencoding::decode(encoded).ok().map(|v| v.into_owned());
            }
        } else if plain.is_none() {
            plain = Some(value.to_string());
        }
    }

    let raw = extended.or(plain)?;
    let name = Path::new(&raw).file_name()?.to_str()?.to_string();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}
