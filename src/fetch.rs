use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, Response, Url};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Fetches remote content for URL uploads.
#[derive(Clone)]
pub struct RemoteFetcher {
    client: Client,
}

impl RemoteFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stowage/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &Url) -> Result<RemoteResponse, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        Ok(RemoteResponse::new(response))
    }
}

/// A response whose body has not been read yet.
pub struct RemoteResponse {
    status: u16,
    content_type: Option<String>,
    inner: Response,
}

impl RemoteResponse {
    fn new(inner: Response) -> Self {
        let content_type = inner
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(media_type);

        Self {
            status: inner.status().as_u16(),
            content_type,
            inner,
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// The reported media type without parameters, e.g. `text/html`.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the next chunk of the body, or `None` once it is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, FetchError> {
        Ok(self.inner.chunk().await?)
    }
}

/// Parses `s` as an absolute http(s) URL with a host.
#[must_use]
pub fn parse_http_url(s: &str) -> Option<Url> {
    let url = Url::parse(s.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().filter(|h| !h.is_empty())?;
    Some(url)
}

/// Strips parameters from a Content-Type value and lowercases it.
/// Returns `None` unless the result looks like `type/subtype`.
#[must_use]
pub fn media_type(value: &str) -> Option<String> {
    let essence = value.split(';').next()?.trim().to_ascii_lowercase();
    let (kind, subtype) = essence.split_once('/')?;
    if kind.is_empty() || subtype.is_empty() || subtype.contains('/') {
        return None;
    }
    Some(essence)
}
