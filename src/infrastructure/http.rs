use crate::types::{Result, headers};
use async_trait::async_trait;
use url::Url;

/// A GET request issued by the polling transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl PollRequest {
    /// A JSON GET request, with a bearer token when one is available
    pub fn new(url: Url, token: Option<&str>) -> Self {
        let mut headers = vec![("Accept".to_string(), headers::ACCEPT_JSON.to_string())];
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        Self { url, headers }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw answer of the polling endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl PollResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes poll requests. Swap it out to route polling through a custom
/// HTTP stack.
#[async_trait]
pub trait PollFetcher: Send + Sync {
    async fn fetch(&self, request: PollRequest) -> Result<PollResponse>;
}

/// Default fetcher backed by `reqwest`.
///
/// The shared client keeps a cookie store, so cookies set by the server are
/// sent back on later polls and SSE connections.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client used by the default transports
    pub fn default_client() -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().cookie_store(true).build()?)
    }
}

#[async_trait]
impl PollFetcher for ReqwestFetcher {
    async fn fetch(&self, request: PollRequest) -> Result<PollResponse> {
        let mut builder = self.client.get(request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::debug!(
            "Poll request to {} answered {} ({} bytes)",
            request.url.path(),
            status,
            body.len()
        );
        Ok(PollResponse::new(status, body.to_vec()))
    }
}
