use super::{RemoteCollection, TransportError, PAGE_SIZE};
use crate::model::{Follower, UserProfile};
use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB
const USER_AGENT: &str = concat!("followfeed/", env!("CARGO_PKG_VERSION"));

/// [`RemoteCollection`] backed by the GitHub REST API.
///
/// No retries happen here: a failed page is reported once and the caller
/// decides whether to request it again.
#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    timeout: Duration,
}

impl GithubClient {
    /// Create a client for `base_url` (e.g. `https://api.github.com`).
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url,
            token,
            timeout,
        }
    }

    /// Build `{base}/users/{subject}[/followers]` with the subject
    /// percent-encoded as a single path segment.
    fn user_url(&self, subject: &str, followers: bool) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TransportError::Network("Invalid API base URL".to_string()))?;
            segments.pop_if_empty().push("users").push(subject);
            if followers {
                segments.push("followers");
            }
        }
        Ok(url)
    }

    /// GET `url` and decode the JSON body.
    ///
    /// The timeout covers the whole exchange, body included.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TransportError> {
        let bytes = tokio::time::timeout(self.timeout, self.get_bytes(url))
            .await
            .map_err(|_| TransportError::Network("request timed out".to_string()))??;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, TransportError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || is_quota_exhausted(&response) {
            tracing::warn!(url = %url, status = %status, "Rate limited by remote API");
            return Err(TransportError::RateLimited);
        }
        if !status.is_success() {
            return Err(TransportError::Network(format!(
                "HTTP error: status {}",
                status.as_u16()
            )));
        }

        read_limited_bytes(response, MAX_RESPONSE_SIZE).await
    }
}

/// GitHub reports an exhausted quota as 403 with a zero remaining header.
fn is_quota_exhausted(response: &reqwest::Response) -> bool {
    response.status() == reqwest::StatusCode::FORBIDDEN
        && response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0")
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(TransportError::Network("Response too large".to_string()));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TransportError::Network(e.to_string()))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(TransportError::Network("Response too large".to_string()));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[async_trait]
impl RemoteCollection for GithubClient {
    async fn fetch_page(&self, subject: &str, page: u32) -> Result<Vec<Follower>, TransportError> {
        let mut url = self.user_url(subject, true)?;
        url.query_pairs_mut()
            .append_pair("per_page", &PAGE_SIZE.to_string())
            .append_pair("page", &page.to_string());

        tracing::debug!(subject = %subject, page, "Fetching follower page");
        self.get_json(url).await
    }

    async fn fetch_detail(&self, subject: &str) -> Result<UserProfile, TransportError> {
        let url = self.user_url(subject, false)?;
        tracing::debug!(subject = %subject, "Fetching user detail");
        self.get_json(url).await
    }
}
