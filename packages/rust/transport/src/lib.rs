//! Scoreboard transport: one HTTP GET per query, decoded as JSON.
//!
//! Failures come back as [`TransportError`] values and are never retried here.
//! Callers treat a failed request as "no data" and move on to their next
//! strategy, usually through [`fetch_or_warn`].

mod query;

use std::future::Future;
use std::time::Duration;

use gridsync_shared::{GridsyncError, RawDocument, Result, SyncConfig, TransportError};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

pub use query::ScoreboardQuery;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// Maximum response size we accept (5 MB). A full week is a few hundred KB.
const MAX_RESPONSE_SIZE: u64 = 5 * 1024 * 1024;

/// User-Agent string for scoreboard requests.
const USER_AGENT: &str = concat!("gridsync/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ScoreboardSource
// ---------------------------------------------------------------------------

/// Anything that can answer a scoreboard query with a raw JSON document.
///
/// [`HttpTransport`] is the production implementation; tests substitute
/// canned documents.
pub trait ScoreboardSource {
    /// Perform a single request for `query`.
    fn fetch(
        &self,
        query: &ScoreboardQuery,
    ) -> impl Future<Output = std::result::Result<RawDocument, TransportError>> + Send;
}

/// Fetch `query`, logging any failure as a warning and mapping it to `None`.
pub async fn fetch_or_warn<S: ScoreboardSource>(
    source: &S,
    query: &ScoreboardQuery,
) -> Option<RawDocument> {
    match source.fetch(query).await {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(%query, error = %e, "scoreboard fetch failed");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// reqwest-backed scoreboard client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport for `base_url` with the given per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GridsyncError::config(format!("invalid API base URL '{base_url}': {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Build a transport from the runtime sync configuration.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// The full request URL for `query`.
    pub fn url_for(&self, query: &ScoreboardQuery) -> Url {
        let mut url = self.base_url.clone();
        let params = query.params();
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        url
    }

    async fn get_json(&self, url: Url) -> std::result::Result<RawDocument, TransportError> {
        let url_str = url.to_string();
        debug!(url = %url_str, "fetching scoreboard");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: url_str.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(TransportError::TooLarge {
                    url: url_str,
                    len,
                    max: MAX_RESPONSE_SIZE,
                });
            }
        }

        let body = response.bytes().await.map_err(|e| TransportError::Request {
            url: url_str.clone(),
            message: format!("failed to read body: {e}"),
        })?;

        if body.len() as u64 > MAX_RESPONSE_SIZE {
            return Err(TransportError::TooLarge {
                url: url_str,
                len: body.len() as u64,
                max: MAX_RESPONSE_SIZE,
            });
        }

        let doc = serde_json::from_slice(&body).map_err(|e| TransportError::Decode {
            url: url_str.clone(),
            message: e.to_string(),
        })?;

        debug!(url = %url_str, bytes = body.len(), "scoreboard fetched");
        Ok(doc)
    }
}

impl ScoreboardSource for HttpTransport {
    async fn fetch(
        &self,
        query: &ScoreboardQuery,
    ) -> std::result::Result<RawDocument, TransportError> {
        self.get_json(self.url_for(query)).await
    }
}
