//! HTTP client for the content API.
//!
//! Queries go out as `GET {api}/v{version}/data/query/{dataset}` with the GROQ
//! text in `query` and each parameter as `$name=<json>`. The API wraps the
//! answer in an envelope:
//!
//! ```text
//! { "query": "...", "result": <value>, "ms": 12 }          200
//! { "error": { "description": "..." } }                     4xx/5xx
//! ```
//!
//! Only published documents are requested (`perspective=published`). With
//! `use_cdn` the cached edge API host is used instead of the live one; a
//! token always forces the live API, since the CDN does not serve
//! authenticated requests.

use crate::config::CmsConfig;
use crate::query::{ContentQuery, ContentSource, QueryError};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("campus-press/", env!("CARGO_PKG_VERSION"));

/// Read-only client for one project and dataset.
#[derive(Debug, Clone)]
pub struct SanityClient {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl SanityClient {
    pub fn new(cms: &CmsConfig) -> Result<Self, QueryError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(cms.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: query_endpoint(cms),
            token: cms.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Full query URL without parameters.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// `…/v{version}/data/query/{dataset}` for the configured host.
pub fn query_endpoint(cms: &CmsConfig) -> String {
    let base = match &cms.api_url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => {
            let host = if cms.use_cdn && cms.token.as_deref().is_none_or(str::is_empty) {
                "apicdn.sanity.io"
            } else {
                "api.sanity.io"
            };
            format!("https://{}.{host}", cms.project_id)
        }
    };
    let version = cms.api_version.trim_start_matches('v');
    format!("{base}/v{version}/data/query/{}", cms.dataset)
}

/// Query-string pairs for `query`: the GROQ text, the perspective, then
/// `$name` parameters JSON-encoded.
pub fn query_pairs(query: &ContentQuery) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("query".to_string(), query.groq()),
        ("perspective".to_string(), "published".to_string()),
    ];
    for (name, value) in query.params() {
        pairs.push((format!("${name}"), value.to_string()));
    }
    pairs
}

impl ContentSource for SanityClient {
    fn run(&self, query: &ContentQuery) -> Result<serde_json::Value, QueryError> {
        tracing::debug!(query = query.name(), endpoint = %self.endpoint, "running content query");
        let mut request = self.http.get(&self.endpoint).query(&query_pairs(query));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.description.or(e.error.message))
                .unwrap_or_else(|| body.trim().chars().take(200).collect());
            tracing::warn!(query = query.name(), status = status.as_u16(), %message, "content query failed");
            return Err(QueryError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope = serde_json::from_str(&body)?;
        Ok(envelope.result)
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}
