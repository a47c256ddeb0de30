//! Short link expansion
//!
//! Short links are resolved by issuing a HEAD request and following
//! redirects; the final URL is the expanded link.

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::{redirect::Policy, Client};
use serde::Serialize;
use std::time::Duration;

use super::error::{LiveTrackError, LiveTrackResult};

/// Resolves a link to the URL it finally redirects to
#[async_trait]
pub trait LinkExpander: Send + Sync {
    async fn expand(&self, url: &str) -> LiveTrackResult<String>;
}

/// Outcome of expanding one URL in a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandOutcome {
    pub original_url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Expand every URL concurrently.
///
/// One outcome per input, in input order; a failure never affects siblings.
pub async fn expand_batch(expander: &dyn LinkExpander, urls: &[String]) -> Vec<ExpandOutcome> {
    let futures = urls.iter().map(|url| async move {
        match expander.expand(url).await {
            Ok(expanded) => ExpandOutcome {
                original_url: url.clone(),
                success: true,
                expanded_url: Some(expanded),
                error: None,
            },
            Err(e) => ExpandOutcome {
                original_url: url.clone(),
                success: false,
                expanded_url: None,
                error: Some(e.to_string()),
            },
        }
    });

    join_all(futures).await
}

/// reqwest-backed expander
pub struct HttpLinkExpander {
    client: Client,
}

impl HttpLinkExpander {
    /// Create an expander following at most `max_redirects` hops
    pub fn new(timeout: Duration, max_redirects: usize) -> LiveTrackResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(max_redirects))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl LinkExpander for HttpLinkExpander {
    async fn expand(&self, url: &str) -> LiveTrackResult<String> {
        let response = self.client.head(url).send().await.map_err(|e| {
            LiveTrackError::Expansion {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let expanded = response.url().to_string();
        tracing::debug!(url = %url, expanded = %expanded, status = %response.status(), "Expanded link");

        Ok(expanded)
    }
}
