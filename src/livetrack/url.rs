//! LiveTrack URL parsing
//!
//! Two URL shapes are accepted:
//!
//! - long form: `https://livetrack.garmin.com/session/{sessionId}/token/{token}`
//! - short links on `gar.mn`, which redirect to the long form
//!
//! Parsing never fails loudly: anything unrecognized yields `None` and the
//! caller records a per-item error.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::expand::LinkExpander;

/// Hosts serving long-form session URLs
pub const LONG_FORM_HOSTS: [&str; 2] = ["livetrack.garmin.com", "www.livetrack.garmin.com"];

/// Hosts serving short links
pub const SHORT_LINK_HOSTS: [&str; 2] = ["gar.mn", "www.gar.mn"];

/// Identifies one LiveTrack session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub session_id: String,
    pub token: String,
}

impl SessionRef {
    pub fn new(session_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            token: token.into(),
        }
    }

    /// Canonical long-form URL for this session
    pub fn url(&self) -> String {
        format!(
            "https://{}/session/{}/token/{}",
            LONG_FORM_HOSTS[0],
            urlencoding::encode(&self.session_id),
            urlencoding::encode(&self.token)
        )
    }
}

/// What kind of LiveTrack link a URL is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    LongForm,
    ShortLink,
    Unsupported,
}

/// Classify a URL by hostname, without network access
pub fn classify_url(url: &str) -> UrlKind {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return UrlKind::Unsupported;
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return UrlKind::Unsupported;
    }

    match parsed.host_str() {
        Some(host) if LONG_FORM_HOSTS.contains(&host) => UrlKind::LongForm,
        Some(host) if SHORT_LINK_HOSTS.contains(&host) => UrlKind::ShortLink,
        _ => UrlKind::Unsupported,
    }
}

/// Check if a URL is a LiveTrack link of either form
pub fn is_supported_url(url: &str) -> bool {
    classify_url(url) != UrlKind::Unsupported
}

/// Parse a long-form session URL into its session id and token
pub fn parse_session_url(url: &str) -> Option<SessionRef> {
    if classify_url(url) != UrlKind::LongForm {
        return None;
    }

    let parsed = Url::parse(url.trim()).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();

    let session_id = segment_after(&segments, "session")?;
    let token = segment_after(&segments, "token")?;

    Some(SessionRef::new(session_id, token))
}

fn segment_after(segments: &[&str], marker: &str) -> Option<String> {
    let idx = segments.iter().position(|s| *s == marker)?;
    let value = segments.get(idx + 1)?;

    if value.is_empty() {
        return None;
    }

    urlencoding::decode(value).ok().map(|v| v.into_owned())
}

/// Resolve any supported URL to a session, expanding short links first.
///
/// Returns `None` for unsupported hosts, malformed paths and failed
/// expansions.
pub async fn resolve_session_url(expander: &dyn LinkExpander, url: &str) -> Option<SessionRef> {
    match classify_url(url) {
        UrlKind::LongForm => parse_session_url(url),
        UrlKind::ShortLink => match expander.expand(url.trim()).await {
            Ok(expanded) => {
                let session = parse_session_url(&expanded);
                if session.is_none() {
                    tracing::debug!(url = %url, expanded = %expanded, "Short link did not resolve to a session");
                }
                session
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to expand short link");
                None
            }
        },
        UrlKind::Unsupported => None,
    }
}
