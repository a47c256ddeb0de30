//! Garmin LiveTrack Integration
//!
//! Everything needed to go from a user-supplied LiveTrack link to
//! normalized tracking data.
//!
//! ## Architecture
//!
//! - **url**: classify and parse session links
//! - **expand**: resolve short links by following redirects
//! - **client**: GraphQL client behind the [`TrackingSource`] trait
//! - **fetch**: combine session, track points and course into [`TrackingData`]
//! - **batch**: concurrent, failure-isolated fan-out keyed by session id
//!
//! ## Data Flow
//!
//! 1. A link is classified; short links are expanded first
//! 2. The long-form path yields a [`SessionRef`]
//! 3. The fetcher issues the session lookup, then track points and course
//! 4. Batches settle independently and are mapped back onto their inputs

mod batch;
mod client;
mod error;
mod expand;
mod fetch;
mod graphql;
mod url;

pub use batch::{BatchItem, BatchOutcome};
pub use client::{LiveTrackClient, LiveTrackConfig, SessionInfo, TrackingSource};
pub use error::{LiveTrackError, LiveTrackResult};
pub use expand::{expand_batch, ExpandOutcome, HttpLinkExpander, LinkExpander};
pub use fetch::{build_profile, TrackingData, TrackingFetcher};
pub use url::{
    classify_url, is_supported_url, parse_session_url, resolve_session_url, SessionRef, UrlKind,
    LONG_FORM_HOSTS, SHORT_LINK_HOSTS,
};

#[cfg(test)]
pub(crate) use fetch::testing;
