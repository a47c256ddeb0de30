//! Live tracking
//!
//! Keeps a loaded athlete list current by polling for new samples on a
//! fixed interval while the tracker is live.

mod tracker;

pub use tracker::{LiveTracker, TickReport, TrackerState};
