//! Live polling loop
//!
//! Holds the current athlete list and, while live, polls LiveTrack for
//! samples newer than each athlete's latest known one. The timer reads the
//! athlete list at tick time, so replacing the list never needs a restart
//! to pick up new athletes.

use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;

use crate::athlete::Athlete;
use crate::livetrack::{BatchItem, SessionRef, TrackingFetcher};

/// Whether the tracker wants to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerState {
    Live,
    Paused,
}

/// Summary of one poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub generation: u64,
    pub polled: usize,
    pub updated: usize,
    pub failed: usize,
    pub new_points: usize,
    /// The athlete list was replaced while the poll was in flight
    pub stale: bool,
}

struct Inner {
    athletes: RwLock<Vec<Athlete>>,
    generation: AtomicU64,
    fetcher: TrackingFetcher,
    interval: Duration,
}

impl Inner {
    async fn tick(&self) -> TickReport {
        let generation = self.generation.load(Ordering::SeqCst);

        let (positions, items): (Vec<usize>, Vec<BatchItem>) = {
            let athletes = self.athletes.read().await;
            athletes
                .iter()
                .enumerate()
                .filter(|(_, a)| a.is_pollable())
                .map(|(i, a)| {
                    let item = BatchItem::new(
                        SessionRef::new(a.session_id.clone(), a.token.clone()),
                        a.latest_timestamp(),
                    );
                    (i, item)
                })
                .unzip()
        };

        let mut report = TickReport {
            generation,
            polled: items.len(),
            ..Default::default()
        };
        if items.is_empty() {
            return report;
        }

        let results = self.fetcher.fetch_updates_batch(&items).await;

        let mut athletes = self.athletes.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Athlete list replaced during poll, discarding results");
            report.stale = true;
            return report;
        }

        for (position, outcome) in positions.into_iter().zip(results) {
            let Some(athlete) = athletes.get_mut(position) else {
                continue;
            };
            match outcome {
                Ok(coordinates) => {
                    let appended = athlete.append_coordinates(coordinates);
                    if appended > 0 {
                        athlete.last_update = Utc::now();
                        report.updated += 1;
                        report.new_points += appended;
                    }
                }
                Err(_) => report.failed += 1,
            }
        }

        report
    }
}

/// Owns the athlete list and the repeating poll timer.
///
/// Dropping the tracker disarms the timer. A poll already in flight is
/// allowed to finish.
pub struct LiveTracker {
    inner: Arc<Inner>,
    state: Mutex<TrackerState>,
    timer: Mutex<Option<watch::Sender<()>>>,
}

impl LiveTracker {
    pub fn new(fetcher: TrackingFetcher, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                athletes: RwLock::new(Vec::new()),
                generation: AtomicU64::new(0),
                fetcher,
                interval,
            }),
            state: Mutex::new(TrackerState::Paused),
            timer: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TrackerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Whether the poll timer is currently scheduled
    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Copy of the current athlete list
    pub async fn snapshot(&self) -> Vec<Athlete> {
        self.inner.athletes.read().await.clone()
    }

    /// Replace the athlete list; results of polls started earlier are discarded
    pub async fn replace_athletes(&self, athletes: Vec<Athlete>) {
        {
            let mut current = self.inner.athletes.write().await;
            *current = athletes;
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.rearm().await;
    }

    /// Enter LIVE and arm the timer if any athlete can be polled
    pub async fn go_live(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = TrackerState::Live;
        self.rearm().await;
    }

    /// Enter PAUSED and disarm the timer
    pub fn pause(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = TrackerState::Paused;
        self.disarm();
    }

    /// Run one poll immediately
    pub async fn tick(&self) -> TickReport {
        let report = self.inner.tick().await;
        log_report(&report);
        report
    }

    async fn rearm(&self) {
        self.disarm();

        if self.state() != TrackerState::Live {
            return;
        }

        let pollable = self
            .inner
            .athletes
            .read()
            .await
            .iter()
            .filter(|a| a.is_pollable())
            .count();
        if pollable == 0 {
            tracing::debug!("No pollable athletes, timer not armed");
            return;
        }

        // pause() may have run while the athlete list was awaited. It disarms
        // through the timer lock, so the state is checked under that lock.
        {
            let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
            if self.state() != TrackerState::Live {
                tracing::debug!("Paused while arming, timer not armed");
                return;
            }
            let (stop_tx, stop_rx) = watch::channel(());
            spawn_loop(self.inner.clone(), stop_rx);
            *timer = Some(stop_tx);
        }

        tracing::info!(
            athletes = pollable,
            interval_secs = self.inner.interval.as_secs_f64(),
            "Live polling armed"
        );
    }

    fn disarm(&self) {
        if self
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
        {
            tracing::debug!("Live polling disarmed");
        }
    }
}

impl Drop for LiveTracker {
    fn drop(&mut self) {
        self.disarm();
    }
}

fn spawn_loop(inner: Arc<Inner>, mut stop: watch::Receiver<()>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(inner.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = inner.tick().await;
                    log_report(&report);
                }
                _ = stop.changed() => break,
            }
        }
    });
}

fn log_report(report: &TickReport) {
    if report.stale {
        return;
    }
    tracing::info!(
        polled = report.polled,
        updated = report.updated,
        failed = report.failed,
        new_points = report.new_points,
        "Live poll complete"
    );
}
