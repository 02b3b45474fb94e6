//! The refresh loop: fetch, normalize, detect, publish.
//!
//! Each tick's output is assembled off to the side and published in one step
//! through a [`watch`] channel. A failed tick leaves the previous output in
//! place and only records the failure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::detect::detect_bunching;
use crate::error::{FailureKind, TickError, error_chain};
use crate::model::{AlertSet, VehicleReport};
use crate::normalize::normalize_counted;
use crate::parser::parse_feed;
use crate::source::SnapshotSource;

/// Everything one successful tick produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickOutput {
    pub tick: u64,
    pub refreshed_at: DateTime<Utc>,
    /// Header timestamp of the feed snapshot, when present.
    pub feed_timestamp: Option<u64>,
    pub threshold_km: f64,
    pub dropped: usize,
    pub reports: Vec<VehicleReport>,
    pub alerts: AlertSet,
}

/// The most recent failed tick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickFailure {
    pub tick: u64,
    pub at: DateTime<Utc>,
    pub kind: FailureKind,
    pub message: String,
}

/// What readers of the refresh loop see.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveView {
    /// Last known good output; survives failed ticks.
    pub latest: Option<Arc<TickOutput>>,
    pub last_failure: Option<TickFailure>,
    pub consecutive_failures: u32,
}

pub struct Refresher<S> {
    source: S,
    threshold_km: f64,
    fetch_timeout: Duration,
    tick: u64,
    view: watch::Sender<LiveView>,
}

impl<S: SnapshotSource> Refresher<S> {
    pub fn new(source: S, threshold_km: f64, fetch_timeout: Duration) -> Self {
        let (view, _) = watch::channel(LiveView::default());
        Self {
            source,
            threshold_km,
            fetch_timeout,
            tick: 0,
            view,
        }
    }

    /// A handle for readers. Any number may be taken.
    pub fn subscribe(&self) -> watch::Receiver<LiveView> {
        self.view.subscribe()
    }

    /// Runs one tick and publishes its outcome.
    #[tracing::instrument(
        skip(self),
        fields(tick = self.tick + 1, source = %self.source.describe())
    )]
    pub async fn tick(&mut self) -> Result<Arc<TickOutput>, TickError> {
        self.tick += 1;
        let tick = self.tick;

        match self.compute(tick).await {
            Ok(output) => {
                let output = Arc::new(output);
                info!(
                    reports = output.reports.len(),
                    dropped = output.dropped,
                    alerts = output.alerts.len(),
                    routes = output.alerts.route_count(),
                    "Tick complete"
                );
                let published = output.clone();
                self.view.send_modify(|view| {
                    view.latest = Some(published);
                    view.last_failure = None;
                    view.consecutive_failures = 0;
                });
                Ok(output)
            }
            Err(e) => {
                let message = error_chain(&e);
                error!(kind = ?e.kind(), error = %message, "Tick failed, keeping last good output");
                let failure = TickFailure {
                    tick,
                    at: Utc::now(),
                    kind: e.kind(),
                    message,
                };
                self.view.send_modify(|view| {
                    view.last_failure = Some(failure);
                    view.consecutive_failures = view.consecutive_failures.saturating_add(1);
                });
                Err(e)
            }
        }
    }

    async fn compute(&self, tick: u64) -> Result<TickOutput, TickError> {
        let bytes = tokio::time::timeout(self.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| TickError::Timeout(self.fetch_timeout))?
            .map_err(|e| TickError::SourceUnavailable(e.into()))?;
        debug!(bytes = bytes.len(), "Snapshot received, parsing");

        let feed = parse_feed(&bytes)?;
        let (reports, dropped) = normalize_counted(&feed);
        let alerts = detect_bunching(&reports, self.threshold_km)?;

        Ok(TickOutput {
            tick,
            refreshed_at: Utc::now(),
            feed_timestamp: feed.header.timestamp,
            threshold_km: self.threshold_km,
            dropped: dropped.total(),
            reports,
            alerts,
        })
    }

    /// Ticks every `interval` until `shutdown` resolves.
    ///
    /// The first tick fires immediately. A tick is awaited before the next
    /// can start; intervals that elapse meanwhile are skipped. Shutdown drops
    /// any tick still in flight.
    pub async fn run<F>(mut self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            interval_secs = interval.as_secs(),
            threshold_km = self.threshold_km,
            "Refresh loop started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let started = tokio::time::Instant::now();
            tokio::select! {
                _ = &mut shutdown => break,
                // Failures are already logged and recorded in the view.
                _ = self.tick() => {}
            }

            let elapsed = started.elapsed();
            if elapsed > interval {
                warn!(elapsed_ms = elapsed.as_millis() as u64, "Tick overran the refresh interval");
            }
        }

        info!(ticks = self.tick, "Refresh loop stopped");
    }
}
