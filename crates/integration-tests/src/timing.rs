//! Span timing collection for scenario tests.
//!
//! Durations are measured on tokio's clock, so under paused time they are
//! the virtual time a poll actually consumed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Id as SpanId, Subscriber, span};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Timing data for a single span
#[derive(Debug, Clone)]
pub struct SpanTiming {
    /// Span name
    pub name: String,
    /// Start time
    pub start: Instant,
    /// Duration (set when span closes)
    pub duration: Option<Duration>,
}

/// Collected timing data from all spans
#[derive(Debug, Clone, Default)]
pub struct TimingData {
    /// All span timings by ID
    pub spans: HashMap<SpanId, SpanTiming>,
    /// Closed spans in closing order
    pub closed: Vec<SpanTiming>,
}

impl TimingData {
    /// Durations of every closed span named `name`, in closing order
    pub fn durations_for(&self, name: &str) -> Vec<Duration> {
        self.closed
            .iter()
            .filter(|timing| timing.name == name)
            .filter_map(|timing| timing.duration)
            .collect()
    }

    /// Get total duration for a named span (sum across all instances)
    pub fn total_duration_for(&self, name: &str) -> Duration {
        self.durations_for(name).into_iter().sum()
    }

    /// Get count of closed spans with given name
    pub fn count_for(&self, name: &str) -> usize {
        self.closed
            .iter()
            .filter(|timing| timing.name == name)
            .count()
    }

    /// Log every closed span at debug level
    pub fn log_report(&self) {
        tracing::debug!("=== Timing Report ===");
        for timing in &self.closed {
            let duration_str = timing.duration.map_or_else(
                || "RUNNING".to_owned(),
                |dur| format!("{:.3}s", dur.as_secs_f64()),
            );
            tracing::debug!("{}: {duration_str}", timing.name);
        }
    }
}

/// Tracing layer that collects timing data
#[derive(Debug)]
pub struct TimingLayer {
    /// Shared timing data
    data: Arc<Mutex<TimingData>>,
}

impl TimingLayer {
    /// Create new timing layer and a handle to what it collects
    #[must_use]
    pub fn new() -> (Self, Arc<Mutex<TimingData>>) {
        let data = Arc::new(Mutex::new(TimingData::default()));
        (
            Self {
                data: Arc::clone(&data),
            },
            data,
        )
    }
}

impl<S> Layer<S> for TimingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, _ctx: Context<'_, S>) {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.spans.insert(
            id.clone(),
            SpanTiming {
                name: attrs.metadata().name().to_owned(),
                start: Instant::now(),
                duration: None,
            },
        );
    }

    fn on_close(&self, id: span::Id, _ctx: Context<'_, S>) {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut timing) = data.spans.remove(&id) {
            timing.duration = Some(timing.start.elapsed());
            data.closed.push(timing);
        }
    }
}
