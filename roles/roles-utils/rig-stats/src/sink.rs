//! Chart Sink: where finished reports are handed off.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::engine::RigReport;

/// Consumer of finished reports. Each report replaces the previous one whole.
pub trait ChartSink: Send + Sync {
    fn publish(&self, report: Arc<RigReport>);
}

/// Holds the latest report for readers.
///
/// Readers clone the `Arc` once and see a complete report; a publish never
/// exposes a half-written one.
#[derive(Debug, Default)]
pub struct ReportCache {
    latest: RwLock<Option<(Arc<RigReport>, Instant)>>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Arc<RigReport>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(report, _)| report.clone())
    }

    /// Time since the last report landed.
    pub fn age(&self) -> Option<Duration> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, at)| at.elapsed())
    }

    /// Missing data counts as stale.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        match self.age() {
            None => true,
            Some(age) => age > max_age,
        }
    }
}

impl ChartSink for ReportCache {
    fn publish(&self, report: Arc<RigReport>) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) =
            Some((report, Instant::now()));
    }
}
