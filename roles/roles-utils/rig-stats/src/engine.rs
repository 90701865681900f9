//! Per-push pipeline: anchors, both windows, closest sample, overall.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::anchor::resolve_anchor;
use crate::closest::{extract_closest, ClosestSampleSnapshot};
use crate::error::{Result, RigStatsError};
use crate::overall::{map_overall, OverallSummary};
use crate::types::{RigInfoPush, SampleWindow};
use crate::windowing::{aggregate, WindowGeometry, WindowPolicy, WindowReport};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortWindowReport {
    #[serde(flatten)]
    pub window: WindowReport,
    pub closest: ClosestSampleSnapshot,
}

/// Everything produced for one push. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigReport {
    pub short: ShortWindowReport,
    pub long: WindowReport,
    pub overall: OverallSummary,
    /// Wall clock the anchors were resolved against, epoch milliseconds
    pub generated_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub short: WindowPolicy,
    pub long: WindowPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            short: WindowPolicy::short(),
            long: WindowPolicy::long(),
        }
    }
}

/// Turns pushes into reports for one rig.
///
/// The only state carried between pushes is the last report, which seeds the
/// closest-sample snapshot when its period is missing.
#[derive(Debug, Default)]
pub struct RigStatsEngine {
    options: EngineOptions,
    latest: Option<Arc<RigReport>>,
}

impl RigStatsEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            latest: None,
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn latest(&self) -> Option<Arc<RigReport>> {
        self.latest.clone()
    }

    /// Run the full pipeline on `push` as of `now_ms`.
    ///
    /// A push that fails validation is rejected and the previous report stays
    /// current.
    pub fn process(&mut self, push: &RigInfoPush, now_ms: u64) -> Result<Arc<RigReport>> {
        validate(push)?;

        let period = push.period_duration;
        let short_geometry = WindowGeometry::new(period, push.short_window_duration);
        let long_geometry = WindowGeometry::new(period, push.long_window_duration);

        let short_anchor = resolve_anchor(
            period,
            self.options.short.anchor_source.samples(push),
            now_ms,
        );
        let long_anchor = resolve_anchor(
            period,
            self.options.long.anchor_source.samples(push),
            now_ms,
        );

        let previous_closest = self
            .latest
            .as_ref()
            .map(|report| report.short.closest.clone())
            .unwrap_or_default();

        let short = ShortWindowReport {
            window: aggregate(
                short_geometry,
                &push.short_window_sample,
                short_anchor,
                self.options.short.percent_guard,
            ),
            closest: extract_closest(
                &push.short_window_sample,
                short_anchor,
                period,
                &previous_closest,
            ),
        };
        let long = aggregate(
            long_geometry,
            &push.long_window_sample,
            long_anchor,
            self.options.long.percent_guard,
        );

        let report = Arc::new(RigReport {
            short,
            long,
            overall: map_overall(&push.overall),
            generated_at_ms: now_ms,
        });

        debug!(
            "Processed push: period={}s, short_anchor={}, long_anchor={}, short_samples={}, long_samples={}",
            period,
            short_anchor,
            long_anchor,
            push.short_window_sample.len(),
            push.long_window_sample.len()
        );

        self.latest = Some(report.clone());
        Ok(report)
    }
}

fn validate(push: &RigInfoPush) -> Result<()> {
    validate_geometry("short", push.period_duration, push.short_window_duration)?;
    validate_geometry("long", push.period_duration, push.long_window_duration)?;
    validate_window("short", &push.short_window_sample)?;
    validate_window("long", &push.long_window_sample)?;

    for (field, value) in [
        ("reported_hashrate", push.overall.reported_hashrate),
        ("effective_hashrate", push.overall.effective_hashrate),
    ] {
        if !is_valid_hashrate(value) {
            return Err(RigStatsError::InvalidOverall { field, value });
        }
    }
    Ok(())
}

fn validate_geometry(
    window: &'static str,
    period_duration: u64,
    window_duration: u64,
) -> Result<()> {
    if WindowGeometry::new(period_duration, window_duration).is_bounded() {
        Ok(())
    } else {
        Err(RigStatsError::InvalidGeometry {
            window,
            period_duration,
            window_duration,
        })
    }
}

fn validate_window(window: &'static str, samples: &SampleWindow) -> Result<()> {
    for (&period, sample) in samples {
        for (field, value) in [
            ("reported_hashrate", sample.reported_hashrate),
            ("effective_hashrate", sample.effective_hashrate),
        ] {
            if !is_valid_hashrate(value) {
                return Err(RigStatsError::InvalidSample {
                    window,
                    period,
                    field,
                    value,
                });
            }
        }
    }
    Ok(())
}

fn is_valid_hashrate(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
