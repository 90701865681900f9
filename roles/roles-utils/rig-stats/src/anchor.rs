//! Anchor point resolution.
//!
//! The anchor is the period index a window treats as "now". It reconciles the
//! wall clock with the latest period the source actually reported: when the
//! newest sample sits in the current period that period is used, otherwise
//! the current (likely incomplete) period is skipped and the one before it
//! becomes the anchor.

use serde::{Deserialize, Serialize};

use crate::types::{RigInfoPush, SampleWindow};

/// Which sample collection of a push the resolver scans for the newest index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorSource {
    #[default]
    Short,
    Long,
}

impl AnchorSource {
    pub fn samples(self, push: &RigInfoPush) -> &SampleWindow {
        match self {
            AnchorSource::Short => &push.short_window_sample,
            AnchorSource::Long => &push.long_window_sample,
        }
    }
}

/// Period index containing `now_ms`, rounded to the nearest period.
///
/// Evaluated as `now / period / 1000` in floating point.
pub fn current_period(period_duration: u64, now_ms: u64) -> i64 {
    (now_ms as f64 / period_duration as f64 / 1000.0 + 0.5).floor() as i64
}

/// Resolve the anchor period for a window.
///
/// Returns 0 when `period_duration` is 0. The newest index never drops below
/// 0, so an empty collection behaves like one whose newest period is 0.
pub fn resolve_anchor(period_duration: u64, samples: &SampleWindow, now_ms: u64) -> i64 {
    if period_duration == 0 {
        return 0;
    }

    let current_point = current_period(period_duration, now_ms);
    let max_point = samples.keys().next_back().copied().unwrap_or(0).max(0);

    if max_point == current_point {
        max_point
    } else {
        current_point - 1
    }
}
