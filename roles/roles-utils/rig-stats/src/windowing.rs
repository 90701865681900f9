//! Windowed aggregation over a fixed span of periods.
//!
//! One parameterized aggregator serves both the short and the long window.
//! The span always holds `point_total` periods ending at the anchor; periods
//! the source did not report are zero-filled so every series keeps the same
//! length and stays aligned with its timestamps.
//!
//! # Averaging
//!
//! - effective hashrate and share averages divide by the nominal span, so
//!   missing periods pull the average down;
//! - reported hashrate divides by the number of periods that had data.
//!
//! Percentages are undefined (not zero) when their gate is zero. Which value
//! gates the share percentages is a per-window [`PercentGuard`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::anchor::AnchorSource;
use crate::format::{percent_of, round2, to_mhz};
use crate::types::{Percent, SampleWindow};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Largest span a window may cover. A week of one-second periods.
pub const MAX_POINT_TOTAL: u64 = 7 * 24 * 3600 + 1;

/// Period and window lengths, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub period_duration: u64,
    pub window_duration: u64,
}

impl WindowGeometry {
    pub fn new(period_duration: u64, window_duration: u64) -> Self {
        Self {
            period_duration,
            window_duration,
        }
    }

    /// Number of periods in the span, both ends inclusive.
    ///
    /// A zero period collapses the span to a single point.
    pub fn point_total(&self) -> u64 {
        self.checked_point_total().unwrap_or(u64::MAX)
    }

    /// [`point_total`](Self::point_total), or `None` if it does not fit in a
    /// `u64`.
    pub fn checked_point_total(&self) -> Option<u64> {
        if self.period_duration == 0 {
            Some(1)
        } else {
            (self.window_duration / self.period_duration).checked_add(1)
        }
    }

    /// Whether the span is small enough to aggregate.
    pub fn is_bounded(&self) -> bool {
        matches!(self.checked_point_total(), Some(total) if total <= MAX_POINT_TOTAL)
    }

    pub fn duration_in_hour(&self) -> f64 {
        self.window_duration as f64 / SECONDS_PER_HOUR
    }

    /// X-axis value for a period, epoch milliseconds.
    ///
    /// Saturates instead of overflowing for extreme periods.
    pub fn timestamp_ms(&self, period: i64) -> i64 {
        let period_duration = i64::try_from(self.period_duration).unwrap_or(i64::MAX);
        period.saturating_mul(period_duration).saturating_mul(1000)
    }
}

/// Which total must be non-zero for the valid/rejected percentages to be
/// defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentGuard {
    /// Gate each percentage on its own numerator (valid or rejected total).
    NonZeroNumerator,
    /// Gate both percentages on the mined total.
    NonZeroMined,
}

impl PercentGuard {
    fn share_percent(self, part: u64, mined: u64) -> Percent {
        let gate = match self {
            PercentGuard::NonZeroNumerator => part,
            PercentGuard::NonZeroMined => mined,
        };
        if gate == 0 {
            Percent::UNDEFINED
        } else {
            // A zero mined total stays undefined under either guard.
            percent_of(part as f64, mined as f64).into()
        }
    }
}

/// Per-window knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPolicy {
    pub anchor_source: AnchorSource,
    pub percent_guard: PercentGuard,
}

impl WindowPolicy {
    pub fn short() -> Self {
        Self {
            anchor_source: AnchorSource::Short,
            percent_guard: PercentGuard::NonZeroNumerator,
        }
    }

    pub fn long() -> Self {
        Self {
            anchor_source: AnchorSource::Short,
            percent_guard: PercentGuard::NonZeroMined,
        }
    }
}

/// Hashrate chart data in MH/s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashrateSeries {
    pub timestamps: Vec<i64>,
    pub reported: Vec<f64>,
    pub effective: Vec<f64>,
}

impl HashrateSeries {
    /// Column layout for a C3-style time-series chart.
    pub fn to_columns(&self) -> Vec<Value> {
        vec![
            labelled("x", &self.timestamps),
            labelled("Reported Hashrate", &self.reported),
            labelled("Effective Hashrate", &self.effective),
        ]
    }
}

/// Share counter chart data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareSeries {
    pub timestamps: Vec<i64>,
    pub mined: Vec<u64>,
    pub valid: Vec<u64>,
    pub rejected: Vec<u64>,
}

impl ShareSeries {
    pub fn to_columns(&self) -> Vec<Value> {
        vec![
            labelled("x", &self.timestamps),
            labelled("Mined Shares", &self.mined),
            labelled("Valid Shares", &self.valid),
            labelled("Rejected Shares", &self.rejected),
        ]
    }
}

fn labelled<T: Serialize>(label: &str, values: &[T]) -> Value {
    let mut column = vec![json!(label)];
    column.extend(values.iter().map(|v| json!(v)));
    Value::Array(column)
}

/// Scalars derived from a window's series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub effective_hashrate_average: f64,
    pub reported_hashrate_average: f64,
    pub effective_hashrate_percent: Percent,
    pub mined_share_total: u64,
    pub valid_share_total: u64,
    pub rejected_share_total: u64,
    pub mined_share_average: f64,
    pub valid_share_average: f64,
    pub rejected_share_average: f64,
    pub valid_share_percent: Percent,
    pub rejected_share_percent: Percent,
}

/// Everything a chart needs for one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub duration_in_hour: f64,
    pub point_number: u64,
    pub anchor: i64,
    pub summary: WindowSummary,
    pub hashrate_series: HashrateSeries,
    pub shares_series: ShareSeries,
}

impl WindowReport {
    pub fn chart_columns(&self) -> Value {
        json!({
            "hash_rate": self.hashrate_series.to_columns(),
            "shares": self.shares_series.to_columns(),
        })
    }
}

#[derive(Debug, Default)]
struct Totals {
    effective: f64,
    reported: f64,
    mined: u64,
    valid: u64,
    rejected: u64,
    sample_count: u64,
}

/// Aggregate the span of `geometry.point_total()` periods ending at `anchor`.
///
/// Pure: the same inputs always produce the same report. Callers are expected
/// to check [`WindowGeometry::is_bounded`] first; the engine rejects pushes
/// whose windows are not.
pub fn aggregate(
    geometry: WindowGeometry,
    samples: &SampleWindow,
    anchor: i64,
    guard: PercentGuard,
) -> WindowReport {
    let point_total = geometry.point_total();
    let capacity = point_total.min(MAX_POINT_TOTAL) as usize;

    let mut hashrate = HashrateSeries {
        timestamps: Vec::with_capacity(capacity),
        reported: Vec::with_capacity(capacity),
        effective: Vec::with_capacity(capacity),
    };
    let mut shares = ShareSeries {
        timestamps: Vec::with_capacity(capacity),
        mined: Vec::with_capacity(capacity),
        valid: Vec::with_capacity(capacity),
        rejected: Vec::with_capacity(capacity),
    };
    let mut totals = Totals::default();

    let span_back = i64::try_from(point_total).unwrap_or(i64::MAX) - 1;
    let first = anchor.saturating_sub(span_back);
    for key in first..=anchor {
        let timestamp = geometry.timestamp_ms(key);
        hashrate.timestamps.push(timestamp);
        shares.timestamps.push(timestamp);

        match samples.get(&key) {
            Some(sample) => {
                totals.sample_count += 1;
                totals.effective += sample.effective_hashrate;
                totals.reported += sample.reported_hashrate;
                totals.mined += sample.mined_share;
                totals.valid += sample.valid_share;
                totals.rejected += sample.rejected_share;

                hashrate.reported.push(to_mhz(sample.reported_hashrate));
                hashrate.effective.push(to_mhz(sample.effective_hashrate));
                shares.mined.push(sample.mined_share);
                shares.valid.push(sample.valid_share);
                shares.rejected.push(sample.rejected_share);
            }
            None => {
                hashrate.reported.push(0.0);
                hashrate.effective.push(0.0);
                shares.mined.push(0);
                shares.valid.push(0);
                shares.rejected.push(0);
            }
        }
    }

    let span = point_total as f64;
    let effective_avg = to_mhz(totals.effective / span);
    let reported_avg = if totals.sample_count == 0 {
        0.0
    } else {
        to_mhz(totals.reported / totals.sample_count as f64)
    };

    let summary = WindowSummary {
        effective_hashrate_average: effective_avg,
        reported_hashrate_average: reported_avg,
        effective_hashrate_percent: percent_of(effective_avg, reported_avg).into(),
        mined_share_total: totals.mined,
        valid_share_total: totals.valid,
        rejected_share_total: totals.rejected,
        mined_share_average: round2(totals.mined as f64 / span),
        valid_share_average: round2(totals.valid as f64 / span),
        rejected_share_average: round2(totals.rejected as f64 / span),
        valid_share_percent: guard.share_percent(totals.valid, totals.mined),
        rejected_share_percent: guard.share_percent(totals.rejected, totals.mined),
    };

    tracing::debug!(
        "Aggregated window: anchor={}, points={}, samples={}, effective_avg={:.2}MH/s, reported_avg={:.2}MH/s",
        anchor,
        point_total,
        totals.sample_count,
        effective_avg,
        reported_avg
    );

    WindowReport {
        duration_in_hour: geometry.duration_in_hour(),
        point_number: point_total,
        anchor,
        summary,
        hashrate_series: hashrate,
        shares_series: shares,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TelemetrySample;

    fn sample(hashrate: f64, mined: u64, valid: u64, rejected: u64) -> TelemetrySample {
        TelemetrySample {
            reported_hashrate: hashrate,
            effective_hashrate: hashrate,
            mined_share: mined,
            valid_share: valid,
            rejected_share: rejected,
        }
    }

    #[test]
    fn test_point_total() {
        assert_eq!(WindowGeometry::new(60, 300).point_total(), 6);
        assert_eq!(WindowGeometry::new(600, 86400).point_total(), 145);
        assert_eq!(WindowGeometry::new(0, 300).point_total(), 1);
    }

    #[test]
    fn test_span_bounds() {
        assert!(WindowGeometry::new(60, 86400).is_bounded());
        assert!(WindowGeometry::new(0, u64::MAX).is_bounded());
        assert!(WindowGeometry::new(1, MAX_POINT_TOTAL - 1).is_bounded());
        assert!(!WindowGeometry::new(1, MAX_POINT_TOTAL).is_bounded());
        assert!(!WindowGeometry::new(1, u64::MAX / 2).is_bounded());

        let overflowing = WindowGeometry::new(1, u64::MAX);
        assert_eq!(overflowing.checked_point_total(), None);
        assert_eq!(overflowing.point_total(), u64::MAX);
        assert!(!overflowing.is_bounded());
    }

    #[test]
    fn test_timestamp_saturates() {
        let geometry = WindowGeometry::new(u64::MAX, 0);
        assert_eq!(geometry.timestamp_ms(-1), i64::MIN);
        assert_eq!(geometry.timestamp_ms(0), 0);
        assert_eq!(WindowGeometry::new(60, 0).timestamp_ms(i64::MAX), i64::MAX);
    }

    #[test]
    fn test_series_length_fixed_for_sparse_input() {
        let geometry = WindowGeometry::new(60, 3600);
        let mut samples = SampleWindow::new();
        samples.insert(990, sample(1_000_000.0, 1, 1, 0));
        samples.insert(1000, sample(1_000_000.0, 1, 1, 0));

        let report = aggregate(geometry, &samples, 1000, PercentGuard::NonZeroMined);
        assert_eq!(report.point_number, 61);
        assert_eq!(report.hashrate_series.timestamps.len(), 61);
        assert_eq!(report.hashrate_series.reported.len(), 61);
        assert_eq!(report.hashrate_series.effective.len(), 61);
        assert_eq!(report.shares_series.timestamps.len(), 61);
        assert_eq!(report.shares_series.mined.len(), 61);
        assert_eq!(report.shares_series.valid.len(), 61);
        assert_eq!(report.shares_series.rejected.len(), 61);
    }

    #[test]
    fn test_zero_fill_and_timestamps() {
        let geometry = WindowGeometry::new(60, 300);
        let mut samples = SampleWindow::new();
        samples.insert(98, sample(2_500_000.0, 5, 4, 1));
        // Outside the span, must be ignored
        samples.insert(90, sample(9_000_000.0, 9, 9, 0));

        let report = aggregate(geometry, &samples, 100, PercentGuard::NonZeroNumerator);
        assert_eq!(
            report.hashrate_series.timestamps,
            vec![5_700_000, 5_760_000, 5_820_000, 5_880_000, 5_940_000, 6_000_000]
        );
        assert_eq!(report.hashrate_series.reported, vec![0.0, 0.0, 0.0, 2.5, 0.0, 0.0]);
        assert_eq!(report.shares_series.mined, vec![0, 0, 0, 5, 0, 0]);
        assert_eq!(report.shares_series.rejected, vec![0, 0, 0, 1, 0, 0]);
        assert_eq!(report.summary.mined_share_total, 5);
        assert_eq!(report.summary.valid_share_total, 4);
        assert_eq!(report.summary.rejected_share_total, 1);
    }

    #[test]
    fn test_asymmetric_averages() {
        let geometry = WindowGeometry::new(60, 300);
        let mut samples = SampleWindow::new();
        samples.insert(98, sample(60_000_000.0, 0, 0, 0));
        samples.insert(100, sample(60_000_000.0, 0, 0, 0));

        let report = aggregate(geometry, &samples, 100, PercentGuard::NonZeroNumerator);
        // Effective divides by the 6-point span, reported by the 2 samples
        assert_eq!(report.summary.effective_hashrate_average, 20.0);
        assert_eq!(report.summary.reported_hashrate_average, 60.0);
        assert_eq!(report.summary.effective_hashrate_percent, Percent(Some(33.33)));
    }

    #[test]
    fn test_share_averages_over_span() {
        let geometry = WindowGeometry::new(60, 120);
        let mut samples = SampleWindow::new();
        samples.insert(10, sample(0.0, 10, 9, 1));

        let report = aggregate(geometry, &samples, 10, PercentGuard::NonZeroMined);
        assert_eq!(report.summary.mined_share_average, 3.33);
        assert_eq!(report.summary.valid_share_average, 3.0);
        assert_eq!(report.summary.rejected_share_average, 0.33);
        assert_eq!(report.summary.valid_share_percent, Percent(Some(90.0)));
        assert_eq!(report.summary.rejected_share_percent, Percent(Some(10.0)));
    }

    #[test]
    fn test_empty_window() {
        let geometry = WindowGeometry::new(60, 300);
        let report = aggregate(geometry, &SampleWindow::new(), 100, PercentGuard::NonZeroMined);

        assert_eq!(report.summary.reported_hashrate_average, 0.0);
        assert_eq!(report.summary.effective_hashrate_average, 0.0);
        assert!(report.summary.effective_hashrate_percent.is_undefined());
        assert!(report.hashrate_series.effective.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_no_mined_shares_leaves_percentages_undefined() {
        let geometry = WindowGeometry::new(60, 300);
        let mut samples = SampleWindow::new();
        for key in 95..=100 {
            samples.insert(key, sample(1_000_000.0, 0, 0, 0));
        }

        for guard in [PercentGuard::NonZeroNumerator, PercentGuard::NonZeroMined] {
            let report = aggregate(geometry, &samples, 100, guard);
            assert!(report.summary.valid_share_percent.is_undefined());
            assert!(report.summary.rejected_share_percent.is_undefined());
        }
    }

    #[test]
    fn test_guard_variance_with_zero_rejected() {
        let geometry = WindowGeometry::new(60, 300);
        let mut samples = SampleWindow::new();
        samples.insert(100, sample(1_000_000.0, 8, 8, 0));

        let short = aggregate(geometry, &samples, 100, PercentGuard::NonZeroNumerator);
        assert_eq!(short.summary.valid_share_percent, Percent(Some(100.0)));
        assert!(short.summary.rejected_share_percent.is_undefined());

        let long = aggregate(geometry, &samples, 100, PercentGuard::NonZeroMined);
        assert_eq!(long.summary.valid_share_percent, Percent(Some(100.0)));
        assert_eq!(long.summary.rejected_share_percent, Percent(Some(0.0)));
    }

    #[test]
    fn test_valid_without_mined_is_undefined() {
        let geometry = WindowGeometry::new(60, 60);
        let mut samples = SampleWindow::new();
        samples.insert(5, sample(0.0, 0, 3, 0));

        let report = aggregate(geometry, &samples, 5, PercentGuard::NonZeroNumerator);
        assert!(report.summary.valid_share_percent.is_undefined());
    }

    #[test]
    fn test_zero_period_degenerate_series() {
        let geometry = WindowGeometry::new(0, 300);
        let report = aggregate(geometry, &SampleWindow::new(), 0, PercentGuard::NonZeroMined);

        assert_eq!(report.point_number, 1);
        assert_eq!(report.hashrate_series.timestamps, vec![0]);
        assert_eq!(report.hashrate_series.reported, vec![0.0]);
        assert_eq!(report.shares_series.mined, vec![0]);
    }

    #[test]
    fn test_aggregate_is_pure() {
        let geometry = WindowGeometry::new(60, 600);
        let mut samples = SampleWindow::new();
        samples.insert(49, sample(3_333_333.0, 7, 6, 1));
        samples.insert(45, sample(1_111_111.0, 2, 1, 1));

        let first = aggregate(geometry, &samples, 50, PercentGuard::NonZeroMined);
        let second = aggregate(geometry, &samples, 50, PercentGuard::NonZeroMined);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_chart_columns() {
        let geometry = WindowGeometry::new(60, 60);
        let mut samples = SampleWindow::new();
        samples.insert(2, sample(1_500_000.0, 3, 2, 1));

        let report = aggregate(geometry, &samples, 2, PercentGuard::NonZeroMined);
        let columns = report.hashrate_series.to_columns();
        assert_eq!(columns[0], json!(["x", 60_000, 120_000]));
        assert_eq!(columns[1], json!(["Reported Hashrate", 0.0, 1.5]));
        assert_eq!(columns[2], json!(["Effective Hashrate", 0.0, 1.5]));

        let shares = report.shares_series.to_columns();
        assert_eq!(shares[1], json!(["Mined Shares", 0, 3]));
        assert_eq!(shares[3], json!(["Rejected Shares", 0, 1]));
    }
}
