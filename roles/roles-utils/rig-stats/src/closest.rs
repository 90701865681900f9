//! Point-in-time fields taken from a single sample.

use serde::{Deserialize, Serialize};

use crate::format::{percent_of, to_mhz};
use crate::types::{Percent, SampleWindow};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosestHashrate {
    pub effective_hashrate: f64,
    pub reported_hashrate: f64,
    pub effective_hashrate_percent: Percent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosestShares {
    pub mined_share: u64,
    pub valid_share: u64,
    pub rejected_share: u64,
    pub valid_share_percent: Percent,
    pub rejected_share_percent: Percent,
}

/// Display fields for the last complete period before the short anchor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosestSampleSnapshot {
    pub duration_in_min: f64,
    pub hash_rate: ClosestHashrate,
    pub shares: ClosestShares,
}

/// Build the closest-sample snapshot from `samples[anchor - 1]`.
///
/// When that period is missing the hashrate and share fields are carried
/// over from `previous`; only `duration_in_min` is refreshed.
pub fn extract_closest(
    samples: &SampleWindow,
    anchor: i64,
    period_duration: u64,
    previous: &ClosestSampleSnapshot,
) -> ClosestSampleSnapshot {
    let mut snapshot = previous.clone();
    snapshot.duration_in_min = period_duration as f64 / 60.0;

    let Some(sample) = samples.get(&(anchor - 1)) else {
        return snapshot;
    };

    snapshot.hash_rate = ClosestHashrate {
        effective_hashrate: to_mhz(sample.effective_hashrate),
        reported_hashrate: to_mhz(sample.reported_hashrate),
        effective_hashrate_percent: percent_of(
            sample.effective_hashrate,
            sample.reported_hashrate,
        )
        .into(),
    };

    let mined = sample.mined_share as f64;
    snapshot.shares = ClosestShares {
        mined_share: sample.mined_share,
        valid_share: sample.valid_share,
        rejected_share: sample.rejected_share,
        valid_share_percent: percent_of(sample.valid_share as f64, mined).into(),
        rejected_share_percent: percent_of(sample.rejected_share as f64, mined).into(),
    };

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TelemetrySample;

    #[test]
    fn test_reads_period_before_anchor() {
        let mut samples = SampleWindow::new();
        samples.insert(
            99,
            TelemetrySample {
                reported_hashrate: 30_000_000.0,
                effective_hashrate: 27_000_000.0,
                mined_share: 20,
                valid_share: 19,
                rejected_share: 1,
            },
        );
        samples.insert(
            100,
            TelemetrySample {
                reported_hashrate: 1.0,
                ..Default::default()
            },
        );

        let snapshot = extract_closest(&samples, 100, 120, &ClosestSampleSnapshot::default());
        assert_eq!(snapshot.duration_in_min, 2.0);
        assert_eq!(snapshot.hash_rate.effective_hashrate, 27.0);
        assert_eq!(snapshot.hash_rate.reported_hashrate, 30.0);
        assert_eq!(snapshot.hash_rate.effective_hashrate_percent, Percent(Some(90.0)));
        assert_eq!(snapshot.shares.mined_share, 20);
        assert_eq!(snapshot.shares.valid_share_percent, Percent(Some(95.0)));
        assert_eq!(snapshot.shares.rejected_share_percent, Percent(Some(5.0)));
    }

    #[test]
    fn test_miss_keeps_previous_values() {
        let previous = ClosestSampleSnapshot {
            duration_in_min: 10.0,
            hash_rate: ClosestHashrate {
                effective_hashrate: 4.2,
                reported_hashrate: 5.0,
                effective_hashrate_percent: Percent(Some(84.0)),
            },
            shares: ClosestShares {
                mined_share: 3,
                valid_share: 3,
                rejected_share: 0,
                valid_share_percent: Percent(Some(100.0)),
                rejected_share_percent: Percent(Some(0.0)),
            },
        };

        let snapshot = extract_closest(&SampleWindow::new(), 100, 60, &previous);
        assert_eq!(snapshot.duration_in_min, 1.0);
        assert_eq!(snapshot.hash_rate, previous.hash_rate);
        assert_eq!(snapshot.shares, previous.shares);
    }

    #[test]
    fn test_zero_denominators() {
        let mut samples = SampleWindow::new();
        samples.insert(
            9,
            TelemetrySample {
                effective_hashrate: 5_000_000.0,
                ..Default::default()
            },
        );

        let snapshot = extract_closest(&samples, 10, 60, &ClosestSampleSnapshot::default());
        assert_eq!(snapshot.hash_rate.effective_hashrate, 5.0);
        assert!(snapshot.hash_rate.effective_hashrate_percent.is_undefined());
        assert!(snapshot.shares.valid_share_percent.is_undefined());
        assert!(snapshot.shares.rejected_share_percent.is_undefined());
    }
}
