//! Lifetime counters mapped for display.

use serde::{Deserialize, Serialize};

use crate::format::{percent_of, to_mhz};
use crate::types::{OverallRaw, Percent};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    pub effective_hashrate: f64,
    pub reported_hashrate: f64,
    pub effective_hashrate_percent: Percent,
    pub mined_share: u64,
    pub valid_share: u64,
    pub rejected_share: u64,
    pub verified_share: u64,
    pub pending_share: u64,
    pub valid_share_percent: Percent,
    pub rejected_share_percent: Percent,
    pub total_block_found: u64,
    pub start_time: Option<String>,
    pub last_block: Option<String>,
    pub last_valid_share: Option<String>,
}

pub fn map_overall(raw: &OverallRaw) -> OverallSummary {
    let effective_hashrate = to_mhz(raw.effective_hashrate);
    let reported_hashrate = to_mhz(raw.reported_hashrate);
    let mined = raw.mined_share as f64;

    OverallSummary {
        effective_hashrate,
        reported_hashrate,
        effective_hashrate_percent: percent_of(effective_hashrate, reported_hashrate).into(),
        mined_share: raw.mined_share,
        valid_share: raw.valid_share,
        rejected_share: raw.rejected_share,
        verified_share: raw.verified_share,
        pending_share: raw.pending_share,
        valid_share_percent: percent_of(raw.valid_share as f64, mined).into(),
        rejected_share_percent: percent_of(raw.rejected_share as f64, mined).into(),
        total_block_found: raw.total_block_found,
        start_time: raw.start_time.clone(),
        last_block: raw.last_block.clone(),
        last_valid_share: raw.last_valid_share.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_overall() {
        let raw = OverallRaw {
            reported_hashrate: 120_000_000.0,
            effective_hashrate: 90_000_000.0,
            mined_share: 300,
            valid_share: 297,
            rejected_share: 3,
            verified_share: 250,
            pending_share: 47,
            total_block_found: 2,
            start_time: Some("2017-06-01T08:00:00Z".to_string()),
            last_block: Some("2017-06-01T09:30:00Z".to_string()),
            last_valid_share: None,
        };

        let summary = map_overall(&raw);
        assert_eq!(summary.effective_hashrate, 90.0);
        assert_eq!(summary.reported_hashrate, 120.0);
        assert_eq!(summary.effective_hashrate_percent, Percent(Some(75.0)));
        assert_eq!(summary.valid_share_percent, Percent(Some(99.0)));
        assert_eq!(summary.rejected_share_percent, Percent(Some(1.0)));
        assert_eq!(summary.verified_share, 250);
        assert_eq!(summary.pending_share, 47);
        assert_eq!(summary.total_block_found, 2);
        assert_eq!(summary.start_time, raw.start_time);
        assert_eq!(summary.last_block, raw.last_block);
        assert!(summary.last_valid_share.is_none());
    }

    #[test]
    fn test_fresh_rig() {
        let summary = map_overall(&OverallRaw::default());
        assert!(summary.effective_hashrate_percent.is_undefined());
        assert!(summary.valid_share_percent.is_undefined());
        assert!(summary.rejected_share_percent.is_undefined());
    }

    #[test]
    fn test_tiny_reported_hashrate_rounds_to_zero() {
        // The ratio is taken on the converted values
        let raw = OverallRaw {
            reported_hashrate: 1_000.0,
            effective_hashrate: 1_000.0,
            ..Default::default()
        };
        assert!(map_overall(&raw).effective_hashrate_percent.is_undefined());
    }
}
