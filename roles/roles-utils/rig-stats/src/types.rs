//! Wire types exchanged with the Telemetry Source.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Sparse telemetry keyed by period index. Lives for a single push.
pub type SampleWindow = BTreeMap<i64, TelemetrySample>;

/// One period's worth of rig telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Hashrate reported by the miner, H/s
    #[serde(default)]
    pub reported_hashrate: f64,

    /// Hashrate derived from accepted share difficulty, H/s
    #[serde(default)]
    pub effective_hashrate: f64,

    #[serde(default)]
    pub mined_share: u64,

    #[serde(default)]
    pub valid_share: u64,

    #[serde(default)]
    pub rejected_share: u64,
}

/// Lifetime counters for the rig as tracked by the source.
///
/// The share counters accept both the display names and the names the share
/// tracker persists them under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallRaw {
    #[serde(default)]
    pub reported_hashrate: f64,

    #[serde(default)]
    pub effective_hashrate: f64,

    #[serde(default, alias = "total_submitted_share")]
    pub mined_share: u64,

    #[serde(default, alias = "total_accepted_share")]
    pub valid_share: u64,

    #[serde(default, alias = "total_rejected_share")]
    pub rejected_share: u64,

    #[serde(default)]
    pub verified_share: u64,

    #[serde(default)]
    pub pending_share: u64,

    #[serde(default)]
    pub total_block_found: u64,

    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(default)]
    pub last_block: Option<String>,

    #[serde(default)]
    pub last_valid_share: Option<String>,
}

/// One message from the Telemetry Source. Durations are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigInfoPush {
    pub period_duration: u64,
    pub short_window_duration: u64,
    pub long_window_duration: u64,
    #[serde(default)]
    pub short_window_sample: SampleWindow,
    #[serde(default)]
    pub long_window_sample: SampleWindow,
    #[serde(default)]
    pub overall: OverallRaw,
}

impl RigInfoPush {
    /// Parse a single newline-delimited JSON payload.
    pub fn from_slice(data: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Poll sent upstream to ask for a fresh push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigInfoRequest {
    pub action: String,
    #[serde(alias = "rig_id")]
    pub rig_id: String,
    #[serde(alias = "rig_ip")]
    pub rig_ip: String,
}

impl RigInfoRequest {
    pub const ACTION: &'static str = "getRigInfo";

    pub fn new(rig_id: impl Into<String>, rig_ip: impl Into<String>) -> Self {
        Self {
            action: Self::ACTION.to_string(),
            rig_id: rig_id.into(),
            rig_ip: rig_ip.into(),
        }
    }
}

/// A ratio that may be undefined.
///
/// Undefined is carried on the wire as `""` so consumers can tell it apart
/// from `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Percent(pub Option<f64>);

impl Percent {
    pub const UNDEFINED: Percent = Percent(None);

    pub fn value(self) -> Option<f64> {
        self.0
    }

    pub fn is_undefined(self) -> bool {
        self.0.is_none()
    }
}

impl From<Option<f64>> for Percent {
    fn from(value: Option<f64>) -> Self {
        Percent(value)
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(Percent(Some(value))),
            Raw::Text(text) if text.is_empty() => Ok(Percent(None)),
            Raw::Text(text) => text
                .parse::<f64>()
                .map(|value| Percent(Some(value)))
                .map_err(de::Error::custom),
        }
    }
}

/// Get current Unix timestamp in milliseconds.
pub fn unix_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
