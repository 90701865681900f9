//! Rolling-window telemetry aggregation for a mining rig.
//!
//! Each push from the Telemetry Source carries sparse per-period samples for a
//! short and a long window plus lifetime counters. The engine resolves an
//! anchor period for each window, walks the fixed span ending at it with
//! zero-fill for missing periods, and derives display-ready series, averages
//! and percentages. Reports are immutable and replace the previous one whole.

pub mod anchor;
pub mod closest;
pub mod consumer;
pub mod engine;
pub mod error;
pub mod format;
pub mod mailbox;
pub mod overall;
pub mod sink;
pub mod types;
pub mod windowing;

pub use anchor::{resolve_anchor, AnchorSource};
pub use closest::{extract_closest, ClosestSampleSnapshot};
pub use consumer::run_consumer;
pub use engine::{EngineOptions, RigReport, RigStatsEngine, ShortWindowReport};
pub use error::{Result, RigStatsError};
pub use format::{round2, to_mhz};
pub use mailbox::PushMailbox;
pub use overall::{map_overall, OverallSummary};
pub use sink::{ChartSink, ReportCache};
pub use types::{
    unix_timestamp_millis, OverallRaw, Percent, RigInfoPush, RigInfoRequest, SampleWindow,
    TelemetrySample,
};
pub use windowing::{
    aggregate, PercentGuard, WindowGeometry, WindowPolicy, WindowReport, WindowSummary,
};
