use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::RigStatsEngine;
use crate::mailbox::PushMailbox;
use crate::sink::ChartSink;
use crate::types::unix_timestamp_millis;

/// Drain the mailbox one push at a time until it is closed.
///
/// Rejected pushes are logged and skipped; the sink keeps the previous report.
pub async fn run_consumer<S>(mailbox: Arc<PushMailbox>, mut engine: RigStatsEngine, sink: Arc<S>)
where
    S: ChartSink + ?Sized,
{
    while let Some(push) = mailbox.recv().await {
        match engine.process(&push, unix_timestamp_millis()) {
            Ok(report) => {
                debug!(
                    "Publishing report: short_anchor={}, long_anchor={}",
                    report.short.window.anchor, report.long.anchor
                );
                sink.publish(report);
            }
            Err(e) => {
                warn!("Rejected telemetry push: {}", e);
            }
        }
    }
    info!("Push mailbox closed, consumer stopping");
}
