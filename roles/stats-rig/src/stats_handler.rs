use std::sync::Arc;
use tracing::{debug, warn};

use rig_stats::{PushMailbox, RigInfoPush};

use crate::poller::RequestGate;

/// Turns newline-delimited JSON from the Telemetry Source into mailbox posts.
pub struct StatsHandler {
    mailbox: Arc<PushMailbox>,
    gate: Arc<RequestGate>,
}

impl StatsHandler {
    pub fn new(mailbox: Arc<PushMailbox>, gate: Arc<RequestGate>) -> Self {
        Self { mailbox, gate }
    }

    /// Accept one JSON payload. Any reply, parseable or not, answers the
    /// outstanding request.
    pub fn handle_message(&self, data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        self.gate.complete();

        match RigInfoPush::from_slice(data) {
            Ok(push) => {
                debug!(
                    "Received rig push: period={}s, short_samples={}, long_samples={}",
                    push.period_duration,
                    push.short_window_sample.len(),
                    push.long_window_sample.len()
                );
                if self.mailbox.post(push) {
                    debug!("Consumer busy, replaced waiting push");
                }
                Ok(())
            }
            Err(e) => {
                warn!("Failed to parse rig push: {}", e);
                Err(e.into())
            }
        }
    }
}
