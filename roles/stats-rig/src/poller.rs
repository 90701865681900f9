use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use rig_stats::RigInfoRequest;

use crate::upstream::UpstreamClient;

/// Tracks whether a `getRigInfo` request is still waiting for its push.
#[derive(Debug, Default)]
pub struct RequestGate {
    sent_at: Mutex<Option<Instant>>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right to send a request. Fails while another one is
    /// outstanding and younger than `timeout`.
    pub fn try_begin(&self, timeout: Duration) -> bool {
        let mut sent_at = self.sent_at.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(at) = *sent_at {
            if at.elapsed() < timeout {
                return false;
            }
            warn!("No push received {}s after request, sending again", at.elapsed().as_secs());
        }
        *sent_at = Some(Instant::now());
        true
    }

    pub fn complete(&self) {
        *self.sent_at.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_outstanding(&self) -> bool {
        self.sent_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Ask the Telemetry Source for a push once per tick, skipping ticks while a
/// request is outstanding.
pub async fn start_rig_polling(
    client: Arc<UpstreamClient>,
    request: RigInfoRequest,
    poll_interval: Duration,
    request_timeout: Duration,
) {
    let mut interval = tokio::time::interval(poll_interval);
    let gate = client.gate();

    loop {
        interval.tick().await;

        if !gate.try_begin(request_timeout) {
            debug!("Request still outstanding, skipping tick");
            continue;
        }

        if let Err(e) = client.send_request(&request).await {
            error!("Failed to request rig info: {}", e);
            // Nothing is in flight, try again next tick
            gate.complete();
        }
    }
}
