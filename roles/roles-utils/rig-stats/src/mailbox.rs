//! Single-slot, latest-wins mailbox between the Telemetry Source and the
//! consumer task.
//!
//! At most one push waits while the consumer is busy. A newer push replaces
//! the waiting one, so a slow consumer only ever sees the freshest data.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::debug;

use crate::types::RigInfoPush;

#[derive(Debug, Default)]
struct Slot {
    pending: Option<RigInfoPush>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct PushMailbox {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl PushMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Leave a push for the consumer. Returns `true` if it replaced one that
    /// was still waiting. Pushes posted after `close` are dropped.
    pub fn post(&self, push: RigInfoPush) -> bool {
        let replaced = {
            let mut slot = self.slot();
            if slot.closed {
                return false;
            }
            slot.pending.replace(push).is_some()
        };
        if replaced {
            debug!("Dropped stale push still waiting in mailbox");
        }
        self.notify.notify_one();
        replaced
    }

    /// Wait for the next push. `None` once the mailbox is closed and drained.
    pub async fn recv(&self) -> Option<RigInfoPush> {
        loop {
            {
                let mut slot = self.slot();
                if let Some(push) = slot.pending.take() {
                    return Some(push);
                }
                if slot.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn close(&self) {
        self.slot().closed = true;
        self.notify.notify_one();
    }

    pub fn has_pending(&self) -> bool {
        self.slot().pending.is_some()
    }
}
