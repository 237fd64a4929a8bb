//! Cancellation signal shared by every blocking wait in the pipeline.
//!
//! A [`ShutdownSignal`] owns the only sender of a zero-message channel. Triggering drops that
//! sender, which disconnects every clone's receiver at once, so threads parked in a
//! `crossbeam_channel::select!` on it wake immediately instead of noticing a flag on their next
//! iteration.

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct SignalInner {
    requested: AtomicBool,
    sender: Mutex<Option<Sender<()>>>,
}

/// Cloneable cancellation token.
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<SignalInner>,
    receiver: Receiver<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            inner: Arc::new(SignalInner {
                requested: AtomicBool::new(false),
                sender: Mutex::new(Some(sender)),
            }),
            receiver,
        }
    }

    /// Request cancellation. Idempotent.
    pub fn trigger(&self) {
        self.inner.requested.store(true, Ordering::Release);
        self.inner.sender.lock().take();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once the signal fires.
    ///
    /// Nothing is ever sent on it; callers only select on it alongside their real wait.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    /// Sleep for `duration` unless the signal fires first.
    ///
    /// # Returns
    /// `true` if the full duration elapsed, `false` if the sleep was cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        if self.is_triggered() {
            return false;
        }
        select! {
            recv(self.receiver) -> _ => false,
            default(duration) => !self.is_triggered(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
