//! Single-shot debounce timer: many notifications, one firing per quiet
//! period, timed from the last notification.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Coalesces edit notifications. Owns a background task holding the single
/// pending-timer slot; dropping the controller stops the task (a countdown
/// in flight is abandoned, a regeneration already running completes).
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    _task: JoinHandle<()>,
}

impl Debouncer {
    /// Spawns the timer task. `regenerate` runs once per quiet period; while
    /// it runs, further notifications only restart the timer for the next
    /// pass, so passes never overlap.
    pub fn new<F, Fut>(interval: Duration, mut regenerate: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let task = tokio::spawn(async move {
            // Outer loop: wait for the first edit of a burst.
            while rx.recv().await.is_some() {
                // Inner loop: restartable countdown.
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {
                            debug!("debounce interval elapsed; regenerating");
                            regenerate().await;
                            break;
                        }
                        msg = rx.recv() => {
                            if msg.is_none() {
                                return; // controller dropped mid-countdown
                            }
                            // countdown restarts
                        }
                    }
                }
            }
        });

        Debouncer { tx, _task: task }
    }

    /// (Re)starts the countdown, discarding any countdown already running.
    /// Called on every field edit, template change, and structural change.
    pub fn notify_edit(&self) {
        // Send only fails after the task exited, i.e. during teardown.
        let _ = self.tx.send(());
    }
}
