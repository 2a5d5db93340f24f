//! Multi-producer multi-consumer shutdown signal.

use std::sync::Arc;

use tokio::sync::watch;

/// A latched one-way flag used to tell workers to stop.
///
/// Internally a [`watch`] channel carrying a boolean that only ever flips
/// from `false` to `true`. [`recv`] reads the current value before waiting,
/// so a handle cloned after the flip still completes immediately, and
/// flipping more than once is harmless. Any handle may send; every handle
/// observes.
///
/// Each handle keeps the sender half alive through the [`Arc`], so the
/// channel cannot close out from under a waiter.
///
/// [`recv`]: ShutdownSignal::recv
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Flips the flag. All pending and future calls to [`recv`] complete.
    ///
    /// [`recv`]: ShutdownSignal::recv
    pub fn send(&self) {
        self.tx.send_replace(true);
    }

    /// Waits for the flag to flip; returns immediately if it already has.
    pub async fn recv(&self) {
        // Wait on a clone so this works through `&self` and the handle
        // stays usable afterwards. `wait_for` checks the current value
        // first, which is what makes late subscription safe.
        let mut rx = self.rx.clone();
        // The sender half lives in `self.tx`, so the channel cannot close
        // here; the only way out of the wait is seeing `true`.
        let _ = rx.wait_for(|sent| *sent).await;
    }

    /// Whether the flag has flipped, without waiting.
    pub fn is_sent(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::time;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn waiters_wake_on_send() {
        let shutdown = ShutdownSignal::new();
        assert!(!shutdown.is_sent());

        let waiter = shutdown.clone();
        let handle = tokio::spawn(async move { waiter.recv().await });

        // Still waiting before the flag flips.
        time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        shutdown.send();
        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn late_subscribers_and_repeat_sends() {
        let shutdown = ShutdownSignal::new();
        shutdown.send();
        shutdown.send();

        // A handle cloned after the flip still observes it, repeatedly.
        let late = shutdown.clone();
        assert!(late.is_sent());
        late.recv().await;
        late.recv().await;
    }
}
