//! The shared polling harness.
//!
//! A freshly observed transaction may take a few seconds to propagate to the
//! gateway we query, so lookups retry with exponential backoff. The harness
//! is deliberately dumb: it only decides *whether* to retry; the adapter
//! decides what a lookup means.

use std::{future::Future, time::Duration};

use tracing::warn;
use winc_common::{backoff, ids::TxId, shutdown::ShutdownSignal};

use crate::{error::GatewayError, TransactionInfo};

/// Retry schedule for [`poll_gateway`]. The defaults give five attempts
/// spaced 500 ms, 1 s, 2 s, 4 s, 8 s apart (≈ 15.5 s total).
#[derive(Copy, Clone, Debug)]
pub struct PollingConfig {
    pub initial_wait: Duration,
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_millis(500),
            max_attempts: 5,
        }
    }
}

/// Polls `get_tx` until it yields a transaction, a terminal verdict, or the
/// attempt budget runs out (then [`GatewayError::TransactionNotFound`]).
///
/// - `Ok(None)` (not visible yet) and transient errors are retried.
/// - [`TransactionNotMined`] and [`TransactionNotAPayment`] surface
///   immediately; waiting will not change the chain's verdict.
/// - Every wait races the shutdown signal, so cancellation takes effect
///   between attempts.
///
/// [`TransactionNotMined`]: GatewayError::TransactionNotMined
/// [`TransactionNotAPayment`]: GatewayError::TransactionNotAPayment
pub async fn poll_gateway<F, Fut>(
    tx_id: &TxId,
    mut get_tx: F,
    config: PollingConfig,
    shutdown: &ShutdownSignal,
) -> Result<TransactionInfo, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<TransactionInfo>, GatewayError>>,
{
    let mut waits = backoff::iter_with_initial_wait(config.initial_wait);

    for attempt in 1..=config.max_attempts {
        if shutdown.is_sent() {
            return Err(GatewayError::Cancelled);
        }

        match get_tx().await {
            Ok(Some(info)) => return Ok(info),
            Ok(None) => {}
            Err(err) if err.is_terminal() => return Err(err),
            Err(err) => {
                warn!(%tx_id, attempt, "gateway lookup failed: {err:#}");
            }
        }

        let wait = waits.next().expect("backoff iterator is infinite");
        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = shutdown.recv() => return Err(GatewayError::Cancelled),
        }
    }

    Err(GatewayError::TransactionNotFound(tx_id.clone()))
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use winc_common::{address::UserAddress, winc::Winc};

    use super::*;

    fn test_info() -> TransactionInfo {
        TransactionInfo {
            quantity: Winc::from(100u64),
            sender_address: UserAddress::new("sender"),
            recipient_address: UserAddress::new("recipient"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_once_found() {
        let attempts = Arc::new(AtomicU32::new(0));
        let shutdown = ShutdownSignal::new();

        let counter = attempts.clone();
        let info = poll_gateway(
            &TxId::new("T"),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Ok(None)
                    } else {
                        Ok(Some(test_info()))
                    }
                }
            },
            PollingConfig::default(),
            &shutdown,
        )
        .await
        .unwrap();

        assert_eq!(info, test_info());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_is_not_found() {
        let attempts = Arc::new(AtomicU32::new(0));
        let shutdown = ShutdownSignal::new();

        let counter = attempts.clone();
        let err = poll_gateway(
            &TxId::new("T"),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            },
            PollingConfig::default(),
            &shutdown,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GatewayError::TransactionNotFound(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_errors_skip_retries() {
        let attempts = Arc::new(AtomicU32::new(0));
        let shutdown = ShutdownSignal::new();

        let counter = attempts.clone();
        let err = poll_gateway(
            &TxId::new("T"),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(GatewayError::TransactionNotAPayment(TxId::new("T")))
                }
            },
            PollingConfig::default(),
            &shutdown,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GatewayError::TransactionNotAPayment(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let shutdown = ShutdownSignal::new();

        let counter = attempts.clone();
        let info = poll_gateway(
            &TxId::new("T"),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(GatewayError::BadResponse("flaky".to_owned()))
                    } else {
                        Ok(Some(test_info()))
                    }
                }
            },
            PollingConfig::default(),
            &shutdown,
        )
        .await
        .unwrap();

        assert_eq!(info, test_info());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_between_attempts() {
        let shutdown = ShutdownSignal::new();
        shutdown.send();

        let err = poll_gateway(
            &TxId::new("T"),
            || async { Ok(None) },
            PollingConfig::default(),
            &shutdown,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GatewayError::Cancelled));
    }
}
