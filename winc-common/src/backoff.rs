//! Exponential backoff iterators for retry loops.

use std::{cmp::min, time::Duration};

const DEFAULT_INITIAL_WAIT_MS: u64 = 250;
const MAXIMUM_WAIT_MS: u64 = 32_000;
const EXP_BASE: u64 = 2;

/// An iterator of [`Duration`]s which can be passed to e.g.
/// [`tokio::time::sleep`] to observe time-based exponential backoff, starting
/// from the default initial wait.
pub fn iter() -> impl Iterator<Item = Duration> {
    iter_with_initial_wait(Duration::from_millis(DEFAULT_INITIAL_WAIT_MS))
}

/// An exponential backoff iterator with a caller-chosen initial wait. The
/// gateway poller passes its configured polling wait here, so attempt `i`
/// sleeps `initial × 2^i`, capped at 32 s.
pub fn iter_with_initial_wait(
    initial_wait: Duration,
) -> impl Iterator<Item = Duration> {
    let initial_wait_ms = initial_wait.as_millis() as u64;
    (0u32..).map(move |index| {
        let factor = EXP_BASE.saturating_pow(index);
        let wait_ms = initial_wait_ms.saturating_mul(factor);
        Duration::from_millis(min(wait_ms, MAXIMUM_WAIT_MS))
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_integer_overflow() {
        let mut waits = iter();
        for _ in 0..200 {
            waits.next();
        }
    }

    #[test]
    fn doubles_from_initial_wait() {
        let waits = iter_with_initial_wait(Duration::from_millis(500))
            .take(5)
            .collect::<Vec<_>>();
        let expected = [500, 1_000, 2_000, 4_000, 8_000]
            .map(Duration::from_millis);
        assert_eq!(waits, expected);
    }

    #[test]
    fn caps_at_maximum() {
        let long = iter_with_initial_wait(Duration::from_millis(500))
            .nth(20)
            .unwrap();
        assert_eq!(long, Duration::from_millis(MAXIMUM_WAIT_MS));
    }
}
