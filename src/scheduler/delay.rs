//! Extended Delay Module
//!
//! Splits a delay of any length into waits no longer than a maximum chunk,
//! so far-future deadlines never hand the timer an out-of-range duration.

use std::time::Duration;

use tokio::sync::watch;
use tracing::trace;

/// Largest single wait issued by default: `i32::MAX` milliseconds, about 24.8 days.
pub const MAX_CHUNK: Duration = Duration::from_millis(i32::MAX as u64);

// == Delay Chunks ==
/// Iterator over the bounded waits that make up one long delay.
///
/// Every chunk is at most `max_chunk` and the chunks sum to the total delay.
#[derive(Debug, Clone)]
pub struct DelayChunks {
    remaining: Duration,
    max_chunk: Duration,
}

impl Iterator for DelayChunks {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining.is_zero() {
            return None;
        }
        let chunk = self.remaining.min(self.max_chunk);
        self.remaining -= chunk;
        Some(chunk)
    }
}

/// Plans the waits for `total`. A zero `max_chunk` falls back to [`MAX_CHUNK`].
pub fn delay_chunks(total: Duration, max_chunk: Duration) -> DelayChunks {
    let max_chunk = if max_chunk.is_zero() {
        MAX_CHUNK
    } else {
        max_chunk
    };
    DelayChunks {
        remaining: total,
        max_chunk,
    }
}

// == Extended Sleep ==
/// Waits for `total`, one bounded chunk at a time.
pub async fn extended_sleep(total: Duration, max_chunk: Duration) {
    for chunk in delay_chunks(total, max_chunk) {
        trace!(chunk_ms = chunk.as_millis() as u64, "waiting on delay chunk");
        tokio::time::sleep(chunk).await;
    }
}

/// How a cancellable wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    Elapsed,
    Cancelled,
}

/// Like [`extended_sleep`], but gives up as soon as `cancel` turns true.
///
/// The flag is checked before each chunk and raced against the chunk in flight.
pub(crate) async fn cancellable_sleep(
    total: Duration,
    max_chunk: Duration,
    cancel: &mut watch::Receiver<bool>,
) -> WaitOutcome {
    for (index, chunk) in delay_chunks(total, max_chunk).enumerate() {
        if *cancel.borrow() {
            return WaitOutcome::Cancelled;
        }
        trace!(index, chunk_ms = chunk.as_millis() as u64, "waiting on delay chunk");

        tokio::select! {
            biased;
            _ = cancel.wait_for(|cancelled| *cancelled) => return WaitOutcome::Cancelled,
            () = tokio::time::sleep(chunk) => {}
        }
    }

    if *cancel.borrow() {
        WaitOutcome::Cancelled
    } else {
        WaitOutcome::Elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_short_delay_is_one_chunk() {
        let chunks: Vec<_> = delay_chunks(Duration::from_secs(2), MAX_CHUNK).collect();
        assert_eq!(chunks, vec![Duration::from_secs(2)]);
    }

    #[test]
    fn test_long_delay_is_split() {
        let total = Duration::from_millis(2_300_000_000);
        let chunks: Vec<_> = delay_chunks(total, MAX_CHUNK).collect();

        assert_eq!(
            chunks,
            vec![
                Duration::from_millis(2_147_483_647),
                Duration::from_millis(152_516_353),
            ]
        );
        assert_eq!(chunks.iter().sum::<Duration>(), total);
    }

    #[test]
    fn test_exact_multiple_of_chunk() {
        let chunks: Vec<_> =
            delay_chunks(Duration::from_millis(300), Duration::from_millis(100)).collect();
        assert_eq!(chunks, vec![Duration::from_millis(100); 3]);
    }

    #[test]
    fn test_zero_delay_has_no_chunks() {
        assert_eq!(delay_chunks(Duration::ZERO, MAX_CHUNK).count(), 0);
    }

    #[test]
    fn test_zero_max_chunk_uses_default() {
        let chunks: Vec<_> = delay_chunks(Duration::from_secs(1), Duration::ZERO).collect();
        assert_eq!(chunks, vec![Duration::from_secs(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extended_sleep_waits_full_duration() {
        let total = Duration::from_millis(2_300_000_000);
        let start = Instant::now();

        extended_sleep(total, MAX_CHUNK).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= total);
        assert!(elapsed < total + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_sleep_elapses() {
        let (_tx, mut rx) = watch::channel(false);
        let outcome =
            cancellable_sleep(Duration::from_millis(350), Duration::from_millis(100), &mut rx)
                .await;
        assert_eq!(outcome, WaitOutcome::Elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_sleep_cancelled_mid_chunk() {
        let (tx, mut rx) = watch::channel(false);
        let start = Instant::now();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            tx.send_replace(true);
            tx
        });

        let outcome =
            cancellable_sleep(Duration::from_secs(10), Duration::from_secs(1), &mut rx).await;

        assert_eq!(outcome, WaitOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
        canceller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_sleep_already_cancelled() {
        let (_tx, mut rx) = watch::channel(true);
        let start = Instant::now();

        let outcome = cancellable_sleep(Duration::from_secs(5), MAX_CHUNK, &mut rx).await;

        assert_eq!(outcome, WaitOutcome::Cancelled);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
