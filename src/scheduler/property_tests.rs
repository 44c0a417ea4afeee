//! Property-Based Tests for Scheduler Module

use proptest::prelude::*;
use std::time::Duration;

use crate::scheduler::{delay_chunks, MAX_CHUNK};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Chunks always add up to the requested delay.
    #[test]
    fn prop_chunks_sum_to_total(total_ms in 0u64..50_000_000_000, max_chunk_ms in 1u64..5_000_000_000) {
        let total = Duration::from_millis(total_ms);
        let chunks: Vec<_> = delay_chunks(total, Duration::from_millis(max_chunk_ms)).collect();

        prop_assert_eq!(chunks.iter().sum::<Duration>(), total);
    }

    // No chunk is empty or longer than the bound, and only the last may be short.
    #[test]
    fn prop_chunks_are_bounded(total_ms in 1u64..50_000_000_000, max_chunk_ms in 1u64..5_000_000_000) {
        let max_chunk = Duration::from_millis(max_chunk_ms);
        let chunks: Vec<_> = delay_chunks(Duration::from_millis(total_ms), max_chunk).collect();

        prop_assert!(chunks.iter().all(|c| !c.is_zero() && *c <= max_chunk));
        if let Some((_, init)) = chunks.split_last() {
            prop_assert!(init.iter().all(|c| *c == max_chunk));
        }
        prop_assert_eq!(chunks.len() as u64, total_ms.div_ceil(max_chunk_ms));
    }

    // Delays under the default bound need a single wait.
    #[test]
    fn prop_ordinary_delay_is_single_chunk(total_ms in 1u64..=2_147_483_647) {
        prop_assert_eq!(delay_chunks(Duration::from_millis(total_ms), MAX_CHUNK).count(), 1);
    }
}
