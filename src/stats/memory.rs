//! Process memory sampling.
//!
//! The raw numbers come from a `MemoryStatsProvider`, so tests can feed fixed
//! values. The sampler only sorts the recorded reclaim pauses and turns them
//! into percentiles.

use std::sync::Arc;
use crate::stats::models::MemSample;
use crate::utils::percentile::percentile;

/// Capacity of the pause ring buffer every provider reports.
pub const PAUSE_BUFFER_LEN: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeMemStats {
    pub heap_objects: u64,
    pub heap_idle: u64,
    pub heap_in_use: u64,
    pub heap_released: u64,
    pub next_gc: u64,
    pub num_gc: u32,
    /// Ring buffer of reclaim pauses in nanoseconds, written at
    /// `run % PAUSE_BUFFER_LEN`. Only the first `min(num_gc, len)` slots are meaningful.
    pub pause_ns: Vec<u64>,
}

pub trait MemoryStatsProvider: Send + Sync {
    fn read(&self) -> RuntimeMemStats;
}

pub struct MemoryStatsSampler {
    provider: Arc<dyn MemoryStatsProvider>,
}

impl MemoryStatsSampler {
    pub fn new(provider: Arc<dyn MemoryStatsProvider>) -> Self {
        Self { provider }
    }

    pub fn sample(&self) -> MemSample {
        let ms = self.provider.read();

        let length = (ms.num_gc as usize).min(ms.pause_ns.len());
        let mut pauses = ms.pause_ns[..length].to_vec();
        pauses.sort_unstable();
        let n = pauses.len();

        MemSample {
            heap_objects: ms.heap_objects,
            heap_idle_bytes: ms.heap_idle,
            heap_in_use_bytes: ms.heap_in_use,
            heap_released_bytes: ms.heap_released,
            gc_pause_usec_100: percentile(100.0, &pauses, n) / 1000,
            gc_pause_usec_99: percentile(99.0, &pauses, n) / 1000,
            gc_pause_usec_95: percentile(95.0, &pauses, n) / 1000,
            next_gc_bytes: ms.next_gc,
            gc_total_runs: ms.num_gc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider(RuntimeMemStats);

    impl MemoryStatsProvider for FixedProvider {
        fn read(&self) -> RuntimeMemStats {
            self.0.clone()
        }
    }

    fn sampler(stats: RuntimeMemStats) -> MemoryStatsSampler {
        MemoryStatsSampler::new(Arc::new(FixedProvider(stats)))
    }

    #[test]
    fn test_no_runs_reports_zero_pauses() {
        let sample = sampler(RuntimeMemStats {
            heap_objects: 12,
            heap_in_use: 4096,
            pause_ns: vec![0; PAUSE_BUFFER_LEN],
            ..Default::default()
        })
        .sample();

        assert_eq!(sample.heap_objects, 12);
        assert_eq!(sample.heap_in_use_bytes, 4096);
        assert_eq!(sample.gc_pause_usec_100, 0);
        assert_eq!(sample.gc_pause_usec_99, 0);
        assert_eq!(sample.gc_pause_usec_95, 0);
        assert_eq!(sample.gc_total_runs, 0);
    }

    #[test]
    fn test_percentiles_from_unsorted_buffer() {
        let mut pause_ns = vec![0; PAUSE_BUFFER_LEN];
        pause_ns[..5].copy_from_slice(&[3_000, 5_000, 1_000, 4_999, 2_000]);
        let sample = sampler(RuntimeMemStats {
            num_gc: 5,
            next_gc: 1 << 20,
            pause_ns,
            ..Default::default()
        })
        .sample();

        assert_eq!(sample.gc_pause_usec_100, 5);
        assert_eq!(sample.gc_pause_usec_99, 5);
        assert_eq!(sample.gc_pause_usec_95, 5);
        assert_eq!(sample.next_gc_bytes, 1 << 20);
        assert_eq!(sample.gc_total_runs, 5);
    }

    #[test]
    fn test_microseconds_are_truncated() {
        let mut pause_ns = vec![0; PAUSE_BUFFER_LEN];
        pause_ns[0] = 1_999;
        let sample = sampler(RuntimeMemStats { num_gc: 1, pause_ns, ..Default::default() }).sample();
        assert_eq!(sample.gc_pause_usec_100, 1);
    }

    #[test]
    fn test_wrapped_buffer_uses_every_slot() {
        // 1000 runs: every slot holds a recent pause
        let pause_ns: Vec<u64> = (1..=PAUSE_BUFFER_LEN as u64).map(|i| i * 1_000).collect();
        let sample = sampler(RuntimeMemStats { num_gc: 1000, pause_ns, ..Default::default() }).sample();

        assert_eq!(sample.gc_pause_usec_100, 256);
        // ceil(0.99 * 256) - 1 = 253
        assert_eq!(sample.gc_pause_usec_99, 254);
        // ceil(0.95 * 256) - 1 = 243
        assert_eq!(sample.gc_pause_usec_95, 244);
        assert_eq!(sample.gc_total_runs, 1000);
    }
}
