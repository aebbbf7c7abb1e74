//! E2E processing latency tracking.
//!
//! A sliding window of raw samples per channel. Topic-level figures are built
//! by merging the channel windows into a fresh stream, which allocates and
//! sorts, so callers must not hold any broker lock while doing it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use crate::utils::percentile::quantile;

/// Oldest samples are dropped past this many, even inside the window.
pub const MAX_WINDOW_SAMPLES: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileResult {
    pub count: usize,
    pub percentiles: Vec<PercentileValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub quantile: f64,
    pub value: f64,
}

pub struct E2eLatencyStream {
    percentiles: Vec<f64>,
    window: Duration,
    samples: Mutex<VecDeque<(Instant, u64)>>,
}

impl E2eLatencyStream {
    pub fn new(percentiles: Vec<f64>, window: Duration) -> Self {
        Self {
            percentiles,
            window,
            samples: Mutex::new(VecDeque::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Vec::new(), Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.percentiles.is_empty()
    }

    /// Empty stream with the same percentiles and window.
    pub fn empty_like(&self) -> Self {
        Self::new(self.percentiles.clone(), self.window)
    }

    pub fn insert(&self, latency_ns: u64) {
        if !self.is_enabled() {
            return;
        }
        let now = Instant::now();
        let mut samples = self.samples.lock();
        Self::evict(&mut samples, now, self.window);
        if samples.len() >= MAX_WINDOW_SAMPLES {
            samples.pop_front();
        }
        samples.push_back((now, latency_ns));
    }

    /// Folds the live samples of `other` into this stream.
    pub fn merge(&self, other: &E2eLatencyStream) {
        if !self.is_enabled() {
            return;
        }
        let incoming = other.live_samples();
        let mut samples = self.samples.lock();
        samples.extend(incoming);
        // Merged streams are read once, so order only matters for eviction
        samples.make_contiguous().sort_unstable_by_key(|(at, _)| *at);
        while samples.len() > MAX_WINDOW_SAMPLES {
            samples.pop_front();
        }
    }

    pub fn result(&self) -> Option<QuantileResult> {
        if !self.is_enabled() {
            return None;
        }
        let mut values: Vec<u64> = self.live_samples().into_iter().map(|(_, v)| v).collect();
        values.sort_unstable();

        let percentiles = self
            .percentiles
            .iter()
            .map(|q| PercentileValue {
                quantile: *q,
                value: quantile(*q, &values) as f64,
            })
            .collect();

        Some(QuantileResult { count: values.len(), percentiles })
    }

    fn live_samples(&self) -> Vec<(Instant, u64)> {
        let mut samples = self.samples.lock();
        Self::evict(&mut samples, Instant::now(), self.window);
        samples.iter().copied().collect()
    }

    fn evict(samples: &mut VecDeque<(Instant, u64)>, now: Instant, window: Duration) {
        while let Some((at, _)) = samples.front() {
            if now.duration_since(*at) > window {
                samples.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> E2eLatencyStream {
        E2eLatencyStream::new(vec![1.0, 0.5], Duration::from_secs(60))
    }

    #[test]
    fn test_disabled_has_no_result() {
        let s = E2eLatencyStream::disabled();
        s.insert(10);
        assert!(s.result().is_none());
    }

    #[test]
    fn test_result_percentiles() {
        let s = stream();
        for v in [40, 10, 30, 20] {
            s.insert(v);
        }
        let result = s.result().unwrap();
        assert_eq!(result.count, 4);
        assert_eq!(result.percentiles[0], PercentileValue { quantile: 1.0, value: 40.0 });
        assert_eq!(result.percentiles[1], PercentileValue { quantile: 0.5, value: 20.0 });
    }

    #[test]
    fn test_empty_enabled_stream_reports_zero() {
        let result = stream().result().unwrap();
        assert_eq!(result.count, 0);
        assert!(result.percentiles.iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn test_merge_combines_counts() {
        let a = stream();
        let b = stream();
        a.insert(5);
        b.insert(100);
        b.insert(200);

        let agg = a.empty_like();
        agg.merge(&a);
        agg.merge(&b);

        let result = agg.result().unwrap();
        assert_eq!(result.count, 3);
        assert_eq!(result.percentiles[0].value, 200.0);
        // sources untouched
        assert_eq!(a.result().unwrap().count, 1);
    }

    #[test]
    fn test_whole_number_ranks_are_exact() {
        let s = E2eLatencyStream::new(vec![0.55, 0.07], Duration::from_secs(60));
        for v in 1..=100 {
            s.insert(v);
        }
        let result = s.result().unwrap();
        assert_eq!(result.count, 100);
        assert_eq!(result.percentiles[0].value, 55.0);
        assert_eq!(result.percentiles[1].value, 7.0);
    }

    #[test]
    fn test_window_eviction() {
        let s = E2eLatencyStream::new(vec![0.99], Duration::from_millis(20));
        s.insert(1);
        std::thread::sleep(Duration::from_millis(40));
        s.insert(2);
        assert_eq!(s.result().unwrap().count, 1);
    }
}
