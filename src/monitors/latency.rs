//! Response time window.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

/// Summary of the retained response times, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencySnapshot {
    pub current: u64,
    pub average: u64,
    pub min: u64,
    pub max: u64,
}

/// Bounded FIFO of the most recent response times.
#[derive(Debug)]
pub struct LatencyAggregator {
    samples: Mutex<VecDeque<u64>>,
    window: usize,
}

impl LatencyAggregator {
    /// Create an aggregator retaining at most `window` samples.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(window)),
            window,
        }
    }

    /// Record one response time, evicting the oldest sample when full.
    pub fn record(&self, ms: u64) {
        let mut samples = self.samples.lock().expect("latency window mutex poisoned");
        samples.push_back(ms);
        while samples.len() > self.window {
            samples.pop_front();
        }
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        self.samples.lock().expect("latency window mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute current/average/min/max over the window. Empty yields zeros.
    pub fn snapshot(&self) -> LatencySnapshot {
        let samples = self.samples.lock().expect("latency window mutex poisoned");
        let Some(&current) = samples.back() else {
            return LatencySnapshot::default();
        };

        let count = samples.len() as u128;
        let sum: u128 = samples.iter().map(|&s| s as u128).sum();
        // Round half up.
        let average = ((sum * 2 + count) / (count * 2)) as u64;

        LatencySnapshot {
            current,
            average,
            min: samples.iter().copied().min().unwrap_or(0),
            max: samples.iter().copied().max().unwrap_or(0),
        }
    }
}
