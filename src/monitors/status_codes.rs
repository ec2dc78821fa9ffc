//! Cumulative status code distribution.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

const DEFAULT_CLASSES: [&str; 4] = ["2xx", "3xx", "4xx", "5xx"];

/// Point-in-time copy of the status counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub by_class: BTreeMap<String, u64>,
    pub by_code: BTreeMap<u16, u64>,
    pub total: u64,
}

#[derive(Debug, Default)]
struct Counts {
    by_class: BTreeMap<String, u64>,
    by_code: BTreeMap<u16, u64>,
}

/// Running counts by status class and exact code.
///
/// Both maps live behind one lock so a class count always equals the sum
/// of the exact codes within it.
#[derive(Debug)]
pub struct StatusAggregator {
    counts: Mutex<Counts>,
}

impl StatusAggregator {
    pub fn new() -> Self {
        let by_class = DEFAULT_CLASSES
            .iter()
            .map(|class| (class.to_string(), 0))
            .collect();
        Self {
            counts: Mutex::new(Counts {
                by_class,
                by_code: BTreeMap::new(),
            }),
        }
    }

    /// Count one response with the given status code.
    pub fn record(&self, code: u16) {
        let mut counts = self.counts.lock().expect("status counts mutex poisoned");
        *counts.by_class.entry(status_class(code)).or_insert(0) += 1;
        *counts.by_code.entry(code).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let counts = self.counts.lock().expect("status counts mutex poisoned");
        StatusSnapshot {
            by_class: counts.by_class.clone(),
            by_code: counts.by_code.clone(),
            total: counts.by_class.values().sum(),
        }
    }
}

impl Default for StatusAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// `404` → `"4xx"`.
pub fn status_class(code: u16) -> String {
    format!("{}xx", code / 100)
}
