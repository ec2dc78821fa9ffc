//! Per-endpoint hit counters.
//!
//! Endpoints are keyed by the literal `(method, path)` pair: trailing slashes,
//! query strings and casing all produce distinct entries. The map is bounded;
//! once `max_entries` is exceeded the least recently used entry is evicted.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use serde::Serialize;

/// Identity of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy)]
struct EndpointEntry {
    count: u64,
    /// Epoch milliseconds of the last hit.
    last_used: i64,
    /// Global touch sequence, breaks ties between equal timestamps.
    touched: u64,
}

/// One row of the "recent endpoints" view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointView {
    pub method: String,
    pub path: String,
    pub count: u64,
    pub last_used: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndpointSnapshot {
    /// Distinct endpoints currently tracked.
    pub total: usize,
    /// Most recently used endpoints, newest first.
    pub recent: Vec<EndpointView>,
}

/// Touch order of every tracked key, oldest first.
#[derive(Debug, Default)]
struct Recency {
    sequence: u64,
    by_touch: BTreeMap<u64, EndpointKey>,
}

/// Thread-safe endpoint frequency tracker.
///
/// Writers serialize on the recency index so it always mirrors `entries`;
/// readers only touch the map.
#[derive(Debug)]
pub struct EndpointAggregator {
    entries: DashMap<EndpointKey, EndpointEntry>,
    recency: Mutex<Recency>,
    recent_limit: usize,
    max_entries: usize,
}

impl EndpointAggregator {
    pub fn new(recent_limit: usize, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            recency: Mutex::new(Recency::default()),
            recent_limit,
            max_entries: max_entries.max(1),
        }
    }

    /// Record one hit on `(method, path)` at the current wall-clock time.
    pub fn record(&self, method: &str, path: &str) {
        self.record_at(method, path, Utc::now().timestamp_millis());
    }

    /// Record one hit with an explicit timestamp (epoch ms).
    pub fn record_at(&self, method: &str, path: &str, now_ms: i64) {
        let key = EndpointKey {
            method: method.to_string(),
            path: path.to_string(),
        };

        let mut recency = self.recency.lock().expect("endpoint recency mutex poisoned");
        let touched = recency.sequence;
        recency.sequence += 1;

        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                recency.by_touch.remove(&entry.touched);
                entry.count += 1;
                entry.last_used = now_ms;
                entry.touched = touched;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(EndpointEntry {
                    count: 1,
                    last_used: now_ms,
                    touched,
                });
            }
        }
        recency.by_touch.insert(touched, key);

        while self.entries.len() > self.max_entries {
            let Some((_, oldest)) = recency.by_touch.pop_first() else {
                break;
            };
            tracing::debug!(method = %oldest.method, path = %oldest.path, "Evicting endpoint entry");
            self.entries.remove(&oldest);
        }
    }

    /// Count of distinct endpoints tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit count for a single endpoint, if tracked.
    pub fn count(&self, method: &str, path: &str) -> Option<u64> {
        let key = EndpointKey {
            method: method.to_string(),
            path: path.to_string(),
        };
        self.entries.get(&key).map(|entry| entry.count)
    }

    pub fn snapshot(&self) -> EndpointSnapshot {
        let mut rows: Vec<(EndpointKey, EndpointEntry)> = self
            .entries
            .iter()
            .map(|item| (item.key().clone(), *item.value()))
            .collect();

        rows.sort_by(|(_, a), (_, b)| {
            b.last_used
                .cmp(&a.last_used)
                .then_with(|| b.touched.cmp(&a.touched))
        });

        let total = rows.len();
        let recent = rows
            .into_iter()
            .take(self.recent_limit)
            .map(|(key, entry)| EndpointView {
                method: key.method,
                path: key.path,
                count: entry.count,
                last_used: entry.last_used,
            })
            .collect();

        EndpointSnapshot { total, recent }
    }
}
