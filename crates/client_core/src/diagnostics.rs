use std::{
    collections::VecDeque,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.message
        )
    }
}

struct Ring {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_sequence: u64,
    evicted: u64,
}

pub struct DiagnosticsRecorder {
    ring: Mutex<Ring>,
}

impl Default for DiagnosticsRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTICS_CAPACITY)
    }
}

impl DiagnosticsRecorder {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity.min(DEFAULT_DIAGNOSTICS_CAPACITY)),
                capacity,
                next_sequence: 0,
                evicted: 0,
            }),
        }
    }

    fn ring(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, message: impl Into<String>) {
        let message = message.into();
        let mut ring = self.ring();
        let sequence = ring.next_sequence;
        ring.next_sequence += 1;
        if ring.entries.len() == ring.capacity {
            ring.entries.pop_front();
            ring.evicted += 1;
        }
        debug!(target: "diagnostics", sequence, "{message}");
        ring.entries.push_back(LogEntry {
            sequence,
            timestamp: Utc::now(),
            message,
        });
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.ring().entries.iter().cloned().collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.ring()
            .entries
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        let mut ring = self.ring();
        ring.entries.clear();
        ring.evicted = 0;
    }

    pub fn len(&self) -> usize {
        self.ring().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.ring().capacity
    }

    /// Entries dropped from the front since the last `clear()`.
    pub fn evicted(&self) -> u64 {
        self.ring().evicted
    }
}

#[cfg(test)]
#[path = "tests/diagnostics_tests.rs"]
mod tests;
