//! Bounded in-memory history of telemetry log lines.
//!
//! Holds the most recent lines only; nothing is persisted. A UI can render a
//! tail of recent activity without subscribing to the callback stream.

use parking_lot::Mutex;
use std::collections::VecDeque;

const DEFAULT_CAPACITY: usize = 200;

/// Thread-safe ring of recent log lines.
pub struct LogHistory {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl Default for LogHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends a line, evicting the oldest once the ring is full.
    pub fn add(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock();
        lines.push_back(line.into());
        while lines.len() > self.capacity {
            lines.pop_front();
        }
    }

    /// The most recent `limit` lines, oldest first.
    pub fn latest(&self, limit: usize) -> Vec<String> {
        let lines = self.lines.lock();
        lines
            .iter()
            .skip(lines.len().saturating_sub(limit))
            .cloned()
            .collect()
    }

    /// Every retained line, oldest first.
    pub fn all(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_returns_tail_in_order() {
        let history = LogHistory::new(10);
        for i in 0..5 {
            history.add(format!("line {i}"));
        }
        assert_eq!(history.latest(2), vec!["line 3", "line 4"]);
        assert_eq!(history.latest(100).len(), 5);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let history = LogHistory::new(3);
        for i in 0..5 {
            history.add(format!("line {i}"));
        }
        assert_eq!(history.all(), vec!["line 2", "line 3", "line 4"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_clear() {
        let history = LogHistory::default();
        history.add("one");
        history.clear();
        assert!(history.is_empty());
        assert!(history.latest(5).is_empty());
    }
}
