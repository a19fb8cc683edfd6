//! The bounded, append-only entry buffer behind the log surface.

use std::collections::VecDeque;

use crate::entry::LogEntry;

/// Default number of entries kept before the oldest is evicted.
pub const DEFAULT_MAX_HISTORY: usize = 500;

/// Ordered entries with a fixed capacity.
///
/// Every append that pushes the length past `max_history` evicts exactly
/// one entry from the front, so the length never exceeds the limit and
/// the survivors keep their insertion order.
#[derive(Debug, Clone)]
pub struct Sink {
    entries: VecDeque<LogEntry>,
    max_history: usize,
}

impl Default for Sink {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl Sink {
    /// Create a sink. A limit of zero is raised to one.
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            entries: VecDeque::with_capacity(max_history.min(1024)),
            max_history,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Append an entry, returning the evicted one if the limit was hit.
    pub fn append(&mut self, entry: LogEntry) -> Option<LogEntry> {
        self.entries.push_back(entry);
        if self.entries.len() > self.max_history {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Plain-text snapshot of every entry, oldest first.
    pub fn value(&self) -> String {
        self.entries.iter().map(LogEntry::plain_text).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LogImage;
    use image::RgbaImage;

    fn text(n: usize) -> LogEntry {
        LogEntry::Text(format!("{n}\n"))
    }

    #[test]
    fn keeps_most_recent_entries_in_order() {
        for (max, n) in [(1, 5), (3, 10), (5, 6), (500, 1234)] {
            let mut sink = Sink::new(max);
            for i in 1..=n {
                sink.append(text(i));
            }
            assert_eq!(sink.len(), max);
            let kept: Vec<_> = sink.iter().cloned().collect();
            let expected: Vec<_> = (n - max + 1..=n).map(text).collect();
            assert_eq!(kept, expected);
        }
    }

    #[test]
    fn evicts_one_entry_per_append() {
        let mut sink = Sink::new(2);
        assert!(sink.append(text(1)).is_none());
        assert!(sink.append(text(2)).is_none());
        assert_eq!(sink.append(text(3)), Some(text(1)));
        assert_eq!(sink.append(text(4)), Some(text(2)));
        assert_eq!(sink.value(), "3\n4\n");
    }

    #[test]
    fn eviction_counts_entries_of_every_variant() {
        let mut sink = Sink::new(2);
        sink.append(LogEntry::Image(LogImage::new(RgbaImage::new(4, 4))));
        sink.append(LogEntry::Html("<p>a long paragraph of html</p>".into()));
        sink.append(LogEntry::Text("x".repeat(10_000)));
        assert_eq!(sink.len(), 2);
        assert!(matches!(sink.get(0), Some(LogEntry::Html(_))));
    }

    #[test]
    fn clear_then_value_is_empty() {
        let mut sink = Sink::default();
        sink.append(text(0));
        sink.clear();
        assert_eq!(sink.value(), "");
        assert!(sink.is_empty());
        assert_eq!(sink.max_history(), DEFAULT_MAX_HISTORY);
    }

    #[test]
    fn zero_limit_is_raised_to_one() {
        let mut sink = Sink::new(0);
        sink.append(text(1));
        sink.append(text(2));
        assert_eq!(sink.value(), "2\n");
    }
}
