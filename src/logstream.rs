use crate::model::{LogEntry, Severity, Stage};
use std::time::Instant;

/// Append-only ordered record of the events produced during a run.
///
/// Entries are immutable once appended. Timestamps come from a monotonic
/// clock relative to the stream epoch, so they never decrease within a run;
/// ties are possible when entries land in the same tick. Ids are sequential
/// and restart after `reset` (a run starts cold).
#[derive(Debug)]
pub struct LogStream {
    entries: Vec<LogEntry>,
    next_id: u64,
    epoch: Instant,
}

impl LogStream {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            epoch: Instant::now(),
        }
    }

    /// Append one entry under the given stage. Total: always succeeds.
    pub fn append(
        &mut self,
        stage: Stage,
        message: impl Into<String>,
        severity: Severity,
    ) -> LogEntry {
        let entry = LogEntry {
            id: self.next_id,
            timestamp_ms: self.epoch.elapsed().as_millis() as u64,
            stage,
            message: message.into(),
            severity,
        };
        self.next_id += 1;
        self.entries.push(entry.clone());
        entry
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard all entries and restart ids and the timestamp epoch.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_id = 0;
        self.epoch = Instant::now();
    }
}

impl Default for LogStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_unique() {
        let mut log = LogStream::new();
        for i in 0..5 {
            let e = log.append(Stage::Ingestion, format!("line {i}"), Severity::Info);
            assert_eq!(e.id, i);
        }
        let ids: Vec<u64> = log.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn timestamps_never_decrease() {
        let mut log = LogStream::new();
        for _ in 0..20 {
            log.append(Stage::Extraction, "tick", Severity::Info);
        }
        let stamps: Vec<u64> = log.entries().iter().map(|e| e.timestamp_ms).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn reset_clears_entries_and_restarts_ids() {
        let mut log = LogStream::new();
        log.append(Stage::Ingestion, "a", Severity::Info);
        log.append(Stage::Ingestion, "b", Severity::Warning);
        assert_eq!(log.len(), 2);

        log.reset();
        assert!(log.is_empty());
        let e = log.append(Stage::Ingestion, "c", Severity::Success);
        assert_eq!(e.id, 0);
    }

    #[test]
    fn entries_preserve_insertion_order() {
        let mut log = LogStream::new();
        log.append(Stage::Ingestion, "first", Severity::Info);
        log.append(Stage::Ingestion, "second", Severity::Error);
        let msgs: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(msgs, vec!["first", "second"]);
    }
}
