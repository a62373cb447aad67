//! Removal log types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::segment::SegmentId;

/// Why a segment was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Degree reached the degree threshold.
    Degree,
    /// Betweenness centrality reached the centrality threshold.
    Centrality,
    /// No segment met either threshold; the most central one was removed.
    Forced,
    /// Listed explicitly by the caller.
    Listed,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Degree => write!(f, "degree"),
            Self::Centrality => write!(f, "centrality"),
            Self::Forced => write!(f, "forced"),
            Self::Listed => write!(f, "listed"),
        }
    }
}

/// One removed segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalRecord {
    /// Removed segment.
    pub segment: SegmentId,
    /// Iteration that removed it (1-based).
    pub iteration: usize,
    /// Reason code.
    pub reason: RemovalReason,
    /// Degree when flagged.
    pub degree: usize,
    /// Betweenness centrality when flagged.
    pub centrality: f64,
}

/// Append-only log of removed segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemovalLog {
    records: Vec<RemovalRecord>,
}

/// Removal counts per reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalCounts {
    /// Removed by the degree threshold.
    pub degree: usize,
    /// Removed by the centrality threshold.
    pub centrality: usize,
    /// Forced removals.
    pub forced: usize,
    /// Explicitly listed removals.
    pub listed: usize,
}

impl RemovalCounts {
    /// Total removals.
    pub fn total(&self) -> usize {
        self.degree + self.centrality + self.forced + self.listed
    }
}

impl RemovalLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: RemovalRecord) {
        self.records.push(record);
    }

    /// Records in removal order.
    pub fn records(&self) -> &[RemovalRecord] {
        &self.records
    }

    /// Removed segment names in removal order.
    pub fn names(&self) -> Vec<&SegmentId> {
        self.records.iter().map(|r| &r.segment).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records removed in a given iteration.
    pub fn in_iteration(&self, iteration: usize) -> impl Iterator<Item = &RemovalRecord> {
        self.records.iter().filter(move |r| r.iteration == iteration)
    }

    /// Counts per reason.
    pub fn counts(&self) -> RemovalCounts {
        let mut counts = RemovalCounts::default();
        for r in &self.records {
            match r.reason {
                RemovalReason::Degree => counts.degree += 1,
                RemovalReason::Centrality => counts.centrality += 1,
                RemovalReason::Forced => counts.forced += 1,
                RemovalReason::Listed => counts.listed += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, iteration: usize, reason: RemovalReason) -> RemovalRecord {
        RemovalRecord {
            segment: SegmentId::from(id),
            iteration,
            reason,
            degree: 3,
            centrality: 0.1,
        }
    }

    #[test]
    fn test_log_preserves_order() {
        let mut log = RemovalLog::new();
        log.push(record("b", 1, RemovalReason::Degree));
        log.push(record("a", 1, RemovalReason::Centrality));
        log.push(record("c", 2, RemovalReason::Forced));

        let names: Vec<&str> = log.names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(log.in_iteration(1).count(), 2);
    }

    #[test]
    fn test_counts() {
        let mut log = RemovalLog::new();
        log.push(record("a", 1, RemovalReason::Degree));
        log.push(record("b", 1, RemovalReason::Degree));
        log.push(record("c", 2, RemovalReason::Forced));

        let counts = log.counts();
        assert_eq!(counts.degree, 2);
        assert_eq!(counts.forced, 1);
        assert_eq!(counts.total(), 3);
    }
}
