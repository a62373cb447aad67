//! Segment types for the assembly graph.

use serde::{Deserialize, Serialize};

use super::atom::AtomId;

/// Segments are named after the atom class they were derived from.
pub type SegmentId = AtomId;

/// Tag holding the display colour of a segment.
pub const COLOR_TAG: &str = "CL:z:";

/// A node of the assembly graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment name.
    pub id: SegmentId,
    /// Sequence, `*` when unknown.
    pub sequence: String,
    /// Optional GFA tags, kept verbatim (`TG:T:value`).
    pub tags: Vec<String>,
    /// Number of genomes containing the underlying atom, when known.
    pub usage: Option<usize>,
}

impl Segment {
    /// Create a segment with no tags.
    pub fn new(id: SegmentId, sequence: impl Into<String>) -> Self {
        Self {
            id,
            sequence: sequence.into(),
            tags: Vec::new(),
            usage: None,
        }
    }

    /// Attach tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sequence length, 0 when the sequence is `*`.
    pub fn length(&self) -> usize {
        if self.sequence == "*" {
            0
        } else {
            self.sequence.len()
        }
    }

    /// First `CL:z:` colour tag value.
    pub fn color(&self) -> Option<&str> {
        self.tags.iter().find_map(|t| t.strip_prefix(COLOR_TAG))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_tag_lookup() {
        let seg = Segment::new(AtomId::from("1"), "ACGT")
            .with_tags(vec!["LN:i:4".to_string(), "CL:z:#00aa00".to_string()]);
        assert_eq!(seg.color(), Some("#00aa00"));
        assert_eq!(seg.length(), 4);
    }

    #[test]
    fn test_unknown_sequence_length() {
        let seg = Segment::new(AtomId::from("1"), "*");
        assert_eq!(seg.length(), 0);
        assert_eq!(seg.color(), None);
    }
}
