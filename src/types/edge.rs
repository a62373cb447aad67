//! Link types for the assembly graph.

use serde::{Deserialize, Serialize};
use super::atom::Strand;
use super::segment::SegmentId;

/// Orientation of a link endpoint. GFA uses the same symbols as strands.
pub type Orientation = Strand;

/// Unordered endpoint pair identifying a link.
///
/// The smaller id is always stored first, so `EdgeKey::new(a, b) == EdgeKey::new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey(SegmentId, SegmentId);

impl EdgeKey {
    /// Create a key from two endpoints in any order.
    pub fn new(a: SegmentId, b: SegmentId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// Lower endpoint.
    pub fn low(&self) -> &SegmentId {
        &self.0
    }

    /// Higher endpoint.
    pub fn high(&self) -> &SegmentId {
        &self.1
    }

    /// Whether both endpoints are the same segment.
    pub fn is_self_loop(&self) -> bool {
        self.0 == self.1
    }
}

/// Adjacency between two segments.
///
/// Keeps the orientation of the first observation. Implements `Ord` through
/// its [`EdgeKey`] for deterministic ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Source segment.
    pub from: SegmentId,
    /// Orientation of the source.
    pub from_orient: Orientation,
    /// Target segment.
    pub to: SegmentId,
    /// Orientation of the target.
    pub to_orient: Orientation,
    /// Overlap field, kept verbatim.
    pub overlap: String,
    /// Number of adjacency observations collapsed into this link.
    pub multiplicity: u32,
}

impl Link {
    /// Create a new link with a single observation and a `0M` overlap.
    pub fn new(from: SegmentId, from_orient: Orientation, to: SegmentId, to_orient: Orientation) -> Self {
        Self {
            from,
            from_orient,
            to,
            to_orient,
            overlap: "0M".to_string(),
            multiplicity: 1,
        }
    }

    /// Forward-forward link.
    pub fn forward(from: SegmentId, to: SegmentId) -> Self {
        Self::new(from, Strand::Forward, to, Strand::Forward)
    }

    /// Unordered key of this link.
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from.clone(), self.to.clone())
    }

    /// Endpoint opposite to `id`, if `id` is an endpoint.
    pub fn other(&self, id: &SegmentId) -> Option<&SegmentId> {
        if &self.from == id {
            Some(&self.to)
        } else if &self.to == id {
            Some(&self.from)
        } else {
            None
        }
    }
}

impl PartialOrd for Link {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Link {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key()
            .cmp(&other.key())
            .then_with(|| self.from.cmp(&other.from))
            .then_with(|| self.from_orient.cmp(&other.from_orient))
            .then_with(|| self.to_orient.cmp(&other.to_orient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SegmentId {
        SegmentId::from(s)
    }

    #[test]
    fn test_edge_key_is_unordered() {
        assert_eq!(EdgeKey::new(id("2"), id("1")), EdgeKey::new(id("1"), id("2")));
        assert_eq!(EdgeKey::new(id("2"), id("1")).low(), &id("1"));
        assert!(EdgeKey::new(id("3"), id("3")).is_self_loop());
    }

    #[test]
    fn test_link_ordering() {
        let l1 = Link::forward(id("1"), id("2"));
        let l2 = Link::forward(id("1"), id("3"));
        let l3 = Link::forward(id("2"), id("3"));

        assert!(l1 < l2);
        assert!(l1 < l3);
        assert!(l2 < l3);
    }

    #[test]
    fn test_link_other_endpoint() {
        let link = Link::new(id("a"), Strand::Forward, id("b"), Strand::Reverse);
        assert_eq!(link.other(&id("a")), Some(&id("b")));
        assert_eq!(link.other(&id("b")), Some(&id("a")));
        assert_eq!(link.other(&id("c")), None);
    }
}
