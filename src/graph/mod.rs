//! Assembly graph store and construction.

pub mod builder;
pub mod snapshot;

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{EdgeKey, Link, Segment, SegmentId};

pub use builder::GraphBuilder;
pub use snapshot::GraphSnapshot;

/// In-memory undirected assembly graph.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order. Links are
/// deduplicated by their unordered endpoint pair and self-links are never
/// stored, so the degree of a segment is its number of distinct neighbours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyGraph {
    /// Segments by id.
    segments: BTreeMap<SegmentId, Segment>,
    /// Segment -> neighbours.
    adjacency: BTreeMap<SegmentId, BTreeSet<SegmentId>>,
    /// Links by unordered endpoint pair.
    links: BTreeMap<EdgeKey, Link>,
    /// Header and other non-S/L records, written back verbatim.
    other_lines: Vec<String>,
}

impl AssemblyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment, replacing any segment with the same id. Existing links are kept.
    pub fn add_segment(&mut self, segment: Segment) {
        self.adjacency.entry(segment.id.clone()).or_default();
        self.segments.insert(segment.id.clone(), segment);
    }

    /// Add a link.
    ///
    /// Returns `true` when a new adjacency was created. A link between
    /// already adjacent segments only raises the stored multiplicity.
    /// Self-links and links to unknown segments are ignored.
    pub fn add_link(&mut self, link: Link) -> bool {
        let key = link.key();
        if key.is_self_loop()
            || !self.segments.contains_key(&link.from)
            || !self.segments.contains_key(&link.to)
        {
            return false;
        }

        if let Some(existing) = self.links.get_mut(&key) {
            existing.multiplicity += link.multiplicity;
            return false;
        }

        self.adjacency
            .entry(link.from.clone())
            .or_default()
            .insert(link.to.clone());
        self.adjacency
            .entry(link.to.clone())
            .or_default()
            .insert(link.from.clone());
        self.links.insert(key, link);
        true
    }

    /// Remove a segment and its incident links.
    pub fn remove_segment(&mut self, id: &SegmentId) -> Option<(Segment, Vec<Link>)> {
        let segment = self.segments.remove(id)?;
        let neighbours = self.adjacency.remove(id).unwrap_or_default();

        let mut removed = Vec::with_capacity(neighbours.len());
        for neighbour in neighbours {
            if let Some(set) = self.adjacency.get_mut(&neighbour) {
                set.remove(id);
            }
            if let Some(link) = self.links.remove(&EdgeKey::new(id.clone(), neighbour)) {
                removed.push(link);
            }
        }

        Some((segment, removed))
    }

    /// Append a header or other record line.
    pub fn push_other_line(&mut self, line: String) {
        self.other_lines.push(line);
    }

    /// Header and other record lines.
    pub fn other_lines(&self) -> &[String] {
        &self.other_lines
    }

    /// Get a segment.
    pub fn segment(&self, id: &SegmentId) -> Option<&Segment> {
        self.segments.get(id)
    }

    /// Whether the graph contains a segment.
    pub fn contains(&self, id: &SegmentId) -> bool {
        self.segments.contains_key(id)
    }

    /// All segments in id order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// All segment ids in order.
    pub fn segment_ids(&self) -> impl Iterator<Item = &SegmentId> {
        self.segments.keys()
    }

    /// All links in canonical order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Neighbours of a segment, in id order.
    pub fn neighbors(&self, id: &SegmentId) -> impl Iterator<Item = &SegmentId> {
        self.adjacency.get(id).into_iter().flatten()
    }

    /// Number of distinct neighbours.
    pub fn degree(&self, id: &SegmentId) -> usize {
        self.adjacency.get(id).map_or(0, BTreeSet::len)
    }

    /// Whether two segments are adjacent.
    pub fn has_edge(&self, a: &SegmentId, b: &SegmentId) -> bool {
        self.adjacency.get(a).map_or(false, |set| set.contains(b))
    }

    /// Get the link between two segments.
    pub fn link(&self, a: &SegmentId, b: &SegmentId) -> Option<&Link> {
        self.links.get(&EdgeKey::new(a.clone(), b.clone()))
    }

    /// Number of segments.
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Number of distinct edges.
    pub fn num_edges(&self) -> usize {
        self.links.len()
    }

    /// Whether the graph has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Apply `f` to every segment. Ids must not change.
    pub fn update_segments<F: FnMut(&mut Segment)>(&mut self, f: F) {
        self.segments.values_mut().for_each(f);
    }

    /// Whether `a` and `b` are connected by a path.
    pub fn connected(&self, a: &SegmentId, b: &SegmentId) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        let mut seen = BTreeSet::new();
        let mut stack = vec![a];
        seen.insert(a);
        while let Some(current) = stack.pop() {
            if current == b {
                return true;
            }
            for next in self.neighbors(current) {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        false
    }
}
