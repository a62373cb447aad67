//! Assembly graph construction from an atom collection.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::annotate::Localization;
use crate::io::SequenceCatalog;
use crate::types::{AtomCollection, AtomId, Link, Segment};

use super::AssemblyGraph;

/// Builds the segment/link graph from atoms.
///
/// Every included atom becomes one segment. Consecutive included atoms of
/// each genome walk are linked; excluded atoms are skipped, so their walk
/// neighbours become adjacent.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    max_class_occurrences: Option<usize>,
    exclude: BTreeSet<AtomId>,
}

impl GraphBuilder {
    /// Include every atom.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip atoms with more than `cutoff` occurrences.
    pub fn max_class_occurrences(mut self, cutoff: usize) -> Self {
        self.max_class_occurrences = Some(cutoff);
        self
    }

    /// Skip the listed atoms.
    pub fn exclude<I: IntoIterator<Item = AtomId>>(mut self, ids: I) -> Self {
        self.exclude.extend(ids);
        self
    }

    fn includes(&self, atoms: &AtomCollection, id: &AtomId) -> bool {
        let within_cutoff = match (self.max_class_occurrences, atoms.get(id)) {
            (Some(cutoff), Some(atom)) => atom.depth() <= cutoff,
            (None, Some(_)) => true,
            (_, None) => false,
        };
        within_cutoff && !self.exclude.contains(id)
    }

    /// Build the graph. Segments are coloured when a catalog is given.
    pub fn build(&self, atoms: &AtomCollection, catalog: Option<&SequenceCatalog>) -> AssemblyGraph {
        info!(
            histogram = ?depth_histogram(atoms),
            "Histogram of atom counts per class"
        );

        let mut graph = AssemblyGraph::new();
        for atom in atoms.atoms() {
            if !self.includes(atoms, &atom.id) {
                debug!(atom = %atom.id, depth = atom.depth(), "Skipping atom");
                continue;
            }
            let sequence = atom
                .sequence
                .as_deref()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .unwrap_or_else(|| "*".to_string());
            let tags = catalog
                .and_then(|c| Localization::of(atom, c))
                .map(|loc| loc.color_tags())
                .unwrap_or_default();

            let mut segment = Segment::new(atom.id.clone(), sequence).with_tags(tags);
            segment.usage = Some(atom.usage());
            graph.add_segment(segment);
        }

        for walk in atoms.genome_walks().values() {
            let included: Vec<_> = walk.iter().filter(|s| graph.contains(&s.atom)).collect();
            for pair in included.windows(2) {
                graph.add_link(Link::new(
                    pair[0].atom.clone(),
                    pair[0].strand,
                    pair[1].atom.clone(),
                    pair[1].strand,
                ));
            }
        }

        info!(
            segments = graph.num_segments(),
            links = graph.num_edges(),
            excluded = atoms.len() - graph.num_segments(),
            "Built assembly graph"
        );
        graph
    }
}

/// `histogram[k]` is the number of atoms with exactly `k` occurrences.
pub fn depth_histogram(atoms: &AtomCollection) -> Vec<usize> {
    let counts: BTreeMap<usize, usize> = atoms.atoms().fold(BTreeMap::new(), |mut acc, a| {
        *acc.entry(a.depth()).or_insert(0) += 1;
        acc
    });
    let len = counts.keys().next_back().map_or(0, |max| max + 1);
    let mut histogram = vec![0; len];
    for (depth, count) in counts {
        histogram[depth] = count;
    }
    histogram
}
