//! Degree and betweenness centrality of assembly graph segments.
//!
//! Metrics are computed behind the [`CentralityBackend`] trait so the
//! untangler can be driven by any implementation. The default backend
//! delegates betweenness to `rustworkx-core`, which matches the NetworkX
//! definition (normalised, endpoints excluded) and parallelises over
//! shortest-path sources once the graph is large enough.

use std::collections::BTreeMap;
use std::io::Write;

use rustworkx_core::centrality::betweenness_centrality;
use rustworkx_core::petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::graph::AssemblyGraph;
use crate::types::SegmentId;

/// Per-segment metrics for one graph state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetrics {
    /// Number of distinct neighbours.
    pub degree: usize,
    /// Normalised betweenness centrality in `[0, 1]`.
    pub centrality: f64,
}

/// Metrics of every segment, by id.
pub type MetricsView = BTreeMap<SegmentId, SegmentMetrics>;

/// Source of degree and betweenness values.
pub trait CentralityBackend {
    /// Degree of every segment.
    fn degrees(&self, graph: &AssemblyGraph) -> BTreeMap<SegmentId, usize> {
        graph
            .segment_ids()
            .map(|id| (id.clone(), graph.degree(id)))
            .collect()
    }

    /// Normalised betweenness centrality of every segment.
    fn betweenness(&self, graph: &AssemblyGraph) -> BTreeMap<SegmentId, f64>;

    /// Both metrics for every segment.
    fn evaluate(&self, graph: &AssemblyGraph) -> MetricsView {
        let degrees = self.degrees(graph);
        let centrality = self.betweenness(graph);
        degrees
            .into_iter()
            .map(|(id, degree)| {
                let c = centrality.get(&id).copied().unwrap_or(0.0);
                (id, SegmentMetrics { degree, centrality: c })
            })
            .collect()
    }
}

/// Betweenness via `rustworkx-core`.
#[derive(Debug, Clone, Copy)]
pub struct RustworkxBackend {
    /// Node count from which shortest paths run in parallel.
    pub parallel_threshold: usize,
}

impl Default for RustworkxBackend {
    fn default() -> Self {
        Self { parallel_threshold: 50 }
    }
}

impl RustworkxBackend {
    /// Backend with a custom parallel threshold.
    pub fn new(parallel_threshold: usize) -> Self {
        Self { parallel_threshold }
    }
}

/// Undirected petgraph copy of `graph`; node `i` is the `i`-th id in order.
pub(crate) fn to_petgraph(graph: &AssemblyGraph) -> (UnGraph<(), ()>, Vec<SegmentId>) {
    let mut pg = UnGraph::<(), ()>::with_capacity(graph.num_segments(), graph.num_edges());
    let mut index: BTreeMap<&SegmentId, NodeIndex> = BTreeMap::new();
    let mut ids = Vec::with_capacity(graph.num_segments());

    for id in graph.segment_ids() {
        index.insert(id, pg.add_node(()));
        ids.push(id.clone());
    }
    for link in graph.links() {
        if let (Some(&a), Some(&b)) = (index.get(&link.from), index.get(&link.to)) {
            pg.update_edge(a, b, ());
        }
    }
    (pg, ids)
}

impl CentralityBackend for RustworkxBackend {
    fn betweenness(&self, graph: &AssemblyGraph) -> BTreeMap<SegmentId, f64> {
        // No segment can lie between two others.
        if graph.num_segments() < 3 {
            return graph.segment_ids().map(|id| (id.clone(), 0.0)).collect();
        }
        let (pg, ids) = to_petgraph(graph);
        let values = betweenness_centrality(&pg, false, true, self.parallel_threshold);

        ids.into_iter()
            .enumerate()
            .map(|(i, id)| (id, values.get(i).copied().flatten().unwrap_or(0.0)))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vertex table
// ─────────────────────────────────────────────────────────────────────────────

/// Column to sort a vertex table by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Sort by degree.
    Degree,
    /// Sort by betweenness centrality.
    Centrality,
}

/// One row of the vertex table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRow {
    /// Segment id.
    pub segment: SegmentId,
    /// Distinct degree.
    pub degree: usize,
    /// Betweenness centrality.
    pub centrality: f64,
}

/// Degree and centrality of every segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexTable {
    /// Rows, in id order unless sorted.
    pub rows: Vec<VertexRow>,
}

impl VertexTable {
    /// Compute the table for `graph`.
    pub fn compute<B: CentralityBackend + ?Sized>(graph: &AssemblyGraph, backend: &B) -> Self {
        let rows = backend
            .evaluate(graph)
            .into_iter()
            .map(|(segment, m)| VertexRow {
                segment,
                degree: m.degree,
                centrality: m.centrality,
            })
            .collect();
        Self { rows }
    }

    /// Stable sort by `key`.
    pub fn sort(&mut self, key: SortKey, descending: bool) {
        self.rows.sort_by(|a, b| {
            let ord = match key {
                SortKey::Degree => a.degree.cmp(&b.degree),
                SortKey::Centrality => a.centrality.total_cmp(&b.centrality),
            };
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }

    /// Write as tab-separated text with a header row.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "segment\tdegree\tcentrality")?;
        for row in &self.rows {
            writeln!(writer, "{}\t{}\t{}", row.segment, row.degree, row.centrality)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::graph;

    fn id(s: &str) -> SegmentId {
        SegmentId::from(s)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_path_betweenness() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
        let bc = RustworkxBackend::default().betweenness(&g);

        assert!(approx(bc[&id("a")], 0.0));
        assert!(approx(bc[&id("b")], 2.0 / 3.0));
        assert!(approx(bc[&id("c")], 2.0 / 3.0));
        assert!(approx(bc[&id("d")], 0.0));
    }

    #[test]
    fn test_star_center_is_maximal() {
        let g = graph(
            &["hub", "1", "2", "3", "4"],
            &[("hub", "1"), ("hub", "2"), ("hub", "3"), ("hub", "4")],
        );
        let view = RustworkxBackend::default().evaluate(&g);

        assert_eq!(view[&id("hub")].degree, 4);
        assert!(approx(view[&id("hub")].centrality, 1.0));
        assert!(approx(view[&id("1")].centrality, 0.0));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let names: Vec<String> = (0..60).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let links: Vec<(&str, &str)> = refs.windows(2).map(|w| (w[0], w[1])).collect();
        let g = graph(&refs, &links);

        let serial = RustworkxBackend::new(usize::MAX).betweenness(&g);
        let parallel = RustworkxBackend::new(1).betweenness(&g);
        for (k, v) in &serial {
            assert!(approx(*v, parallel[k]));
        }
    }

    #[test]
    fn test_isolated_segments_have_zero_metrics() {
        let g = graph(&["x", "y"], &[]);
        let view = RustworkxBackend::default().evaluate(&g);
        assert_eq!(view.len(), 2);
        assert!(view.values().all(|m| m.degree == 0 && m.centrality == 0.0));
    }

    #[test]
    fn test_vertex_table_sort_and_write() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let mut table = VertexTable::compute(&g, &RustworkxBackend::default());
        table.sort(SortKey::Degree, true);
        assert_eq!(table.rows[0].segment, id("b"));

        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("segment\tdegree\tcentrality\nb\t2\t1\n"));
        assert_eq!(text.lines().count(), 4);
    }
}
