//! Untangling score.
//!
//! ```text
//! avg_degree         = 2 * edges / segments
//! fraction_remaining = segments / original_segments
//! score              = (avg_degree + 1) / sqrt(fraction_remaining)
//! ```
//!
//! Lower is better: a less tangled graph that kept more of its segments.
//!
//! [`HairballIndex`] compares an original and a simplified graph with a
//! weighted sum of topology and removal terms:
//!
//! ```text
//! 0.5   * edges / nodes
//! 0.25  * (1 - modularity)
//! 0.012 * avg shortest path (largest component), filtered / original
//! 0.1   * fraction of nodes removed
//! 0.1   * fraction of edges removed
//! 0.05  * fraction of sequence length removed
//! ```

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use rustworkx_core::connectivity::connected_components;
use rustworkx_core::petgraph::algo::dijkstra;
use rustworkx_core::petgraph::graph::UnGraph;
use serde::{Deserialize, Serialize};

use crate::centrality::to_petgraph;
use crate::error::{Error, Result};
use crate::graph::AssemblyGraph;

/// Score with its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UntangleScore {
    /// Segments before any removal.
    pub original_segments: usize,
    /// Segments remaining.
    pub segments: usize,
    /// Distinct links remaining.
    pub edges: usize,
    /// `2 * edges / segments`.
    pub avg_degree: f64,
    /// `segments / original_segments`.
    pub fraction_remaining: f64,
    /// The score.
    pub score: f64,
}

impl UntangleScore {
    /// Reject an original segment count of zero.
    pub fn check_original(original_segments: usize) -> Result<()> {
        if original_segments == 0 {
            return Err(Error::Parameter(
                "original segment count must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Score from raw counts.
    pub fn from_counts(segments: usize, edges: usize, original_segments: usize) -> Result<Self> {
        Self::check_original(original_segments)?;
        if segments == 0 {
            return Err(Error::EmptyGraph);
        }

        let avg_degree = 2.0 * edges as f64 / segments as f64;
        let fraction_remaining = segments as f64 / original_segments as f64;
        let score = (avg_degree + 1.0) / fraction_remaining.sqrt();

        Ok(Self {
            original_segments,
            segments,
            edges,
            avg_degree,
            fraction_remaining,
            score,
        })
    }

    /// Score a graph against its original segment count.
    pub fn compute(graph: &AssemblyGraph, original_segments: usize) -> Result<Self> {
        Self::from_counts(graph.num_segments(), graph.num_edges(), original_segments)
    }

    /// Multi-line breakdown for verbose output.
    pub fn breakdown(&self) -> String {
        format!(
            "Original segments:   {}\n\
             Remaining segments:  {}\n\
             Links:               {}\n\
             Average degree:      {:.3}\n\
             Fraction remaining:  {:.3}\n\
             Score:               {:.5}",
            self.original_segments,
            self.segments,
            self.edges,
            self.avg_degree,
            self.fraction_remaining,
            self.score
        )
    }
}

impl fmt::Display for UntangleScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}", self.score)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Hairball index
// ─────────────────────────────────────────────────────────────────────────────

/// Weights of the hairball index terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HairballWeights {
    /// Edges per node of the simplified graph.
    pub edges_per_node: f64,
    /// One minus the modularity of the simplified graph.
    pub modularity: f64,
    /// Average shortest path ratio.
    pub shortest_path: f64,
    /// Fraction of nodes removed.
    pub nodes_removed: f64,
    /// Fraction of edges removed.
    pub edges_removed: f64,
    /// Fraction of sequence length removed.
    pub length_removed: f64,
}

impl Default for HairballWeights {
    fn default() -> Self {
        Self {
            edges_per_node: 0.5,
            modularity: 0.25,
            shortest_path: 0.012,
            nodes_removed: 0.1,
            edges_removed: 0.1,
            length_removed: 0.05,
        }
    }
}

/// Topology of one graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// Segments.
    pub nodes: usize,
    /// Distinct links.
    pub edges: usize,
    /// `edges / nodes`, 0 for an empty graph.
    pub edges_per_node: f64,
    /// Mean shortest path length over ordered pairs of the largest component.
    pub avg_shortest_path: f64,
    /// Modularity of the greedy community partition.
    pub modularity: f64,
    /// Summed segment sequence length in bp.
    pub total_length: u64,
}

impl GraphMetrics {
    /// Measure `graph`.
    pub fn compute(graph: &AssemblyGraph) -> Self {
        let (pg, _) = to_petgraph(graph);
        let nodes = pg.node_count();
        let edges = pg.edge_count();
        Self {
            nodes,
            edges,
            edges_per_node: if nodes > 0 { edges as f64 / nodes as f64 } else { 0.0 },
            avg_shortest_path: largest_component_path_length(&pg),
            modularity: greedy_modularity(&pg),
            total_length: graph.segments().map(|s| s.length() as u64).sum(),
        }
    }
}

/// Composite tangledness of a simplified graph relative to its original.
/// Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HairballIndex {
    /// Metrics of the original graph.
    pub original: GraphMetrics,
    /// Metrics of the simplified graph.
    pub filtered: GraphMetrics,
    /// Filtered over original average shortest path, 1 when the original has none.
    pub shortest_path_ratio: f64,
    /// Fraction of nodes removed.
    pub nodes_removed: f64,
    /// Fraction of edges removed.
    pub edges_removed: f64,
    /// Fraction of sequence length removed.
    pub length_removed: f64,
    /// The index.
    pub index: f64,
}

impl HairballIndex {
    /// Compare two graphs.
    pub fn compute(original: &AssemblyGraph, filtered: &AssemblyGraph, weights: &HairballWeights) -> Self {
        Self::from_metrics(GraphMetrics::compute(original), GraphMetrics::compute(filtered), weights)
    }

    /// Combine precomputed metrics.
    pub fn from_metrics(original: GraphMetrics, filtered: GraphMetrics, weights: &HairballWeights) -> Self {
        let shortest_path_ratio = if original.avg_shortest_path > 0.0 {
            filtered.avg_shortest_path / original.avg_shortest_path
        } else {
            1.0
        };
        let nodes_removed = removed_fraction(original.nodes as f64, filtered.nodes as f64);
        let edges_removed = removed_fraction(original.edges as f64, filtered.edges as f64);
        let length_removed = removed_fraction(original.total_length as f64, filtered.total_length as f64);

        let index = weights.edges_per_node * filtered.edges_per_node
            + weights.modularity * (1.0 - filtered.modularity)
            + weights.shortest_path * shortest_path_ratio
            + weights.nodes_removed * nodes_removed
            + weights.edges_removed * edges_removed
            + weights.length_removed * length_removed;

        Self {
            original,
            filtered,
            shortest_path_ratio,
            nodes_removed,
            edges_removed,
            length_removed,
            index,
        }
    }

    /// Multi-line breakdown for verbose output.
    pub fn breakdown(&self) -> String {
        let graph = |label: &str, m: &GraphMetrics| {
            format!(
                "{label} nodes {}, edges {}, edges/node {:.4}, avg path {:.4}, modularity {:.4}, length {} bp",
                m.nodes, m.edges, m.edges_per_node, m.avg_shortest_path, m.modularity, m.total_length
            )
        };
        format!(
            "{}\n{}\n\
             Removed:   nodes {:.2}%, edges {:.2}%, length {:.2}%\n\
             Hairball index: {:.4}",
            graph("Original: ", &self.original),
            graph("Filtered: ", &self.filtered),
            self.nodes_removed * 100.0,
            self.edges_removed * 100.0,
            self.length_removed * 100.0,
            self.index
        )
    }
}

impl fmt::Display for HairballIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.index)
    }
}

fn removed_fraction(before: f64, after: f64) -> f64 {
    if before > 0.0 {
        (before - after) / before
    } else {
        0.0
    }
}

/// Mean BFS distance over ordered node pairs of the largest connected
/// component. Ties between components go to the one holding the lowest node.
fn largest_component_path_length(pg: &UnGraph<(), ()>) -> f64 {
    if pg.node_count() < 2 || pg.edge_count() == 0 {
        return 0.0;
    }
    let largest = connected_components(pg)
        .into_iter()
        .max_by_key(|c| (c.len(), Reverse(c.iter().map(|n| n.index()).min())));
    let Some(component) = largest else {
        return 0.0;
    };
    let k = component.len();
    if k < 2 {
        return 0.0;
    }

    let total: usize = component
        .iter()
        .map(|&source| dijkstra(pg, source, None, |_| 1usize).values().sum::<usize>())
        .sum();
    total as f64 / (k * (k - 1)) as f64
}

/// Modularity of the partition found by greedy agglomeration: starting from
/// singletons, repeatedly merge the pair of linked communities with the
/// largest modularity gain until no merge gains.
fn greedy_modularity(pg: &UnGraph<(), ()>) -> f64 {
    let n = pg.node_count();
    let two_m = 2.0 * pg.edge_count() as f64;
    if n < 2 || two_m == 0.0 {
        return 0.0;
    }

    // a[i]: fraction of edge ends in community i.
    // e[i][j]: fraction of edge ends joining i to j, for i != j.
    let mut a: Vec<f64> = pg
        .node_indices()
        .map(|v| pg.neighbors(v).count() as f64 / two_m)
        .collect();
    let mut e: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
    for (u, v) in pg.edge_indices().filter_map(|idx| pg.edge_endpoints(idx)) {
        let (u, v) = (u.index(), v.index());
        *e[u].entry(v).or_insert(0.0) += 1.0 / two_m;
        *e[v].entry(u).or_insert(0.0) += 1.0 / two_m;
    }

    let mut q: f64 = -a.iter().map(|x| x * x).sum::<f64>();
    loop {
        let mut best: Option<(f64, usize, usize)> = None;
        for (i, row) in e.iter().enumerate() {
            for (&j, &eij) in row.range(i + 1..) {
                let gain = 2.0 * (eij - a[i] * a[j]);
                if best.map_or(true, |(b, _, _)| gain > b) {
                    best = Some((gain, i, j));
                }
            }
        }
        let Some((gain, i, j)) = best else { break };
        if gain <= 0.0 {
            break;
        }

        q += gain;
        for (k, w) in std::mem::take(&mut e[j]) {
            e[k].remove(&j);
            if k != i {
                *e[i].entry(k).or_insert(0.0) += w;
                *e[k].entry(i).or_insert(0.0) += w;
            }
        }
        a[i] += a[j];
        a[j] = 0.0;
    }
    q
}
