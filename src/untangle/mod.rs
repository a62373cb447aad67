//! Iterative untangling of an assembly graph.
//!
//! Each iteration runs Evaluate → Flag → Remove+Bridge:
//!
//! - **Evaluate**: degree and betweenness of every segment, recomputed on
//!   the current graph.
//! - **Flag**: segments at or above the degree threshold (reason `degree`)
//!   or the centrality threshold (reason `centrality`). When nothing is
//!   flagged and forced removal is enabled, the most central segment is
//!   flagged (reason `forced`).
//! - **Remove+Bridge**: flagged segments and their links are removed and
//!   connectivity is restored according to the [`BridgePolicy`].
//!
//! The loop stops when a pass flags nothing or the iteration budget is
//! spent. An emptied graph is a valid result.

pub mod bridge;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::centrality::{CentralityBackend, MetricsView, RustworkxBackend};
use crate::error::{Error, Result};
use crate::fixpoint::run_to_fixpoint;
use crate::graph::AssemblyGraph;
use crate::policy::{BridgePolicy, UntanglePolicy};
use crate::types::{
    AtomCollection, RemovalLog, RemovalReason, RemovalRecord, SegmentId, WalkStep,
};

/// A segment selected for removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    /// Segment to remove.
    pub segment: SegmentId,
    /// Why it was selected.
    pub reason: RemovalReason,
    /// Degree when flagged.
    pub degree: usize,
    /// Betweenness when flagged.
    pub centrality: f64,
}

/// Statistics of one applied iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationSummary {
    /// Iteration number (1-based).
    pub iteration: usize,
    /// Segments before removal.
    pub segments_before: usize,
    /// Links before removal.
    pub edges_before: usize,
    /// Segments removed.
    pub removed: usize,
    /// Whether the removal was forced.
    pub forced: bool,
    /// New adjacencies created by bridging.
    pub bridges_added: usize,
    /// Segments after removal.
    pub segments_after: usize,
    /// Links after removal and bridging.
    pub edges_after: usize,
}

/// Result of an untangling run.
#[derive(Debug, Clone)]
pub struct UntangleOutcome {
    /// Simplified graph.
    pub graph: AssemblyGraph,
    /// Removed segments in removal order.
    pub log: RemovalLog,
    /// Evaluate passes run.
    pub iterations: usize,
    /// Whether the last pass flagged nothing.
    pub converged: bool,
    /// One entry per iteration that removed something.
    pub summaries: Vec<IterationSummary>,
    /// Bridging mode actually used.
    pub bridge: BridgePolicy,
}

/// Threshold-driven segment remover.
#[derive(Debug, Clone)]
pub struct Untangler<B = RustworkxBackend> {
    policy: UntanglePolicy,
    backend: B,
}

impl Untangler<RustworkxBackend> {
    /// Untangler using `rustworkx-core` for centrality.
    pub fn new(policy: UntanglePolicy) -> Result<Self> {
        let backend = RustworkxBackend::new(policy.parallel_threshold);
        Self::with_backend(policy, backend)
    }
}

impl<B: CentralityBackend> Untangler<B> {
    /// Untangler with a custom centrality backend.
    pub fn with_backend(policy: UntanglePolicy, backend: B) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy, backend })
    }

    /// The policy in use.
    pub fn policy(&self) -> &UntanglePolicy {
        &self.policy
    }

    /// Bridging mode for a run with or without atom evidence.
    pub fn effective_bridge(&self, has_atoms: bool) -> BridgePolicy {
        match (self.policy.bridge, has_atoms) {
            (BridgePolicy::Evidence, false) => BridgePolicy::Structural,
            (bridge, _) => bridge,
        }
    }

    /// Select segments to remove from a metrics view.
    pub fn flag(&self, view: &MetricsView) -> Vec<Flag> {
        let mut flags: Vec<Flag> = view
            .iter()
            .filter_map(|(id, m)| {
                let reason = if m.degree >= self.policy.degree_threshold {
                    RemovalReason::Degree
                } else if m.centrality >= self.policy.centrality_threshold {
                    RemovalReason::Centrality
                } else {
                    return None;
                };
                Some(Flag {
                    segment: id.clone(),
                    reason,
                    degree: m.degree,
                    centrality: m.centrality,
                })
            })
            .collect();

        if flags.is_empty() && self.policy.force_removal {
            // Highest centrality, then highest degree, then lowest id.
            let forced = view.iter().max_by(|(ia, a), (ib, b)| {
                a.centrality
                    .total_cmp(&b.centrality)
                    .then(a.degree.cmp(&b.degree))
                    .then(ib.cmp(ia))
            });
            if let Some((id, m)) = forced {
                flags.push(Flag {
                    segment: id.clone(),
                    reason: RemovalReason::Forced,
                    degree: m.degree,
                    centrality: m.centrality,
                });
            }
        }
        flags
    }

    /// Run the untangling loop.
    ///
    /// `atoms` supplies walk evidence for [`BridgePolicy::Evidence`]; without
    /// it, evidence bridging falls back to structural bridging.
    pub fn untangle(&self, graph: AssemblyGraph, atoms: Option<&AtomCollection>) -> Result<UntangleOutcome> {
        let bridge = self.effective_bridge(atoms.is_some());
        if bridge != self.policy.bridge {
            warn!(
                requested = self.policy.bridge.as_str(),
                used = bridge.as_str(),
                "No atom evidence available; bridging structurally"
            );
        }
        let walks = match bridge {
            BridgePolicy::Evidence => atoms.map(AtomCollection::genome_walks),
            _ => None,
        };

        info!(
            segments = graph.num_segments(),
            links = graph.num_edges(),
            degree_threshold = self.policy.degree_threshold,
            centrality_threshold = self.policy.centrality_threshold,
            max_iterations = self.policy.max_iterations,
            bridge = bridge.as_str(),
            "Untangling graph"
        );

        let mut graph = graph;
        let mut log = RemovalLog::new();
        let mut summaries = Vec::new();

        let outcome = run_to_fixpoint(
            &mut graph,
            self.policy.max_iterations,
            |g: &AssemblyGraph, iteration| {
                let view = self.backend.evaluate(g);
                let flags = self.flag(&view);
                if flags.is_empty() {
                    info!(iteration, "No segments flagged; stopping");
                }
                Ok::<_, Error>(flags)
            },
            |g: &mut AssemblyGraph, flags: Vec<Flag>, iteration| {
                let summary = remove_flagged(g, &flags, iteration, bridge, walks.as_ref(), &mut log);
                info!(
                    iteration,
                    removed = summary.removed,
                    forced = summary.forced,
                    bridges = summary.bridges_added,
                    segments = summary.segments_after,
                    links = summary.edges_after,
                    "Untangle iteration"
                );
                summaries.push(summary);
                Ok(())
            },
        )?;

        if graph.is_empty() {
            warn!(removed = log.len(), "Untangling removed every segment");
        }

        Ok(UntangleOutcome {
            graph,
            log,
            iterations: outcome.iterations,
            converged: outcome.converged,
            summaries,
            bridge,
        })
    }

    /// Remove an explicit list of segments in one step, bridging as configured.
    ///
    /// Unknown identifiers are skipped with a warning.
    pub fn remove_listed(
        &self,
        graph: AssemblyGraph,
        ids: &[SegmentId],
        atoms: Option<&AtomCollection>,
    ) -> Result<UntangleOutcome> {
        let bridge = self.effective_bridge(atoms.is_some());
        let walks = match bridge {
            BridgePolicy::Evidence => atoms.map(AtomCollection::genome_walks),
            _ => None,
        };

        let mut graph = graph;
        let view = self.backend.evaluate(&graph);
        let mut flags = Vec::new();
        let mut listed = BTreeSet::new();
        for id in ids {
            match view.get(id) {
                Some(m) if listed.insert(id) => flags.push(Flag {
                    segment: id.clone(),
                    reason: RemovalReason::Listed,
                    degree: m.degree,
                    centrality: m.centrality,
                }),
                Some(_) => {}
                None => warn!(segment = %id, "Listed segment not in graph"),
            }
        }

        let mut log = RemovalLog::new();
        let mut summaries = Vec::new();
        if !flags.is_empty() {
            summaries.push(remove_flagged(&mut graph, &flags, 1, bridge, walks.as_ref(), &mut log));
        }
        info!(removed = log.len(), segments = graph.num_segments(), "Removed listed segments");

        Ok(UntangleOutcome {
            graph,
            log,
            iterations: 1,
            converged: true,
            summaries,
            bridge,
        })
    }
}

fn remove_flagged(
    graph: &mut AssemblyGraph,
    flags: &[Flag],
    iteration: usize,
    mode: BridgePolicy,
    walks: Option<&BTreeMap<String, Vec<WalkStep>>>,
    log: &mut RemovalLog,
) -> IterationSummary {
    let segments_before = graph.num_segments();
    let edges_before = graph.num_edges();
    let removed: BTreeSet<SegmentId> = flags.iter().map(|f| f.segment.clone()).collect();

    let planned = match (mode, walks) {
        (BridgePolicy::Evidence, Some(walks)) => bridge::plan_evidence(graph, &removed, walks),
        (BridgePolicy::Evidence, None) | (BridgePolicy::Structural, _) => {
            bridge::plan_structural(graph, &removed)
        }
        (BridgePolicy::None, _) => Vec::new(),
    };

    for flag in flags {
        if graph.remove_segment(&flag.segment).is_some() {
            debug!(
                segment = %flag.segment,
                reason = %flag.reason,
                degree = flag.degree,
                centrality = flag.centrality,
                "Removed segment"
            );
            log.push(RemovalRecord {
                segment: flag.segment.clone(),
                iteration,
                reason: flag.reason,
                degree: flag.degree,
                centrality: flag.centrality,
            });
        }
    }

    let bridges_added = planned.into_iter().filter(|link| graph.add_link(link.clone())).count();

    IterationSummary {
        iteration,
        segments_before,
        edges_before,
        removed: segments_before - graph.num_segments(),
        forced: flags.iter().any(|f| f.reason == RemovalReason::Forced),
        bridges_added,
        segments_after: graph.num_segments(),
        edges_after: graph.num_edges(),
    }
}
