//! Bridging links around removed segments.
//!
//! Plans are computed on the graph *before* the removal, then applied
//! after it, so both modes see the neighbourhoods that are about to
//! disappear.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::AssemblyGraph;
use crate::types::{Link, Orientation, SegmentId, WalkStep};

/// Links joining surviving segments that some genome walk visits
/// consecutively once the removed segments are skipped.
///
/// Segments absent from the graph are ignored by the walk; only gaps made
/// of segments in `removed` produce a bridge.
pub fn plan_evidence(
    graph: &AssemblyGraph,
    removed: &BTreeSet<SegmentId>,
    walks: &BTreeMap<String, Vec<WalkStep>>,
) -> Vec<Link> {
    let mut links = Vec::new();

    for walk in walks.values() {
        let mut last: Option<&WalkStep> = None;
        let mut gap = false;

        for step in walk {
            if removed.contains(&step.atom) {
                gap = true;
                continue;
            }
            if !graph.contains(&step.atom) {
                continue;
            }
            if let (Some(prev), true) = (last, gap) {
                links.push(Link::new(
                    prev.atom.clone(),
                    prev.strand,
                    step.atom.clone(),
                    step.strand,
                ));
            }
            last = Some(step);
            gap = false;
        }
    }
    links
}

/// Links between every pair of surviving neighbours of each connected
/// group of removed segments.
pub fn plan_structural(graph: &AssemblyGraph, removed: &BTreeSet<SegmentId>) -> Vec<Link> {
    let mut links = Vec::new();
    let mut seen: BTreeSet<&SegmentId> = BTreeSet::new();

    for start in removed {
        if !graph.contains(start) || !seen.insert(start) {
            continue;
        }

        // Surviving neighbour -> orientation in which it leaves towards the group.
        let mut boundary: BTreeMap<&SegmentId, Orientation> = BTreeMap::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for next in graph.neighbors(current) {
                if removed.contains(next) {
                    if seen.insert(next) {
                        stack.push(next);
                    }
                } else if let Some(link) = graph.link(current, next) {
                    boundary.entry(next).or_insert_with(|| exit_orientation(link, next));
                }
            }
        }

        let boundary: Vec<(&SegmentId, Orientation)> = boundary.into_iter().collect();
        for (i, (from, from_exit)) in boundary.iter().enumerate() {
            for (to, to_exit) in &boundary[i + 1..] {
                links.push(Link::new((*from).clone(), *from_exit, (*to).clone(), to_exit.flip()));
            }
        }
    }
    links
}

/// Orientation of `id` when traversing `link` away from it.
fn exit_orientation(link: &Link, id: &SegmentId) -> Orientation {
    if &link.from == id {
        link.from_orient
    } else {
        link.to_orient.flip()
    }
}
