//! Golden tests for the untangle kernel.
//!
//! These tests pin the reference scenarios and verify determinism of the
//! filter, the untangler and the scorer.

use std::io::Cursor;
use std::path::Path;

use untangle_kernel::io::{parse_atoms, parse_gfa, write_gfa_to};
use untangle_kernel::{
    AssemblyGraph, AtomCollection, AtomFilter, AtomId, BridgePolicy, ContextPolicy, Error,
    FilterPolicy, GraphBuilder, GraphSnapshot, RemovalReason, SegmentId, UntanglePolicy,
    UntangleScore, Untangler,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn atoms_from(text: &str) -> AtomCollection {
    parse_atoms(Cursor::new(text), Path::new("golden.geese"), None).unwrap()
}

fn gfa_from(text: &str) -> AssemblyGraph {
    parse_gfa(Cursor::new(text), Path::new("golden.gfa")).unwrap()
}

/// Genomes `g0..g39`; atom 1 occurs in the first 30, atom 2 in the first
/// 10 and atom 3 in all 40.
fn depth_collection() -> AtomCollection {
    let mut text = String::new();
    for g in 0..40 {
        let mut nr = 1;
        for (atom, depth) in [(1, 30), (2, 10), (3, 40)] {
            if g < depth {
                let start = nr * 100;
                text.push_str(&format!("g{g}\t{nr}\t{atom}\t+\t{start}\t{}\n", start + 100));
                nr += 1;
            }
        }
    }
    atoms_from(&text)
}

fn path_graph() -> AssemblyGraph {
    gfa_from(
        "S\tA\t*\nS\tB\t*\nS\tC\t*\nS\tD\t*\n\
         L\tA\t+\tB\t+\t0M\nL\tB\t+\tC\t+\t0M\nL\tC\t+\tD\t+\t0M\n",
    )
}

fn id(s: &str) -> SegmentId {
    SegmentId::from(s)
}

// ─────────────────────────────────────────────────────────────────────────────
// Reference scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_depth_filter_keeps_30_and_40() {
    let atoms = depth_collection();
    let depths: Vec<usize> = atoms.atoms().map(|a| a.depth()).collect();
    assert_eq!(depths, vec![30, 10, 40]);

    let filter = AtomFilter::new(FilterPolicy {
        min_depth: 25,
        context: ContextPolicy::disabled(),
        ..FilterPolicy::default()
    })
    .unwrap();
    let outcome = filter.filter(&atoms).unwrap();

    let kept: Vec<&str> = outcome.atoms.ids().map(|id| id.as_str()).collect();
    assert_eq!(kept, vec!["1", "3"]);
    assert_eq!(outcome.report.removed_by_rule.get("depth"), Some(&1));
}

#[test]
fn test_path_without_forced_removal_is_untouched() {
    let untangler = Untangler::new(UntanglePolicy {
        degree_threshold: 3,
        centrality_threshold: 1.0,
        force_removal: false,
        ..UntanglePolicy::default()
    })
    .unwrap();

    let outcome = untangler.untangle(path_graph(), None).unwrap();

    assert!(outcome.log.is_empty());
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.converged);
    assert_eq!(outcome.graph.num_segments(), 4);
    assert_eq!(outcome.graph.num_edges(), 3);
}

#[test]
fn test_path_with_forced_removal_takes_lowest_central_id() {
    let untangler = Untangler::new(UntanglePolicy {
        degree_threshold: 3,
        centrality_threshold: 1.0,
        force_removal: true,
        bridge: BridgePolicy::Structural,
        ..UntanglePolicy::default()
    })
    .unwrap();

    let outcome = untangler.untangle(path_graph(), None).unwrap();

    // B and C tie on centrality and degree; the lower id goes first.
    let records = outcome.log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].segment, id("B"));
    assert_eq!(records[0].reason, RemovalReason::Forced);
    assert!((records[0].centrality - 2.0 / 3.0).abs() < 1e-9);
    assert!(outcome.graph.has_edge(&id("A"), &id("C")));
}

#[test]
fn test_reference_score() {
    let score = UntangleScore::from_counts(100, 150, 200).unwrap();
    assert!((score.avg_degree - 3.0).abs() < 1e-12);
    assert!((score.fraction_remaining - 0.5).abs() < 1e-12);
    assert!((score.score - 5.657).abs() < 1e-3);
}

#[test]
fn test_empty_graph_has_no_score() {
    let result = UntangleScore::compute(&AssemblyGraph::new(), 10);
    assert!(matches!(result, Err(Error::EmptyGraph)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────────────

fn tangled_atoms() -> AtomCollection {
    // Atom 9 is a repeat visited between every pair of unique atoms.
    atoms_from(
        "g1\t1\t1\t+\t0\t10\n\
         g1\t2\t9\t+\t10\t20\n\
         g1\t3\t2\t+\t20\t30\n\
         g1\t4\t9\t+\t30\t40\n\
         g1\t5\t3\t+\t40\t50\n\
         g2\t1\t1\t+\t0\t10\n\
         g2\t2\t9\t+\t10\t20\n\
         g2\t3\t4\t+\t20\t30\n\
         g2\t4\t9\t+\t30\t40\n\
         g2\t5\t3\t+\t40\t50\n\
         g3\t1\t5\t+\t0\t10\n\
         g3\t2\t9\t+\t10\t20\n\
         g3\t3\t6\t+\t20\t30\n",
    )
}

#[test]
fn test_repeat_hub_is_removed_and_walks_bridged() {
    let atoms = tangled_atoms();
    let graph = GraphBuilder::new().build(&atoms, None);
    assert_eq!(graph.degree(&id("9")), 6);

    let untangler = Untangler::new(UntanglePolicy {
        degree_threshold: 5,
        centrality_threshold: 0.9,
        ..UntanglePolicy::default()
    })
    .unwrap();
    let outcome = untangler.untangle(graph, Some(&atoms)).unwrap();

    assert_eq!(outcome.bridge, BridgePolicy::Evidence);
    assert_eq!(outcome.log.names(), vec![&id("9")]);
    assert_eq!(outcome.log.records()[0].reason, RemovalReason::Degree);
    for (a, b) in [("1", "2"), ("2", "3"), ("1", "4"), ("4", "3"), ("5", "6")] {
        assert!(outcome.graph.has_edge(&id(a), &id(b)), "{a}-{b}");
    }
    // Walk evidence never joins 1 and 3 directly.
    assert!(!outcome.graph.has_edge(&id("1"), &id("3")));
}

#[test]
fn test_untangle_is_deterministic() {
    let atoms = tangled_atoms();
    let policy = UntanglePolicy {
        max_iterations: 3,
        degree_threshold: 4,
        ..UntanglePolicy::default()
    };

    let render = || {
        let graph = GraphBuilder::new().build(&atoms, None);
        let outcome = Untangler::new(policy.clone())
            .unwrap()
            .untangle(graph, Some(&atoms))
            .unwrap();
        let mut gfa = Vec::new();
        write_gfa_to(&outcome.graph, &mut gfa).unwrap();
        (outcome.log, GraphSnapshot::compute(&outcome.graph).snapshot_id, gfa)
    };

    assert_eq!(render(), render());
}

#[test]
fn test_policy_hashes_are_stable() {
    assert_eq!(FilterPolicy::default().params_hash(), FilterPolicy::default().params_hash());
    assert_ne!(
        UntanglePolicy::default().params_hash(),
        UntanglePolicy {
            centrality_threshold: 0.06,
            ..UntanglePolicy::default()
        }
        .params_hash()
    );
}

#[test]
fn test_atom_ids_sort_numerically() {
    let atoms = atoms_from("g1\t1\t10\t+\t0\t5\ng1\t2\t9\t+\t5\t10\ng1\t3\tx\t+\t10\t15\n");
    let ids: Vec<&AtomId> = atoms.ids().collect();
    assert_eq!(ids, vec![&AtomId::from("9"), &AtomId::from("10"), &AtomId::from("x")]);
}
