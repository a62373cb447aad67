//! End-to-end tests through files.
//!
//! Each test writes its inputs into a temporary directory, runs the pipeline
//! (or the `untangle` binary) and checks the artifacts on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use untangle_kernel::io::{read_atoms, read_gfa, VizPayload};
use untangle_kernel::pipeline::{run, RunConfig};
use untangle_kernel::report::{removal_log_hash, RunManifest};
use untangle_kernel::{
    BridgePolicy, ContextPolicy, Error, FilterPolicy, GraphSnapshot, SegmentId, UntanglePolicy,
    Untangler,
};

/// Two chromosomes and one plasmid, 50 bp each.
const FASTA: &str = ">chrA chromosome=true\n\
                     ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTAC\n\
                     >chrB chromosome=true\n\
                     TTTTTGGGGGCCCCCAAAAATTTTTGGGGGCCCCCAAAAATTTTTGGGGG\n\
                     >plas plasmid=true\n\
                     GATTACAGATTACAGATTACAGATTACAGATTACAGATTACAGATTACAG\n";

/// Atom 9 is a repeat shared by every genome; 3 closes all of them.
const GEESE: &str = "#name\tatom_nr\tclass\tstrand\tstart\tend\n\
                     chrA\t1\t1\t+\t0\t10\n\
                     chrA\t2\t9\t+\t10\t20\n\
                     chrA\t3\t2\t+\t20\t30\n\
                     chrA\t4\t9\t+\t30\t40\n\
                     chrA\t5\t3\t+\t40\t50\n\
                     chrB\t1\t1\t+\t0\t10\n\
                     chrB\t2\t9\t+\t10\t20\n\
                     chrB\t3\t4\t+\t20\t30\n\
                     chrB\t4\t9\t+\t30\t40\n\
                     chrB\t5\t3\t+\t40\t50\n\
                     plas\t1\t5\t+\t0\t10\n\
                     plas\t2\t9\t+\t10\t20\n\
                     plas\t3\t3\t+\t20\t30\n";

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let atoms = dir.path().join("pangenome.geese");
    let fasta = dir.path().join("genomes.fa");
    fs::write(&atoms, GEESE).unwrap();
    fs::write(&fasta, FASTA).unwrap();
    (dir, atoms, fasta)
}

fn config(dir: &Path, atoms: &Path, fasta: &Path) -> RunConfig {
    let mut config = RunConfig::new(atoms, dir.join("out"));
    config.fasta = Some(fasta.to_path_buf());
    config.filter = Some(FilterPolicy {
        min_depth: 1,
        context: ContextPolicy::disabled(),
        ..FilterPolicy::default()
    });
    config.untangle = UntanglePolicy {
        degree_threshold: 5,
        centrality_threshold: 0.9,
        ..UntanglePolicy::default()
    };
    config
}

fn id(s: &str) -> SegmentId {
    SegmentId::from(s)
}

#[test]
fn test_full_run_artifacts() {
    let (dir, atoms, fasta) = setup();
    let config = config(dir.path(), &atoms, &fasta);
    let out = dir.path().join("out");

    let result = run(&config).unwrap();

    // The hub is removed and every walk is bridged around it.
    assert_eq!(result.outcome.log.names(), vec![&id("9")]);
    let gfa = read_gfa(&out.join(&config.paths.gfa)).unwrap();
    assert_eq!(gfa.num_segments(), 5);
    assert_eq!(gfa.num_edges(), 5);
    for (a, b) in [("1", "2"), ("2", "3"), ("1", "4"), ("4", "3"), ("5", "3")] {
        assert!(gfa.has_edge(&id(a), &id(b)), "{a}-{b}");
    }

    // Colours and sequences come from the FASTA.
    assert_eq!(gfa.segment(&id("1")).unwrap().color(), Some("#00aa00"));
    assert_eq!(gfa.segment(&id("3")).unwrap().color(), Some("#aaaa00"));
    assert_eq!(gfa.segment(&id("5")).unwrap().color(), Some("#aa0000"));
    assert_eq!(gfa.segment(&id("1")).unwrap().sequence, "ACGTACGTAC");

    // Filtered atoms are written back unchanged.
    let filtered = fs::read_to_string(out.join(&config.paths.filtered_atoms)).unwrap();
    assert_eq!(filtered, GEESE);

    let names = fs::read_to_string(out.join(&config.paths.removal_names)).unwrap();
    assert_eq!(names, "9\n");
    let details = fs::read_to_string(out.join(&config.paths.removal_details)).unwrap();
    let row: Vec<&str> = details.lines().nth(1).unwrap().split('\t').collect();
    assert_eq!(row[0], "1");
    assert_eq!(row[1], "9");
    assert_eq!(row[2], "5");
    assert_eq!(row[4], "degree");

    let payload: VizPayload =
        serde_json::from_str(&fs::read_to_string(out.join(&config.paths.payload)).unwrap()).unwrap();
    let ids: Vec<&str> = payload.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(payload.nodes[2].usage_value, 3);
    assert_eq!(payload.links.len(), 5);

    let score = result.score.unwrap();
    assert!((score.score - 3.0 / (5.0f64 / 6.0).sqrt()).abs() < 1e-9);
}

#[test]
fn test_manifest_matches_artifacts() {
    let (dir, atoms, fasta) = setup();
    let config = config(dir.path(), &atoms, &fasta);
    let out = dir.path().join("out");

    let result = run(&config).unwrap();
    let manifest = RunManifest::read(&out.join(&config.paths.manifest)).unwrap();

    assert_eq!(manifest.run_id, result.manifest.run_id);
    assert_eq!(manifest.graph_before.segment_count, 6);
    assert_eq!(manifest.stats.removals.degree, 1);
    assert_eq!(manifest.stats.atoms_before, 6);
    assert_eq!(manifest.stats.atoms_after, 6);
    assert_eq!(manifest.stats.bridge, "evidence");
    assert_eq!(manifest.stats.removal_log_hash, removal_log_hash(&result.outcome.log));

    let gfa = read_gfa(&out.join(&manifest.artifact_paths.gfa)).unwrap();
    assert_eq!(GraphSnapshot::compute(&gfa).snapshot_id, manifest.graph_after.snapshot_id);
    assert!(manifest.score.is_some());
}

#[test]
fn test_runs_are_reproducible() {
    let (dir, atoms, fasta) = setup();
    let first = run(&config(dir.path(), &atoms, &fasta)).unwrap();
    let second = run(&config(dir.path(), &atoms, &fasta)).unwrap();
    assert_eq!(first.manifest.run_id, second.manifest.run_id);
}

#[test]
fn test_malformed_atoms_abort_before_writing() {
    let (dir, atoms, fasta) = setup();
    fs::write(&atoms, "chrA\t1\t1\t+\t0\n").unwrap();
    let config = config(dir.path(), &atoms, &fasta);

    let err = run(&config).unwrap_err();
    assert!(matches!(err, Error::MalformedInput { line: 1, .. }));
    assert!(!dir.path().join("out").join(&config.paths.gfa).exists());
}

#[test]
fn test_coordinates_outside_fasta_are_malformed() {
    let (dir, atoms, fasta) = setup();
    fs::write(&atoms, "plas\t1\t5\t+\t40\t60\n").unwrap();
    let err = run(&config(dir.path(), &atoms, &fasta)).unwrap_err();
    assert!(matches!(err, Error::MalformedInput { .. }));
}

#[test]
fn test_remove_listed_from_written_gfa() {
    let (dir, atoms, fasta) = setup();
    let mut config = config(dir.path(), &atoms, &fasta);
    config.untangle.force_removal = false;
    config.untangle.degree_threshold = 100;
    config.untangle.centrality_threshold = 2.0;
    run(&config).unwrap();

    let graph = read_gfa(&dir.path().join("out").join(&config.paths.gfa)).unwrap();
    let atoms = read_atoms(&atoms, None).unwrap();
    let untangler = Untangler::new(UntanglePolicy {
        bridge: BridgePolicy::Evidence,
        ..UntanglePolicy::default()
    })
    .unwrap();
    let outcome = untangler
        .remove_listed(graph, &[id("9"), id("missing")], Some(&atoms))
        .unwrap();

    assert_eq!(outcome.log.len(), 1);
    assert!(outcome.graph.has_edge(&id("5"), &id("3")));
    assert!(!outcome.graph.contains(&id("9")));
}

// ─────────────────────────────────────────────────────────────────────────────
// Binary
// ─────────────────────────────────────────────────────────────────────────────

fn untangle_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_untangle"))
}

#[test]
fn test_cli_run_then_score() {
    let (dir, atoms, fasta) = setup();
    let out = dir.path().join("cli");

    let status = untangle_bin()
        .args(["run", "--min-depth", "1", "--context-passes", "0", "--degree-threshold", "5"])
        .args(["--centrality-threshold", "0.9", "--prefix", "pg"])
        .arg("--atoms")
        .arg(&atoms)
        .arg("--fasta")
        .arg(&fasta)
        .arg("--out-dir")
        .arg(&out)
        .output()
        .unwrap();
    assert!(status.status.success(), "{}", String::from_utf8_lossy(&status.stderr));
    assert!(out.join("pg.untangled.gfa").exists());

    let score = untangle_bin()
        .args(["score", "--original-nodes", "6", "--gfa"])
        .arg(out.join("pg.untangled.gfa"))
        .output()
        .unwrap();
    assert!(score.status.success());
    assert_eq!(String::from_utf8_lossy(&score.stdout).trim(), "3.28634");
}

#[test]
fn test_cli_rejects_zero_original_nodes() {
    let (dir, _, _) = setup();
    let gfa = dir.path().join("g.gfa");
    fs::write(&gfa, "S\ta\t*\n").unwrap();

    let output = untangle_bin()
        .args(["score", "--original-nodes", "0", "--gfa"])
        .arg(&gfa)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("original segment count"));
}

#[test]
fn test_cli_score_checks_original_nodes_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let output = untangle_bin()
        .args(["score", "--original-nodes", "0", "--gfa"])
        .arg(dir.path().join("absent.gfa"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("original segment count"));
}

/// Two genomes whose atoms 1 and 2 both read ACGT.
const DUP_FASTA: &str = ">g1\nACGTACGT\n>g2\nACGTACGT\n";
const DUP_GEESE: &str = "g1\t1\t1\t+\t0\t4\n\
                         g1\t2\t2\t+\t4\t8\n\
                         g2\t1\t1\t+\t0\t4\n\
                         g2\t2\t2\t+\t4\t8\n";

#[test]
fn test_cli_filter_removes_duplicate_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let atoms = dir.path().join("dup.geese");
    let fasta = dir.path().join("dup.fa");
    fs::write(&atoms, DUP_GEESE).unwrap();
    fs::write(&fasta, DUP_FASTA).unwrap();
    let filtered = dir.path().join("filtered.geese");
    let removed = dir.path().join("removed.tsv");

    let output = untangle_bin()
        .args(["filter", "--min-depth", "0", "--context-passes", "0", "--remove-duplicates"])
        .arg("--atoms")
        .arg(&atoms)
        .arg("--fasta")
        .arg(&fasta)
        .arg("--output")
        .arg(&filtered)
        .arg("--removed")
        .arg(&removed)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let kept = fs::read_to_string(&filtered).unwrap();
    let classes: Vec<&str> = kept.lines().map(|l| l.split('\t').nth(2).unwrap()).collect();
    assert_eq!(classes, vec!["1", "1"]);
    assert_eq!(fs::read_to_string(&removed).unwrap(), "Atom\tReason\n2\tduplicate\n");
}

#[test]
fn test_cli_filter_duplicates_require_fasta() {
    let dir = tempfile::tempdir().unwrap();
    let atoms = dir.path().join("dup.geese");
    fs::write(&atoms, DUP_GEESE).unwrap();
    let filtered = dir.path().join("filtered.geese");

    let output = untangle_bin()
        .args(["filter", "--min-depth", "0", "--context-passes", "0", "--remove-duplicates"])
        .arg("--atoms")
        .arg(&atoms)
        .arg("--output")
        .arg(&filtered)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--fasta"));
    assert!(!filtered.exists());
}

#[test]
fn test_cli_hairball_of_removed_bridge() {
    let dir = tempfile::tempdir().unwrap();
    let triangles = "S\ta\tACGT\nS\tb\tACGT\nS\tc\tACGT\nS\td\tACGT\nS\te\tACGT\nS\tf\tACGT\n\
                     L\ta\t+\tb\t+\t0M\nL\tb\t+\tc\t+\t0M\nL\ta\t+\tc\t+\t0M\n\
                     L\td\t+\te\t+\t0M\nL\te\t+\tf\t+\t0M\nL\td\t+\tf\t+\t0M\n";
    let original = dir.path().join("original.gfa");
    let simplified = dir.path().join("simplified.gfa");
    fs::write(&original, format!("{triangles}L\tc\t+\td\t+\t0M\n")).unwrap();
    fs::write(&simplified, triangles).unwrap();

    let output = untangle_bin()
        .arg("hairball")
        .arg("--original")
        .arg(&original)
        .arg("--gfa")
        .arg(&simplified)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0.6460");
}
