//! End-to-end run: filter atoms, build the graph, untangle, score, write
//! every artifact and the manifest.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::filter::AtomFilter;
use crate::graph::{GraphBuilder, GraphSnapshot};
use crate::io::{self, SequenceCatalog, VizPayload};
use crate::policy::{FilterPolicy, UntanglePolicy};
use crate::report::{ArtifactPaths, ManifestBuilder, RunManifest};
use crate::score::UntangleScore;
use crate::untangle::{UntangleOutcome, Untangler};

/// Inputs and policies of a pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// `.geese` atom file.
    pub atoms: PathBuf,
    /// Optional FASTA with the genome sequences.
    pub fasta: Option<PathBuf>,
    /// Directory receiving every artifact.
    pub out_dir: PathBuf,
    /// Artifact file names.
    pub paths: ArtifactPaths,
    /// Filter policy; `None` skips filtering.
    pub filter: Option<FilterPolicy>,
    /// Untangle policy.
    pub untangle: UntanglePolicy,
    /// Skip atoms with more occurrences when building the graph.
    pub max_class_occurrences: Option<usize>,
}

impl RunConfig {
    /// Default policies writing `untangle.*` artifacts into `out_dir`.
    pub fn new(atoms: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            atoms: atoms.into(),
            fasta: None,
            out_dir: out_dir.into(),
            paths: ArtifactPaths::default(),
            filter: Some(FilterPolicy::default()),
            untangle: UntanglePolicy::default(),
            max_class_occurrences: None,
        }
    }

    fn artifact(&self, name: &str) -> PathBuf {
        self.out_dir.join(name)
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Untangling outcome with the final graph.
    pub outcome: UntangleOutcome,
    /// Score, `None` when untangling removed every segment.
    pub score: Option<UntangleScore>,
    /// Manifest as written.
    pub manifest: RunManifest,
}

/// Run the whole pipeline.
///
/// Every input is read and every stage computed before the first artifact
/// is written, so a failing run leaves no partial output behind.
pub fn run(config: &RunConfig) -> Result<RunResult> {
    let filter = config.filter.clone().map(AtomFilter::new).transpose()?;
    let untangler = Untangler::new(config.untangle.clone())?;
    if config.fasta.is_none() && filter.as_ref().map_or(false, |f| f.policy().requires_sequences()) {
        return Err(Error::Parameter(
            "duplicate removal compares atom sequences and needs a FASTA".into(),
        ));
    }

    let catalog = config
        .fasta
        .as_deref()
        .map(SequenceCatalog::read)
        .transpose()?;
    let atoms = io::read_atoms(&config.atoms, catalog.as_ref())?;
    let atoms_before = atoms.len();

    let mut manifest = ManifestBuilder::new()
        .with_paths(config.paths.clone())
        .untangle_params_hash(untangler.policy().params_hash());

    let atoms = match &filter {
        Some(filter) => {
            let outcome = filter.filter(&atoms)?;
            manifest = manifest.filter(filter.policy().params_hash(), outcome.report);
            outcome.atoms
        }
        None => atoms,
    };

    let mut builder = GraphBuilder::new();
    if let Some(cutoff) = config.max_class_occurrences {
        builder = builder.max_class_occurrences(cutoff);
    }
    let graph = builder.build(&atoms, catalog.as_ref());
    let original_segments = graph.num_segments();
    manifest = manifest
        .atom_counts(atoms_before, atoms.len())
        .graph_before(GraphSnapshot::compute(&graph));

    let outcome = untangler.untangle(graph, Some(&atoms))?;

    let score = match UntangleScore::compute(&outcome.graph, original_segments) {
        Ok(score) => Some(score),
        Err(Error::EmptyGraph) => {
            warn!("Untangling removed every segment; no score");
            None
        }
        Err(e) => {
            warn!(error = %e, "Score unavailable");
            None
        }
    };
    if let Some(score) = score {
        manifest = manifest.score(score);
    }
    let manifest = manifest.outcome(&outcome).build()?;
    let payload = VizPayload::from_graph(&outcome.graph, Some(&atoms));

    ensure_dir(&config.out_dir)?;
    io::write_atoms(&atoms, &config.artifact(&config.paths.filtered_atoms))?;
    io::write_gfa(&outcome.graph, &config.artifact(&config.paths.gfa))?;
    io::write_removal_details(&outcome.log, &config.artifact(&config.paths.removal_details))?;
    io::write_removal_names(&outcome.log, &config.artifact(&config.paths.removal_names))?;
    payload.write(&config.artifact(&config.paths.payload))?;
    manifest.write(&config.artifact(&config.paths.manifest))?;

    info!(
        run_id = %manifest.run_id,
        segments = outcome.graph.num_segments(),
        removed = outcome.log.len(),
        score = score.map(|s| s.score),
        "Run complete"
    );

    Ok(RunResult {
        outcome,
        score,
        manifest,
    })
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(e, dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEESE: &str = "g1\t1\t1\t+\t0\t4\n\
                         g1\t2\t2\t+\t4\t8\n\
                         g1\t3\t3\t+\t8\t12\n\
                         g2\t1\t1\t+\t0\t4\n\
                         g2\t2\t2\t+\t4\t8\n\
                         g2\t3\t3\t+\t8\t12\n";

    #[test]
    fn test_run_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let atoms = dir.path().join("atoms.geese");
        std::fs::write(&atoms, GEESE).unwrap();

        let mut config = RunConfig::new(&atoms, dir.path().join("out"));
        config.filter = Some(FilterPolicy {
            min_depth: 2,
            ..FilterPolicy::default()
        });
        config.untangle.force_removal = false;
        config.untangle.centrality_threshold = 2.0;

        let result = run(&config).unwrap();

        assert_eq!(result.outcome.graph.num_segments(), 3);
        assert!(result.outcome.log.is_empty());
        let paths = ArtifactPaths::default();
        for name in [&paths.filtered_atoms, &paths.gfa, &paths.removal_details, &paths.payload, &paths.manifest] {
            assert!(config.artifact(name).exists(), "{name}");
        }
        assert!(result.manifest.filter_params_hash.is_some());
    }

    #[test]
    fn test_invalid_policy_rejected_before_reading() {
        let mut config = RunConfig::new("missing.geese", "unused");
        config.untangle.degree_threshold = 0;
        assert!(matches!(run(&config), Err(Error::Parameter(_))));
    }

    #[test]
    fn test_duplicate_removal_without_fasta_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let atoms = dir.path().join("atoms.geese");
        std::fs::write(&atoms, GEESE).unwrap();

        let mut config = RunConfig::new(&atoms, dir.path().join("out"));
        config.filter = Some(FilterPolicy {
            remove_duplicates: true,
            ..FilterPolicy::default()
        });

        assert!(matches!(run(&config), Err(Error::Parameter(_))));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_failed_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let atoms = dir.path().join("atoms.geese");
        std::fs::write(&atoms, GEESE).unwrap();

        // The atoms parse, but the FASTA does not exist.
        let mut config = RunConfig::new(&atoms, dir.path().join("out"));
        config.fasta = Some(dir.path().join("missing.fa"));

        assert!(matches!(run(&config), Err(Error::Io { .. })));
        assert!(!dir.path().join("out").exists());
    }
}
