//! Run manifest packaging every artifact of a pipeline run.
//!
//! The manifest records the policies (by `params_hash`), the graph before and
//! after untangling (by [`GraphSnapshot`]), the removal counts and the score,
//! so a run can be identified and checked against the files it produced.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::canonical::canonical_hash_hex;
use crate::error::{Error, Result};
use crate::filter::FilterReport;
use crate::graph::GraphSnapshot;
use crate::io::write_file;
use crate::score::UntangleScore;
use crate::types::{RemovalCounts, RemovalLog};
use crate::untangle::UntangleOutcome;
use crate::UNTANGLE_SCHEMA_VERSION;

/// File names of the run artifacts, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Filtered `.geese` atoms.
    pub filtered_atoms: String,
    /// Untangled GFA.
    pub gfa: String,
    /// Detailed removal log.
    pub removal_details: String,
    /// Removed segment names.
    pub removal_names: String,
    /// Visualization payload.
    pub payload: String,
    /// This manifest.
    pub manifest: String,
}

impl ArtifactPaths {
    /// Artifact names sharing a common prefix.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            filtered_atoms: format!("{prefix}.filtered.geese"),
            gfa: format!("{prefix}.untangled.gfa"),
            removal_details: format!("{prefix}.removed.tsv"),
            removal_names: format!("{prefix}.removed.txt"),
            payload: format!("{prefix}.payload.json"),
            manifest: format!("{prefix}.manifest.json"),
        }
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::with_prefix("untangle")
    }
}

/// Summary statistics for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Atoms read.
    pub atoms_before: usize,
    /// Atoms surviving the filter.
    pub atoms_after: usize,
    /// Untangling iterations run.
    pub iterations: usize,
    /// Whether untangling stopped because nothing was flagged.
    pub converged: bool,
    /// Bridging mode used.
    pub bridge: String,
    /// Removed segments per reason.
    pub removals: RemovalCounts,
    /// Hash of the removed names in removal order.
    pub removal_log_hash: String,
}

/// The complete run manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Identifier derived from every component hash.
    pub run_id: String,
    /// Schema version.
    pub version: String,
    /// Filter policy hash, absent when filtering was skipped.
    pub filter_params_hash: Option<String>,
    /// Untangle policy hash.
    pub untangle_params_hash: String,
    /// Graph as built from the filtered atoms.
    pub graph_before: GraphSnapshot,
    /// Graph after untangling.
    pub graph_after: GraphSnapshot,
    /// Filter statistics, absent when filtering was skipped.
    pub filter: Option<FilterReport>,
    /// Score, absent when untangling emptied the graph.
    pub score: Option<UntangleScore>,
    /// Summary statistics.
    pub stats: RunStats,
    /// Artifact file names.
    pub artifact_paths: ArtifactPaths,
    /// Unix timestamp when built.
    pub computed_at: i64,
}

impl RunManifest {
    /// Write as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_file(path, |w| {
            serde_json::to_writer_pretty(&mut *w, self)?;
            writeln!(w)
        })?;
        info!(path = %path.display(), run_id = %self.run_id, "Wrote run manifest");
        Ok(())
    }

    /// Read a manifest back.
    pub fn read(path: &Path) -> Result<Self> {
        let reader = crate::io::open_reader(path)?;
        serde_json::from_reader(reader).map_err(|e| Error::malformed(path, e.line(), e.to_string()))
    }
}

/// Hash of the removed names, in removal order.
pub fn removal_log_hash(log: &RemovalLog) -> String {
    canonical_hash_hex(&log.names())
}

/// Builder for run manifests.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    filter_params_hash: Option<String>,
    filter: Option<FilterReport>,
    untangle_params_hash: Option<String>,
    graph_before: Option<GraphSnapshot>,
    outcome: Option<(GraphSnapshot, RunStatsInput)>,
    score: Option<UntangleScore>,
    atoms: Option<(usize, usize)>,
    artifact_paths: ArtifactPaths,
}

#[derive(Debug)]
struct RunStatsInput {
    iterations: usize,
    converged: bool,
    bridge: String,
    removals: RemovalCounts,
    removal_log_hash: String,
}

impl ManifestBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom artifact paths.
    pub fn with_paths(mut self, paths: ArtifactPaths) -> Self {
        self.artifact_paths = paths;
        self
    }

    /// Record the filter policy hash and its report.
    pub fn filter(mut self, params_hash: String, report: FilterReport) -> Self {
        self.filter_params_hash = Some(params_hash);
        self.filter = Some(report);
        self
    }

    /// Record the untangle policy hash.
    pub fn untangle_params_hash(mut self, params_hash: String) -> Self {
        self.untangle_params_hash = Some(params_hash);
        self
    }

    /// Record atom counts before and after filtering.
    pub fn atom_counts(mut self, before: usize, after: usize) -> Self {
        self.atoms = Some((before, after));
        self
    }

    /// Record the graph as built.
    pub fn graph_before(mut self, snapshot: GraphSnapshot) -> Self {
        self.graph_before = Some(snapshot);
        self
    }

    /// Record the untangling outcome.
    pub fn outcome(mut self, outcome: &UntangleOutcome) -> Self {
        let stats = RunStatsInput {
            iterations: outcome.iterations,
            converged: outcome.converged,
            bridge: outcome.bridge.as_str().to_string(),
            removals: outcome.log.counts(),
            removal_log_hash: removal_log_hash(&outcome.log),
        };
        self.outcome = Some((GraphSnapshot::compute(&outcome.graph), stats));
        self
    }

    /// Record the score.
    pub fn score(mut self, score: UntangleScore) -> Self {
        self.score = Some(score);
        self
    }

    /// Build the manifest.
    ///
    /// The untangle hash, both graph snapshots and the atom counts are required.
    pub fn build(self) -> Result<RunManifest> {
        let missing = |what: &str| Error::Parameter(format!("run manifest is missing {what}"));
        let untangle_params_hash = self.untangle_params_hash.ok_or_else(|| missing("the untangle policy"))?;
        let graph_before = self.graph_before.ok_or_else(|| missing("the initial graph"))?;
        let (graph_after, stats) = self.outcome.ok_or_else(|| missing("the untangling outcome"))?;
        let (atoms_before, atoms_after) = self.atoms.ok_or_else(|| missing("atom counts"))?;

        let id_input = RunIdInput {
            version: UNTANGLE_SCHEMA_VERSION,
            filter_params_hash: self.filter_params_hash.as_deref(),
            untangle_params_hash: &untangle_params_hash,
            graph_before: &graph_before.snapshot_id,
            graph_after: &graph_after.snapshot_id,
            removal_log_hash: &stats.removal_log_hash,
        };
        let run_id = canonical_hash_hex(&id_input);

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        Ok(RunManifest {
            run_id,
            version: UNTANGLE_SCHEMA_VERSION.to_string(),
            filter_params_hash: self.filter_params_hash,
            untangle_params_hash,
            graph_before,
            graph_after,
            filter: self.filter,
            score: self.score,
            stats: RunStats {
                atoms_before,
                atoms_after,
                iterations: stats.iterations,
                converged: stats.converged,
                bridge: stats.bridge,
                removals: stats.removals,
                removal_log_hash: stats.removal_log_hash,
            },
            artifact_paths: self.artifact_paths,
            computed_at: now,
        })
    }
}

/// Internal struct for computing run_id.
#[derive(Serialize)]
struct RunIdInput<'a> {
    version: &'a str,
    filter_params_hash: Option<&'a str>,
    untangle_params_hash: &'a str,
    graph_before: &'a str,
    graph_after: &'a str,
    removal_log_hash: &'a str,
}
