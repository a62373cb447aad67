//! # untangle-kernel
//!
//! Iterative atom filtering and assembly-graph untangling for pangenome graphs.
//!
//! The kernel answers one question:
//!
//! > Given atoms shared across genomes, which segments make the assembly
//! > graph **tangled**, and what is left once they are removed?
//!
//! ## Core Contract
//!
//! 1. Filter atoms by depth, length, copy number, duplicate sequence and
//!    genome context until nothing more is removed
//! 2. Build one segment per atom and link consecutive atoms of each genome
//! 3. Remove segments whose degree or betweenness centrality crosses a
//!    threshold, bridging their neighbours, for a bounded number of iterations
//! 4. Score the result: `(2E/N + 1) / sqrt(N / N_original)`, lower is better
//!
//! ## Architecture
//!
//! ```text
//! .geese + FASTA → AtomFilter → GraphBuilder → Untangler → Scorer
//!                       ↓                          ↓
//!                 FilterPolicy          UntanglePolicy + CentralityBackend
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same atoms + same policies → identical removal log and GFA
//! - Segments are ordered numerically where ids are numeric, else lexically
//! - Links are ordered by their unordered endpoint pair
//! - Policies and graphs are fingerprinted with canonical xxh64 hashes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod annotate;
pub mod canonical;
pub mod centrality;
pub mod error;
pub mod filter;
pub mod fixpoint;
pub mod graph;
pub mod io;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod score;
pub mod types;
pub mod untangle;

// Re-exports
pub use types::{
    Atom, AtomCollection, AtomId, EdgeKey, Link, Occurrence, Orientation, RemovalCounts, RemovalLog,
    RemovalReason, RemovalRecord, Segment, SegmentId, Strand,
};
pub use error::{Error, Result};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use fixpoint::{run_to_fixpoint, FixpointOutcome};
pub use graph::{AssemblyGraph, GraphBuilder, GraphSnapshot};
pub use centrality::{CentralityBackend, MetricsView, RustworkxBackend, SegmentMetrics, SortKey, VertexTable};
pub use policy::{BridgePolicy, BubblePolicy, ContextPolicy, FilterPolicy, UntanglePolicy};
pub use filter::{AtomFilter, FilterOutcome, FilterReport, RemovedAtom};
pub use untangle::{Flag, UntangleOutcome, Untangler};
pub use score::{GraphMetrics, HairballIndex, HairballWeights, UntangleScore};
pub use annotate::{color_segments, shared_atoms, Localization};
pub use report::{ArtifactPaths, ManifestBuilder, RunManifest};
pub use pipeline::{run, RunConfig, RunResult};

/// Schema version for snapshots and manifests.
/// Increment on breaking changes to any serialized type.
pub const UNTANGLE_SCHEMA_VERSION: &str = "untangle_v1";
