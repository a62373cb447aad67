//! Atom filter parameters.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::error::{Error, Result};

/// Policy version identifier for the atom filter.
pub const FILTER_POLICY_VERSION: &str = "filter_v1";

/// Bubble detection bounds for context cleaning.
///
/// A bubble opens at a source atom with at least `min_source_branches`
/// distinct successors and closes at a sink atom with at least
/// `min_sink_branches` distinct predecessors, no more than `max_span` bp
/// further along the same genome walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BubblePolicy {
    /// Minimum distinct successors of a bubble source.
    pub min_source_branches: usize,
    /// Minimum distinct predecessors of a bubble sink.
    pub min_sink_branches: usize,
    /// Maximum summed atom length from source to sink, inclusive.
    pub max_span: u64,
}

impl Default for BubblePolicy {
    fn default() -> Self {
        Self {
            min_source_branches: 2,
            min_sink_branches: 2,
            max_span: 70_000,
        }
    }
}

/// Context cleaning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPolicy {
    /// Maximum number of context passes. Zero disables context cleaning.
    pub passes: usize,
    /// A context is shared when at least this many genomes exhibit it.
    pub min_shared_genomes: usize,
    /// Bubble resolution; `None` skips it.
    pub bubbles: Option<BubblePolicy>,
}

impl ContextPolicy {
    /// No context cleaning.
    pub fn disabled() -> Self {
        Self {
            passes: 0,
            ..Self::default()
        }
    }
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            passes: 1,
            min_shared_genomes: 2,
            bubbles: Some(BubblePolicy::default()),
        }
    }
}

/// Atom filter policy.
///
/// ## Parameters
///
/// - `min_depth`: atoms with fewer occurrences are removed
/// - `min_length`: atoms shorter than this are removed
/// - `remove_duplicates`: drop atoms whose sequence equals a retained atom's
/// - `remove_multicopy`: drop atoms occurring more than once in a genome
/// - `max_iterations`: budget of the global fixed-point loop
/// - `context`: context cleaning passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPolicy {
    /// Policy version identifier.
    pub version: String,
    /// Minimum number of occurrences.
    pub min_depth: usize,
    /// Minimum atom length in bp.
    pub min_length: u64,
    /// Remove atoms with byte-identical sequence to a lower-id atom.
    pub remove_duplicates: bool,
    /// Remove atoms occurring more than once within one genome.
    pub remove_multicopy: bool,
    /// Budget of the global pass loop.
    pub max_iterations: usize,
    /// Context cleaning.
    pub context: ContextPolicy,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            version: FILTER_POLICY_VERSION.to_string(),
            min_depth: 10,
            min_length: 0,
            remove_duplicates: false,
            remove_multicopy: false,
            max_iterations: 1,
            context: ContextPolicy::default(),
        }
    }
}

impl FilterPolicy {
    /// A policy that removes nothing.
    pub fn identity() -> Self {
        Self {
            min_depth: 0,
            context: ContextPolicy::disabled(),
            ..Self::default()
        }
    }

    /// Whether the policy compares atom sequences, which are only known
    /// when a FASTA is supplied.
    pub fn requires_sequences(&self) -> bool {
        self.remove_duplicates
    }

    /// Reject parameters that cannot be applied.
    pub fn validate(&self) -> Result<()> {
        if self.context.passes > 0 && self.context.min_shared_genomes == 0 {
            return Err(Error::Parameter(
                "min_shared_genomes must be at least 1 when context cleaning is enabled".into(),
            ));
        }
        if let Some(bubbles) = &self.context.bubbles {
            if bubbles.max_span == 0 {
                return Err(Error::Parameter("bubble max_span must be positive".into()));
            }
        }
        Ok(())
    }

    /// Hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}
