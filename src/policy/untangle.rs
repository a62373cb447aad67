//! Untangler parameters.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::error::{Error, Result};

use super::quantize_float;

/// Policy version identifier for the untangler.
pub const UNTANGLE_POLICY_VERSION: &str = "untangle_v1";

/// How connectivity is restored after segments are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgePolicy {
    /// Link surviving segments that some genome walk traverses consecutively
    /// once the removed segments are skipped.
    Evidence,
    /// Link every pair of surviving neighbours of each removed group.
    Structural,
    /// Remove without bridging.
    None,
}

impl BridgePolicy {
    /// Stable name used in logs and hashes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evidence => "evidence",
            Self::Structural => "structural",
            Self::None => "none",
        }
    }
}

/// Untangler policy.
///
/// ## Parameters
///
/// - `max_iterations`: evaluate/remove rounds before stopping
/// - `degree_threshold`: segments with at least this degree are flagged
/// - `centrality_threshold`: segments with at least this betweenness are flagged
/// - `force_removal`: remove the most central segment when nothing is flagged
/// - `bridge`: how to reconnect the graph around removed segments
/// - `parallel_threshold`: node count from which betweenness runs in parallel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UntanglePolicy {
    /// Policy version identifier.
    pub version: String,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Degree threshold.
    pub degree_threshold: usize,
    /// Betweenness centrality threshold.
    pub centrality_threshold: f64,
    /// Force the most central segment when nothing meets a threshold.
    pub force_removal: bool,
    /// Bridging mode.
    pub bridge: BridgePolicy,
    /// Parallel betweenness threshold.
    pub parallel_threshold: usize,
}

impl Default for UntanglePolicy {
    fn default() -> Self {
        Self {
            version: UNTANGLE_POLICY_VERSION.to_string(),
            max_iterations: 1,
            degree_threshold: 10,
            centrality_threshold: 0.05,
            force_removal: true,
            bridge: BridgePolicy::Evidence,
            parallel_threshold: 50,
        }
    }
}

#[derive(Serialize)]
struct QuantizedUntangleParams<'a> {
    version: &'a str,
    max_iterations: usize,
    degree_threshold: usize,
    centrality_threshold: i64,
    force_removal: bool,
    bridge: &'a str,
}

impl UntanglePolicy {
    /// Reject thresholds that can never or always match.
    pub fn validate(&self) -> Result<()> {
        if self.degree_threshold == 0 {
            return Err(Error::Parameter("degree threshold must be positive".into()));
        }
        if !self.centrality_threshold.is_finite() || self.centrality_threshold <= 0.0 {
            return Err(Error::Parameter(format!(
                "centrality threshold must be a positive number, got {}",
                self.centrality_threshold
            )));
        }
        Ok(())
    }

    /// Hash of the policy parameters.
    ///
    /// `parallel_threshold` only affects scheduling and is excluded.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&QuantizedUntangleParams {
            version: &self.version,
            max_iterations: self.max_iterations,
            degree_threshold: self.degree_threshold,
            centrality_threshold: quantize_float(self.centrality_threshold),
            force_removal: self.force_removal,
            bridge: self.bridge.as_str(),
        })
    }
}
