//! Graph snapshot identity.
//!
//! A `GraphSnapshot` fingerprints the segment set and the link set of an
//! assembly graph, so a run manifest can prove which graph a score or a
//! removal log was computed against.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, to_canonical_bytes};
use crate::UNTANGLE_SCHEMA_VERSION;

use super::AssemblyGraph;

/// A deterministic fingerprint of the graph state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// xxh64 over all components below except `computed_at`.
    pub snapshot_id: String,
    /// Number of segments.
    pub segment_count: u64,
    /// Number of distinct links.
    pub edge_count: u64,
    /// Schema version used for types.
    pub schema_version: String,
    /// Hash of the segment ids in id order.
    pub segment_id_hash: String,
    /// Hash of the sorted endpoint pairs.
    pub edge_pair_hash: String,
    /// Unix timestamp when this snapshot was computed.
    pub computed_at: i64,
}

impl GraphSnapshot {
    /// Fingerprint a graph.
    pub fn compute(graph: &AssemblyGraph) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        let segment_count = graph.num_segments() as u64;
        let edge_count = graph.num_edges() as u64;

        let segment_ids: Vec<&str> = graph.segment_ids().map(|id| id.as_str()).collect();
        let segment_id_hash = canonical_hash_hex(&segment_ids);

        // Links iterate in EdgeKey order, so the pairs are already sorted.
        let edge_pairs: Vec<(&str, &str)> = graph
            .links()
            .map(|l| {
                let key = l.key();
                (
                    if key.low() == &l.from { l.from.as_str() } else { l.to.as_str() },
                    if key.low() == &l.from { l.to.as_str() } else { l.from.as_str() },
                )
            })
            .collect();
        let edge_pair_hash = canonical_hash_hex(&edge_pairs);

        let id_input = SnapshotIdInput {
            segment_count,
            edge_count,
            schema_version: UNTANGLE_SCHEMA_VERSION,
            segment_id_hash: &segment_id_hash,
            edge_pair_hash: &edge_pair_hash,
        };
        let snapshot_id = canonical_hash_hex(&id_input);

        Self {
            snapshot_id,
            segment_count,
            edge_count,
            schema_version: UNTANGLE_SCHEMA_VERSION.to_string(),
            segment_id_hash,
            edge_pair_hash,
            computed_at: now,
        }
    }

    /// Serialize to canonical JSON bytes.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        to_canonical_bytes(self)
    }

    /// Whether this snapshot still describes `graph`.
    pub fn verify(&self, graph: &AssemblyGraph) -> bool {
        self.snapshot_id == Self::compute(graph).snapshot_id
    }
}

#[derive(Serialize)]
struct SnapshotIdInput<'a> {
    segment_count: u64,
    edge_count: u64,
    schema_version: &'a str,
    segment_id_hash: &'a str,
    edge_pair_hash: &'a str,
}
