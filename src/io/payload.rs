//! Visualization payload for force-directed renderers.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::AssemblyGraph;
use crate::types::AtomCollection;

use super::write_file;

/// A payload node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VizNode {
    /// Segment id.
    pub id: String,
    /// Number of genomes containing the atom.
    #[serde(rename = "usageValue")]
    pub usage_value: usize,
    /// Colour from the `CL:z:` tag.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
}

/// A payload link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VizLink {
    /// Source segment id.
    pub source: String,
    /// Target segment id.
    pub target: String,
}

/// `{nodes, links}` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VizPayload {
    /// Nodes sorted by id.
    pub nodes: Vec<VizNode>,
    /// Links in canonical order.
    pub links: Vec<VizLink>,
}

impl VizPayload {
    /// Build the payload. Usage comes from `atoms` when given, else from the
    /// usage already stored on the segments.
    pub fn from_graph(graph: &AssemblyGraph, atoms: Option<&AtomCollection>) -> Self {
        let mut nodes: Vec<VizNode> = graph
            .segments()
            .map(|s| VizNode {
                id: s.id.to_string(),
                usage_value: match atoms {
                    Some(a) => a.get(&s.id).map_or(0, |atom| atom.usage()),
                    None => s.usage.unwrap_or(0),
                },
                color: s.color().map(str::to_string),
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let links = graph
            .links()
            .map(|l| VizLink {
                source: l.from.to_string(),
                target: l.to.to_string(),
            })
            .collect();

        Self { nodes, links }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self
            .to_json()
            .map_err(|e| Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e), path))?;
        write_file(path, |w| {
            use std::io::Write;
            w.write_all(json.as_bytes())?;
            writeln!(w)
        })?;
        info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            links = self.links.len(),
            "Wrote visualization payload"
        );
        Ok(())
    }
}
