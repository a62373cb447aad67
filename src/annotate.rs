//! Chromosome / plasmid localisation of atoms.
//!
//! FASTA headers mark sequences with `chromosome=true` or `plasmid=true`.
//! An atom is localised by the markers of every genome it occurs in; the
//! result colours GFA segments and drives the shared-atom report.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::graph::AssemblyGraph;
use crate::io::SequenceCatalog;
use crate::types::{Atom, AtomCollection, AtomId, COLOR_TAG};

/// Secondary colour tag written next to [`COLOR_TAG`].
pub const SECONDARY_COLOR_TAG: &str = "C2:z:";

/// Where an atom was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Localization {
    /// Only on chromosome-marked sequences.
    Chromosome,
    /// Only on plasmid-marked sequences.
    Plasmid,
    /// On both.
    Both,
}

impl Localization {
    /// Localise an atom. `None` when no occurrence lies on a marked sequence.
    pub fn of(atom: &Atom, catalog: &SequenceCatalog) -> Option<Self> {
        let mut chromosome = false;
        let mut plasmid = false;
        for occ in &atom.occurrences {
            // A chromosome marker wins over a plasmid marker on the same header.
            if catalog.is_chromosome(&occ.genome) {
                chromosome = true;
            } else if catalog.is_plasmid(&occ.genome) {
                plasmid = true;
            }
        }
        match (chromosome, plasmid) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Chromosome),
            (false, true) => Some(Self::Plasmid),
            (false, false) => None,
        }
    }

    /// Display colour.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Both => "#aaaa00",
            Self::Chromosome => "#00aa00",
            Self::Plasmid => "#aa0000",
        }
    }

    /// GFA segment tags carrying the colour.
    pub fn color_tags(&self) -> Vec<String> {
        vec![
            format!("{COLOR_TAG}{}", self.color()),
            format!("{SECONDARY_COLOR_TAG}{}", self.color()),
        ]
    }
}

/// Atoms observed on both chromosome and plasmid sequences, in id order.
pub fn shared_atoms(atoms: &AtomCollection, catalog: &SequenceCatalog) -> Vec<AtomId> {
    let shared: Vec<AtomId> = atoms
        .atoms()
        .filter(|a| Localization::of(a, catalog) == Some(Localization::Both))
        .map(|a| a.id.clone())
        .collect();
    info!(shared = shared.len(), atoms = atoms.len(), "Located shared atoms");
    shared
}

/// Replace the colour tags of every segment backed by an atom.
///
/// Returns the number of coloured segments.
pub fn color_segments(
    graph: &mut AssemblyGraph,
    atoms: &AtomCollection,
    catalog: &SequenceCatalog,
) -> usize {
    let mut colored = 0;
    graph.update_segments(|segment| {
        segment
            .tags
            .retain(|t| !t.starts_with(COLOR_TAG) && !t.starts_with(SECONDARY_COLOR_TAG));
        if let Some(loc) = atoms.get(&segment.id).and_then(|a| Localization::of(a, catalog)) {
            segment.tags.extend(loc.color_tags());
            colored += 1;
        }
    });
    colored
}
