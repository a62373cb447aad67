//! Atom types for the untangle kernel.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of an atom class.
///
/// Segments in the assembly graph carry the same identifier as the atom
/// they were derived from. Ordering puts numeric identifiers first (in
/// numeric order) followed by all other identifiers in lexicographic order,
/// so "2" sorts before "10".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomId(String);

impl AtomId {
    /// Create a new AtomId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for AtomId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for AtomId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AtomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AtomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Strand of an atom occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strand {
    /// Forward strand.
    Forward,
    /// Reverse strand.
    Reverse,
}

impl Strand {
    /// Parse strand from its one-character form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "+" => Some(Self::Forward),
            "-" => Some(Self::Reverse),
            _ => None,
        }
    }

    /// The opposite strand.
    pub fn flip(&self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }

    /// One-character symbol.
    pub fn symbol(&self) -> char {
        match self {
            Self::Forward => '+',
            Self::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One placement of an atom in one genome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Genome (sequence) name.
    pub genome: String,
    /// Position of the atom along the genome walk.
    pub atom_nr: u64,
    /// Strand of the placement.
    pub strand: Strand,
    /// Start coordinate (0-based, inclusive).
    pub start: u64,
    /// End coordinate (exclusive).
    pub end: u64,
    /// Columns after the sixth, kept verbatim.
    pub extra: Vec<String>,
    /// Index of the source record, used to keep the input line order on output.
    pub record: usize,
}

impl Occurrence {
    /// Length covered by this occurrence.
    pub fn span(&self) -> u64 {
        self.end - self.start
    }
}

/// An aligned block shared by a subset of genomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    /// Atom class identifier.
    pub id: AtomId,
    /// Length taken from the first recorded occurrence.
    pub length: u64,
    /// Sequence of the first occurrence, when the companion FASTA provides it.
    pub sequence: Option<Vec<u8>>,
    /// Occurrences, sorted by input record.
    pub occurrences: Vec<Occurrence>,
}

impl Atom {
    /// Number of occurrences. Always derived from the occurrence list.
    pub fn depth(&self) -> usize {
        self.occurrences.len()
    }

    /// Whether any genome contains this atom more than once.
    pub fn is_duplicated(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.occurrences.iter().any(|o| !seen.insert(o.genome.as_str()))
    }

    /// Distinct genomes containing this atom.
    pub fn genomes(&self) -> BTreeSet<&str> {
        self.occurrences.iter().map(|o| o.genome.as_str()).collect()
    }

    /// Number of distinct genomes containing this atom.
    pub fn usage(&self) -> usize {
        self.genomes().len()
    }
}

/// One step of a genome walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkStep {
    /// Atom visited.
    pub atom: AtomId,
    /// Strand of the visit.
    pub strand: Strand,
    /// Input record of the occurrence behind this step.
    pub record: usize,
}

/// Structural context of an occurrence: the neighbouring atoms, oriented by strand.
pub type Context = (Option<AtomId>, Option<AtomId>);

/// A collection of atoms as read from a `.geese` file.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomCollection {
    atoms: BTreeMap<AtomId, Atom>,
    /// Header and comment lines, written back unchanged.
    header: Vec<String>,
}

impl AtomCollection {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection with header lines.
    pub fn with_header(header: Vec<String>) -> Self {
        Self {
            atoms: BTreeMap::new(),
            header,
        }
    }

    /// Insert an atom, replacing any atom with the same id.
    pub fn insert(&mut self, atom: Atom) {
        self.atoms.insert(atom.id.clone(), atom);
    }

    /// Remove an atom.
    pub fn remove(&mut self, id: &AtomId) -> Option<Atom> {
        self.atoms.remove(id)
    }

    /// Get an atom by id.
    pub fn get(&self, id: &AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Whether the collection contains the atom.
    pub fn contains(&self, id: &AtomId) -> bool {
        self.atoms.contains_key(id)
    }

    /// Iterate atoms in id order.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.values()
    }

    /// Iterate atom ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &AtomId> {
        self.atoms.keys()
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Total number of occurrences across all atoms.
    pub fn num_occurrences(&self) -> usize {
        self.atoms.values().map(Atom::depth).sum()
    }

    /// Header lines.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Drop occurrences rejected by `keep`. Atoms left without occurrences
    /// are removed. Returns the number of occurrences dropped.
    pub fn retain_occurrences<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&AtomId, &Occurrence) -> bool,
    {
        let mut dropped = 0;
        for atom in self.atoms.values_mut() {
            let before = atom.occurrences.len();
            let id = atom.id.clone();
            atom.occurrences.retain(|o| keep(&id, o));
            dropped += before - atom.occurrences.len();
        }
        self.atoms.retain(|_, atom| !atom.occurrences.is_empty());
        dropped
    }

    /// Walk of every genome: atoms ordered by `atom_nr`, ties by input record.
    pub fn genome_walks(&self) -> BTreeMap<String, Vec<WalkStep>> {
        let mut placed: BTreeMap<String, Vec<(u64, usize, WalkStep)>> = BTreeMap::new();
        for atom in self.atoms.values() {
            for occ in &atom.occurrences {
                placed.entry(occ.genome.clone()).or_default().push((
                    occ.atom_nr,
                    occ.record,
                    WalkStep {
                        atom: atom.id.clone(),
                        strand: occ.strand,
                        record: occ.record,
                    },
                ));
            }
        }

        placed
            .into_iter()
            .map(|(genome, mut steps)| {
                steps.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
                (genome, steps.into_iter().map(|(_, _, step)| step).collect())
            })
            .collect()
    }

    /// All occurrences in input record order.
    pub fn occurrences_in_record_order(&self) -> Vec<(&AtomId, &Occurrence)> {
        let mut all: Vec<_> = self
            .atoms
            .values()
            .flat_map(|a| a.occurrences.iter().map(move |o| (&a.id, o)))
            .collect();
        all.sort_by_key(|(_, o)| o.record);
        all
    }

    /// Whether `other` only contains atoms and occurrences also present here.
    pub fn is_superset_of(&self, other: &AtomCollection) -> bool {
        other.atoms().all(|atom| {
            self.get(&atom.id).map_or(false, |mine| {
                atom.occurrences
                    .iter()
                    .all(|o| mine.occurrences.iter().any(|m| m.record == o.record))
            })
        })
    }
}

/// Oriented context of step `idx` within `walk`.
pub fn step_context(walk: &[WalkStep], idx: usize) -> Context {
    let prev = idx.checked_sub(1).map(|i| walk[i].atom.clone());
    let next = walk.get(idx + 1).map(|s| s.atom.clone());
    match walk[idx].strand {
        Strand::Forward => (prev, next),
        Strand::Reverse => (next, prev),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build an occurrence with coordinates derived from its position.
    pub fn occ(genome: &str, atom_nr: u64, strand: Strand, record: usize) -> Occurrence {
        Occurrence {
            genome: genome.to_string(),
            atom_nr,
            strand,
            start: atom_nr * 100,
            end: atom_nr * 100 + 100,
            extra: Vec::new(),
            record,
        }
    }

    /// Build a collection from genome walks given as atom id lists (forward strand).
    pub fn collection_from_walks(walks: &[(&str, &[&str])]) -> AtomCollection {
        let mut atoms: BTreeMap<AtomId, Atom> = BTreeMap::new();
        let mut record = 0;
        for (genome, walk) in walks {
            for (nr, id) in walk.iter().enumerate() {
                let atom = atoms.entry(AtomId::from(*id)).or_insert_with(|| Atom {
                    id: AtomId::from(*id),
                    length: 100,
                    sequence: None,
                    occurrences: Vec::new(),
                });
                atom.occurrences.push(occ(genome, nr as u64 + 1, Strand::Forward, record));
                record += 1;
            }
        }
        let mut collection = AtomCollection::new();
        for atom in atoms.into_values() {
            collection.insert(atom);
        }
        collection
    }
}
