//! Structural contexts of atom occurrences.
//!
//! The context of an occurrence is the pair of atoms around it in its
//! genome walk, read in the direction of its strand. Context cleaning
//! compares how many genomes share each context of an atom.

use std::collections::{BTreeMap, BTreeSet};

use crate::policy::BubblePolicy;
use crate::types::{step_context, AtomCollection, AtomId, Context, Strand, WalkStep};

/// Contexts of one atom: context -> genomes exhibiting it, plus the
/// occurrence records seen in that context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomContexts {
    contexts: BTreeMap<Context, ContextEvidence>,
}

/// Genomes and occurrence records of one context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextEvidence {
    /// Genomes exhibiting the context.
    pub genomes: BTreeSet<String>,
    /// Input records of the occurrences in this context.
    pub records: Vec<usize>,
}

impl AtomContexts {
    /// The context shared by the most genomes. Ties go to the first context in order.
    pub fn best(&self) -> Option<(&Context, &ContextEvidence)> {
        let mut best: Option<(&Context, &ContextEvidence)> = None;
        for (ctx, ev) in &self.contexts {
            if best.map_or(true, |(_, b)| ev.genomes.len() > b.genomes.len()) {
                best = Some((ctx, ev));
            }
        }
        best
    }

    /// Whether some context is exhibited by at least `min_genomes` genomes.
    pub fn has_shared(&self, min_genomes: usize) -> bool {
        self.contexts.values().any(|ev| ev.genomes.len() >= min_genomes)
    }

    /// All contexts in order.
    pub fn iter(&self) -> impl Iterator<Item = (&Context, &ContextEvidence)> {
        self.contexts.iter()
    }

    /// Number of distinct contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no context was recorded.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

type Branches<'a> = BTreeMap<&'a AtomId, BTreeSet<&'a AtomId>>;

/// Context index over every atom of a collection.
#[derive(Debug, Clone, Default)]
pub struct ContextIndex {
    walks: BTreeMap<String, Vec<WalkStep>>,
    by_atom: BTreeMap<AtomId, AtomContexts>,
}

impl ContextIndex {
    /// Index the genome walks of `atoms`.
    pub fn build(atoms: &AtomCollection) -> Self {
        let walks = atoms.genome_walks();
        let mut by_atom: BTreeMap<AtomId, AtomContexts> = BTreeMap::new();

        for (genome, walk) in &walks {
            for (idx, step) in walk.iter().enumerate() {
                let evidence = by_atom
                    .entry(step.atom.clone())
                    .or_default()
                    .contexts
                    .entry(step_context(walk, idx))
                    .or_default();
                evidence.genomes.insert(genome.clone());
                evidence.records.push(step.record);
            }
        }

        Self { walks, by_atom }
    }

    /// Contexts of one atom.
    pub fn atom(&self, id: &AtomId) -> Option<&AtomContexts> {
        self.by_atom.get(id)
    }

    /// All atoms with their contexts.
    pub fn atoms(&self) -> impl Iterator<Item = (&AtomId, &AtomContexts)> {
        self.by_atom.iter()
    }

    /// Genome walks the index was built from.
    pub fn walks(&self) -> &BTreeMap<String, Vec<WalkStep>> {
        &self.walks
    }

    /// Atoms whose contexts are all private to fewer than `min_genomes` genomes.
    pub fn private_atoms(&self, min_genomes: usize) -> Vec<AtomId> {
        self.by_atom
            .iter()
            .filter(|(_, ctx)| !ctx.has_shared(min_genomes))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Distinct predecessors and successors of every atom, strand-aware.
    fn branching(&self) -> (Branches<'_>, Branches<'_>) {
        let mut incoming: BTreeMap<&AtomId, BTreeSet<&AtomId>> = BTreeMap::new();
        let mut outgoing: BTreeMap<&AtomId, BTreeSet<&AtomId>> = BTreeMap::new();

        for walk in self.walks.values() {
            for (idx, step) in walk.iter().enumerate() {
                let prev = idx.checked_sub(1).map(|i| &walk[i].atom);
                let next = walk.get(idx + 1).map(|s| &s.atom);
                let (before, after) = match step.strand {
                    Strand::Forward => (prev, next),
                    Strand::Reverse => (next, prev),
                };
                if let Some(b) = before {
                    incoming.entry(&step.atom).or_default().insert(b);
                }
                if let Some(a) = after {
                    outgoing.entry(&step.atom).or_default().insert(a);
                }
            }
        }
        (incoming, outgoing)
    }

    /// Atoms lying strictly inside a bubble on some genome walk.
    ///
    /// `lengths` gives the bp length of each atom; the span of a bubble is
    /// the summed length from source to sink, both included.
    pub fn bubble_interiors(
        &self,
        policy: &BubblePolicy,
        lengths: &BTreeMap<AtomId, u64>,
    ) -> BTreeSet<AtomId> {
        let (incoming, outgoing) = self.branching();

        let mut interior = BTreeSet::new();
        for walk in self.walks.values() {
            let mut prefix = Vec::with_capacity(walk.len() + 1);
            prefix.push(0u64);
            for step in walk {
                let last = prefix[prefix.len() - 1];
                prefix.push(last + lengths.get(&step.atom).copied().unwrap_or(0));
            }

            for (i, source) in walk.iter().enumerate() {
                if fan(&outgoing, &source.atom) < policy.min_source_branches {
                    continue;
                }
                for j in i + 1..walk.len() {
                    if prefix[j + 1] - prefix[i] > policy.max_span {
                        break;
                    }
                    if fan(&incoming, &walk[j].atom) < policy.min_sink_branches {
                        continue;
                    }
                    interior.extend(walk[i + 1..j].iter().map(|s| s.atom.clone()));
                }
            }
        }
        interior
    }
}

fn fan(map: &BTreeMap<&AtomId, BTreeSet<&AtomId>>, id: &AtomId) -> usize {
    map.get(id).map_or(0, BTreeSet::len)
}
