//! Atom filter.
//!
//! Pruning runs in two layers, both driven by [`run_to_fixpoint`]:
//!
//! 1. **Global pass**: removes atoms by depth, length, multi-copy and
//!    duplicate-sequence rules until a pass removes nothing or the
//!    iteration budget is spent.
//! 2. **Context passes**: resolves bubbles by keeping each candidate atom
//!    only in its best-supported context, drops atoms whose every context
//!    is private to too few genomes, then re-runs the global pass because
//!    occurrence removal lowers depth.
//!
//! The input collection is never modified; filtering returns a new one.

pub mod context;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fixpoint::{run_to_fixpoint, FixpointOutcome};
use crate::policy::FilterPolicy;
use crate::types::{AtomCollection, AtomId};

pub use context::{AtomContexts, ContextEvidence, ContextIndex};

/// Global rule that removed an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalRule {
    /// Too few occurrences.
    Depth,
    /// Too short.
    Length,
    /// More than one copy within a genome.
    Multicopy,
    /// Same sequence as a retained atom with a lower id.
    Duplicate,
}

impl GlobalRule {
    /// Name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depth => "depth",
            Self::Length => "length",
            Self::Multicopy => "multicopy",
            Self::Duplicate => "duplicate",
        }
    }
}

/// An atom dropped by the filter and the rule that dropped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedAtom {
    /// Atom id.
    pub atom: AtomId,
    /// `depth`, `length`, `multicopy`, `duplicate`, `private` or `bubble`.
    pub reason: String,
}

/// One context pass worth of removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextFlag {
    /// Occurrence (by input record) outside its atom's best bubble context.
    Occurrence(usize),
    /// Atom with no context shared by enough genomes.
    Atom(AtomId),
}

/// What the filter removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterReport {
    /// Atoms in the input.
    pub atoms_before: usize,
    /// Atoms in the output.
    pub atoms_after: usize,
    /// Occurrences in the input.
    pub occurrences_before: usize,
    /// Occurrences in the output.
    pub occurrences_after: usize,
    /// Atoms removed per global rule.
    pub removed_by_rule: BTreeMap<String, usize>,
    /// Occurrences removed by bubble resolution.
    pub bubble_occurrences_removed: usize,
    /// Atoms removed for having only genome-private contexts.
    pub private_atoms_removed: usize,
    /// Removed atoms in removal order.
    #[serde(default)]
    pub removed_atoms: Vec<RemovedAtom>,
    /// Initial global fixed-point run.
    pub global: FixpointOutcome,
    /// Context fixed-point run.
    pub context: FixpointOutcome,
}

impl FilterReport {
    fn record(&mut self, atom: AtomId, reason: &str) {
        self.removed_atoms.push(RemovedAtom {
            atom,
            reason: reason.to_string(),
        });
    }

    fn count_rule(&mut self, atom: AtomId, rule: GlobalRule) {
        *self.removed_by_rule.entry(rule.as_str().to_string()).or_insert(0) += 1;
        self.record(atom, rule.as_str());
    }

    /// Atoms removed by any rule.
    pub fn atoms_removed(&self) -> usize {
        self.atoms_before - self.atoms_after
    }
}

/// Result of a filter run.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Filtered collection.
    pub atoms: AtomCollection,
    /// Removal statistics.
    pub report: FilterReport,
}

/// Atom filter.
#[derive(Debug, Clone)]
pub struct AtomFilter {
    policy: FilterPolicy,
}

impl AtomFilter {
    /// Create a filter, validating the policy.
    pub fn new(policy: FilterPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// The policy in use.
    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    /// Filter `atoms` into a new collection.
    pub fn filter(&self, atoms: &AtomCollection) -> Result<FilterOutcome> {
        let mut state = atoms.clone();
        let mut report = FilterReport {
            atoms_before: atoms.len(),
            occurrences_before: atoms.num_occurrences(),
            ..FilterReport::default()
        };

        info!(
            atoms = atoms.len(),
            occurrences = atoms.num_occurrences(),
            min_depth = self.policy.min_depth,
            min_length = self.policy.min_length,
            "Filtering atoms"
        );

        report.global = self.run_global(&mut state, &mut report)?;

        let context_policy = self.policy.context;
        let context = run_to_fixpoint(
            &mut state,
            context_policy.passes,
            |s: &AtomCollection, _| Ok(self.context_flags(s)),
            |s: &mut AtomCollection, flags: Vec<ContextFlag>, pass| {
                self.apply_context_flags(s, flags, pass, &mut report);
                self.run_global(s, &mut report)?;
                Ok::<_, Error>(())
            },
        )?;
        report.context = context;

        report.atoms_after = state.len();
        report.occurrences_after = state.num_occurrences();

        if state.is_empty() && !atoms.is_empty() {
            warn!("Filtering removed every atom");
        }
        info!(
            atoms = state.len(),
            removed = report.atoms_removed(),
            occurrences = state.num_occurrences(),
            "Atom filtering complete"
        );

        Ok(FilterOutcome { atoms: state, report })
    }

    /// Atoms the global rules would remove from `atoms`, in id order.
    pub fn global_flags(&self, atoms: &AtomCollection) -> Vec<(AtomId, GlobalRule)> {
        let mut retained_sequences: BTreeSet<&[u8]> = BTreeSet::new();
        let mut flags = Vec::new();

        for atom in atoms.atoms() {
            let rule = if atom.depth() < self.policy.min_depth {
                Some(GlobalRule::Depth)
            } else if atom.length < self.policy.min_length {
                Some(GlobalRule::Length)
            } else if self.policy.remove_multicopy && atom.is_duplicated() {
                Some(GlobalRule::Multicopy)
            } else {
                match atom.sequence.as_deref().filter(|s| !s.is_empty()) {
                    Some(seq) if self.policy.remove_duplicates && !retained_sequences.insert(seq) => {
                        Some(GlobalRule::Duplicate)
                    }
                    _ => None,
                }
            };

            if let Some(rule) = rule {
                flags.push((atom.id.clone(), rule));
            }
        }
        flags
    }

    fn run_global(&self, state: &mut AtomCollection, report: &mut FilterReport) -> Result<FixpointOutcome> {
        run_to_fixpoint(
            state,
            self.policy.max_iterations,
            |s: &AtomCollection, _| Ok(self.global_flags(s)),
            |s: &mut AtomCollection, flags: Vec<(AtomId, GlobalRule)>, iteration| {
                info!(iteration, removed = flags.len(), "Globally removing atoms");
                for (id, rule) in flags {
                    debug!(atom = %id, ?rule, "Removing atom");
                    s.remove(&id);
                    report.count_rule(id, rule);
                }
                Ok(())
            },
        )
    }

    /// Context removals for one pass, computed from the current state.
    pub fn context_flags(&self, atoms: &AtomCollection) -> Vec<ContextFlag> {
        let context = self.policy.context;
        let index = ContextIndex::build(atoms);
        let mut flags = Vec::new();

        if let Some(bubbles) = &context.bubbles {
            let lengths: BTreeMap<AtomId, u64> = atoms.atoms().map(|a| (a.id.clone(), a.length)).collect();
            let candidates = index.bubble_interiors(bubbles, &lengths);
            for id in &candidates {
                let Some(contexts) = index.atom(id) else { continue };
                let Some((best, _)) = contexts.best() else { continue };
                for (ctx, evidence) in contexts.iter() {
                    if ctx != best {
                        flags.extend(evidence.records.iter().map(|r| ContextFlag::Occurrence(*r)));
                    }
                }
            }
            debug!(candidates = candidates.len(), "Resolved bubble candidates");
        }

        flags.extend(
            index
                .private_atoms(context.min_shared_genomes)
                .into_iter()
                .map(ContextFlag::Atom),
        );
        flags
    }

    fn apply_context_flags(
        &self,
        state: &mut AtomCollection,
        flags: Vec<ContextFlag>,
        pass: usize,
        report: &mut FilterReport,
    ) {
        let mut records = BTreeSet::new();
        let mut private = BTreeSet::new();
        for flag in flags {
            match flag {
                ContextFlag::Occurrence(record) => {
                    records.insert(record);
                }
                ContextFlag::Atom(id) => {
                    private.insert(id);
                }
            }
        }

        let ids_before: Vec<AtomId> = state.ids().cloned().collect();
        let mut bubble_removed = 0;
        state.retain_occurrences(|id, occ| {
            if private.contains(id) {
                false
            } else if records.contains(&occ.record) {
                bubble_removed += 1;
                false
            } else {
                true
            }
        });

        let mut dropped = 0;
        for id in ids_before {
            if !state.contains(&id) {
                let reason = if private.contains(&id) { "private" } else { "bubble" };
                report.record(id, reason);
                dropped += 1;
            }
        }
        report.bubble_occurrences_removed += bubble_removed;
        report.private_atoms_removed += private.len();
        info!(
            pass,
            bubble_occurrences = bubble_removed,
            private_atoms = private.len(),
            atoms_dropped = dropped,
            "Context cleaning pass"
        );
    }
}
