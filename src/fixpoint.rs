//! Bounded fixed-point iteration.
//!
//! The atom filter and the untangler share one termination contract:
//! evaluate the current state, flag elements, apply the removals, and
//! repeat until a pass flags nothing or the iteration budget runs out.
//!
//! ```text
//! for iteration in 1..=max_iterations:
//!     flags = evaluate(state, iteration)
//!     if flags is empty: converged, stop
//!     apply(state, flags, iteration)
//! ```

use serde::{Deserialize, Serialize};

/// Summary of a fixed-point run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixpointOutcome {
    /// Number of evaluate calls made.
    pub iterations: usize,
    /// Number of passes that applied at least one flag.
    pub applied: usize,
    /// Total number of flags applied.
    pub flagged: usize,
    /// Whether the run ended on a pass that flagged nothing.
    pub converged: bool,
}

/// Run `evaluate`/`apply` passes over `state` until a pass flags nothing or
/// `max_iterations` passes have run.
///
/// Iteration numbers passed to the callbacks are 1-based. A budget of zero
/// leaves the state untouched and reports a non-converged run.
pub fn run_to_fixpoint<S, F, E, Ev, Ap>(
    state: &mut S,
    max_iterations: usize,
    mut evaluate: Ev,
    mut apply: Ap,
) -> Result<FixpointOutcome, E>
where
    Ev: FnMut(&S, usize) -> Result<Vec<F>, E>,
    Ap: FnMut(&mut S, Vec<F>, usize) -> Result<(), E>,
{
    let mut outcome = FixpointOutcome::default();

    for iteration in 1..=max_iterations {
        outcome.iterations = iteration;
        let flags = evaluate(state, iteration)?;
        if flags.is_empty() {
            outcome.converged = true;
            break;
        }
        outcome.applied += 1;
        outcome.flagged += flags.len();
        apply(state, flags, iteration)?;
    }

    Ok(outcome)
}
