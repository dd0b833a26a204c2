//! Stochastic reaction scheduling.
//!
//! A pass reads the current particle configuration and produces a
//! [`ReactionOutcome`], never mutating the store itself. Callers apply the
//! outcome afterwards with [`apply_outcome`], which compacts the store and
//! inserts the products in one step. [`SerialGillespie`] sweeps the whole
//! box; [`ParallelGillespie`] decomposes it into slices and reproduces the
//! serial statistics.

pub mod event;
pub mod gillespie;
pub mod parallel;

pub use event::{apply_outcome, gather_events, NewParticle, ReactionEvent, ReactionOutcome};
pub use gillespie::{run_pass, SerialGillespie};
pub use parallel::ParallelGillespie;

use rxd_kernel::{NeighborList, ParticleStore};
use rxd_model::System;

/// One reaction pass over the current configuration.
pub trait ReactionScheduler {
    fn pass(
        &mut self,
        system: &System,
        store: &ParticleStore,
        list: &NeighborList,
    ) -> ReactionOutcome;
}
