//! rxd: particle-based reaction-diffusion engine.
//!
//! This is the umbrella crate that provides the `Simulation` driver and
//! re-exports core types from sub-crates.

pub use rxd_kernel::{self, CellGrid, NeighborList, ParticleId, ParticleStore};
pub use rxd_math::{self, Vec3};
pub use rxd_model::{
    self, Config, Context, EventPoolPolicy, PotentialConfig, ReactionConfig, System, TypeConfig,
};
pub use rxd_react::{self, ParallelGillespie, ReactionOutcome, ReactionScheduler, SerialGillespie};

use rand::prelude::*;
use rand_distr::StandardNormal;
use rayon::prelude::*;

use rxd_model::ParticleTypeId;
use rxd_react::apply_outcome;

/// Main simulation driver.
///
/// Owns the resolved system, the particle store, the neighbor list, and the
/// reaction scheduler. One [`step`](Simulation::step) advances the
/// configuration by `dt`: Euler-Maruyama diffusion, neighbor-list refresh,
/// force accumulation, then a reaction pass whose outcome is applied to the
/// store.
pub struct Simulation {
    system: System,
    store: ParticleStore,
    list: NeighborList,
    scheduler: Box<dyn ReactionScheduler>,
    rng: StdRng,
}

impl Simulation {
    /// Builds a simulation from `config`, choosing the sliced scheduler when
    /// more than one worker is configured.
    pub fn new(config: &Config) -> rxd_model::Result<Self> {
        let system = config.build()?;
        let workers = system.worker_count();
        let scheduler: Box<dyn ReactionScheduler> = if workers > 1 {
            Box::new(ParallelGillespie::new(
                scheduler_seed(&system),
                system.policy,
                workers,
            ))
        } else {
            Box::new(SerialGillespie::new(scheduler_seed(&system), system.policy))
        };
        Ok(Self::assemble(system, scheduler))
    }

    /// Builds a simulation that always runs the whole-box scheduler.
    pub fn serial(config: &Config) -> rxd_model::Result<Self> {
        let system = config.build()?;
        let scheduler = Box::new(SerialGillespie::new(scheduler_seed(&system), system.policy));
        Ok(Self::assemble(system, scheduler))
    }

    /// Builds a simulation with a custom scheduler.
    pub fn with_scheduler(
        config: &Config,
        scheduler: Box<dyn ReactionScheduler>,
    ) -> rxd_model::Result<Self> {
        Ok(Self::assemble(config.build()?, scheduler))
    }

    fn assemble(system: System, scheduler: Box<dyn ReactionScheduler>) -> Self {
        let list = NeighborList::new(&system.context, system.max_cutoff(), system.worker_count());
        let rng = StdRng::seed_from_u64(system.seed);
        Self {
            system,
            store: ParticleStore::new(),
            list,
            scheduler,
            rng,
        }
    }

    /// Inserts a particle by species name. The returned slot index stays
    /// valid until the next compacting step.
    pub fn add_particle(&mut self, type_name: &str, position: Vec3) -> rxd_model::Result<usize> {
        let type_id = self.system.types.id_of(type_name)?;
        Ok(self.store.add_particle(type_id, position))
    }

    /// Inserts a particle by resolved species id.
    pub fn add_particle_by_id(&mut self, type_id: ParticleTypeId, position: Vec3) -> usize {
        self.store.add_particle(type_id, position)
    }

    /// Advances the configuration by one time step.
    pub fn step(&mut self) -> rxd_kernel::Result<()> {
        self.diffuse();
        self.list.fill(&self.store);
        self.accumulate_forces();
        let outcome = self.scheduler.pass(&self.system, &self.store, &self.list);
        if !outcome.is_empty() {
            apply_outcome(&mut self.store, &outcome)?;
        }
        Ok(())
    }

    /// Runs `n` steps.
    pub fn simulate(&mut self, n: usize) -> rxd_kernel::Result<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    /// Overdamped Langevin update with the forces accumulated last step.
    /// Freshly inserted particles carry zero force and move by noise alone.
    fn diffuse(&mut self) {
        let dt = self.system.context.dt;
        let kbt = self.system.context.kbt;
        let n = self.store.deactivated_index();
        let mut displacements = Vec::with_capacity(n);
        for i in 0..n {
            let diffusion = self.system.types.diffusion_constant(self.store.type_id(i));
            let drift = (diffusion * dt / kbt) * self.store.forces()[i];
            let sigma = (2.0 * diffusion * dt).sqrt();
            displacements.push(drift + noise(&mut self.rng, sigma));
        }
        for (i, delta) in displacements.into_iter().enumerate() {
            let mut position = self.store.position(i) + delta;
            self.system.context.fix_position(&mut position);
            self.store.positions_mut()[i] = position;
        }
    }

    /// Zeroes and re-accumulates pair forces over the current neighbor list,
    /// each particle summing its own side of every pair.
    fn accumulate_forces(&mut self) {
        self.store.zero_forces();
        if self.system.potentials.is_empty() {
            return;
        }
        let system = &self.system;
        let store = &self.store;
        let list = &self.list;
        let accumulated: Vec<Vec3> = (0..store.deactivated_index())
            .into_par_iter()
            .map(|i| {
                let position = store.position(i);
                let type_id = store.type_id(i);
                let mut force = Vec3::zeros();
                for &(j, d2) in list.neighbors(i, &position) {
                    let diff = system
                        .context
                        .shortest_difference(&position, &store.position(j));
                    for potential in system.potentials.by_types(type_id, store.type_id(j)) {
                        force += potential.force(&diff, d2);
                    }
                }
                force
            })
            .collect();
        for (slot, force) in self.store.forces_mut().iter_mut().zip(accumulated) {
            *slot += force;
        }
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    /// Number of live particles.
    pub fn n_particles(&self) -> usize {
        self.store.size()
    }

    /// Number of live particles of the named species.
    pub fn count_of(&self, type_name: &str) -> rxd_model::Result<usize> {
        let type_id = self.system.types.id_of(type_name)?;
        Ok(self
            .store
            .type_ids()
            .iter()
            .filter(|&&t| t == type_id)
            .count())
    }

    /// Positions of all live particles of the named species, in slot order.
    pub fn positions_of(&self, type_name: &str) -> rxd_model::Result<Vec<Vec3>> {
        let type_id = self.system.types.id_of(type_name)?;
        Ok(self
            .store
            .type_ids()
            .iter()
            .zip(self.store.positions())
            .filter(|(&t, _)| t == type_id)
            .map(|(_, &p)| p)
            .collect())
    }
}

/// The integrator draws from `seed`; scheduler streams begin at `seed + 1`.
fn scheduler_seed(system: &System) -> u64 {
    system.seed.wrapping_add(1)
}

fn noise(rng: &mut StdRng, sigma: f64) -> Vec3 {
    Vec3::new(
        sigma * <StandardNormal as Distribution<f64>>::sample(&StandardNormal, rng),
        sigma * <StandardNormal as Distribution<f64>>::sample(&StandardNormal, rng),
        sigma * <StandardNormal as Distribution<f64>>::sample(&StandardNormal, rng),
    )
}
