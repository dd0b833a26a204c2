//! Domain-decomposed Gillespie scheduling.
//!
//! The box is cut along its longest axis into one slice per worker. A
//! particle within the halo margin of an internal slice boundary, or
//! transitively neighboring one within the halo radius, is *problematic*:
//! it is withheld from the slice passes and handled by a single serial
//! boundary pass after they join. The halo equals the largest registered
//! educt distance, so any reactable pair with a problematic member has both
//! members problematic; slice passes therefore only ever see pairs fully
//! inside their own slice, and the boundary pass sees every remaining pair
//! exactly once.

use std::collections::{HashSet, VecDeque};

use rand::prelude::*;
use rayon::prelude::*;

use rxd_kernel::{NeighborList, ParticleStore};
use rxd_model::{EventPoolPolicy, System};

use crate::event::{gather_events, ReactionOutcome};
use crate::gillespie::run_pass;
use crate::ReactionScheduler;

/// Geometry of the decomposition along one axis.
#[derive(Debug, Clone, Copy)]
struct Slicing {
    axis: usize,
    lower: f64,
    width: f64,
    periodic: bool,
    n_slices: usize,
    halo: f64,
}

impl Slicing {
    fn new(system: &System, n_slices: usize, halo: f64) -> Self {
        let box_size = system.context.box_size;
        let mut axis = 0;
        for d in 1..3 {
            if box_size[d] > box_size[axis] {
                axis = d;
            }
        }
        Self {
            axis,
            lower: -0.5 * box_size[axis],
            width: box_size[axis] / n_slices as f64,
            periodic: system.context.periodic[axis],
            n_slices,
            halo,
        }
    }

    fn slice_of(&self, coordinate: f64) -> usize {
        let raw = ((coordinate - self.lower) / self.width).floor();
        (raw.max(0.0) as usize).min(self.n_slices - 1)
    }

    /// Whether `coordinate` lies within the halo of an internal boundary.
    /// On a periodic axis the wrap seam between the last and first slice is
    /// internal as well.
    fn near_boundary(&self, coordinate: f64) -> bool {
        let slice = self.slice_of(coordinate);
        let local = coordinate - self.lower - slice as f64 * self.width;
        let near_lower = local < self.halo;
        let near_upper = self.width - local < self.halo;
        (near_lower && (slice > 0 || self.periodic))
            || (near_upper && (slice + 1 < self.n_slices || self.periodic))
    }
}

/// Sliced scheduler: parallel passes over safe particles, then one serial
/// pass over the problematic set. Statistically equivalent to
/// [`crate::SerialGillespie`], and bit-identical to it for systems confined
/// to the first slice's safe interior.
#[derive(Debug)]
pub struct ParallelGillespie {
    n_slices: usize,
    policy: EventPoolPolicy,
    slice_rngs: Vec<StdRng>,
    boundary_rng: StdRng,
}

impl ParallelGillespie {
    pub fn new(seed: u64, policy: EventPoolPolicy, n_workers: usize) -> Self {
        let n_slices = n_workers.max(1);
        Self {
            n_slices,
            policy,
            slice_rngs: (0..n_slices)
                .map(|k| StdRng::seed_from_u64(seed + k as u64))
                .collect(),
            boundary_rng: StdRng::seed_from_u64(seed + n_slices as u64),
        }
    }

    fn serial_sweep(
        &mut self,
        system: &System,
        store: &ParticleStore,
        list: &NeighborList,
    ) -> ReactionOutcome {
        let live: Vec<usize> = (0..store.deactivated_index())
            .filter(|&i| !store.is_deactivated(i))
            .collect();
        let events = gather_events(system, store, list, &live);
        run_pass(system, store, events, self.policy, &mut self.slice_rngs[0])
    }
}

impl ReactionScheduler for ParallelGillespie {
    fn pass(
        &mut self,
        system: &System,
        store: &ParticleStore,
        list: &NeighborList,
    ) -> ReactionOutcome {
        let halo = system.reactions.max_educt_distance();
        if halo <= 0.0 || self.n_slices < 2 {
            // nothing to decompose; a single sweep is already exact
            return self.serial_sweep(system, store, list);
        }
        let slicing = Slicing::new(system, self.n_slices, halo);

        let live: Vec<usize> = (0..store.deactivated_index())
            .filter(|&i| !store.is_deactivated(i))
            .collect();

        // seed the problematic set with halo residents, then close it over
        // neighbor edges within the halo radius
        let mut problematic: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<usize> = VecDeque::new();
        for &i in &live {
            if slicing.near_boundary(store.position(i)[slicing.axis]) {
                problematic.insert(i);
                queue.push_back(i);
            }
        }
        let halo_sq = halo * halo;
        while let Some(i) = queue.pop_front() {
            for &(j, d2) in list.neighbors(i, &store.position(i)) {
                if d2 < halo_sq && !store.is_deactivated(j) && problematic.insert(j) {
                    queue.push_back(j);
                }
            }
        }

        let mut slices: Vec<Vec<usize>> = vec![Vec::new(); self.n_slices];
        for &i in &live {
            if problematic.contains(&i) {
                continue;
            }
            slices[slicing.slice_of(store.position(i)[slicing.axis])].push(i);
        }

        let policy = self.policy;
        let results: Vec<ReactionOutcome> = slices
            .par_iter()
            .zip(self.slice_rngs.par_iter_mut())
            .map(|(subset, rng)| {
                let events = gather_events(system, store, list, subset);
                run_pass(system, store, events, policy, rng)
            })
            .collect();

        let mut boundary: Vec<usize> = problematic.into_iter().collect();
        boundary.sort_unstable();
        let boundary_events = gather_events(system, store, list, &boundary);
        let boundary_outcome = run_pass(
            system,
            store,
            boundary_events,
            policy,
            &mut self.boundary_rng,
        );

        let mut merged = ReactionOutcome::default();
        for outcome in results {
            merged.merge(outcome);
        }
        merged.merge(boundary_outcome);
        log::trace!(
            "parallel reaction pass: {} slices, {} boundary particles, {} deactivated, {} products",
            self.n_slices,
            boundary.len(),
            merged.deactivate.len(),
            merged.products.len()
        );
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rxd_math::Vec3;
    use rxd_model::{Config, ReactionConfig, TypeConfig};

    use crate::gillespie::SerialGillespie;

    fn fusion_system(box_size: [f64; 3], periodic: [bool; 3]) -> System {
        Config {
            box_size,
            periodic,
            dt: 100.0,
            types: vec![TypeConfig {
                name: "A".into(),
                diffusion_constant: 1.0,
                radius: 0.5,
            }],
            reactions: vec![ReactionConfig::Fusion {
                name: "merge".into(),
                rate: 10.0,
                from1: "A".into(),
                from2: "A".into(),
                to: "A".into(),
                educt_distance: 1.0,
                weight1: 0.5,
                weight2: 0.5,
            }],
            ..Config::default()
        }
        .build()
        .unwrap()
    }

    fn filled_list(system: &System, store: &ParticleStore, n_workers: usize) -> NeighborList {
        let mut list = NeighborList::new(&system.context, system.max_cutoff(), n_workers);
        list.fill(store);
        list
    }

    #[test]
    fn slicing_splits_the_longest_axis() {
        let system = fusion_system([10.0, 10.0, 30.0], [true, true, false]);
        let slicing = Slicing::new(&system, 2, 1.0);
        assert_eq!(slicing.axis, 2);
        assert_relative_eq!(slicing.width, 15.0);
        assert_eq!(slicing.slice_of(-0.1), 0);
        assert_eq!(slicing.slice_of(0.1), 1);
        assert_eq!(slicing.slice_of(-15.0), 0);
        assert_eq!(slicing.slice_of(14.9), 1);
    }

    #[test]
    fn halo_classification_is_boundary_local() {
        let system = fusion_system([10.0, 10.0, 30.0], [true, true, false]);
        let slicing = Slicing::new(&system, 2, 1.0);
        // the only internal boundary sits at z = 0
        assert!(slicing.near_boundary(0.0));
        assert!(slicing.near_boundary(-0.7));
        assert!(slicing.near_boundary(0.7));
        assert!(!slicing.near_boundary(-1.6));
        assert!(!slicing.near_boundary(1.6));
        // the axis is not periodic, so the outer walls are not boundaries
        assert!(!slicing.near_boundary(-14.9));
        assert!(!slicing.near_boundary(14.9));
    }

    #[test]
    fn periodic_axis_makes_the_seam_internal() {
        let system = fusion_system([10.0, 10.0, 30.0], [true, true, true]);
        let slicing = Slicing::new(&system, 2, 1.0);
        assert!(slicing.near_boundary(-14.9));
        assert!(slicing.near_boundary(14.9));
        assert!(!slicing.near_boundary(-13.0));
    }

    #[test]
    fn midline_pair_resolves_exactly_once() {
        let system = fusion_system([10.0, 10.0, 30.0], [true, true, false]);
        let a = system.types.id_of("A").unwrap();
        let mut store = ParticleStore::new();
        store.add_particle(a, Vec3::new(0.0, 0.0, -0.2));
        store.add_particle(a, Vec3::new(0.0, 0.0, 0.2));
        let list = filled_list(&system, &store, 2);

        let mut scheduler = ParallelGillespie::new(42, EventPoolPolicy::LazyReject, 2);
        let outcome = scheduler.pass(&system, &store, &list);

        let mut deactivated = outcome.deactivate.clone();
        deactivated.sort_unstable();
        assert_eq!(deactivated, vec![0, 1]);
        assert_eq!(outcome.products.len(), 1);
        assert_relative_eq!(outcome.products[0].position.z, 0.0);
    }

    #[test]
    fn single_worker_matches_the_serial_scheduler() {
        let system = fusion_system([10.0, 10.0, 30.0], [true, true, false]);
        let a = system.types.id_of("A").unwrap();
        let mut store = ParticleStore::new();
        for z in [-12.0, -11.5, -4.0, 3.0, 3.4, 10.0] {
            store.add_particle(a, Vec3::new(0.0, 0.0, z));
        }
        let list = filled_list(&system, &store, 1);

        let mut serial = SerialGillespie::new(7, EventPoolPolicy::LazyReject);
        let mut parallel = ParallelGillespie::new(7, EventPoolPolicy::LazyReject, 1);
        assert_eq!(
            serial.pass(&system, &store, &list),
            parallel.pass(&system, &store, &list)
        );
    }

    #[test]
    fn system_confined_to_one_slice_matches_the_serial_scheduler() {
        let system = fusion_system([10.0, 10.0, 30.0], [true, true, false]);
        let a = system.types.id_of("A").unwrap();
        let mut store = ParticleStore::new();
        // everything sits in slice 0, more than one halo away from z = 0
        for z in [-12.0, -11.7, -9.0, -8.6, -5.0] {
            store.add_particle(a, Vec3::new(0.0, 0.0, z));
        }
        let list = filled_list(&system, &store, 2);

        let mut serial = SerialGillespie::new(123, EventPoolPolicy::LazyReject);
        let mut parallel = ParallelGillespie::new(123, EventPoolPolicy::LazyReject, 2);
        for _ in 0..3 {
            assert_eq!(
                serial.pass(&system, &store, &list),
                parallel.pass(&system, &store, &list)
            );
        }
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        let system = fusion_system([10.0, 10.0, 30.0], [true, true, false]);
        let a = system.types.id_of("A").unwrap();
        let mut store = ParticleStore::new();
        for z in [-12.0, -11.6, -0.3, 0.3, 6.0, 6.4] {
            store.add_particle(a, Vec3::new(0.0, 0.0, z));
        }
        let list = filled_list(&system, &store, 2);

        let mut first = ParallelGillespie::new(99, EventPoolPolicy::EagerFilter, 2);
        let mut second = ParallelGillespie::new(99, EventPoolPolicy::EagerFilter, 2);
        assert_eq!(
            first.pass(&system, &store, &list),
            second.pass(&system, &store, &list)
        );
    }
}
