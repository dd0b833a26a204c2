//! Reaction events and outcome application.
//!
//! Events are gathered fresh for every scheduling pass and never outlive
//! it. An event stores slot indices into the particle store, which stay
//! valid for the duration of the pass because the store is not mutated
//! until the merged outcome is applied.

use rxd_kernel::{NeighborList, ParticleStore, Result};
use rxd_math::Vec3;
use rxd_model::{ParticleTypeId, System};

/// One candidate firing of a registered reaction.
#[derive(Debug, Clone, Copy)]
pub struct ReactionEvent {
    /// 1 or 2 educts.
    pub order: usize,
    pub idx1: usize,
    /// Second educt slot; equals `idx1` for order-1 events.
    pub idx2: usize,
    pub type1: ParticleTypeId,
    pub type2: ParticleTypeId,
    /// Position of the reaction in its registry bucket.
    pub reaction_index: usize,
    pub rate: f64,
}

impl ReactionEvent {
    pub fn involves(&self, index: usize) -> bool {
        self.idx1 == index || self.idx2 == index
    }
}

/// Particle synthesized by a fired reaction, inserted at outcome apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewParticle {
    pub type_id: ParticleTypeId,
    pub position: Vec3,
}

/// Net effect of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionOutcome {
    /// Educt slots to deactivate, valid until the store compacts.
    pub deactivate: Vec<usize>,
    pub products: Vec<NewParticle>,
}

impl ReactionOutcome {
    pub fn merge(&mut self, other: ReactionOutcome) {
        self.deactivate.extend(other.deactivate);
        self.products.extend(other.products);
    }

    pub fn is_empty(&self) -> bool {
        self.deactivate.is_empty() && self.products.is_empty()
    }
}

/// Collects the candidate events of a particle subset: order-1 reactions
/// per particle, order-2 reactions per neighbor pair within the reaction's
/// educt distance. Pairs are deduplicated with `idx1 < idx2`, so a pair is
/// gathered exactly once when both members are in the subset.
pub fn gather_events(
    system: &System,
    store: &ParticleStore,
    list: &NeighborList,
    subset: &[usize],
) -> Vec<ReactionEvent> {
    let mut events = Vec::new();
    for &i in subset {
        if store.is_deactivated(i) {
            continue;
        }
        let type1 = store.type_id(i);
        for (reaction_index, reaction) in system.reactions.order1_by_type(type1).iter().enumerate()
        {
            events.push(ReactionEvent {
                order: 1,
                idx1: i,
                idx2: i,
                type1,
                type2: type1,
                reaction_index,
                rate: reaction.rate,
            });
        }

        let pos = store.position(i);
        for &(j, d2) in list.neighbors(i, &pos) {
            if j < i || store.is_deactivated(j) {
                continue;
            }
            let type2 = store.type_id(j);
            for (reaction_index, reaction) in
                system.reactions.order2_by_types(type1, type2).iter().enumerate()
            {
                let educt_distance = reaction.kind.educt_distance();
                if d2 < educt_distance * educt_distance {
                    events.push(ReactionEvent {
                        order: 2,
                        idx1: i,
                        idx2: j,
                        type1,
                        type2,
                        reaction_index,
                        rate: reaction.rate,
                    });
                }
            }
        }
    }
    events
}

/// Applies a merged outcome to the store: marks educts, compacts, then
/// inserts all products as one batch. Returns the product slot indices.
pub fn apply_outcome(store: &mut ParticleStore, outcome: &ReactionOutcome) -> Result<Vec<usize>> {
    for &index in &outcome.deactivate {
        store.mark_for_deactivation(index);
    }
    store.deactivate_marked()?;
    Ok(store.add_particles(
        outcome
            .products
            .iter()
            .map(|product| (product.type_id, product.position)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rxd_model::{Config, PotentialConfig, ReactionConfig, TypeConfig};

    fn small_system() -> System {
        Config {
            box_size: [10.0, 10.0, 10.0],
            periodic: [false, false, false],
            types: vec![
                TypeConfig {
                    name: "A".into(),
                    diffusion_constant: 1.0,
                    radius: 0.7,
                },
                TypeConfig {
                    name: "B".into(),
                    diffusion_constant: 1.0,
                    radius: 0.7,
                },
            ],
            reactions: vec![
                ReactionConfig::Decay {
                    name: "decay".into(),
                    rate: 2.0,
                    from: "A".into(),
                },
                ReactionConfig::Conversion {
                    name: "flip".into(),
                    rate: 1.0,
                    from: "A".into(),
                    to: "B".into(),
                },
                ReactionConfig::Fusion {
                    name: "merge".into(),
                    rate: 3.0,
                    from1: "A".into(),
                    from2: "B".into(),
                    to: "B".into(),
                    educt_distance: 1.0,
                    weight1: 0.5,
                    weight2: 0.5,
                },
            ],
            potentials: vec![PotentialConfig {
                types: ("A".into(), "B".into()),
                force_constant: 5.0,
            }],
            ..Config::default()
        }
        .build()
        .unwrap()
    }

    fn filled_list(system: &System, store: &ParticleStore) -> NeighborList {
        let mut list = NeighborList::new(&system.context, system.max_cutoff(), 2);
        list.fill(store);
        list
    }

    #[test]
    fn order1_events_per_particle_and_reaction() {
        let system = small_system();
        let mut store = ParticleStore::new();
        let a = system.types.id_of("A").unwrap();
        store.add_particle(a, Vec3::new(0.0, 0.0, 0.0));
        store.add_particle(a, Vec3::new(3.0, 0.0, 0.0));
        let list = filled_list(&system, &store);

        let events = gather_events(&system, &store, &list, &[0, 1]);
        // two order-1 reactions per A particle, no pair in range
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.order == 1 && e.idx1 == e.idx2));
        // 2 particles x (decay 2.0 + conversion 1.0)
        let total_rate: f64 = events.iter().map(|e| e.rate).sum();
        assert_relative_eq!(total_rate, 6.0);
    }

    #[test]
    fn order2_events_respect_educt_distance() {
        let system = small_system();
        let mut store = ParticleStore::new();
        let a = system.types.id_of("A").unwrap();
        let b = system.types.id_of("B").unwrap();
        store.add_particle(a, Vec3::new(0.0, 0.0, 0.0));
        // inside the neighbor cutoff but outside the educt distance
        store.add_particle(b, Vec3::new(1.2, 0.0, 0.0));
        let list = filled_list(&system, &store);
        let events = gather_events(&system, &store, &list, &[0, 1]);
        assert!(events.iter().all(|e| e.order == 1));

        let mut store = ParticleStore::new();
        store.add_particle(a, Vec3::new(0.0, 0.0, 0.0));
        store.add_particle(b, Vec3::new(0.8, 0.0, 0.0));
        let list = filled_list(&system, &store);
        let events = gather_events(&system, &store, &list, &[0, 1]);
        let pairs: Vec<_> = events.iter().filter(|e| e.order == 2).collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].idx1, pairs[0].idx2), (0, 1));
        assert_relative_eq!(pairs[0].rate, 3.0);
    }

    #[test]
    fn deactivated_particles_are_skipped() {
        let system = small_system();
        let mut store = ParticleStore::new();
        let a = system.types.id_of("A").unwrap();
        let b = system.types.id_of("B").unwrap();
        store.add_particle(a, Vec3::new(0.0, 0.0, 0.0));
        store.add_particle(b, Vec3::new(0.5, 0.0, 0.0));
        let list = filled_list(&system, &store);

        let before = gather_events(&system, &store, &list, &[0, 1]);
        assert!(before.iter().any(|e| e.order == 2));

        store.mark_for_deactivation(1);
        let after = gather_events(&system, &store, &list, &[0, 1]);
        assert!(after.iter().all(|e| !e.involves(1)));
        assert!(after.iter().all(|e| e.order == 1));
    }

    #[test]
    fn apply_compacts_and_inserts_products() {
        let system = small_system();
        let mut store = ParticleStore::new();
        let a = system.types.id_of("A").unwrap();
        let b = system.types.id_of("B").unwrap();
        for i in 0..3 {
            store.add_particle(a, Vec3::new(i as f64, 0.0, 0.0));
        }
        let outcome = ReactionOutcome {
            deactivate: vec![1],
            products: vec![NewParticle {
                type_id: b,
                position: Vec3::new(4.0, 0.0, 0.0),
            }],
        };
        let inserted = apply_outcome(&mut store, &outcome).unwrap();
        assert_eq!(store.size(), 3);
        assert_eq!(inserted.len(), 1);
        assert_eq!(store.type_id(inserted[0]), b);
        assert_relative_eq!(store.position(inserted[0]).x, 4.0);
    }
}
