//! Pairwise potentials and their interaction cutoffs.
//!
//! Only the soft-core repulsion is carried here; its cutoff (the contact
//! distance) is what the neighbor list needs from this module.

use std::collections::HashMap;

use rxd_math::Vec3;

use crate::types::ParticleTypeId;

/// Harmonic repulsion between overlapping particles.
///
/// Energy `k/2 (d - r0)²` for `d < r0`, zero beyond; `r0` is the sum of
/// the two species radii.
#[derive(Debug, Clone)]
pub struct HarmonicRepulsion {
    pub types: (ParticleTypeId, ParticleTypeId),
    pub force_constant: f64,
    /// Contact distance `r0`, also the interaction cutoff.
    pub interaction_distance: f64,
}

impl HarmonicRepulsion {
    /// Energy at squared separation `d2`.
    pub fn energy(&self, d2: f64) -> f64 {
        let d = d2.sqrt();
        if d < self.interaction_distance {
            let overlap = d - self.interaction_distance;
            0.5 * self.force_constant * overlap * overlap
        } else {
            0.0
        }
    }

    /// Force on the first particle; `diff` points from the first particle
    /// to the second.
    pub fn force(&self, diff: &Vec3, d2: f64) -> Vec3 {
        let d = d2.sqrt();
        if d > 0.0 && d < self.interaction_distance {
            (self.force_constant * (d - self.interaction_distance) / d) * diff
        } else {
            Vec3::zeros()
        }
    }
}

fn pair_key(a: ParticleTypeId, b: ParticleTypeId) -> (ParticleTypeId, ParticleTypeId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Potentials keyed by unordered type pair.
#[derive(Debug, Clone, Default)]
pub struct PotentialRegistry {
    pairs: HashMap<(ParticleTypeId, ParticleTypeId), Vec<HarmonicRepulsion>>,
}

impl PotentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, potential: HarmonicRepulsion) {
        let key = pair_key(potential.types.0, potential.types.1);
        self.pairs.entry(key).or_default().push(potential);
    }

    pub fn by_types(&self, a: ParticleTypeId, b: ParticleTypeId) -> &[HarmonicRepulsion] {
        self.pairs
            .get(&pair_key(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Largest interaction cutoff over all registered potentials.
    pub fn max_cutoff(&self) -> f64 {
        self.pairs
            .values()
            .flatten()
            .map(|p| p.interaction_distance)
            .fold(0.0, f64::max)
    }
}
