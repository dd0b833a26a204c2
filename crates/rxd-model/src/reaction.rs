//! Reaction definitions and their lookup tables.
//!
//! Reactions are plain data: a rate plus a [`ReactionKind`] carrying educt
//! and product types and the geometry parameters. Execution lives in the
//! scheduler crate and dispatches on the kind.

use std::collections::HashMap;

use crate::error::{ModelError, Result};
use crate::types::ParticleTypeId;

/// What a reaction does to its educts.
///
/// The two-educt kinds carry the educt distance within which the pair is
/// eligible; weights split product placement between the educt positions
/// and must sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub enum ReactionKind {
    /// A → B, product at the educt position.
    Conversion {
        from: ParticleTypeId,
        to: ParticleTypeId,
    },
    /// A → ∅.
    Decay { from: ParticleTypeId },
    /// A → B + C, products `product_distance` apart along a random
    /// orientation through the educt position.
    Fission {
        from: ParticleTypeId,
        to: (ParticleTypeId, ParticleTypeId),
        product_distance: f64,
        weight1: f64,
        weight2: f64,
    },
    /// A + B → C, product on the segment between the educts.
    Fusion {
        from: (ParticleTypeId, ParticleTypeId),
        to: ParticleTypeId,
        educt_distance: f64,
        weight1: f64,
        weight2: f64,
    },
    /// A + C → B + C, the non-catalyst educt converts in place.
    Enzymatic {
        from: ParticleTypeId,
        to: ParticleTypeId,
        catalyst: ParticleTypeId,
        educt_distance: f64,
    },
}

impl ReactionKind {
    /// Number of educts consumed by one firing.
    pub fn order(&self) -> usize {
        match self {
            ReactionKind::Conversion { .. }
            | ReactionKind::Decay { .. }
            | ReactionKind::Fission { .. } => 1,
            ReactionKind::Fusion { .. } | ReactionKind::Enzymatic { .. } => 2,
        }
    }

    /// Distance within which an educt pair is eligible; zero for order-1
    /// kinds.
    pub fn educt_distance(&self) -> f64 {
        match self {
            ReactionKind::Fusion { educt_distance, .. }
            | ReactionKind::Enzymatic { educt_distance, .. } => *educt_distance,
            _ => 0.0,
        }
    }

    /// Educt types: the single educt for order-1 kinds, both for order-2.
    pub fn educt_types(&self) -> (ParticleTypeId, Option<ParticleTypeId>) {
        match self {
            ReactionKind::Conversion { from, .. }
            | ReactionKind::Decay { from }
            | ReactionKind::Fission { from, .. } => (*from, None),
            ReactionKind::Fusion { from, .. } => (from.0, Some(from.1)),
            ReactionKind::Enzymatic { from, catalyst, .. } => (*from, Some(*catalyst)),
        }
    }
}

/// A named, rated reaction.
#[derive(Debug, Clone)]
pub struct Reaction {
    pub name: String,
    pub rate: f64,
    pub kind: ReactionKind,
}

impl Reaction {
    pub fn new(name: &str, rate: f64, kind: ReactionKind) -> Self {
        Self {
            name: name.to_string(),
            rate,
            kind,
        }
    }
}

fn pair_key(a: ParticleTypeId, b: ParticleTypeId) -> (ParticleTypeId, ParticleTypeId) {
    if a <= b { (a, b) } else { (b, a) }
}

fn check_weights(name: &str, w1: f64, w2: f64) -> Result<()> {
    let in_range = (0.0..=1.0).contains(&w1) && (0.0..=1.0).contains(&w2);
    if !in_range || (w1 + w2 - 1.0).abs() > 1e-9 {
        return Err(ModelError::InvalidWeights(name.to_string(), w1, w2));
    }
    Ok(())
}

/// Order-1 reactions keyed by educt type, order-2 by unordered type pair.
#[derive(Debug, Clone, Default)]
pub struct ReactionRegistry {
    order1: HashMap<ParticleTypeId, Vec<Reaction>>,
    order2: HashMap<(ParticleTypeId, ParticleTypeId), Vec<Reaction>>,
    n_order1: usize,
    n_order2: usize,
}

impl ReactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and files a reaction under its educt type or type pair.
    pub fn add(&mut self, reaction: Reaction) -> Result<()> {
        if reaction.rate < 0.0 {
            return Err(ModelError::NegativeRate(reaction.name.clone(), reaction.rate));
        }
        match &reaction.kind {
            ReactionKind::Fission {
                product_distance,
                weight1,
                weight2,
                ..
            } => {
                if *product_distance < 0.0 {
                    return Err(ModelError::NegativeDistance(
                        reaction.name.clone(),
                        *product_distance,
                    ));
                }
                check_weights(&reaction.name, *weight1, *weight2)?;
            }
            ReactionKind::Fusion {
                educt_distance,
                weight1,
                weight2,
                ..
            } => {
                if *educt_distance < 0.0 {
                    return Err(ModelError::NegativeDistance(
                        reaction.name.clone(),
                        *educt_distance,
                    ));
                }
                check_weights(&reaction.name, *weight1, *weight2)?;
            }
            ReactionKind::Enzymatic { educt_distance, .. } => {
                if *educt_distance < 0.0 {
                    return Err(ModelError::NegativeDistance(
                        reaction.name.clone(),
                        *educt_distance,
                    ));
                }
            }
            _ => {}
        }

        let (t1, t2) = reaction.kind.educt_types();
        match t2 {
            None => {
                self.order1.entry(t1).or_default().push(reaction);
                self.n_order1 += 1;
            }
            Some(t2) => {
                self.order2.entry(pair_key(t1, t2)).or_default().push(reaction);
                self.n_order2 += 1;
            }
        }
        Ok(())
    }

    /// Order-1 reactions whose educt is `t`.
    pub fn order1_by_type(&self, t: ParticleTypeId) -> &[Reaction] {
        self.order1.get(&t).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Order-2 reactions applicable to the unordered pair `(a, b)`.
    pub fn order2_by_types(&self, a: ParticleTypeId, b: ParticleTypeId) -> &[Reaction] {
        self.order2
            .get(&pair_key(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn n_order1(&self) -> usize {
        self.n_order1
    }

    pub fn n_order2(&self) -> usize {
        self.n_order2
    }

    pub fn is_empty(&self) -> bool {
        self.n_order1 == 0 && self.n_order2 == 0
    }

    /// Largest educt distance over all order-2 reactions. Governs the halo
    /// margin of the parallel scheduler and feeds the global cutoff.
    pub fn max_educt_distance(&self) -> f64 {
        self.order2
            .values()
            .flatten()
            .map(|r| r.kind.educt_distance())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_files_by_type_and_pair() {
        let mut reg = ReactionRegistry::new();
        reg.add(Reaction::new(
            "decay",
            1.0,
            ReactionKind::Decay { from: 0 },
        ))
        .unwrap();
        reg.add(Reaction::new(
            "fusion",
            2.0,
            ReactionKind::Fusion {
                from: (0, 1),
                to: 2,
                educt_distance: 1.5,
                weight1: 0.5,
                weight2: 0.5,
            },
        ))
        .unwrap();

        assert_eq!(reg.n_order1(), 1);
        assert_eq!(reg.n_order2(), 1);
        assert_eq!(reg.order1_by_type(0).len(), 1);
        assert!(reg.order1_by_type(1).is_empty());
        // pair lookup is unordered
        assert_eq!(reg.order2_by_types(1, 0).len(), 1);
        assert_eq!(reg.order2_by_types(0, 1).len(), 1);
    }

    #[test]
    fn max_educt_distance_over_order2() {
        let mut reg = ReactionRegistry::new();
        assert_eq!(reg.max_educt_distance(), 0.0);
        reg.add(Reaction::new(
            "fusion",
            1.0,
            ReactionKind::Fusion {
                from: (0, 0),
                to: 1,
                educt_distance: 0.7,
                weight1: 0.5,
                weight2: 0.5,
            },
        ))
        .unwrap();
        reg.add(Reaction::new(
            "enzymatic",
            1.0,
            ReactionKind::Enzymatic {
                from: 0,
                to: 1,
                catalyst: 2,
                educt_distance: 2.5,
            },
        ))
        .unwrap();
        assert_eq!(reg.max_educt_distance(), 2.5);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut reg = ReactionRegistry::new();
        assert!(matches!(
            reg.add(Reaction::new("bad", -1.0, ReactionKind::Decay { from: 0 })),
            Err(ModelError::NegativeRate(_, _))
        ));
        assert!(matches!(
            reg.add(Reaction::new(
                "bad-weights",
                1.0,
                ReactionKind::Fusion {
                    from: (0, 1),
                    to: 2,
                    educt_distance: 1.0,
                    weight1: 0.8,
                    weight2: 0.8,
                },
            )),
            Err(ModelError::InvalidWeights(_, _, _))
        ));
    }

    #[test]
    fn zero_rate_reactions_are_accepted() {
        let mut reg = ReactionRegistry::new();
        reg.add(Reaction::new(
            "never-fires",
            0.0,
            ReactionKind::Fusion {
                from: (0, 1),
                to: 2,
                educt_distance: 1.0,
                weight1: 0.5,
                weight2: 0.5,
            },
        ))
        .unwrap();
        assert_eq!(reg.n_order2(), 1);
    }
}
