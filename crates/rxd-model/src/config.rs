//! Run configuration and the resolved [`System`].
//!
//! The configuration is name-based and serializable; `build()` resolves
//! names through the registries and fails on anything inconsistent.

use serde::{Deserialize, Serialize};

use rxd_math::Vec3;

use crate::context::Context;
use crate::error::Result;
use crate::potential::{HarmonicRepulsion, PotentialRegistry};
use crate::reaction::{Reaction, ReactionKind, ReactionRegistry};
use crate::types::ParticleTypeRegistry;

/// How the reaction scheduler keeps its event pool consistent after a
/// firing consumed educts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventPoolPolicy {
    /// Drop every event referencing consumed particles right away.
    EagerFilter,
    /// Leave stale events in the pool and reject them when drawn.
    #[default]
    LazyReject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeConfig {
    pub name: String,
    pub diffusion_constant: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_radius() -> f64 {
    1.0
}

fn default_weight() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReactionConfig {
    Conversion {
        name: String,
        rate: f64,
        from: String,
        to: String,
    },
    Decay {
        name: String,
        rate: f64,
        from: String,
    },
    Fission {
        name: String,
        rate: f64,
        from: String,
        to1: String,
        to2: String,
        product_distance: f64,
        #[serde(default = "default_weight")]
        weight1: f64,
        #[serde(default = "default_weight")]
        weight2: f64,
    },
    Fusion {
        name: String,
        rate: f64,
        from1: String,
        from2: String,
        to: String,
        educt_distance: f64,
        #[serde(default = "default_weight")]
        weight1: f64,
        #[serde(default = "default_weight")]
        weight2: f64,
    },
    Enzymatic {
        name: String,
        rate: f64,
        from: String,
        to: String,
        catalyst: String,
        educt_distance: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialConfig {
    pub types: (String, String),
    pub force_constant: f64,
}

/// Serializable description of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub box_size: [f64; 3],
    pub periodic: [bool; 3],
    pub dt: f64,
    pub kbt: f64,
    pub seed: u64,
    /// Worker threads; 0 selects the available parallelism.
    pub n_workers: usize,
    #[serde(default)]
    pub policy: EventPoolPolicy,
    #[serde(default)]
    pub types: Vec<TypeConfig>,
    #[serde(default)]
    pub reactions: Vec<ReactionConfig>,
    #[serde(default)]
    pub potentials: Vec<PotentialConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            box_size: [10.0, 10.0, 10.0],
            periodic: [true, true, true],
            dt: 1e-2,
            kbt: 1.0,
            seed: 42,
            n_workers: 0,
            policy: EventPoolPolicy::default(),
            types: Vec::new(),
            reactions: Vec::new(),
            potentials: Vec::new(),
        }
    }
}

impl Config {
    /// Resolves every name and assembles the registries.
    pub fn build(&self) -> Result<System> {
        let mut types = ParticleTypeRegistry::new();
        for t in &self.types {
            types.register(&t.name, t.diffusion_constant, t.radius)?;
        }

        let mut reactions = ReactionRegistry::new();
        for r in &self.reactions {
            let (name, rate, kind) = match r {
                ReactionConfig::Conversion { name, rate, from, to } => (
                    name,
                    *rate,
                    ReactionKind::Conversion {
                        from: types.id_of(from)?,
                        to: types.id_of(to)?,
                    },
                ),
                ReactionConfig::Decay { name, rate, from } => (
                    name,
                    *rate,
                    ReactionKind::Decay {
                        from: types.id_of(from)?,
                    },
                ),
                ReactionConfig::Fission {
                    name,
                    rate,
                    from,
                    to1,
                    to2,
                    product_distance,
                    weight1,
                    weight2,
                } => (
                    name,
                    *rate,
                    ReactionKind::Fission {
                        from: types.id_of(from)?,
                        to: (types.id_of(to1)?, types.id_of(to2)?),
                        product_distance: *product_distance,
                        weight1: *weight1,
                        weight2: *weight2,
                    },
                ),
                ReactionConfig::Fusion {
                    name,
                    rate,
                    from1,
                    from2,
                    to,
                    educt_distance,
                    weight1,
                    weight2,
                } => (
                    name,
                    *rate,
                    ReactionKind::Fusion {
                        from: (types.id_of(from1)?, types.id_of(from2)?),
                        to: types.id_of(to)?,
                        educt_distance: *educt_distance,
                        weight1: *weight1,
                        weight2: *weight2,
                    },
                ),
                ReactionConfig::Enzymatic {
                    name,
                    rate,
                    from,
                    to,
                    catalyst,
                    educt_distance,
                } => (
                    name,
                    *rate,
                    ReactionKind::Enzymatic {
                        from: types.id_of(from)?,
                        to: types.id_of(to)?,
                        catalyst: types.id_of(catalyst)?,
                        educt_distance: *educt_distance,
                    },
                ),
            };
            reactions.add(Reaction::new(name, rate, kind))?;
        }

        let mut potentials = PotentialRegistry::new();
        for p in &self.potentials {
            let a = types.id_of(&p.types.0)?;
            let b = types.id_of(&p.types.1)?;
            potentials.add(HarmonicRepulsion {
                types: (a, b),
                force_constant: p.force_constant,
                interaction_distance: types.radius(a) + types.radius(b),
            });
        }

        let mut context = Context::new(
            Vec3::new(self.box_size[0], self.box_size[1], self.box_size[2]),
            self.periodic,
        );
        context.dt = self.dt;
        context.kbt = self.kbt;

        Ok(System {
            context,
            types,
            reactions,
            potentials,
            seed: self.seed,
            n_workers: self.n_workers,
            policy: self.policy,
        })
    }
}

/// Resolved registries and geometry, the immutable half of a simulation.
#[derive(Debug, Clone)]
pub struct System {
    pub context: Context,
    pub types: ParticleTypeRegistry,
    pub reactions: ReactionRegistry,
    pub potentials: PotentialRegistry,
    pub seed: u64,
    pub n_workers: usize,
    pub policy: EventPoolPolicy,
}

impl System {
    /// Global neighbor-list cutoff: the largest potential cutoff or educt
    /// distance. Zero means no pairwise interaction exists at all.
    pub fn max_cutoff(&self) -> f64 {
        self.potentials
            .max_cutoff()
            .max(self.reactions.max_educt_distance())
    }

    /// Resolved worker count; configuration value 0 maps to the machine's
    /// available parallelism.
    pub fn worker_count(&self) -> usize {
        if self.n_workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.n_workers
        }
    }
}
