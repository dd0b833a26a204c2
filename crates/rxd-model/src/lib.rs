//! Model types for the rxd reaction-diffusion engine.
//!
//! `Context` carries box geometry and integration constants. The registries
//! (`ParticleTypeRegistry`, `ReactionRegistry`, `PotentialRegistry`) hold the
//! static description of a system; `Config` is its serializable, name-based
//! form and `System` the resolved result.

pub mod config;
pub mod context;
pub mod error;
pub mod potential;
pub mod reaction;
pub mod types;

pub use config::{Config, EventPoolPolicy, PotentialConfig, ReactionConfig, System, TypeConfig};
pub use context::Context;
pub use error::{ModelError, Result};
pub use potential::{HarmonicRepulsion, PotentialRegistry};
pub use reaction::{Reaction, ReactionKind, ReactionRegistry};
pub use types::{ParticleType, ParticleTypeId, ParticleTypeRegistry};
