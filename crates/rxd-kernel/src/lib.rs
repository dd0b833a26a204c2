//! Kernel state for the rxd reaction-diffusion engine.
//!
//! `ParticleStore` keeps particle attributes in compact parallel arrays,
//! `CellGrid` partitions the box by the interaction cutoff, and
//! `NeighborList` maintains the per-particle pair lists that force and
//! reaction passes consume.

pub mod cell;
pub mod error;
pub mod neighbor;
pub mod store;

pub use cell::CellGrid;
pub use error::{KernelError, Result};
pub use neighbor::NeighborList;
pub use store::{ParticleId, ParticleStore};
