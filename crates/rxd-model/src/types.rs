//! Particle species registry.

use crate::error::{ModelError, Result};

/// Dense species id handed out by [`ParticleTypeRegistry`] in registration
/// order.
pub type ParticleTypeId = u32;

/// Static description of one particle species.
#[derive(Debug, Clone)]
pub struct ParticleType {
    pub name: String,
    pub diffusion_constant: f64,
    pub radius: f64,
}

/// Maps species names to dense ids and holds per-species constants.
#[derive(Debug, Clone, Default)]
pub struct ParticleTypeRegistry {
    types: Vec<ParticleType>,
}

impl ParticleTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a species and returns its id.
    pub fn register(
        &mut self,
        name: &str,
        diffusion_constant: f64,
        radius: f64,
    ) -> Result<ParticleTypeId> {
        if self.types.iter().any(|t| t.name == name) {
            return Err(ModelError::DuplicateParticleType(name.to_string()));
        }
        self.types.push(ParticleType {
            name: name.to_string(),
            diffusion_constant,
            radius,
        });
        Ok((self.types.len() - 1) as ParticleTypeId)
    }

    pub fn id_of(&self, name: &str) -> Result<ParticleTypeId> {
        self.types
            .iter()
            .position(|t| t.name == name)
            .map(|i| i as ParticleTypeId)
            .ok_or_else(|| ModelError::UnknownParticleType(name.to_string()))
    }

    pub fn get(&self, id: ParticleTypeId) -> &ParticleType {
        &self.types[id as usize]
    }

    pub fn diffusion_constant(&self, id: ParticleTypeId) -> f64 {
        self.types[id as usize].diffusion_constant
    }

    pub fn radius(&self, id: ParticleTypeId) -> f64 {
        self.types[id as usize].radius
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleType> {
        self.types.iter()
    }
}
