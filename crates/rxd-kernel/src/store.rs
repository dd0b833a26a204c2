//! Dense particle storage with swap-to-end compaction.
//!
//! Attributes live in parallel arrays of equal length. Slots
//! `[0, deactivated_index)` hold live entries (or entries pending
//! deactivation); slots `[deactivated_index, len)` are free and get reused
//! by insertions. Compaction reassigns slot indices, so an index must never
//! be retained across [`ParticleStore::deactivate_marked`]. The
//! [`ParticleId`] is the stable handle: assigned once at insertion, never
//! reused.

use std::collections::BTreeSet;

use rxd_math::Vec3;
use rxd_model::ParticleTypeId;

use crate::error::{KernelError, Result};

/// Persistent particle identity, unique for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleId(pub u64);

#[derive(Debug, Default)]
pub struct ParticleStore {
    ids: Vec<ParticleId>,
    positions: Vec<Vec3>,
    forces: Vec<Vec3>,
    type_ids: Vec<ParticleTypeId>,
    deactivated: Vec<bool>,
    /// First free slot; everything at or after it is reusable.
    deactivated_index: usize,
    /// Indices flagged by `mark_for_deactivation`, compacted in one batch.
    marked: BTreeSet<usize>,
    next_id: u64,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a particle, reusing a free slot when one exists. Returns the
    /// slot index, valid until the next compaction.
    pub fn add_particle(&mut self, type_id: ParticleTypeId, position: Vec3) -> usize {
        let id = ParticleId(self.next_id);
        self.next_id += 1;
        let index = self.deactivated_index;
        if index < self.ids.len() {
            self.ids[index] = id;
            self.positions[index] = position;
            self.forces[index] = Vec3::zeros();
            self.type_ids[index] = type_id;
            self.deactivated[index] = false;
        } else {
            self.ids.push(id);
            self.positions.push(position);
            self.forces.push(Vec3::zeros());
            self.type_ids.push(type_id);
            self.deactivated.push(false);
        }
        self.deactivated_index += 1;
        index
    }

    pub fn add_particles(
        &mut self,
        particles: impl IntoIterator<Item = (ParticleTypeId, Vec3)>,
    ) -> Vec<usize> {
        particles
            .into_iter()
            .map(|(t, p)| self.add_particle(t, p))
            .collect()
    }

    /// Removes the entry at `index` immediately by swapping the last live
    /// slot into its place.
    pub fn remove_index(&mut self, index: usize) -> Result<()> {
        if self.deactivated_index == 0 {
            return Err(KernelError::CompactionUnderflow { index, active: 0 });
        }
        if index >= self.deactivated_index {
            return Err(KernelError::IndexOutOfBounds {
                index,
                len: self.deactivated_index,
            });
        }
        let last = self.deactivated_index - 1;
        self.deactivated[index] = true;
        self.swap_slots(index, last);
        self.deactivated_index = last;
        Ok(())
    }

    /// Linear scan for `id` over the live prefix; logs and returns
    /// `Ok(false)` when the id is not present.
    pub fn remove_by_id(&mut self, id: ParticleId) -> Result<bool> {
        let found = self.ids[..self.deactivated_index]
            .iter()
            .position(|&candidate| candidate == id);
        match found {
            Some(index) => {
                self.remove_index(index)?;
                Ok(true)
            }
            None => {
                log::warn!("remove_by_id: no particle with id {}", id.0);
                Ok(false)
            }
        }
    }

    /// Flags `index` for the next `deactivate_marked` batch. Idempotent.
    pub fn mark_for_deactivation(&mut self, index: usize) {
        self.deactivated[index] = true;
        self.marked.insert(index);
    }

    /// Compacts all marked slots into the free region in one pass over the
    /// marked set. O(k) swaps for k marks.
    pub fn deactivate_marked(&mut self) -> Result<()> {
        if self.marked.is_empty() {
            return Ok(());
        }
        if let Some(&top) = self.marked.iter().next_back() {
            if top >= self.deactivated_index {
                return Err(KernelError::IndexOutOfBounds {
                    index: top,
                    len: self.deactivated_index,
                });
            }
        }
        let marked = std::mem::take(&mut self.marked);
        for idx in marked {
            if idx >= self.deactivated_index {
                // already swept into the free region by an earlier swap
                break;
            }
            loop {
                self.deactivated_index -= 1;
                if self.deactivated_index == idx {
                    break;
                }
                if !self.deactivated[self.deactivated_index] {
                    self.swap_slots(idx, self.deactivated_index);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Live particle count, net of pending marks. Clamped at zero when an
    /// immediate removal overlaps a pending mark.
    pub fn size(&self) -> usize {
        self.deactivated_index.saturating_sub(self.marked.len())
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// One past the last live slot. Iteration over `0..deactivated_index()`
    /// visits every live entry plus any pending marks.
    pub fn deactivated_index(&self) -> usize {
        self.deactivated_index
    }

    pub fn n_deactivated(&self) -> usize {
        self.ids.len() - self.deactivated_index
    }

    pub fn is_deactivated(&self, index: usize) -> bool {
        self.deactivated[index]
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.positions.clear();
        self.forces.clear();
        self.type_ids.clear();
        self.deactivated.clear();
        self.deactivated_index = 0;
        self.marked.clear();
    }

    pub fn zero_forces(&mut self) {
        for f in &mut self.forces[..self.deactivated_index] {
            *f = Vec3::zeros();
        }
    }

    pub fn id(&self, index: usize) -> ParticleId {
        self.ids[index]
    }

    pub fn position(&self, index: usize) -> Vec3 {
        self.positions[index]
    }

    pub fn type_id(&self, index: usize) -> ParticleTypeId {
        self.type_ids[index]
    }

    pub fn ids(&self) -> &[ParticleId] {
        &self.ids[..self.deactivated_index]
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions[..self.deactivated_index]
    }

    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions[..self.deactivated_index]
    }

    pub fn forces(&self) -> &[Vec3] {
        &self.forces[..self.deactivated_index]
    }

    pub fn forces_mut(&mut self) -> &mut [Vec3] {
        &mut self.forces[..self.deactivated_index]
    }

    pub fn type_ids(&self) -> &[ParticleTypeId] {
        &self.type_ids[..self.deactivated_index]
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        self.ids.swap(a, b);
        self.positions.swap(a, b);
        self.forces.swap(a, b);
        self.type_ids.swap(a, b);
        self.deactivated.swap(a, b);
    }
}
