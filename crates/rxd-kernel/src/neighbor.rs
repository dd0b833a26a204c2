//! Sharded neighbor list built over the cell grid.
//!
//! For every resident particle the list holds its partners within the
//! cutoff as `(index, squared_distance)` pairs. Pair entries are sharded by
//! cell: worker `w` owns a contiguous range of cells and writes the entries
//! of their residents into shard `w` only.
//!
//! Invariant: the list is symmetric. During `fill`, the owner of particle
//! `i`'s cell records `i -> j` for every partner `j`; since the stencil
//! relation between cells is symmetric, `j`'s owner records `j -> i` in the
//! same pass. The incremental `insert` and `remove` paths maintain both
//! directions explicitly.

use std::collections::HashMap;

use rayon::prelude::*;

use rxd_math::Vec3;
use rxd_model::Context;

use crate::cell::CellGrid;
use crate::store::ParticleStore;

type Shard = HashMap<usize, Vec<(usize, f64)>>;

#[derive(Debug)]
pub struct NeighborList {
    context: Context,
    grid: CellGrid,
    shards: Vec<Shard>,
    n_shards: usize,
    /// Cells per shard; the last shard absorbs the remainder.
    grain: usize,
}

impl NeighborList {
    pub fn new(context: &Context, cutoff: f64, n_workers: usize) -> Self {
        let grid = CellGrid::new(context, cutoff);
        let n_shards = n_workers.max(1);
        let grain = (grid.cell_count() / n_shards).max(1);
        Self {
            context: context.clone(),
            grid,
            shards: vec![Shard::new(); n_shards],
            n_shards,
            grain,
        }
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn cutoff(&self) -> f64 {
        self.grid.cutoff()
    }

    /// Shard owning a cell's pair entries.
    pub fn shard_of(&self, cell: usize) -> usize {
        (cell / self.grain).min(self.n_shards - 1)
    }

    fn shard_range(&self, shard: usize) -> (usize, usize) {
        let count = self.grid.cell_count();
        let start = (shard * self.grain).min(count);
        let end = if shard + 1 == self.n_shards {
            count
        } else {
            ((shard + 1) * self.grain).min(count)
        };
        (start, end)
    }

    /// Redistributes all live particles into their cells and rebuilds every
    /// shard. Particles resolving to no cell are logged and left without
    /// neighbors for this pass.
    pub fn fill(&mut self, store: &ParticleStore) {
        self.grid.clear_residents();
        for index in 0..store.deactivated_index() {
            if store.is_deactivated(index) {
                continue;
            }
            let pos = store.position(index);
            match self.grid.cell_at(&pos) {
                Some(cell) => self.grid.add_resident(cell, index),
                None => log::warn!(
                    "particle {} at [{:.3}, {:.3}, {:.3}] lies outside the cell grid",
                    index,
                    pos[0],
                    pos[1],
                    pos[2]
                ),
            }
        }

        let this: &Self = self;
        let shards: Vec<Shard> = (0..this.n_shards)
            .into_par_iter()
            .map(|shard| this.build_shard(shard, store))
            .collect();
        self.shards = shards;
    }

    fn build_shard(&self, shard: usize, store: &ParticleStore) -> Shard {
        let (start, end) = self.shard_range(shard);
        let cutoff_sq = self.grid.cutoff_sq();
        let mut pairs = Shard::new();
        for cell in start..end {
            let residents = self.grid.residents(cell);
            for &i in residents {
                pairs.entry(i).or_default();
            }
            for &i in residents {
                let pos_i = store.position(i);
                for &j in residents {
                    if i == j {
                        continue;
                    }
                    let d2 = self.context.dist_sq(&pos_i, &store.position(j));
                    if d2 < cutoff_sq {
                        pairs.entry(i).or_default().push((j, d2));
                    }
                }
                for &stencil_cell in self.grid.stencil(cell) {
                    for &j in self.grid.residents(stencil_cell) {
                        let d2 = self.context.dist_sq(&pos_i, &store.position(j));
                        if d2 < cutoff_sq {
                            pairs.entry(i).or_default().push((j, d2));
                        }
                    }
                }
            }
        }
        pairs
    }

    /// Partners of `index` recorded by the last fill. A position outside the
    /// grid or a missing shard entry yields no neighbors.
    pub fn neighbors(&self, index: usize, pos: &Vec3) -> &[(usize, f64)] {
        let cell = match self.grid.cell_at(pos) {
            Some(cell) => cell,
            None => {
                log::warn!(
                    "particle {} at [{:.3}, {:.3}, {:.3}] lies outside the cell grid",
                    index,
                    pos[0],
                    pos[1],
                    pos[2]
                );
                return &[];
            }
        };
        match self.shards[self.shard_of(cell)].get(&index) {
            Some(list) => list.as_slice(),
            None => {
                log::error!(
                    "shard {} has no neighbor entry for particle {}",
                    self.shard_of(cell),
                    index
                );
                &[]
            }
        }
    }

    /// Adds a particle already present in the store, wiring pair entries in
    /// both directions.
    pub fn insert(&mut self, store: &ParticleStore, index: usize) {
        let pos = store.position(index);
        let cell = match self.grid.cell_at(&pos) {
            Some(cell) => cell,
            None => {
                log::warn!(
                    "particle {} at [{:.3}, {:.3}, {:.3}] lies outside the cell grid",
                    index,
                    pos[0],
                    pos[1],
                    pos[2]
                );
                return;
            }
        };

        let cutoff_sq = self.grid.cutoff_sq();
        // (partner, partner's cell, squared distance)
        let mut partners: Vec<(usize, usize, f64)> = Vec::new();
        for candidate_cell in std::iter::once(cell).chain(self.grid.stencil(cell).iter().copied()) {
            for &j in self.grid.residents(candidate_cell) {
                if j == index {
                    continue;
                }
                let d2 = self.context.dist_sq(&pos, &store.position(j));
                if d2 < cutoff_sq {
                    partners.push((j, candidate_cell, d2));
                }
            }
        }

        let own_shard = self.shard_of(cell);
        let own_entry = self.shards[own_shard].entry(index).or_default();
        own_entry.clear();
        own_entry.extend(partners.iter().map(|&(j, _, d2)| (j, d2)));
        for (j, partner_cell, d2) in partners {
            let shard = self.shard_of(partner_cell);
            self.shards[shard].entry(j).or_default().push((index, d2));
        }
        self.grid.add_resident(cell, index);
    }

    /// Erases a particle from its own shard entry and from every partner
    /// entry referencing it, and drops its cell residency.
    pub fn remove(&mut self, store: &ParticleStore, index: usize) {
        let pos = store.position(index);
        let cell = match self.grid.cell_at(&pos) {
            Some(cell) => cell,
            None => {
                log::warn!(
                    "particle {} at [{:.3}, {:.3}, {:.3}] lies outside the cell grid",
                    index,
                    pos[0],
                    pos[1],
                    pos[2]
                );
                return;
            }
        };

        let own_shard = self.shard_of(cell);
        match self.shards[own_shard].remove(&index) {
            Some(partners) => {
                for (j, _) in partners {
                    let partner_cell = match self.grid.cell_at(&store.position(j)) {
                        Some(c) => c,
                        None => continue,
                    };
                    let shard = self.shard_of(partner_cell);
                    match self.shards[shard].get_mut(&j) {
                        Some(list) => list.retain(|&(n, _)| n != index),
                        None => log::error!(
                            "shard {} has no neighbor entry for particle {}",
                            shard,
                            j
                        ),
                    }
                }
            }
            None => log::error!(
                "shard {} has no neighbor entry for particle {}",
                own_shard,
                index
            ),
        }
        self.grid.remove_resident(cell, index);
    }
}
