//! Regular cell grid over the simulation box.
//!
//! Cell width is half the interaction cutoff (or the whole box when the
//! cutoff is zero), so every pair within the cutoff lies in the same cell
//! or in one of the 5x5x5 stencil cells around it. Periodic axes wrap cell
//! coordinates; out-of-range coordinates on non-periodic axes resolve to no
//! cell.

use rxd_math::{positive_modulo, Vec3};
use rxd_model::Context;

#[derive(Debug, Default)]
struct Cell {
    stencil: Vec<usize>,
    residents: Vec<usize>,
}

#[derive(Debug)]
pub struct CellGrid {
    n_cells: [i64; 3],
    cell_size: Vec3,
    box_size: Vec3,
    periodic: [bool; 3],
    cutoff: f64,
    cells: Vec<Cell>,
}

impl CellGrid {
    pub fn new(context: &Context, cutoff: f64) -> Self {
        let mut n_cells = [1i64; 3];
        let mut cell_size = context.box_size;
        if cutoff > 0.0 {
            for d in 0..3 {
                n_cells[d] = ((context.box_size[d] / (0.5 * cutoff)).floor() as i64).max(1);
                cell_size[d] = context.box_size[d] / n_cells[d] as f64;
            }
        }
        let total = (n_cells[0] * n_cells[1] * n_cells[2]) as usize;
        log::debug!(
            "cell grid {}x{}x{}, cell size [{:.3}, {:.3}, {:.3}], cutoff {}",
            n_cells[0],
            n_cells[1],
            n_cells[2],
            cell_size[0],
            cell_size[1],
            cell_size[2],
            cutoff
        );

        let mut grid = Self {
            n_cells,
            cell_size,
            box_size: context.box_size,
            periodic: context.periodic,
            cutoff,
            cells: (0..total).map(|_| Cell::default()).collect(),
        };
        grid.wire_stencils();
        grid
    }

    /// Wires every cell to the surrounding 5x5x5 block. With fewer than 5
    /// cells on some axis, wrapping can alias distinct offsets onto the
    /// same cell, so appends are deduplicated there. A cell never lists
    /// itself.
    fn wire_stencils(&mut self) {
        let enough_cells = self.n_cells.iter().all(|&n| n >= 5);
        for i in 0..self.n_cells[0] {
            for j in 0..self.n_cells[1] {
                for k in 0..self.n_cells[2] {
                    let id = match self.cell_id(i, j, k) {
                        Some(id) => id,
                        None => continue,
                    };
                    for di in -2i64..=2 {
                        for dj in -2i64..=2 {
                            for dk in -2i64..=2 {
                                if di == 0 && dj == 0 && dk == 0 {
                                    continue;
                                }
                                let neighbor = self.cell_id(i + di, j + dj, k + dk);
                                if let Some(neighbor) = neighbor {
                                    if neighbor == id {
                                        continue;
                                    }
                                    let stencil = &mut self.cells[id].stencil;
                                    if enough_cells || !stencil.contains(&neighbor) {
                                        stencil.push(neighbor);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        [
            self.n_cells[0] as usize,
            self.n_cells[1] as usize,
            self.n_cells[2] as usize,
        ]
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn cutoff_sq(&self) -> f64 {
        self.cutoff * self.cutoff
    }

    /// Resolves a position to its cell. Positions are box-centered, so the
    /// first cell starts at `-box_size / 2`.
    pub fn cell_at(&self, pos: &Vec3) -> Option<usize> {
        let i = ((pos[0] + 0.5 * self.box_size[0]) / self.cell_size[0]).floor() as i64;
        let j = ((pos[1] + 0.5 * self.box_size[1]) / self.cell_size[1]).floor() as i64;
        let k = ((pos[2] + 0.5 * self.box_size[2]) / self.cell_size[2]).floor() as i64;
        self.cell_id(i, j, k)
    }

    /// Linear cell id for integer coordinates, wrapping periodic axes.
    pub fn cell_id(&self, i: i64, j: i64, k: i64) -> Option<usize> {
        let i = self.axis_index(i, 0)?;
        let j = self.axis_index(j, 1)?;
        let k = self.axis_index(k, 2)?;
        Some((k + self.n_cells[2] * (j + self.n_cells[1] * i)) as usize)
    }

    fn axis_index(&self, c: i64, d: usize) -> Option<i64> {
        if self.periodic[d] {
            Some(positive_modulo(c, self.n_cells[d]))
        } else if c < 0 || c >= self.n_cells[d] {
            None
        } else {
            Some(c)
        }
    }

    pub fn stencil(&self, cell: usize) -> &[usize] {
        &self.cells[cell].stencil
    }

    pub fn residents(&self, cell: usize) -> &[usize] {
        &self.cells[cell].residents
    }

    pub fn clear_residents(&mut self) {
        for cell in &mut self.cells {
            cell.residents.clear();
        }
    }

    pub fn add_resident(&mut self, cell: usize, index: usize) {
        self.cells[cell].residents.push(index);
    }

    pub fn remove_resident(&mut self, cell: usize, index: usize) {
        self.cells[cell].residents.retain(|&r| r != index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    fn context(box_size: f64, periodic: bool) -> Context {
        Context::new(Vec3::new(box_size, box_size, box_size), [periodic; 3])
    }

    #[test]
    fn dimensions_follow_cutoff() {
        let grid = CellGrid::new(&context(10.0, true), 2.0);
        assert_eq!(grid.dims(), [10, 10, 10]);
        assert_eq!(grid.cell_count(), 1000);
        assert_relative_eq!(grid.cell_size()[0], 1.0);
    }

    #[test]
    fn zero_cutoff_collapses_to_one_cell() {
        let grid = CellGrid::new(&context(10.0, true), 0.0);
        assert_eq!(grid.dims(), [1, 1, 1]);
        assert_eq!(grid.cell_at(&Vec3::new(4.9, -4.9, 0.0)), Some(0));
        assert!(grid.stencil(0).is_empty());
    }

    #[test]
    fn every_in_box_position_has_exactly_one_cell() {
        let grid = CellGrid::new(&context(10.0, false), 2.0);
        for x in [-4.99, -2.5, 0.0, 2.5, 4.99] {
            for y in [-4.99, 0.0, 4.99] {
                let cell = grid.cell_at(&Vec3::new(x, y, 0.0));
                assert!(cell.is_some());
                assert!(cell.unwrap() < grid.cell_count());
            }
        }
        assert_eq!(grid.cell_at(&Vec3::new(5.1, 0.0, 0.0)), None);
        assert_eq!(grid.cell_at(&Vec3::new(0.0, -5.1, 0.0)), None);
    }

    #[test]
    fn periodic_coordinates_wrap() {
        let grid = CellGrid::new(&context(10.0, true), 2.0);
        assert_eq!(grid.cell_id(-1, 0, 0), grid.cell_id(9, 0, 0));
        assert_eq!(grid.cell_id(0, 12, 3), grid.cell_id(0, 2, 3));
    }

    #[test]
    fn stencil_covers_the_full_block() {
        let grid = CellGrid::new(&context(10.0, true), 2.0);
        // periodic 10x10x10 grid: every cell sees the whole 5x5x5 block
        for cell in [0, 555, 999] {
            assert_eq!(grid.stencil(cell).len(), 124);
        }

        let clipped = CellGrid::new(&context(10.0, false), 2.0);
        // corner cell keeps only the 3x3x3 corner of the block
        let corner = clipped.cell_id(0, 0, 0).unwrap();
        assert_eq!(clipped.stencil(corner).len(), 26);
    }

    #[test]
    fn small_periodic_grid_deduplicates_aliases() {
        // 2 cells per axis: offsets alias heavily under wrapping
        let grid = CellGrid::new(&context(10.0, true), 10.0);
        assert_eq!(grid.dims(), [2, 2, 2]);
        for cell in 0..grid.cell_count() {
            let stencil = grid.stencil(cell);
            let unique: HashSet<_> = stencil.iter().copied().collect();
            assert_eq!(unique.len(), stencil.len());
            assert_eq!(stencil.len(), 7);
            assert!(!stencil.contains(&cell));
        }
    }

    #[test]
    fn residents_are_maintained_in_place() {
        let mut grid = CellGrid::new(&context(10.0, true), 2.0);
        grid.add_resident(3, 7);
        grid.add_resident(3, 9);
        assert_eq!(grid.residents(3), &[7, 9]);
        grid.remove_resident(3, 7);
        assert_eq!(grid.residents(3), &[9]);
        grid.clear_residents();
        assert!(grid.residents(3).is_empty());
    }
}
