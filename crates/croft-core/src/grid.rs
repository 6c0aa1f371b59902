//! Uniform-grid spatial index.
//!
//! The world square is cut into fixed-size cells; each cell holds an
//! unordered list of entity references. Callers supply positions on insert
//! and remove, so the grid itself stores no coordinates. Positions outside
//! the world clamp to the border cells, which keeps every lookup in range.

use thiserror::Error;

use crate::fixed::Fixed64;
use crate::geom::Point;
use crate::id::EntityRef;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("cell ({col}, {row}) is full (capacity {capacity})")]
    CellOverflow {
        col: usize,
        row: usize,
        capacity: usize,
    },
    #[error("{entity:?} not present in cell ({col}, {row})")]
    MissingEntry {
        entity: EntityRef,
        col: usize,
        row: usize,
    },
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cells: Vec<Vec<EntityRef>>,
    dim: usize,
    cell_size: Fixed64,
    half_extent: Fixed64,
    cell_capacity: usize,
}

impl SpatialGrid {
    pub fn new(half_extent: Fixed64, cell_size: Fixed64, cell_capacity: usize) -> Self {
        let dim = (half_extent * 2 / cell_size).floor().to_num::<i64>() as usize + 1;
        SpatialGrid {
            cells: vec![Vec::new(); dim * dim],
            dim,
            cell_size,
            half_extent,
            cell_capacity,
        }
    }

    /// Cells per axis.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Total number of stored references.
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }

    pub fn cell_of(&self, pos: Point) -> (usize, usize) {
        (self.axis_cell(pos.x), self.axis_cell(pos.y))
    }

    fn axis_cell(&self, v: Fixed64) -> usize {
        let c = ((v + self.half_extent) / self.cell_size)
            .floor()
            .to_num::<i64>();
        c.clamp(0, self.dim as i64 - 1) as usize
    }

    pub fn cell_entries(&self, col: usize, row: usize) -> &[EntityRef] {
        &self.cells[row * self.dim + col]
    }

    /// All stored references with their cell coordinates.
    pub fn entries(&self) -> impl Iterator<Item = ((usize, usize), EntityRef)> + '_ {
        let dim = self.dim;
        self.cells.iter().enumerate().flat_map(move |(i, cell)| {
            cell.iter().map(move |&e| ((i % dim, i / dim), e))
        })
    }

    pub fn insert(&mut self, entity: EntityRef, pos: Point) -> Result<(), GridError> {
        let (col, row) = self.cell_of(pos);
        let cell = &mut self.cells[row * self.dim + col];
        if cell.len() == self.cell_capacity {
            return Err(GridError::CellOverflow {
                col,
                row,
                capacity: self.cell_capacity,
            });
        }
        cell.push(entity);
        Ok(())
    }

    /// Remove `entity` from the cell covering `pos`. The entry has to be
    /// there; a miss means the caller's position bookkeeping diverged from
    /// the index, and continuing would leave a dangling reference behind.
    pub fn remove(&mut self, entity: EntityRef, pos: Point) -> Result<(), GridError> {
        let (col, row) = self.cell_of(pos);
        let cell = &mut self.cells[row * self.dim + col];
        match cell.iter().position(|&e| e == entity) {
            Some(at) => {
                cell.swap_remove(at);
                Ok(())
            }
            None => Err(GridError::MissingEntry { entity, col, row }),
        }
    }

    /// The entity passing `filter` that lies strictly within `radius` of
    /// `center`, minimizing squared distance. Scans only the cells the
    /// search disc can touch. Returns the winner and its squared distance.
    ///
    /// `position_of` resolves a reference to its current position; entries
    /// it cannot resolve are skipped.
    pub fn find_nearest<P, F>(
        &self,
        center: Point,
        radius: Fixed64,
        position_of: P,
        mut filter: F,
    ) -> Option<(EntityRef, Fixed64)>
    where
        P: Fn(EntityRef) -> Option<Point>,
        F: FnMut(EntityRef) -> bool,
    {
        let lo_col = self.axis_cell(center.x - radius);
        let hi_col = self.axis_cell(center.x + radius);
        let lo_row = self.axis_cell(center.y - radius);
        let hi_row = self.axis_cell(center.y + radius);
        let mut best = None;
        let mut best_qu = radius * radius;
        for row in lo_row..=hi_row {
            for col in lo_col..=hi_col {
                for &entity in &self.cells[row * self.dim + col] {
                    if !filter(entity) {
                        continue;
                    }
                    let Some(pos) = position_of(entity) else {
                        continue;
                    };
                    let qu = center.dist_sq(pos);
                    if qu < best_qu {
                        best = Some(entity);
                        best_qu = qu;
                    }
                }
            }
        }
        best.map(|e| (e, best_qu))
    }
}
