//! Splitting range writes into requests that respect a cell-count ceiling
//!
//! A write of `values` into the rectangle `start..=end` is tiled top-to-bottom into
//! full-width row bands, each holding at most `max_cells` cells (but never less than
//! one row). Values are consumed in row-major order, so writing the chunks in the
//! order they are yielded reproduces the row-major placement.

use crate::error::{Result, SyncError};
use crate::types::{CellRange, Coordinate};

/// One band of a chunked write
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<T> {
    pub range: CellRange,
    pub values: Vec<T>,
}

/// Lazy sequence of chunks, see [`plan_chunks`]
#[derive(Debug)]
pub struct ChunkPlan<T> {
    values: std::vec::IntoIter<T>,
    next_row: u32,
    end: Coordinate,
    start_col: u32,
    chunk_rows: u32,
    num_cols: usize,
}

/// Plan the chunks for writing `values` into `start..=end`.
///
/// Fails with [`SyncError::CellCountMismatch`] unless `values` holds exactly one
/// value per cell of the range.
pub fn plan_chunks<T>(
    start: Coordinate,
    end: Coordinate,
    values: Vec<T>,
    max_cells: usize,
) -> Result<ChunkPlan<T>> {
    let range = CellRange::new(start, end)?;
    let expected = range.cell_count();
    if values.len() != expected {
        return Err(SyncError::CellCountMismatch {
            expected,
            actual: values.len(),
        });
    }

    let num_cols = range.num_cols();
    let chunk_rows = (max_cells / num_cols).max(1);
    let chunk_rows = u32::try_from(chunk_rows).unwrap_or(u32::MAX);

    Ok(ChunkPlan {
        values: values.into_iter(),
        next_row: start.row,
        end,
        start_col: start.col,
        chunk_rows,
        num_cols,
    })
}

impl<T> ChunkPlan<T> {
    /// Number of cells in every chunk except possibly the last
    pub fn chunk_size(&self) -> usize {
        self.chunk_rows as usize * self.num_cols
    }
}

impl<T> Iterator for ChunkPlan<T> {
    type Item = Chunk<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.values.as_slice().is_empty() {
            return None;
        }

        let first_row = self.next_row;
        let last_row = first_row
            .saturating_add(self.chunk_rows - 1)
            .min(self.end.row);
        let rows = (last_row - first_row + 1) as usize;
        let values: Vec<T> = self.values.by_ref().take(rows * self.num_cols).collect();

        self.next_row = last_row.saturating_add(1);

        Some(Chunk {
            range: CellRange {
                start: Coordinate {
                    row: first_row,
                    col: self.start_col,
                },
                end: Coordinate {
                    row: last_row,
                    col: self.end.col,
                },
            },
            values,
        })
    }
}
