//! Repair of grids read from sheets with merged cells
//!
//! The service only reports a value for the top-left cell of a merged region.
//! Copying that value across the region before header parsing keeps spanning
//! header cells from reading as blanks.

use crate::service::GridRange;

/// Copy each merge region's top-left value into every cell of the region.
///
/// Regions that start outside the grid are ignored, regions that extend past it
/// are clipped. Returns the number of regions applied.
pub fn repair_merges(grid: &mut [Vec<String>], merges: &[GridRange]) -> usize {
    let mut applied = 0;

    for merge in merges {
        let start_row = merge.start_row as usize;
        let start_col = merge.start_col as usize;

        let Some(value) = grid.get(start_row).and_then(|row| row.get(start_col)).cloned() else {
            continue;
        };

        let end_row = (merge.end_row as usize).min(grid.len()).max(start_row);
        for row in &mut grid[start_row..end_row] {
            let end_col = (merge.end_col as usize).min(row.len());
            for cell in row.iter_mut().take(end_col).skip(start_col) {
                cell.clone_from(&value);
            }
        }
        applied += 1;
    }

    applied
}
