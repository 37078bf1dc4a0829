//! Builders for structural requests
//!
//! Cell arguments are 1-based and inclusive, the produced [`GridRange`]s are
//! 0-based with exclusive ends.

use crate::header::header_merge_ranges;
use crate::service::{GridRange, MergeType, StructuralRequest};
use crate::types::{CellRange, Coordinate};

/// Grid range covering an inclusive cell range
pub fn grid_range(sheet_id: u64, range: &CellRange) -> GridRange {
    GridRange {
        sheet_id,
        start_row: range.start.row - 1,
        end_row: range.end.row,
        start_col: range.start.col - 1,
        end_col: range.end.col,
    }
}

/// Freeze rows and/or columns. Returns nothing when both are `None`.
pub fn freeze_request(
    sheet_id: u64,
    rows: Option<u32>,
    cols: Option<u32>,
) -> Option<StructuralRequest> {
    if rows.is_none() && cols.is_none() {
        return None;
    }
    Some(StructuralRequest::Freeze {
        sheet_id,
        rows,
        cols,
    })
}

pub fn filter_request(sheet_id: u64, range: &CellRange) -> StructuralRequest {
    StructuralRequest::SetBasicFilter {
        range: grid_range(sheet_id, range),
    }
}

pub fn merge_request(sheet_id: u64, range: &CellRange, merge_type: MergeType) -> StructuralRequest {
    StructuralRequest::MergeCells {
        range: grid_range(sheet_id, range),
        merge_type,
    }
}

pub fn unmerge_request(sheet_id: u64, range: &CellRange) -> StructuralRequest {
    StructuralRequest::UnmergeCells {
        range: grid_range(sheet_id, range),
    }
}

/// Merge requests for equal adjacent header cells written at `start`.
///
/// The first `index_columns` columns are skipped, runs at each level are nested
/// in the runs of the level above.
pub fn header_merge_requests(
    sheet_id: u64,
    header_rows: &[Vec<String>],
    start: Coordinate,
    index_columns: usize,
) -> Vec<StructuralRequest> {
    header_merge_ranges(header_rows, index_columns)
        .into_iter()
        .enumerate()
        .flat_map(|(level, ranges)| {
            let row = start.row - 1 + level as u32;
            ranges.into_iter().map(move |(first, last)| StructuralRequest::MergeCells {
                range: GridRange {
                    sheet_id,
                    start_row: row,
                    end_row: row + 1,
                    start_col: start.col - 1 + first as u32,
                    end_col: start.col + last as u32,
                },
                merge_type: MergeType::All,
            })
        })
        .collect()
}
