//! Header codec: table column labels to sheet header rows and back
//!
//! Writing places an index name in the bottom header level (reads better as a
//! column header). Reading applies blank promotion so that such a name comes back
//! in the top level of the resulting multi-level label.

use crate::error::{Result, SyncError};
use crate::table::{is_index_placeholder, ColumnLabel};

/// Encode column labels as header rows.
///
/// Single-level labels give one row. Multi-level labels give one row per level,
/// or a single row of joined labels when `flatten_sep` is set. With
/// `include_index`, the first `index_levels` columns are index columns: their name
/// moves from the top to the bottom level and unnamed-index placeholders are blanked.
pub fn labels_to_header_rows(
    labels: &[ColumnLabel],
    include_index: bool,
    index_levels: usize,
    flatten_sep: Option<&str>,
) -> Vec<Vec<String>> {
    if labels.is_empty() {
        return vec![Vec::new()];
    }

    let nlevels = labels.iter().map(ColumnLabel::nlevels).max().unwrap_or(1).max(1);
    let index_columns = if include_index {
        index_levels.min(labels.len())
    } else {
        0
    };

    let mut rows: Vec<Vec<String>> = (0..nlevels)
        .map(|level| {
            labels
                .iter()
                .map(|l| l.levels().get(level).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    if nlevels > 1 {
        let bottom = nlevels - 1;
        for col in 0..index_columns {
            let name = std::mem::take(&mut rows[0][col]);
            rows[bottom][col] = name;
        }

        if let Some(sep) = flatten_sep {
            let flat = (0..labels.len())
                .map(|col| {
                    rows.iter()
                        .map(|row| row[col].as_str())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join(sep)
                })
                .collect();
            rows = vec![flat];
        }
    }

    for row in &mut rows {
        for cell in row.iter_mut().take(index_columns) {
            if is_index_placeholder(cell) {
                cell.clear();
            }
        }
    }

    rows
}

/// Decode the first `header_rows` rows of a sheet into column labels.
///
/// Returns `None` when there is no header. Multiple header rows go through
/// [`promote_header_blanks`] first.
pub fn header_rows_to_labels(
    raw_rows: &[Vec<String>],
    header_rows: usize,
) -> Option<Vec<ColumnLabel>> {
    if header_rows == 0 {
        return None;
    }

    let mut headers: Vec<Vec<String>> = raw_rows.iter().take(header_rows).cloned().collect();
    if headers.is_empty() {
        return None;
    }

    if header_rows == 1 {
        return Some(headers[0].iter().map(|s| ColumnLabel::single(s.as_str())).collect());
    }

    promote_header_blanks(&mut headers);
    let width = headers[0].len();
    Some(
        (0..width)
            .map(|col| ColumnLabel::multi(headers.iter().map(|row| row[col].clone())))
            .collect(),
    )
}

/// Shift every column's values up past its leading blanks, filling the vacated
/// bottom cells with blanks. Columns that are blank throughout stay blank.
///
/// Rows are padded with blanks to a common width first. Applying this twice is the
/// same as applying it once.
pub fn promote_header_blanks(rows: &mut [Vec<String>]) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in rows.iter_mut() {
        row.resize(width, String::new());
    }

    let height = rows.len();
    for col in 0..width {
        let shift = rows.iter().take_while(|row| row[col].is_empty()).count();
        if shift == 0 || shift == height {
            continue;
        }
        for row in 0..height {
            rows[row][col] = if row + shift < height {
                std::mem::take(&mut rows[row + shift][col])
            } else {
                String::new()
            };
        }
    }
}

/// Check decoded labels against the data width.
///
/// A mismatch is only an error when there is data; an empty body may be reshaped
/// to follow the header.
pub fn check_header_width(labels: usize, data_columns: usize, data_rows: usize) -> Result<()> {
    if labels != data_columns && data_rows > 0 {
        return Err(SyncError::HeaderColumnMismatch {
            headers: labels,
            columns: data_columns,
        });
    }
    Ok(())
}

/// Runs of at least two equal, non-blank adjacent values within `start..end`,
/// as inclusive `(first, last)` positions.
pub fn contiguous_ranges(values: &[String], start: usize, end: usize) -> Vec<(usize, usize)> {
    let end = end.min(values.len());
    let mut ranges = Vec::new();
    let mut run_start = start;

    while run_start < end {
        let mut run_end = run_start;
        while run_end + 1 < end && values[run_end + 1] == values[run_start] {
            run_end += 1;
        }
        if run_end > run_start && !values[run_start].is_empty() {
            ranges.push((run_start, run_end));
        }
        run_start = run_end + 1;
    }

    ranges
}

/// Plan header merges: for each header row, the runs of equal cells that sit
/// inside a run of the row above. Columns before `skip` (index columns) are left
/// alone. Positions are column offsets into the header rows.
pub fn header_merge_ranges(rows: &[Vec<String>], skip: usize) -> Vec<Vec<(usize, usize)>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if skip >= width {
        return rows.iter().map(|_| Vec::new()).collect();
    }

    let mut parents = vec![(skip, width - 1)];
    let mut levels = Vec::with_capacity(rows.len());

    for row in rows {
        let ranges: Vec<(usize, usize)> = parents
            .iter()
            .flat_map(|&(first, last)| contiguous_ranges(row, first, last + 1))
            .collect();
        parents = ranges.clone();
        levels.push(ranges);
    }

    levels
}
