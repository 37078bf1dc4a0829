//! Conversion between A1-style addresses and 1-based coordinates
//!
//! Column letters use bijective base-26 numbering (A=1 ... Z=26, AA=27 ...).

use crate::error::{Result, SyncError};
use crate::types::{CellRange, CellRef, Coordinate};
use regex::Regex;
use std::sync::LazyLock;

static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("Hardcode regex pattern"));

/// Convert a column number to its letters (1 -> A, 26 -> Z, 27 -> AA)
pub fn column_to_letters(col: u32) -> String {
    let mut result = Vec::new();
    let mut col = col;

    while col > 0 {
        col -= 1;
        result.push(b'A' + (col % 26) as u8);
        col /= 26;
    }

    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

/// Convert column letters (case-insensitive) to a column number
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0u32, |acc, b| {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = (b.to_ascii_uppercase() - b'A') as u32 + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// Normalize a cell reference into a validated 1-based coordinate
pub fn to_coordinate<C: Into<CellRef>>(cell: C) -> Result<Coordinate> {
    match cell.into() {
        CellRef::Coordinate(row, col) => Coordinate::new(row, col),
        CellRef::Address(address) => {
            let captures = ADDRESS_PATTERN.captures(&address).ok_or_else(|| {
                SyncError::InvalidCellFormat(format!("{} is not a valid address", address))
            })?;
            let col = letters_to_column(&captures[1]);
            let row = captures[2].parse::<u32>().ok();
            match (row, col) {
                (Some(row), Some(col)) => Coordinate::new(row, col),
                _ => Err(SyncError::InvalidCellFormat(format!(
                    "{} is out of range",
                    address
                ))),
            }
        }
    }
}

/// Build a validated range from two cell references
pub fn to_range<S: Into<CellRef>, E: Into<CellRef>>(start: S, end: E) -> Result<CellRange> {
    CellRange::new(to_coordinate(start)?, to_coordinate(end)?)
}

/// Transform two cell references into notation like "A1:B5"
pub fn to_range_notation<S: Into<CellRef>, E: Into<CellRef>>(start: S, end: E) -> Result<String> {
    Ok(to_range(start, end)?.notation())
}

/// Parse "A1:B5" (or a lone "A1") into a range
pub fn parse_range_notation(notation: &str) -> Result<CellRange> {
    match notation.split_once(':') {
        Some((start, end)) => to_range(start, end),
        None => to_range(notation, notation),
    }
}
