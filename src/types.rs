//! Type definitions for table cells and sheet coordinates

use crate::address;
use crate::error::{Result, SyncError};
use chrono::NaiveDateTime;
use std::fmt;

/// Format used when a datetime cell is written to a sheet
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Represents a single scalar value in a table column
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing value
    Null,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Date and time without timezone
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Convert cell value to the string sent to the sheet
    pub fn as_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::String(s) => s.clone(),
            CellValue::Int(i) => itoa::Buffer::new().format(*i).to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::DateTime(d) => d.format(DATETIME_FORMAT).to_string(),
        }
    }

    /// Check if cell is missing. NaN floats count as missing.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(d: NaiveDateTime) -> Self {
        CellValue::DateTime(d)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// A validated 1-based cell position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based)
    pub col: u32,
}

impl Coordinate {
    /// Create a coordinate, rejecting zero rows or columns
    pub fn new(row: u32, col: u32) -> Result<Self> {
        if row == 0 || col == 0 {
            return Err(SyncError::InvalidCellFormat(format!(
                "({}, {}) is not a valid cell tuple",
                row, col
            )));
        }
        Ok(Coordinate { row, col })
    }

    /// A1-style reference, e.g. "C3"
    pub fn a1(&self) -> String {
        format!("{}{}", address::column_to_letters(self.col), self.row)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.a1())
    }
}

/// Cell reference as given by a caller: either an A1-style address or a
/// (row, col) pair. Anything else is rejected when converting from dynamic values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellRef {
    /// Column letters followed by a row number, e.g. "B12"
    Address(String),
    /// 1-based (row, col)
    Coordinate(u32, u32),
}

impl From<&str> for CellRef {
    fn from(s: &str) -> Self {
        CellRef::Address(s.to_string())
    }
}

impl From<String> for CellRef {
    fn from(s: String) -> Self {
        CellRef::Address(s)
    }
}

impl From<(u32, u32)> for CellRef {
    fn from((row, col): (u32, u32)) -> Self {
        CellRef::Coordinate(row, col)
    }
}

impl From<Coordinate> for CellRef {
    fn from(c: Coordinate) -> Self {
        CellRef::Coordinate(c.row, c.col)
    }
}

impl TryFrom<&[CellValue]> for CellRef {
    type Error = SyncError;

    /// Accepts a single string or exactly two integers. Floats are rejected even
    /// when they hold an integral value.
    fn try_from(values: &[CellValue]) -> Result<Self> {
        match values {
            [CellValue::String(s)] => Ok(CellRef::Address(s.clone())),
            [CellValue::Int(row), CellValue::Int(col)] => {
                let row = u32::try_from(*row).map_err(|_| invalid_tuple(values))?;
                let col = u32::try_from(*col).map_err(|_| invalid_tuple(values))?;
                Ok(CellRef::Coordinate(row, col))
            }
            _ => Err(invalid_tuple(values)),
        }
    }
}

fn invalid_tuple(values: &[CellValue]) -> SyncError {
    SyncError::InvalidCellFormat(format!("{:?} is not a valid cell tuple", values))
}

/// Inclusive rectangle of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: Coordinate,
    pub end: Coordinate,
}

impl CellRange {
    /// Create a range, requiring start <= end in both dimensions
    pub fn new(start: Coordinate, end: Coordinate) -> Result<Self> {
        if start.row > end.row || start.col > end.col {
            return Err(SyncError::InvalidRange {
                start: start.a1(),
                end: end.a1(),
            });
        }
        Ok(CellRange { start, end })
    }

    /// Number of rows covered
    pub fn num_rows(&self) -> usize {
        (self.end.row - self.start.row + 1) as usize
    }

    /// Number of columns covered
    pub fn num_cols(&self) -> usize {
        (self.end.col - self.start.col + 1) as usize
    }

    /// Number of cells covered
    pub fn cell_count(&self) -> usize {
        self.num_rows() * self.num_cols()
    }

    /// "A1:B5"-style notation
    pub fn notation(&self) -> String {
        format!("{}:{}", self.start.a1(), self.end.a1())
    }

    /// Iterate every coordinate in row-major order
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col).map(move |col| Coordinate { row, col })
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.notation())
    }
}
