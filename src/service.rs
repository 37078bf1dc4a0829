//! Remote sheet service integration
//!
//! This module defines the operations consumed from a spreadsheet backend and
//! the data it hands back. Wire formats, authentication and transport belong to
//! the implementor. [`crate::memory::MemorySheetService`] is an in-process
//! implementation.
//!
//! # Example
//!
//! ```no_run
//! use sheetsync::memory::MemorySheetService;
//! use sheetsync::service::{SheetService, SpreadsheetRef};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut service = MemorySheetService::new();
//! let spreadsheet = service.add_spreadsheet("budget");
//! let sheet = service.create_worksheet(&spreadsheet, "Q1", 10, 4)?;
//! let grid = service.read_all_values(&sheet)?;
//! assert!(grid.is_empty());
//! # Ok(())
//! # }
//! ```

use crate::permission::Permission;
use std::fmt;
use thiserror::Error;

/// Result type for raw service calls
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Classification of a service failure, drives retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ServiceErrorKind {
    /// Timeouts, short rate limits, 5xx responses
    Transient,
    /// Long-window quota exhausted; resets after a known period
    QuotaExceeded,
    /// Requested spreadsheet or worksheet does not exist
    NotFound,
    /// Anything else; never retried
    Fatal,
}

/// Error returned by a [`SheetService`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?} service error: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new<S: Into<String>>(kind: ServiceErrorKind, message: S) -> Self {
        ServiceError {
            kind,
            message: message.into(),
        }
    }

    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::new(ServiceErrorKind::Transient, message)
    }

    pub fn quota<S: Into<String>>(message: S) -> Self {
        Self::new(ServiceErrorKind::QuotaExceeded, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(ServiceErrorKind::NotFound, message)
    }

    pub fn fatal<S: Into<String>>(message: S) -> Self {
        Self::new(ServiceErrorKind::Fatal, message)
    }
}

/// Handle to a remote spreadsheet document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpreadsheetRef {
    pub id: String,
}

impl SpreadsheetRef {
    pub fn new<S: Into<String>>(id: S) -> Self {
        SpreadsheetRef { id: id.into() }
    }
}

/// Handle to one worksheet of a spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub sheet_id: u64,
    pub title: String,
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.title, self.sheet_id)
    }
}

/// How the service should treat written strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueInputMode {
    /// Parsed as if typed by a user (numbers, dates, formulas)
    Interpreted,
    /// Stored literally
    Raw,
}

/// How the service renders cell values on read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueRender {
    /// As displayed, with number formats applied
    #[default]
    Formatted,
    /// Underlying values without formatting
    Unformatted,
    /// Formulas instead of their results
    Formula,
}

/// An addressable cell returned by a range lookup, 1-based
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellHandle {
    pub row: u32,
    pub col: u32,
    pub value: String,
}

/// Rectangle on a sheet grid: 0-based, start inclusive, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridRange {
    pub sheet_id: u64,
    pub start_row: u32,
    pub end_row: u32,
    pub start_col: u32,
    pub end_col: u32,
}

impl GridRange {
    /// Whether the 0-based cell lies inside the range
    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.start_row..self.end_row).contains(&row)
            && (self.start_col..self.end_col).contains(&col)
    }
}

/// Structural properties of one worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetMetadata {
    pub sheet_id: u64,
    pub title: String,
    pub index: usize,
    pub row_count: u32,
    pub col_count: u32,
    pub frozen_rows: u32,
    pub frozen_cols: u32,
    pub merges: Vec<GridRange>,
    pub basic_filter: Option<GridRange>,
}

/// Point-in-time copy of a spreadsheet's structure
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpreadsheetMetadata {
    pub spreadsheet_id: String,
    pub title: String,
    pub sheets: Vec<SheetMetadata>,
}

impl SpreadsheetMetadata {
    /// Handle for the sheet described by `meta`
    pub fn sheet_ref(&self, meta: &SheetMetadata) -> SheetRef {
        SheetRef {
            spreadsheet_id: self.spreadsheet_id.clone(),
            sheet_id: meta.sheet_id,
            title: meta.title.clone(),
        }
    }

    pub fn sheet(&self, sheet_id: u64) -> Option<&SheetMetadata> {
        self.sheets.iter().find(|s| s.sheet_id == sheet_id)
    }
}

/// How cells inside a merge request are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeType {
    /// One merged cell for the whole range
    #[default]
    All,
    /// One merged cell per row
    Rows,
    /// One merged cell per column
    Columns,
}

/// Structural change applied through [`SheetService::batch_structural_update`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructuralRequest {
    /// Set frozen row and/or column counts; `None` leaves a count unchanged
    Freeze {
        sheet_id: u64,
        rows: Option<u32>,
        cols: Option<u32>,
    },
    /// Replace the sheet's basic filter
    SetBasicFilter { range: GridRange },
    MergeCells { range: GridRange, merge_type: MergeType },
    /// Unmerge every merged region intersecting the range
    UnmergeCells { range: GridRange },
}

/// Blocking operations consumed from a remote spreadsheet backend.
///
/// Every call is a request-response round trip. Implementations report failures
/// with a [`ServiceErrorKind`] so callers can decide what is worth retrying.
pub trait SheetService {
    /// All cell values of a sheet, trimmed to the used area and padded to a rectangle
    fn read_all_values(&mut self, sheet: &SheetRef) -> ServiceResult<Vec<Vec<String>>>;

    /// Values of whole columns (1-based), rendered with `render`. Each column runs
    /// from row 1 and stops at its last non-blank cell.
    fn read_columns(
        &mut self,
        sheet: &SheetRef,
        cols: &[u32],
        render: ValueRender,
    ) -> ServiceResult<Vec<Vec<String>>>;

    /// Cells of a range in row-major order, e.g. `"A1:C3"`
    fn read_range(&mut self, sheet: &SheetRef, range: &str) -> ServiceResult<Vec<CellHandle>>;

    /// Write the given cells in one batch
    fn write_cells(
        &mut self,
        sheet: &SheetRef,
        cells: &[CellHandle],
        mode: ValueInputMode,
    ) -> ServiceResult<()>;

    /// Set the sheet's grid dimensions
    fn resize_sheet(&mut self, sheet: &SheetRef, rows: u32, cols: u32) -> ServiceResult<()>;

    /// Structural snapshot of every sheet in the spreadsheet
    fn fetch_metadata(
        &mut self,
        spreadsheet: &SpreadsheetRef,
    ) -> ServiceResult<SpreadsheetMetadata>;

    /// Apply structural requests in one batch
    fn batch_structural_update(
        &mut self,
        spreadsheet: &SpreadsheetRef,
        requests: &[StructuralRequest],
    ) -> ServiceResult<()>;

    fn create_worksheet(
        &mut self,
        spreadsheet: &SpreadsheetRef,
        name: &str,
        rows: u32,
        cols: u32,
    ) -> ServiceResult<SheetRef>;

    fn delete_worksheet(
        &mut self,
        spreadsheet: &SpreadsheetRef,
        sheet: &SheetRef,
    ) -> ServiceResult<()>;

    /// Share the spreadsheet
    fn insert_permission(
        &mut self,
        spreadsheet: &SpreadsheetRef,
        permission: &Permission,
    ) -> ServiceResult<()>;

    fn list_permissions(&mut self, spreadsheet: &SpreadsheetRef) -> ServiceResult<Vec<Permission>>;
}
