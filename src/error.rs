//! Error types for sheetsync

use crate::service::{ServiceError, ServiceErrorKind};
use thiserror::Error;

/// Result type alias for sheetsync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for all table/sheet operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// Malformed cell address or coordinate
    #[error("Invalid cell format: {0}")]
    InvalidCellFormat(String),

    /// Range whose start lies below or right of its end
    #[error("Invalid range {start}:{end}, start must not exceed end")]
    InvalidRange { start: String, end: String },

    /// Number of values does not match the number of target cells
    #[error("Number of values ({actual}) doesn't match number of cells ({expected})")]
    CellCountMismatch { expected: usize, actual: usize },

    /// Parsed header labels disagree with the data width
    #[error("Sheet has {headers} header labels but {columns} data columns")]
    HeaderColumnMismatch { headers: usize, columns: usize },

    /// Worksheet lookup failed and creation was not requested
    #[error("Worksheet not found: {0}")]
    WorksheetNotFound(String),

    /// Spreadsheet lookup failed
    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    /// Operation needs an open worksheet
    #[error("No open worksheet")]
    NoOpenWorksheet,

    /// Table construction or mutation broke a table invariant
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// Malformed permission string
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),

    /// Error reported by the sheet service, surfaced as-is after retries
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl SyncError {
    /// Whether this error came from the service and was classified as transient
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Service(e) if e.kind == ServiceErrorKind::Transient)
    }

    /// The underlying service error, if any
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            SyncError::Service(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_is_transparent() {
        let err: SyncError = ServiceError::transient("backend timed out").into();
        assert_eq!(err.to_string(), ServiceError::transient("backend timed out").to_string());
        assert!(err.is_transient());
        assert_eq!(err.service_error().map(|e| e.kind), Some(ServiceErrorKind::Transient));
    }

    #[test]
    fn test_mismatch_message() {
        let err = SyncError::CellCountMismatch {
            expected: 6,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "Number of values (5) doesn't match number of cells (6)"
        );
        assert!(!err.is_transient());
    }
}
