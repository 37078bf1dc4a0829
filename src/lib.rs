//! # sheetsync
//!
//! Synchronize in-memory tables with worksheets of a remote spreadsheet service.
//!
//! ## Features
//!
//! - **Table to sheet**: Write labelled tables, including multi-level headers and indexes
//! - **Sheet to table**: Read worksheets back, repairing merged cells and header blanks
//! - **Chunked writes**: Large writes are split to stay under per-request cell limits
//! - **Retries**: Transient and quota failures are retried with a bounded budget
//! - **Formatting**: Freeze panes, basic filters and merged header cells
//! - **Pluggable backend**: Anything implementing [`SheetService`], with an in-memory
//!   implementation for offline use and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sheetsync::memory::MemorySheetService;
//! use sheetsync::types::CellValue;
//! use sheetsync::{ReadOptions, Spread, SyncConfig, Table, WriteOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut service = MemorySheetService::new();
//! let doc = service.add_spreadsheet("inventory");
//! let mut spread = Spread::open(service, doc, SyncConfig::default())?;
//!
//! let table = Table::from_rows(
//!     ["Item", "Qty"],
//!     vec![
//!         vec![CellValue::from("bolts"), CellValue::Int(120)],
//!         vec![CellValue::from("nuts"), CellValue::Null],
//!     ],
//! )?;
//!
//! // Write with a frozen header row and a filter
//! let options = WriteOptions::new()
//!     .with_sheet("Stock")
//!     .with_index(false)
//!     .with_freeze_headers(true)
//!     .with_filter(true);
//! spread.table_to_sheet(&table, &options)?;
//!
//! let back = spread.sheet_to_table(&ReadOptions::new().with_index(0))?;
//! println!("{:?}", back.labels());
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod chunk;
pub mod config;
pub mod error;
pub mod header;
pub mod memory;
pub mod merge;
pub mod permission;
pub mod requests;
pub mod retry;
pub mod service;
pub mod spread;
pub mod table;
pub mod types;

pub use config::{DiagnosticSink, LogSink, SyncConfig};
pub use error::{Result, SyncError};
pub use service::{ServiceError, ServiceErrorKind, SheetService};
pub use spread::{ColumnSelection, ReadOptions, SheetSelector, Spread, WriteOptions};
pub use table::{Column, ColumnLabel, Index, Table};
pub use types::{CellRange, CellRef, CellValue, Coordinate};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_imports() {
        let _ = std::marker::PhantomData::<SyncError>;
        let _ = std::marker::PhantomData::<Spread<memory::MemorySheetService>>;
        let _ = std::marker::PhantomData::<Table>;
    }
}
