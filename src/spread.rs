//! Table to sheet synchronization
//!
//! [`Spread`] holds one open spreadsheet, the currently open worksheet and a
//! cached metadata snapshot. Reads turn a worksheet into a [`Table`], writes push
//! a [`Table`] into a worksheet, chunking large writes and applying freeze,
//! filter and header merges afterwards.
//!
//! # Example
//!
//! ```no_run
//! use sheetsync::memory::MemorySheetService;
//! use sheetsync::spread::{ReadOptions, Spread, WriteOptions};
//! use sheetsync::table::Table;
//! use sheetsync::types::CellValue;
//! use sheetsync::SyncConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut service = MemorySheetService::new();
//! let doc = service.add_spreadsheet("report");
//! let mut spread = Spread::open(service, doc, SyncConfig::default())?;
//!
//! let table = Table::from_rows(
//!     ["Name", "Age"],
//!     vec![vec![CellValue::from("Alice"), CellValue::Int(30)]],
//! )?;
//! spread.table_to_sheet(&table, &WriteOptions::new().with_sheet("People").with_index(false))?;
//!
//! let back = spread.sheet_to_table(&ReadOptions::new().with_index(0))?;
//! assert_eq!(back.num_rows(), 1);
//! # Ok(())
//! # }
//! ```

use crate::address::to_coordinate;
use crate::chunk::plan_chunks;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::header::{check_header_width, header_rows_to_labels, labels_to_header_rows};
use crate::merge::repair_merges;
use crate::permission::{parse_permission, Permission};
use crate::requests::{
    filter_request, freeze_request, header_merge_requests, merge_request, unmerge_request,
};
use crate::retry::RetryPolicy;
use crate::service::{
    CellHandle, MergeType, ServiceErrorKind, SheetMetadata, SheetRef, SheetService,
    SpreadsheetMetadata, SpreadsheetRef, StructuralRequest, ValueInputMode, ValueRender,
};
use crate::table::{Column, ColumnLabel, Table};
use crate::types::{CellRange, CellRef, CellValue, Coordinate};
use std::fmt;

/// Worksheet selection by zero-based position or case-insensitive title
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl From<usize> for SheetSelector {
    fn from(index: usize) -> Self {
        SheetSelector::Index(index)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(name: String) -> Self {
        SheetSelector::Name(name)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(i) => write!(f, "#{}", i),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// Columns picked by position or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    /// 1-based positions. On write these count the table's data columns, on read
    /// the sheet's columns (the index column included).
    Positions(Vec<usize>),
    /// Column names, matched against any label level or the space-joined label
    Names(Vec<String>),
}

/// Options for [`Spread::sheet_to_table`]
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// 1-based column to use as the row index, 0 for none
    pub index: usize,
    /// Number of header rows
    pub header_rows: usize,
    /// 1-based row where the header (or data) starts
    pub start_row: usize,
    /// Replacement for blank cells in kept rows
    pub fill_value: String,
    /// Worksheet to open first
    pub sheet: Option<SheetSelector>,
    /// Columns re-read without number formatting
    pub unformatted_columns: Option<ColumnSelection>,
    /// Columns re-read as formulas. Applied after `unformatted_columns`.
    pub formula_columns: Option<ColumnSelection>,
}

impl ReadOptions {
    /// Index in column 1, one header row, starting at row 1
    pub fn new() -> Self {
        Self {
            index: 1,
            header_rows: 1,
            start_row: 1,
            fill_value: String::new(),
            sheet: None,
            unformatted_columns: None,
            formula_columns: None,
        }
    }

    /// Set the 1-based index column, 0 for none
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Set the number of header rows
    pub fn with_header_rows(mut self, rows: usize) -> Self {
        self.header_rows = rows;
        self
    }

    /// Set the 1-based first row to read
    pub fn with_start_row(mut self, row: usize) -> Self {
        self.start_row = row.max(1);
        self
    }

    /// Set the replacement for blank cells
    pub fn with_fill_value<S: Into<String>>(mut self, fill: S) -> Self {
        self.fill_value = fill.into();
        self
    }

    /// Open this worksheet before reading
    pub fn with_sheet<S: Into<SheetSelector>>(mut self, sheet: S) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Read these columns' underlying values instead of their formatted text
    pub fn with_unformatted_columns(mut self, columns: ColumnSelection) -> Self {
        self.unformatted_columns = Some(columns);
        self
    }

    /// Read these columns' formulas instead of their results
    pub fn with_formula_columns(mut self, columns: ColumnSelection) -> Self {
        self.formula_columns = Some(columns);
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for [`Spread::table_to_sheet`]
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Write the index as leading columns
    pub index: bool,
    /// Write header rows
    pub headers: bool,
    /// Top-left cell
    pub start: CellRef,
    /// Clear the sheet before writing
    pub replace: bool,
    pub sheet: Option<SheetSelector>,
    /// Create `sheet` when it doesn't exist
    pub create_sheet: bool,
    pub raw_columns: Option<ColumnSelection>,
    pub freeze_index: bool,
    pub freeze_headers: bool,
    /// Replacement for null values
    pub fill_value: String,
    pub add_filter: bool,
    /// Merge equal adjacent header cells
    pub merge_headers: bool,
    /// Join multi-level labels into one header row with this separator
    pub flatten_headers_sep: Option<String>,
}

impl WriteOptions {
    /// Replace nothing, write index and headers at A1, create a missing sheet
    pub fn new() -> Self {
        Self {
            index: true,
            headers: true,
            start: CellRef::Coordinate(1, 1),
            replace: false,
            sheet: None,
            create_sheet: true,
            raw_columns: None,
            freeze_index: false,
            freeze_headers: false,
            fill_value: String::new(),
            add_filter: false,
            merge_headers: false,
            flatten_headers_sep: None,
        }
    }

    /// Write the index as leading columns
    pub fn with_index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    /// Write the header rows
    pub fn with_headers(mut self, headers: bool) -> Self {
        self.headers = headers;
        self
    }

    /// Set the top-left cell
    pub fn with_start<C: Into<CellRef>>(mut self, start: C) -> Self {
        self.start = start.into();
        self
    }

    /// Clear and resize the sheet before writing
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Write into this worksheet
    pub fn with_sheet<S: Into<SheetSelector>>(mut self, sheet: S) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Create the target sheet when it doesn't exist
    pub fn with_create_sheet(mut self, create: bool) -> Self {
        self.create_sheet = create;
        self
    }

    /// Write these columns without interpretation by the service
    pub fn with_raw_columns(mut self, columns: ColumnSelection) -> Self {
        self.raw_columns = Some(columns);
        self
    }

    /// Freeze the index columns
    pub fn with_freeze_index(mut self, freeze: bool) -> Self {
        self.freeze_index = freeze;
        self
    }

    /// Freeze the header rows
    pub fn with_freeze_headers(mut self, freeze: bool) -> Self {
        self.freeze_headers = freeze;
        self
    }

    /// Set the replacement for null values
    pub fn with_fill_value<S: Into<String>>(mut self, fill: S) -> Self {
        self.fill_value = fill.into();
        self
    }

    /// Add a basic filter over the written area
    pub fn with_filter(mut self, add_filter: bool) -> Self {
        self.add_filter = add_filter;
        self
    }

    /// Merge equal adjacent header cells
    pub fn with_merge_headers(mut self, merge: bool) -> Self {
        self.merge_headers = merge;
        self
    }

    /// Join multi-level labels into one header row with `sep`
    pub fn with_flatten_headers<S: Into<String>>(mut self, sep: S) -> Self {
        self.flatten_headers_sep = Some(sep.into());
        self
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// An open spreadsheet with an optional open worksheet.
///
/// The metadata snapshot is owned by this instance and refreshed after every
/// structural change; share an instance across threads only behind a lock.
pub struct Spread<S: SheetService> {
    service: S,
    spreadsheet: SpreadsheetRef,
    sheet: Option<SheetRef>,
    metadata: SpreadsheetMetadata,
    config: SyncConfig,
    retry: RetryPolicy,
}

impl<S: SheetService> Spread<S> {
    /// Open a spreadsheet and its first worksheet
    pub fn open(service: S, spreadsheet: SpreadsheetRef, config: SyncConfig) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config);
        let mut spread = Spread {
            service,
            spreadsheet,
            sheet: None,
            metadata: SpreadsheetMetadata::default(),
            config,
            retry,
        };

        spread.refresh_metadata().map_err(|e| {
            let not_found = e
                .service_error()
                .is_some_and(|err| err.kind == ServiceErrorKind::NotFound);
            if not_found {
                SyncError::SpreadsheetNotFound(spread.spreadsheet.id.clone())
            } else {
                e
            }
        })?;

        if let Some(first) = spread.metadata.sheets.first() {
            spread.sheet = Some(spread.metadata.sheet_ref(first));
        }
        Ok(spread)
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn spreadsheet(&self) -> &SpreadsheetRef {
        &self.spreadsheet
    }

    /// Cached metadata snapshot
    pub fn metadata(&self) -> &SpreadsheetMetadata {
        &self.metadata
    }

    /// Currently open worksheet
    pub fn sheet(&self) -> Option<&SheetRef> {
        self.sheet.as_ref()
    }

    /// Snapshot of the open worksheet's structure
    pub fn sheet_metadata(&self) -> Result<&SheetMetadata> {
        self.sheet
            .as_ref()
            .and_then(|s| self.metadata.sheet(s.sheet_id))
            .ok_or(SyncError::NoOpenWorksheet)
    }

    /// Worksheets as of the last metadata refresh
    pub fn sheets(&self) -> Vec<SheetRef> {
        self.metadata
            .sheets
            .iter()
            .map(|m| self.metadata.sheet_ref(m))
            .collect()
    }

    pub fn url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}", self.spreadsheet.id)
    }

    /// Re-fetch the metadata snapshot. The open worksheet is dropped if it no
    /// longer exists.
    pub fn refresh_metadata(&mut self) -> Result<()> {
        let spreadsheet = &self.spreadsheet;
        let service = &mut self.service;
        self.metadata = self
            .retry
            .run("fetch metadata", || service.fetch_metadata(spreadsheet))?;
        log::debug!(
            "refreshed metadata for {}: {} sheets",
            self.spreadsheet.id,
            self.metadata.sheets.len()
        );

        if let Some(sheet_id) = self.sheet.as_ref().map(|s| s.sheet_id) {
            self.sheet = self
                .metadata
                .sheet(sheet_id)
                .map(|m| self.metadata.sheet_ref(m));
        }
        Ok(())
    }

    /// Find a worksheet by case-insensitive title
    pub fn find_sheet(&self, name: &str) -> Option<SheetRef> {
        self.metadata
            .sheets
            .iter()
            .find(|m| m.title.eq_ignore_ascii_case(name))
            .map(|m| self.metadata.sheet_ref(m))
    }

    /// Open a worksheet, creating it when `create` is set and it is selected by a
    /// name that doesn't exist yet
    pub fn open_sheet<T: Into<SheetSelector>>(&mut self, selector: T, create: bool) -> Result<()> {
        match selector.into() {
            SheetSelector::Index(index) => {
                let meta = self.metadata.sheets.get(index).ok_or_else(|| {
                    SyncError::WorksheetNotFound(format!("invalid sheet index {}", index))
                })?;
                self.sheet = Some(self.metadata.sheet_ref(meta));
            }
            SheetSelector::Name(name) => match self.find_sheet(&name) {
                Some(sheet) => self.sheet = Some(sheet),
                None if create => self.create_sheet(&name, 1, 1)?,
                None => return Err(SyncError::WorksheetNotFound(name)),
            },
        }
        Ok(())
    }

    /// Create a worksheet and open it. Not retried.
    pub fn create_sheet(&mut self, name: &str, rows: u32, cols: u32) -> Result<()> {
        let sheet = self
            .service
            .create_worksheet(&self.spreadsheet, name, rows, cols)?;
        log::debug!("created worksheet {}", sheet);
        self.refresh_metadata()?;
        self.sheet = Some(sheet);
        Ok(())
    }

    /// Delete a worksheet by title. Returns whether a sheet was found and deleted.
    pub fn delete_sheet(&mut self, name: &str) -> Result<bool> {
        let Some(sheet) = self.find_sheet(name) else {
            return Ok(false);
        };
        self.service.delete_worksheet(&self.spreadsheet, &sheet)?;
        if self.sheet.as_ref().is_some_and(|s| s.sheet_id == sheet.sheet_id) {
            self.sheet = None;
        }
        self.refresh_metadata()?;
        Ok(true)
    }

    /// (rows, cols) of the open worksheet
    pub fn sheet_dims(&self) -> Result<(u32, u32)> {
        let meta = self.sheet_metadata()?;
        Ok((meta.row_count, meta.col_count))
    }

    fn ensure_sheet(&mut self, selector: Option<&SheetSelector>, create: bool) -> Result<SheetRef> {
        if let Some(selector) = selector {
            self.open_sheet(selector.clone(), create)?;
        }
        self.sheet.clone().ok_or(SyncError::NoOpenWorksheet)
    }

    /// Write `values` (row-major) into `start..=end` of the open worksheet.
    ///
    /// The write is split into chunks of at most `max_cells_per_request` cells.
    /// Cells in `raw_columns` (1-based sheet columns) are written as raw input in
    /// a separate batch. A failure part way leaves earlier chunks written.
    pub fn update_cells<A, B>(
        &mut self,
        start: A,
        end: B,
        values: Vec<String>,
        raw_columns: &[u32],
    ) -> Result<()>
    where
        A: Into<CellRef>,
        B: Into<CellRef>,
    {
        let sheet = self.ensure_sheet(None, false)?;
        let start = to_coordinate(start)?;
        let end = to_coordinate(end)?;

        for chunk in plan_chunks(start, end, values, self.config.max_cells_per_request)? {
            let notation = chunk.range.notation();
            let service = &mut self.service;
            let mut cells = self.retry.run(&format!("read range {}", notation), || {
                service.read_range(&sheet, &notation)
            })?;

            if cells.len() != chunk.values.len() {
                return Err(SyncError::CellCountMismatch {
                    expected: cells.len(),
                    actual: chunk.values.len(),
                });
            }
            for (cell, value) in cells.iter_mut().zip(chunk.values) {
                cell.value = value;
            }

            let (raw, interpreted): (Vec<CellHandle>, Vec<CellHandle>) =
                cells.into_iter().partition(|c| raw_columns.contains(&c.col));

            for (mode, batch) in [
                (ValueInputMode::Raw, raw),
                (ValueInputMode::Interpreted, interpreted),
            ] {
                if batch.is_empty() {
                    continue;
                }
                log::debug!("writing {} cells to {} ({:?})", batch.len(), notation, mode);
                self.retry.run(&format!("write range {}", notation), || {
                    service.write_cells(&sheet, &batch, mode)
                })?;
            }
        }
        Ok(())
    }

    /// Reset the open worksheet to a blank sheet of at least `rows` x `cols`.
    ///
    /// The size never drops to or below the frozen row/column counts.
    pub fn clear_sheet(&mut self, rows: u32, cols: u32) -> Result<()> {
        let meta = self.sheet_metadata()?;
        let (frozen_rows, frozen_cols) = (meta.frozen_rows, meta.frozen_cols);
        self.clear_with_frozen(rows, cols, frozen_rows, frozen_cols)
    }

    fn clear_with_frozen(
        &mut self,
        rows: u32,
        cols: u32,
        frozen_rows: u32,
        frozen_cols: u32,
    ) -> Result<()> {
        let rows = rows.max(frozen_rows + 1);
        let cols = cols.max(frozen_cols + 1);
        self.resize(rows, cols)?;

        let blanks = vec![String::new(); rows as usize * cols as usize];
        self.update_cells(Coordinate { row: 1, col: 1 }, (rows, cols), blanks, &[])
    }

    fn resize(&mut self, rows: u32, cols: u32) -> Result<()> {
        let sheet = self.ensure_sheet(None, false)?;
        let service = &mut self.service;
        self.retry.run("resize sheet", || service.resize_sheet(&sheet, rows, cols))?;
        log::debug!("resized {} to {}x{}", sheet, rows, cols);
        self.refresh_metadata()
    }

    fn apply_structural(&mut self, requests: &[StructuralRequest]) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }
        self.service
            .batch_structural_update(&self.spreadsheet, requests)?;
        self.refresh_metadata()
    }

    /// Freeze rows and/or columns; `Some(0)` unfreezes
    pub fn freeze(&mut self, rows: Option<u32>, cols: Option<u32>) -> Result<()> {
        let sheet = self.ensure_sheet(None, false)?;
        match freeze_request(sheet.sheet_id, rows, cols) {
            Some(request) => self.apply_structural(&[request]),
            None => Ok(()),
        }
    }

    /// Range from `start` (default A1) to `end` (default the last cell)
    fn range_or_sheet(&self, start: Option<CellRef>, end: Option<CellRef>) -> Result<CellRange> {
        let start = match start {
            Some(cell) => to_coordinate(cell)?,
            None => Coordinate { row: 1, col: 1 },
        };
        let end = match end {
            Some(cell) => to_coordinate(cell)?,
            None => {
                let (rows, cols) = self.sheet_dims()?;
                Coordinate::new(rows, cols)?
            }
        };
        CellRange::new(start, end)
    }

    /// Set a basic filter over `start..=end`, defaulting to the whole sheet
    pub fn add_filter(&mut self, start: Option<CellRef>, end: Option<CellRef>) -> Result<()> {
        let sheet = self.ensure_sheet(None, false)?;
        let range = self.range_or_sheet(start, end)?;
        self.apply_structural(&[filter_request(sheet.sheet_id, &range)])
    }

    pub fn merge_cells<A, B>(&mut self, start: A, end: B, merge_type: MergeType) -> Result<()>
    where
        A: Into<CellRef>,
        B: Into<CellRef>,
    {
        let sheet = self.ensure_sheet(None, false)?;
        let range = CellRange::new(to_coordinate(start)?, to_coordinate(end)?)?;
        self.apply_structural(&[merge_request(sheet.sheet_id, &range, merge_type)])
    }

    /// Unmerge everything in `start..=end`, defaulting to the whole sheet
    pub fn unmerge_cells(&mut self, start: Option<CellRef>, end: Option<CellRef>) -> Result<()> {
        let sheet = self.ensure_sheet(None, false)?;
        let range = self.range_or_sheet(start, end)?;
        self.apply_structural(&[unmerge_request(sheet.sheet_id, &range)])
    }

    /// Share the spreadsheet, see [`crate::permission`] for the format
    pub fn add_permission(&mut self, permission: &str) -> Result<()> {
        let permission = parse_permission(permission)?;
        self.service
            .insert_permission(&self.spreadsheet, &permission)?;
        Ok(())
    }

    pub fn add_permissions<I, T>(&mut self, permissions: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for permission in permissions {
            self.add_permission(permission.as_ref())?;
        }
        Ok(())
    }

    pub fn list_permissions(&mut self) -> Result<Vec<Permission>> {
        let spreadsheet = &self.spreadsheet;
        let service = &mut self.service;
        Ok(self
            .retry
            .run("list permissions", || service.list_permissions(spreadsheet))?)
    }

    /// Read a worksheet into a table.
    ///
    /// Merged regions are filled with their top-left value before the header is
    /// parsed. Rows that are blank throughout are dropped, blanks in other rows
    /// become `fill_value`. Every cell comes back as a string.
    pub fn sheet_to_table(&mut self, options: &ReadOptions) -> Result<Table> {
        let sheet = self.ensure_sheet(options.sheet.as_ref(), false)?;
        let service = &mut self.service;
        let mut grid = self
            .retry
            .run("read all values", || service.read_all_values(&sheet))?;

        let merges = &self.sheet_metadata()?.merges;
        let applied = repair_merges(&mut grid, merges);
        if applied < merges.len() {
            self.config.diagnostics.notice(&format!(
                "{} of {} merged regions lie outside the data of {}",
                merges.len() - applied,
                merges.len(),
                sheet
            ));
        }

        let body: Vec<Vec<String>> = grid
            .into_iter()
            .skip(options.start_row.saturating_sub(1))
            .collect();
        let labels = header_rows_to_labels(&body, options.header_rows);
        let header_count = if labels.is_some() {
            options.header_rows.min(body.len())
        } else {
            0
        };

        // 0-based sheet row of each kept data row
        let first_data_row = options.start_row.saturating_sub(1) + header_count;
        let (sheet_rows, mut data): (Vec<usize>, Vec<Vec<String>>) = body
            .into_iter()
            .skip(header_count)
            .enumerate()
            .filter(|(_, row)| row.iter().any(|cell| !cell.is_empty()))
            .map(|(i, row)| (first_data_row + i, row))
            .unzip();
        let width = data.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut data {
            row.resize(width, String::new());
        }

        let generated = labels.is_none();
        let labels = match labels {
            Some(labels) => {
                check_header_width(labels.len(), width, data.len())?;
                labels
            }
            None => (0..width).map(|i| ColumnLabel::single(i.to_string())).collect(),
        };

        // Formula columns go last so they win over unformatted ones
        for (selection, render) in [
            (&options.unformatted_columns, ValueRender::Unformatted),
            (&options.formula_columns, ValueRender::Formula),
        ] {
            let Some(selection) = selection else {
                continue;
            };
            let cols = self.selected_sheet_columns(selection, &labels, 1, "re-read");
            let cols: Vec<u32> = cols.into_iter().filter(|&c| c as usize <= width).collect();
            if cols.is_empty() {
                continue;
            }
            let service = &mut self.service;
            let rendered = self.retry.run("read columns", || {
                service.read_columns(&sheet, &cols, render)
            })?;
            for (col, values) in cols.iter().zip(rendered) {
                let col = *col as usize - 1;
                for (row, &sheet_row) in data.iter_mut().zip(&sheet_rows) {
                    row[col] = values.get(sheet_row).cloned().unwrap_or_default();
                }
            }
        }

        for row in &mut data {
            for cell in row.iter_mut().filter(|c| c.is_empty()) {
                cell.clone_from(&options.fill_value);
            }
        }

        let columns = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let values = data
                    .iter()
                    .map(|row| CellValue::String(row[i].clone()))
                    .collect();
                Column::new(label, values)
            })
            .collect();
        let mut table = Table::new(columns)?;

        if options.index > 0 && options.index <= table.num_columns() {
            table.set_index(options.index - 1)?;
            if generated {
                table.clear_index_names();
            }
        }
        log::debug!(
            "read {} rows x {} columns from {}",
            table.num_rows(),
            table.num_columns(),
            sheet
        );
        Ok(table)
    }

    /// Write a table into a worksheet.
    ///
    /// The sheet grows to fit (or, with `replace`, is cleared and sized to fit),
    /// values go out in chunks, then freeze/filter/header merges are applied in
    /// one structural batch and the metadata snapshot is refreshed.
    pub fn table_to_sheet(&mut self, table: &Table, options: &WriteOptions) -> Result<()> {
        self.ensure_sheet(options.sheet.as_ref(), options.create_sheet)?;
        let start_meta = self.sheet_metadata()?.clone();

        let mut table = table.clone();
        let data_labels = table.labels();
        let index_columns = if options.index {
            table.index_levels()
        } else {
            0
        };
        if options.index {
            table.reset_index();
        }
        table.fillna(&options.fill_value);

        let header_rows = if options.headers {
            labels_to_header_rows(
                &table.labels(),
                options.index,
                index_columns,
                options.flatten_headers_sep.as_deref(),
            )
        } else {
            Vec::new()
        };
        let header_height = header_rows.len() as u32;

        let mut rows = header_rows.clone();
        rows.extend(
            table
                .to_rows()
                .iter()
                .map(|row| row.iter().map(CellValue::as_string).collect::<Vec<_>>()),
        );

        let start = to_coordinate(options.start.clone())?;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let req_rows = (rows.len() as u32 + start.row - 1).max(1);
        let req_cols = (width + start.col - 1).max(1);

        if options.replace {
            self.clear_with_frozen(
                req_rows,
                req_cols,
                start_meta.frozen_rows,
                start_meta.frozen_cols,
            )?;
            if !start_meta.merges.is_empty() {
                self.unmerge_cells(None, None)?;
            }
        } else if req_rows > start_meta.row_count || req_cols > start_meta.col_count {
            self.resize(
                start_meta.row_count.max(req_rows),
                start_meta.col_count.max(req_cols),
            )?;
        }

        let raw_columns = match &options.raw_columns {
            Some(raw) => self.selected_sheet_columns(
                raw,
                &data_labels,
                start.col + index_columns as u32,
                "write raw",
            ),
            None => Vec::new(),
        };

        let values: Vec<String> = rows.into_iter().flatten().collect();
        if !values.is_empty() {
            self.update_cells(start, (req_rows, req_cols), values, &raw_columns)?;
        }

        let sheet = self.ensure_sheet(None, false)?;
        let mut requests = Vec::new();

        let freeze_rows = options
            .freeze_headers
            .then(|| header_height + start.row - 1);
        let freeze_cols = options
            .freeze_index
            .then(|| index_columns as u32 + start.col - 1);
        requests.extend(freeze_request(sheet.sheet_id, freeze_rows, freeze_cols));

        if options.add_filter {
            let top = (start.row + header_height).saturating_sub(1).max(start.row);
            let range = CellRange::new(
                Coordinate::new(top.min(req_rows), start.col)?,
                Coordinate::new(req_rows, req_cols)?,
            )?;
            requests.push(filter_request(sheet.sheet_id, &range));
        }

        if options.merge_headers && header_height > 0 {
            requests.extend(header_merge_requests(
                sheet.sheet_id,
                &header_rows,
                start,
                index_columns,
            ));
        }

        if !requests.is_empty() {
            self.service
                .batch_structural_update(&self.spreadsheet, &requests)?;
        }
        self.refresh_metadata()
    }

    /// Map a column selection to 1-based sheet columns. `first_col` is the sheet
    /// column of the first labelled column.
    fn selected_sheet_columns(
        &self,
        selection: &ColumnSelection,
        labels: &[ColumnLabel],
        first_col: u32,
        purpose: &str,
    ) -> Vec<u32> {
        match selection {
            ColumnSelection::Positions(positions) => positions
                .iter()
                .filter(|&&p| p > 0)
                .map(|&p| first_col + p as u32 - 1)
                .collect(),
            ColumnSelection::Names(names) => names
                .iter()
                .filter_map(|name| {
                    let position = labels.iter().position(|l| l.matches(name));
                    if position.is_none() {
                        self.config
                            .diagnostics
                            .notice(&format!("column '{}' to {} not found", name, purpose));
                    }
                    position.map(|p| first_col + p as u32)
                })
                .collect(),
        }
    }
}

impl<S: SheetService> fmt::Debug for Spread<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spread")
            .field("spreadsheet", &self.metadata.title)
            .field("sheet", &self.sheet.as_ref().map(|s| s.title.as_str()))
            .finish_non_exhaustive()
    }
}
