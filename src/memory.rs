//! In-process sheet service
//!
//! Keeps spreadsheets in memory and mimics the remote service closely enough to
//! drive the synchronizer offline: reads trim to the used area, merges keep only
//! their top-left value, resizes can't drop frozen rows. Failures can be injected
//! per operation to exercise retry paths.

use crate::address::parse_range_notation;
use crate::permission::Permission;
use crate::service::{
    CellHandle, GridRange, MergeType, ServiceError, ServiceResult, SheetMetadata, SheetRef,
    SheetService, SpreadsheetMetadata, SpreadsheetRef, StructuralRequest, ValueInputMode,
    ValueRender,
};
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

/// Service operations, used to inject failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadAllValues,
    ReadColumns,
    ReadRange,
    WriteCells,
    ResizeSheet,
    FetchMetadata,
    BatchStructuralUpdate,
    CreateWorksheet,
    DeleteWorksheet,
    InsertPermission,
    ListPermissions,
}

/// One `write_cells` batch as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub sheet_id: u64,
    pub mode: ValueInputMode,
    /// 1-based (row, col) of every written cell
    pub cells: Vec<(u32, u32)>,
}

#[derive(Debug, Clone)]
struct MemorySheet {
    id: u64,
    title: String,
    cells: Vec<Vec<String>>,
    col_count: u32,
    frozen_rows: u32,
    frozen_cols: u32,
    merges: Vec<GridRange>,
    filter: Option<GridRange>,
    /// Per-cell values for non-default renders, keyed by 0-based (row, col)
    rendered: HashMap<(ValueRender, usize, usize), String>,
}

impl MemorySheet {
    fn new(id: u64, title: &str, rows: u32, cols: u32) -> Self {
        MemorySheet {
            id,
            title: title.to_string(),
            cells: vec![vec![String::new(); cols as usize]; rows as usize],
            col_count: cols,
            frozen_rows: 0,
            frozen_cols: 0,
            merges: Vec::new(),
            filter: None,
            rendered: HashMap::new(),
        }
    }

    fn row_count(&self) -> u32 {
        self.cells.len() as u32
    }

    fn resize(&mut self, rows: u32, cols: u32) {
        self.cells.resize(rows as usize, vec![String::new(); cols as usize]);
        for row in &mut self.cells {
            row.resize(cols as usize, String::new());
        }
        self.col_count = cols;
        self.rendered
            .retain(|&(_, r, c), _| r < rows as usize && c < cols as usize);
    }

    fn rendered_value(&self, row: usize, col: usize, render: ValueRender) -> &str {
        self.rendered
            .get(&(render, row, col))
            .unwrap_or(&self.cells[row][col])
    }

    fn check_bounds(&self, row: u32, col: u32) -> ServiceResult<()> {
        if row == 0 || col == 0 || row > self.row_count() || col > self.col_count {
            return Err(ServiceError::fatal(format!(
                "cell ({}, {}) exceeds grid limits of sheet '{}' ({}x{})",
                row,
                col,
                self.title,
                self.row_count(),
                self.col_count
            )));
        }
        Ok(())
    }

    fn used_area(&self) -> Vec<Vec<String>> {
        let last_row = self
            .cells
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map_or(0, |r| r + 1);
        let last_col = self.cells[..last_row]
            .iter()
            .filter_map(|row| row.iter().rposition(|c| !c.is_empty()))
            .max()
            .map_or(0, |c| c + 1);
        self.cells[..last_row]
            .iter()
            .map(|row| row[..last_col].to_vec())
            .collect()
    }

    fn metadata(&self, index: usize) -> SheetMetadata {
        SheetMetadata {
            sheet_id: self.id,
            title: self.title.clone(),
            index,
            row_count: self.row_count(),
            col_count: self.col_count,
            frozen_rows: self.frozen_rows,
            frozen_cols: self.frozen_cols,
            merges: self.merges.clone(),
            basic_filter: self.filter,
        }
    }

    fn merge(&mut self, range: GridRange) -> ServiceResult<()> {
        if range.end_row > self.row_count() || range.end_col > self.col_count {
            return Err(ServiceError::fatal("merge range exceeds grid limits"));
        }
        if self.merges.iter().any(|m| intersects(m, &range)) {
            return Err(ServiceError::fatal(
                "you must select all cells in a merged range to merge or unmerge them",
            ));
        }
        let value = self.cells[range.start_row as usize][range.start_col as usize].clone();
        for row in range.start_row..range.end_row {
            for col in range.start_col..range.end_col {
                self.cells[row as usize][col as usize] = String::new();
            }
        }
        self.cells[range.start_row as usize][range.start_col as usize] = value;
        self.merges.push(range);
        Ok(())
    }
}

fn intersects(a: &GridRange, b: &GridRange) -> bool {
    a.start_row < b.end_row
        && b.start_row < a.end_row
        && a.start_col < b.end_col
        && b.start_col < a.end_col
}

#[derive(Debug, Clone, Default)]
struct MemorySpreadsheet {
    title: String,
    sheets: Vec<MemorySheet>,
    permissions: Vec<Permission>,
}

/// In-memory [`SheetService`]
#[derive(Debug, Default)]
pub struct MemorySheetService {
    spreadsheets: IndexMap<String, MemorySpreadsheet>,
    next_sheet_id: u64,
    failures: HashMap<Operation, VecDeque<ServiceError>>,
    calls: HashMap<Operation, usize>,
    writes: Vec<WriteRecord>,
}

impl MemorySheetService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a spreadsheet with one empty 1000x26 worksheet named "Sheet1"
    pub fn add_spreadsheet(&mut self, title: &str) -> SpreadsheetRef {
        let id = format!("spreadsheet-{}", self.spreadsheets.len() + 1);
        let sheet = MemorySheet::new(self.allocate_sheet_id(), "Sheet1", 1000, 26);
        self.spreadsheets.insert(
            id.clone(),
            MemorySpreadsheet {
                title: title.to_string(),
                sheets: vec![sheet],
                permissions: Vec::new(),
            },
        );
        SpreadsheetRef::new(id)
    }

    /// Make the next call of `op` fail with `error`; queued failures are used in order
    pub fn fail_next(&mut self, op: Operation, error: ServiceError) {
        self.failures.entry(op).or_default().push_back(error);
    }

    /// Number of calls made to `op`, failed ones included
    pub fn calls(&self, op: Operation) -> usize {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> &[WriteRecord] {
        &self.writes
    }

    /// Full grid of a sheet, blanks included
    pub fn grid(&self, sheet: &SheetRef) -> Option<&[Vec<String>]> {
        self.find_sheet(sheet).ok().map(|s| s.cells.as_slice())
    }

    /// Overwrite a sheet's contents from the top-left corner, growing it as needed
    pub fn load_grid(&mut self, sheet: &SheetRef, grid: Vec<Vec<String>>) -> ServiceResult<()> {
        let target = self.find_sheet_mut(sheet)?;
        let rows = (grid.len() as u32).max(target.row_count());
        let cols = (grid.iter().map(Vec::len).max().unwrap_or(0) as u32).max(target.col_count);
        target.resize(rows, cols);
        for (r, row) in grid.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                target.cells[r][c] = value;
            }
        }
        Ok(())
    }

    /// Set what a cell reads as under `render`, e.g. the formula behind a
    /// formatted value. `row` and `col` are 1-based.
    pub fn set_rendered(
        &mut self,
        sheet: &SheetRef,
        row: u32,
        col: u32,
        render: ValueRender,
        value: &str,
    ) -> ServiceResult<()> {
        let target = self.find_sheet_mut(sheet)?;
        target.check_bounds(row, col)?;
        target.rendered.insert(
            (render, row as usize - 1, col as usize - 1),
            value.to_string(),
        );
        Ok(())
    }

    fn allocate_sheet_id(&mut self) -> u64 {
        self.next_sheet_id += 1;
        self.next_sheet_id
    }

    fn record(&mut self, op: Operation) -> ServiceResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn spreadsheet_mut(&mut self, id: &str) -> ServiceResult<&mut MemorySpreadsheet> {
        self.spreadsheets
            .get_mut(id)
            .ok_or_else(|| ServiceError::not_found(format!("spreadsheet {} not found", id)))
    }

    fn find_sheet(&self, sheet: &SheetRef) -> ServiceResult<&MemorySheet> {
        self.spreadsheets
            .get(&sheet.spreadsheet_id)
            .and_then(|s| s.sheets.iter().find(|m| m.id == sheet.sheet_id))
            .ok_or_else(|| ServiceError::not_found(format!("worksheet {} not found", sheet)))
    }

    fn find_sheet_mut(&mut self, sheet: &SheetRef) -> ServiceResult<&mut MemorySheet> {
        self.spreadsheets
            .get_mut(&sheet.spreadsheet_id)
            .and_then(|s| s.sheets.iter_mut().find(|m| m.id == sheet.sheet_id))
            .ok_or_else(|| ServiceError::not_found(format!("worksheet {} not found", sheet)))
    }
}

impl SheetService for MemorySheetService {
    fn read_all_values(&mut self, sheet: &SheetRef) -> ServiceResult<Vec<Vec<String>>> {
        self.record(Operation::ReadAllValues)?;
        Ok(self.find_sheet(sheet)?.used_area())
    }

    fn read_columns(
        &mut self,
        sheet: &SheetRef,
        cols: &[u32],
        render: ValueRender,
    ) -> ServiceResult<Vec<Vec<String>>> {
        self.record(Operation::ReadColumns)?;
        let target = self.find_sheet(sheet)?;
        cols.iter()
            .map(|&col| {
                target.check_bounds(1, col)?;
                let col = col as usize - 1;
                let mut values: Vec<String> = (0..target.cells.len())
                    .map(|row| target.rendered_value(row, col, render).to_string())
                    .collect();
                let used = values.iter().rposition(|v| !v.is_empty()).map_or(0, |r| r + 1);
                values.truncate(used);
                Ok(values)
            })
            .collect()
    }

    fn read_range(&mut self, sheet: &SheetRef, range: &str) -> ServiceResult<Vec<CellHandle>> {
        self.record(Operation::ReadRange)?;
        let range = parse_range_notation(range).map_err(|e| ServiceError::fatal(e.to_string()))?;
        let target = self.find_sheet(sheet)?;
        target.check_bounds(range.end.row, range.end.col)?;
        Ok(range
            .coordinates()
            .map(|c| CellHandle {
                row: c.row,
                col: c.col,
                value: target.cells[c.row as usize - 1][c.col as usize - 1].clone(),
            })
            .collect())
    }

    fn write_cells(
        &mut self,
        sheet: &SheetRef,
        cells: &[CellHandle],
        mode: ValueInputMode,
    ) -> ServiceResult<()> {
        self.record(Operation::WriteCells)?;
        let target = self.find_sheet_mut(sheet)?;
        for cell in cells {
            target.check_bounds(cell.row, cell.col)?;
        }
        for cell in cells {
            let (row, col) = (cell.row as usize - 1, cell.col as usize - 1);
            target.cells[row][col].clone_from(&cell.value);
            target.rendered.retain(|&(_, r, c), _| (r, c) != (row, col));
        }
        self.writes.push(WriteRecord {
            sheet_id: sheet.sheet_id,
            mode,
            cells: cells.iter().map(|c| (c.row, c.col)).collect(),
        });
        Ok(())
    }

    fn resize_sheet(&mut self, sheet: &SheetRef, rows: u32, cols: u32) -> ServiceResult<()> {
        self.record(Operation::ResizeSheet)?;
        let target = self.find_sheet_mut(sheet)?;
        if rows == 0 || cols == 0 {
            return Err(ServiceError::fatal("sheet must keep at least one row and column"));
        }
        if rows <= target.frozen_rows || cols <= target.frozen_cols {
            return Err(ServiceError::fatal(format!(
                "can't resize to {}x{}: {} frozen rows and {} frozen columns must stay, \
                 plus one more",
                rows, cols, target.frozen_rows, target.frozen_cols
            )));
        }
        target.resize(rows, cols);
        Ok(())
    }

    fn fetch_metadata(
        &mut self,
        spreadsheet: &SpreadsheetRef,
    ) -> ServiceResult<SpreadsheetMetadata> {
        self.record(Operation::FetchMetadata)?;
        let doc = self.spreadsheet_mut(&spreadsheet.id)?;
        Ok(SpreadsheetMetadata {
            spreadsheet_id: spreadsheet.id.clone(),
            title: doc.title.clone(),
            sheets: doc.sheets.iter().enumerate().map(|(i, s)| s.metadata(i)).collect(),
        })
    }

    fn batch_structural_update(
        &mut self,
        spreadsheet: &SpreadsheetRef,
        requests: &[StructuralRequest],
    ) -> ServiceResult<()> {
        self.record(Operation::BatchStructuralUpdate)?;
        let doc = self.spreadsheet_mut(&spreadsheet.id)?;

        for request in requests {
            let sheet_id = match request {
                StructuralRequest::Freeze { sheet_id, .. } => *sheet_id,
                StructuralRequest::SetBasicFilter { range }
                | StructuralRequest::MergeCells { range, .. }
                | StructuralRequest::UnmergeCells { range } => range.sheet_id,
            };
            let sheet = doc
                .sheets
                .iter_mut()
                .find(|s| s.id == sheet_id)
                .ok_or_else(|| ServiceError::not_found(format!("no sheet with id {}", sheet_id)))?;

            match request {
                StructuralRequest::Freeze { rows, cols, .. } => {
                    if rows.is_some_and(|r| r >= sheet.row_count())
                        || cols.is_some_and(|c| c >= sheet.col_count)
                    {
                        return Err(ServiceError::fatal(
                            "can't freeze all rows or columns of a sheet",
                        ));
                    }
                    if let Some(rows) = rows {
                        sheet.frozen_rows = *rows;
                    }
                    if let Some(cols) = cols {
                        sheet.frozen_cols = *cols;
                    }
                }
                StructuralRequest::SetBasicFilter { range } => sheet.filter = Some(*range),
                StructuralRequest::MergeCells { range, merge_type } => match merge_type {
                    MergeType::All => sheet.merge(*range)?,
                    MergeType::Rows => {
                        for row in range.start_row..range.end_row {
                            sheet.merge(GridRange {
                                start_row: row,
                                end_row: row + 1,
                                ..*range
                            })?;
                        }
                    }
                    MergeType::Columns => {
                        for col in range.start_col..range.end_col {
                            sheet.merge(GridRange {
                                start_col: col,
                                end_col: col + 1,
                                ..*range
                            })?;
                        }
                    }
                },
                StructuralRequest::UnmergeCells { range } => {
                    sheet.merges.retain(|m| !intersects(m, range));
                }
            }
        }
        Ok(())
    }

    fn create_worksheet(
        &mut self,
        spreadsheet: &SpreadsheetRef,
        name: &str,
        rows: u32,
        cols: u32,
    ) -> ServiceResult<SheetRef> {
        self.record(Operation::CreateWorksheet)?;
        let id = self.allocate_sheet_id();
        let doc = self.spreadsheet_mut(&spreadsheet.id)?;
        if doc.sheets.iter().any(|s| s.title.eq_ignore_ascii_case(name)) {
            return Err(ServiceError::fatal(format!(
                "a sheet with the name \"{}\" already exists",
                name
            )));
        }
        doc.sheets.push(MemorySheet::new(id, name, rows.max(1), cols.max(1)));
        Ok(SheetRef {
            spreadsheet_id: spreadsheet.id.clone(),
            sheet_id: id,
            title: name.to_string(),
        })
    }

    fn delete_worksheet(
        &mut self,
        spreadsheet: &SpreadsheetRef,
        sheet: &SheetRef,
    ) -> ServiceResult<()> {
        self.record(Operation::DeleteWorksheet)?;
        let doc = self.spreadsheet_mut(&spreadsheet.id)?;
        let position = doc
            .sheets
            .iter()
            .position(|s| s.id == sheet.sheet_id)
            .ok_or_else(|| ServiceError::not_found(format!("worksheet {} not found", sheet)))?;
        if doc.sheets.len() == 1 {
            return Err(ServiceError::fatal("can't remove the only sheet of a spreadsheet"));
        }
        doc.sheets.remove(position);
        Ok(())
    }

    fn insert_permission(
        &mut self,
        spreadsheet: &SpreadsheetRef,
        permission: &Permission,
    ) -> ServiceResult<()> {
        self.record(Operation::InsertPermission)?;
        self.spreadsheet_mut(&spreadsheet.id)?
            .permissions
            .push(permission.clone());
        Ok(())
    }

    fn list_permissions(&mut self, spreadsheet: &SpreadsheetRef) -> ServiceResult<Vec<Permission>> {
        self.record(Operation::ListPermissions)?;
        Ok(self.spreadsheet_mut(&spreadsheet.id)?.permissions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceErrorKind;

    fn grid(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn setup() -> (MemorySheetService, SpreadsheetRef, SheetRef) {
        let mut service = MemorySheetService::new();
        let doc = service.add_spreadsheet("test");
        let sheet = service.create_worksheet(&doc, "data", 5, 4).unwrap();
        (service, doc, sheet)
    }

    #[test]
    fn test_read_all_values_trims_used_area() {
        let (mut service, _, sheet) = setup();
        service
            .load_grid(&sheet, grid(&[&["a", "", ""], &["", "b", ""], &["", "", ""]]))
            .unwrap();
        assert_eq!(
            service.read_all_values(&sheet).unwrap(),
            grid(&[&["a", ""], &["", "b"]])
        );
    }

    #[test]
    fn test_read_columns_uses_render_overrides() {
        let (mut service, _, sheet) = setup();
        service
            .load_grid(&sheet, grid(&[&["n", "f"], &["$1.00", "2"], &["$2.50", ""]]))
            .unwrap();
        service
            .set_rendered(&sheet, 2, 1, ValueRender::Unformatted, "1")
            .unwrap();
        service
            .set_rendered(&sheet, 2, 2, ValueRender::Formula, "=1+1")
            .unwrap();

        let unformatted = service
            .read_columns(&sheet, &[1, 2], ValueRender::Unformatted)
            .unwrap();
        assert_eq!(unformatted, grid(&[&["n", "1", "$2.50"], &["f", "2"]]));

        let formulas = service
            .read_columns(&sheet, &[2], ValueRender::Formula)
            .unwrap();
        assert_eq!(formulas, grid(&[&["f", "=1+1"]]));

        let err = service
            .read_columns(&sheet, &[9], ValueRender::Formatted)
            .unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Fatal);
    }

    #[test]
    fn test_write_clears_render_override() {
        let (mut service, _, sheet) = setup();
        service
            .set_rendered(&sheet, 1, 1, ValueRender::Formula, "=A2")
            .unwrap();
        let mut cells = service.read_range(&sheet, "A1").unwrap();
        cells[0].value = "plain".to_string();
        service
            .write_cells(&sheet, &cells, ValueInputMode::Raw)
            .unwrap();
        let formulas = service
            .read_columns(&sheet, &[1], ValueRender::Formula)
            .unwrap();
        assert_eq!(formulas, grid(&[&["plain"]]));
    }

    #[test]
    fn test_range_round_trip_and_bounds() {
        let (mut service, _, sheet) = setup();
        let mut cells = service.read_range(&sheet, "A1:B2").unwrap();
        assert_eq!(cells.len(), 4);
        for (i, cell) in cells.iter_mut().enumerate() {
            cell.value = i.to_string();
        }
        service
            .write_cells(&sheet, &cells, ValueInputMode::Raw)
            .unwrap();
        assert_eq!(service.grid(&sheet).unwrap()[1][1], "3");
        assert_eq!(service.writes()[0].mode, ValueInputMode::Raw);

        let err = service.read_range(&sheet, "A1:Z99").unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Fatal);
    }

    #[test]
    fn test_resize_respects_frozen_rows() {
        let (mut service, doc, sheet) = setup();
        service
            .batch_structural_update(
                &doc,
                &[StructuralRequest::Freeze {
                    sheet_id: sheet.sheet_id,
                    rows: Some(2),
                    cols: None,
                }],
            )
            .unwrap();
        assert!(service.resize_sheet(&sheet, 2, 4).is_err());
        assert!(service.resize_sheet(&sheet, 3, 4).is_ok());
    }

    #[test]
    fn test_merge_keeps_top_left_only() {
        let (mut service, doc, sheet) = setup();
        service
            .load_grid(&sheet, grid(&[&["x", "y", "z"]]))
            .unwrap();
        let range = GridRange {
            sheet_id: sheet.sheet_id,
            start_row: 0,
            end_row: 1,
            start_col: 0,
            end_col: 2,
        };
        service
            .batch_structural_update(
                &doc,
                &[StructuralRequest::MergeCells {
                    range,
                    merge_type: MergeType::All,
                }],
            )
            .unwrap();
        assert_eq!(service.read_all_values(&sheet).unwrap(), grid(&[&["x", "", "z"]]));

        let meta = service.fetch_metadata(&doc).unwrap();
        assert_eq!(meta.sheet(sheet.sheet_id).unwrap().merges, vec![range]);

        service
            .batch_structural_update(&doc, &[StructuralRequest::UnmergeCells { range }])
            .unwrap();
        let meta = service.fetch_metadata(&doc).unwrap();
        assert!(meta.sheet(sheet.sheet_id).unwrap().merges.is_empty());
    }

    #[test]
    fn test_injected_failures_are_consumed_in_order() {
        let (mut service, doc, _) = setup();
        service.fail_next(Operation::FetchMetadata, ServiceError::transient("one"));
        service.fail_next(Operation::FetchMetadata, ServiceError::quota("two"));

        assert_eq!(service.fetch_metadata(&doc).unwrap_err().message, "one");
        assert_eq!(service.fetch_metadata(&doc).unwrap_err().message, "two");
        assert!(service.fetch_metadata(&doc).is_ok());
        assert_eq!(service.calls(Operation::FetchMetadata), 3);
    }

    #[test]
    fn test_unknown_spreadsheet_not_found() {
        let mut service = MemorySheetService::new();
        let err = service
            .fetch_metadata(&SpreadsheetRef::new("missing"))
            .unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::NotFound);
    }

    #[test]
    fn test_duplicate_sheet_name_rejected() {
        let (mut service, doc, _) = setup();
        assert!(service.create_worksheet(&doc, "DATA", 1, 1).is_err());
    }
}
