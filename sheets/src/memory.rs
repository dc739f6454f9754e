use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::grid::Grid;
use crate::{Cell, Record, SheetError, Workbook, Worksheet};

/// A write observed by a [`MemoryWorksheet`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Cell(Cell),
    Batch(Vec<Cell>),
    Append(Vec<String>),
}

/// Workbook held entirely in memory.
pub struct MemoryWorkbook {
    title: String,
    sheets: BTreeMap<String, Arc<MemoryWorksheet>>,
}

impl MemoryWorkbook {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sheets: BTreeMap::new(),
        }
    }

    /// Add (or replace) a worksheet with the given rows; row 1 is the header.
    pub fn with_sheet<R, C>(mut self, title: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        let sheet = MemoryWorksheet {
            title: title.to_string(),
            grid: Mutex::new(Grid::new(rows)),
            reads: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        };
        self.sheets.insert(title.to_string(), Arc::new(sheet));
        self
    }

    /// Concrete handle for inspecting a worksheet from tests.
    pub fn sheet(&self, title: &str) -> Option<Arc<MemoryWorksheet>> {
        self.sheets.get(title).cloned()
    }
}

impl Workbook for MemoryWorkbook {
    fn title(&self) -> &str {
        &self.title
    }

    fn worksheet(&self, title: &str) -> Result<Arc<dyn Worksheet>, SheetError> {
        self.sheets
            .get(title)
            .cloned()
            .map(|sheet| sheet as Arc<dyn Worksheet>)
            .ok_or_else(|| SheetError::WorksheetNotFound(title.to_string()))
    }
}

/// In-memory worksheet that counts reads and records writes.
pub struct MemoryWorksheet {
    title: String,
    grid: Mutex<Grid>,
    reads: AtomicUsize,
    writes: Mutex<Vec<WriteOp>>,
}

impl MemoryWorksheet {
    fn grid(&self) -> Result<MutexGuard<'_, Grid>, SheetError> {
        self.grid
            .lock()
            .map_err(|e| SheetError::Poisoned(e.to_string()))
    }

    fn record(&self, op: WriteOp) -> Result<(), SheetError> {
        self.writes
            .lock()
            .map_err(|e| SheetError::Poisoned(e.to_string()))?
            .push(op);
        Ok(())
    }

    /// Number of `row_values` and `get_all_records` calls served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Writes applied so far.
    pub fn writes(&self) -> Vec<WriteOp> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    /// Current contents, header included.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.grid
            .lock()
            .map(|grid| grid.rows().to_vec())
            .unwrap_or_default()
    }
}

impl Worksheet for MemoryWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn row_values(&self, row: usize) -> Result<Vec<String>, SheetError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.grid()?.row_values(row)
    }

    fn get_all_records(&self) -> Result<Vec<Record>, SheetError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.grid()?.records())
    }

    fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        self.grid()?.set(row, col, value)?;
        self.record(WriteOp::Cell(Cell::new(row, col, value)))
    }

    fn update_cells(&self, cells: &[Cell]) -> Result<(), SheetError> {
        self.grid()?.set_many(cells)?;
        self.record(WriteOp::Batch(cells.to_vec()))
    }

    fn append_row(&self, values: &[String]) -> Result<(), SheetError> {
        self.grid()?.append(values);
        self.record(WriteOp::Append(values.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook() -> MemoryWorkbook {
        MemoryWorkbook::new("test").with_sheet("Items", [vec!["item name", "cost"], vec!["Rope", "1"]])
    }

    #[test]
    fn test_missing_worksheet() {
        let result = workbook().worksheet("Nope");
        assert!(matches!(result, Err(SheetError::WorksheetNotFound(name)) if name == "Nope"));
    }

    #[test]
    fn test_reads_are_counted() {
        let book = workbook();
        let sheet = book.worksheet("Items").unwrap();
        assert_eq!(book.sheet("Items").unwrap().reads(), 0);
        sheet.row_values(1).unwrap();
        let records = sheet.get_all_records().unwrap();
        assert_eq!(records[0]["item name"], "Rope");
        assert_eq!(book.sheet("Items").unwrap().reads(), 2);
    }

    #[test]
    fn test_writes_are_recorded_in_order() {
        let book = workbook();
        let sheet = book.worksheet("Items").unwrap();
        sheet.update_cell(2, 2, "3").unwrap();
        sheet
            .append_row(&["Torch".to_string(), "2".to_string()])
            .unwrap();
        sheet.update_cells(&[Cell::new(3, 2, "4")]).unwrap();

        let handle = book.sheet("Items").unwrap();
        assert_eq!(
            handle.writes(),
            vec![
                WriteOp::Cell(Cell::new(2, 2, "3")),
                WriteOp::Append(vec!["Torch".to_string(), "2".to_string()]),
                WriteOp::Batch(vec![Cell::new(3, 2, "4")]),
            ]
        );
        assert_eq!(handle.rows()[2], vec!["Torch".to_string(), "4".to_string()]);
    }

    #[test]
    fn test_failed_write_is_not_recorded() {
        let book = workbook();
        let sheet = book.worksheet("Items").unwrap();
        assert!(sheet.update_cell(0, 1, "x").is_err());
        assert!(book.sheet("Items").unwrap().writes().is_empty());
    }
}
