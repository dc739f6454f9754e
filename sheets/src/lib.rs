//! Spreadsheet boundary for the questbook ledger.
//!
//! A [`Workbook`] is one named document holding titled [`Worksheet`]s. Row 1
//! of every worksheet is its header; data starts at row 2. Rows and columns
//! are 1-based and every cell is text. The primitives mirror what a hosted
//! spreadsheet offers: whole-row and whole-sheet reads, single-cell and
//! batched-cell writes, and row appends. None of them are transactional.
//!
//! All calls are blocking; async callers are expected to move them onto a
//! blocking worker.
//!
//! Two backends are provided:
//! - [`MemoryWorkbook`] keeps grids in memory and records every read and
//!   write, which is what the ledger's tests assert against.
//! - [`JsonWorkbook`] stores the whole document in one JSON file.

mod grid;
mod json;
mod memory;

pub use json::{JsonWorkbook, JsonWorksheet};
pub use memory::{MemoryWorkbook, MemoryWorksheet, WriteOp};

use std::collections::BTreeMap;
use std::sync::Arc;

/// One data row keyed by (trimmed) header text.
pub type Record = BTreeMap<String, String>;

/// Errors from a spreadsheet backend.
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),
    #[error("invalid cell address: row {row}, column {col}")]
    InvalidCell { row: usize, col: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("worksheet state poisoned: {0}")]
    Poisoned(String),
}

/// A single cell write, addressed 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

impl Cell {
    pub fn new(row: usize, col: usize, value: impl Into<String>) -> Self {
        Self {
            row,
            col,
            value: value.into(),
        }
    }
}

/// A named spreadsheet document.
pub trait Workbook: Send + Sync {
    fn title(&self) -> &str;

    /// Open a worksheet by its exact title.
    fn worksheet(&self, title: &str) -> Result<Arc<dyn Worksheet>, SheetError>;
}

/// One tab of a [`Workbook`].
pub trait Worksheet: Send + Sync {
    fn title(&self) -> &str;

    /// Values of a 1-based row. A row past the end of the sheet is empty.
    fn row_values(&self, row: usize) -> Result<Vec<String>, SheetError>;

    /// Every data row as a header-keyed record, short rows padded with
    /// empty strings. Columns with a blank header are left out, and a
    /// repeated header maps to its first column.
    fn get_all_records(&self) -> Result<Vec<Record>, SheetError>;

    fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), SheetError>;

    /// Apply several cell writes in one call.
    fn update_cells(&self, cells: &[Cell]) -> Result<(), SheetError>;

    /// Append a row after the last row of the sheet.
    fn append_row(&self, values: &[String]) -> Result<(), SheetError>;
}
