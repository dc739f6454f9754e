use serde::{Deserialize, Serialize};

use crate::{Cell, Record, SheetError};

/// Row-major cell storage shared by the backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub(crate) fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub(crate) fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn check(row: usize, col: usize) -> Result<(), SheetError> {
        if row == 0 || col == 0 {
            return Err(SheetError::InvalidCell { row, col });
        }
        Ok(())
    }

    pub(crate) fn row_values(&self, row: usize) -> Result<Vec<String>, SheetError> {
        Self::check(row, 1)?;
        Ok(self.rows.get(row - 1).cloned().unwrap_or_default())
    }

    pub(crate) fn records(&self) -> Vec<Record> {
        let Some((header, data)) = self.rows.split_first() else {
            return Vec::new();
        };

        data.iter()
            .map(|row| {
                let mut record = Record::new();
                for (i, name) in header.iter().enumerate() {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    // A repeated header keeps its first column.
                    record
                        .entry(name.to_string())
                        .or_insert_with(|| row.get(i).cloned().unwrap_or_default());
                }
                record
            })
            .collect()
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        Self::check(row, col)?;
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize_with(col, String::new);
        }
        cells[col - 1] = value.to_string();
        Ok(())
    }

    /// Every address is checked before anything is written.
    pub(crate) fn set_many(&mut self, cells: &[Cell]) -> Result<(), SheetError> {
        for cell in cells {
            Self::check(cell.row, cell.col)?;
        }
        for cell in cells {
            self.set(cell.row, cell.col, &cell.value)?;
        }
        Ok(())
    }

    pub(crate) fn append(&mut self, values: &[String]) {
        self.rows.push(values.to_vec());
    }
}
