use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::grid::Grid;
use crate::{Cell, Record, SheetError, Workbook, Worksheet};

/// On-disk layout of a JSON workbook.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    title: String,
    sheets: BTreeMap<String, Grid>,
}

impl Document {
    fn load(path: &Path) -> Result<Self, SheetError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write to a sibling temp file, then rename over the original.
    fn save(&self, path: &Path) -> Result<(), SheetError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn grid(&self, title: &str) -> Result<&Grid, SheetError> {
        self.sheets
            .get(title)
            .ok_or_else(|| SheetError::WorksheetNotFound(title.to_string()))
    }

    fn grid_mut(&mut self, title: &str) -> Result<&mut Grid, SheetError> {
        self.sheets
            .get_mut(title)
            .ok_or_else(|| SheetError::WorksheetNotFound(title.to_string()))
    }
}

/// Workbook persisted as a single JSON file.
///
/// The file is re-read on every call and rewritten on every write, so edits
/// made to it between calls are always seen.
pub struct JsonWorkbook {
    path: PathBuf,
    title: String,
}

impl JsonWorkbook {
    /// Open an existing workbook file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SheetError> {
        let path = path.into();
        let document = Document::load(&path)?;
        tracing::debug!("Opened workbook '{}' at {:?}", document.title, path);
        Ok(Self {
            path,
            title: document.title,
        })
    }

    /// Create a workbook file whose worksheets hold only the given header
    /// rows. An existing file at `path` is overwritten.
    pub fn create(
        path: impl Into<PathBuf>,
        title: &str,
        headers: &[(&str, &[&str])],
    ) -> Result<Self, SheetError> {
        let path = path.into();
        let document = Document {
            title: title.to_string(),
            sheets: headers
                .iter()
                .map(|(sheet, header)| {
                    let row = header.iter().map(|h| h.to_string()).collect();
                    (sheet.to_string(), Grid::new(vec![row]))
                })
                .collect(),
        };
        document.save(&path)?;
        tracing::info!("Created workbook '{}' at {:?}", title, path);
        Ok(Self {
            path,
            title: title.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Workbook for JsonWorkbook {
    fn title(&self) -> &str {
        &self.title
    }

    fn worksheet(&self, title: &str) -> Result<Arc<dyn Worksheet>, SheetError> {
        Document::load(&self.path)?.grid(title)?;
        Ok(Arc::new(JsonWorksheet {
            path: self.path.clone(),
            title: title.to_string(),
        }))
    }
}

/// One worksheet of a [`JsonWorkbook`].
pub struct JsonWorksheet {
    path: PathBuf,
    title: String,
}

impl JsonWorksheet {
    fn read<T>(&self, f: impl FnOnce(&Grid) -> Result<T, SheetError>) -> Result<T, SheetError> {
        let document = Document::load(&self.path)?;
        f(document.grid(&self.title)?)
    }

    fn write(&self, f: impl FnOnce(&mut Grid) -> Result<(), SheetError>) -> Result<(), SheetError> {
        let mut document = Document::load(&self.path)?;
        f(document.grid_mut(&self.title)?)?;
        document.save(&self.path)
    }
}

impl Worksheet for JsonWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn row_values(&self, row: usize) -> Result<Vec<String>, SheetError> {
        self.read(|grid| grid.row_values(row))
    }

    fn get_all_records(&self) -> Result<Vec<Record>, SheetError> {
        self.read(|grid| Ok(grid.records()))
    }

    fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        self.write(|grid| grid.set(row, col, value))
    }

    fn update_cells(&self, cells: &[Cell]) -> Result<(), SheetError> {
        self.write(|grid| grid.set_many(cells))
    }

    fn append_row(&self, values: &[String]) -> Result<(), SheetError> {
        self.write(|grid| {
            grid.append(values);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(dir: &Path) -> JsonWorkbook {
        JsonWorkbook::create(
            dir.join("book.json"),
            "Test Book",
            &[("Items", &["item name", "cost", "rarity"])],
        )
        .unwrap()
    }

    #[test]
    fn test_create_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let book = create(dir.path());
        let sheet = book.worksheet("Items").unwrap();
        sheet
            .append_row(&["Rope".to_string(), "1".to_string(), "Common".to_string()])
            .unwrap();

        let reopened = JsonWorkbook::open(dir.path().join("book.json")).unwrap();
        assert_eq!(reopened.title(), "Test Book");
        let records = reopened.worksheet("Items").unwrap().get_all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["item name"], "Rope");
        assert_eq!(records[0]["rarity"], "Common");
    }

    #[test]
    fn test_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let book = create(dir.path());
        let header = book.worksheet("Items").unwrap().row_values(1).unwrap();
        assert_eq!(header, vec!["item name", "cost", "rarity"]);
    }

    #[test]
    fn test_missing_worksheet() {
        let dir = tempfile::tempdir().unwrap();
        let book = create(dir.path());
        assert!(matches!(
            book.worksheet("Characters"),
            Err(SheetError::WorksheetNotFound(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            JsonWorkbook::open(dir.path().join("absent.json")),
            Err(SheetError::Io(_))
        ));
    }

    #[test]
    fn test_batch_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let book = create(dir.path());
        let sheet = book.worksheet("Items").unwrap();
        sheet
            .append_row(&["Rope".to_string(), "1".to_string(), "Common".to_string()])
            .unwrap();
        sheet
            .update_cells(&[Cell::new(2, 2, "5"), Cell::new(2, 3, "Rare")])
            .unwrap();
        sheet.update_cell(2, 1, "Silk Rope").unwrap();

        assert_eq!(
            sheet.row_values(2).unwrap(),
            vec!["Silk Rope", "5", "Rare"]
        );
        assert!(!dir.path().join("book.json.tmp").exists());
    }
}
