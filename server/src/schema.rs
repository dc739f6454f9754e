//! Startup schema resolution.
//!
//! Every worksheet the ledger touches is opened once, its header row read,
//! and each logical column resolved to a 1-based index. A missing worksheet
//! or header is fatal: there is no degraded mode, because every later
//! read and write addresses cells through these indices.

use rules::headers::{characters, game_log, items, market_log};
use rules::{Character, GameLogEntry, MarketLogEntry};
use sheets::{SheetError, Workbook, Worksheet};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("worksheet '{0}' not found")]
    MissingWorksheet(&'static str),
    #[error("worksheet '{sheet}' is missing header '{header}'")]
    MissingHeader {
        sheet: &'static str,
        header: &'static str,
    },
    #[error("could not read worksheet '{sheet}': {source}")]
    Store {
        sheet: &'static str,
        #[source]
        source: SheetError,
    },
}

/// Header row of one worksheet.
struct HeaderRow {
    sheet: &'static str,
    cells: Vec<String>,
}

impl HeaderRow {
    /// 1-based index of the first cell whose trimmed text equals `header`.
    fn index(&self, header: &'static str) -> Result<usize, SchemaError> {
        self.cells
            .iter()
            .position(|cell| cell.trim() == header)
            .map(|i| i + 1)
            .ok_or(SchemaError::MissingHeader {
                sheet: self.sheet,
                header,
            })
    }
}

/// Lay `(column, value)` pairs out as a full row of `width` cells.
fn positional_row(width: usize, cells: Vec<(usize, String)>) -> Vec<String> {
    let mut row = vec![String::new(); width];
    for (col, value) in cells {
        row[col - 1] = value;
    }
    row
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterColumns {
    pub player_id: usize,
    pub name: usize,
    pub char_id: usize,
    pub currency: usize,
    pub xp: usize,
    pub level: usize,
}

impl CharacterColumns {
    fn resolve(header: &HeaderRow) -> Result<Self, SchemaError> {
        Ok(Self {
            player_id: header.index(characters::PLAYER_ID)?,
            name: header.index(characters::NAME)?,
            char_id: header.index(characters::CHAR_ID)?,
            currency: header.index(characters::CURRENCY)?,
            xp: header.index(characters::XP)?,
            level: header.index(characters::LEVEL)?,
        })
    }

    pub fn width(&self) -> usize {
        [
            self.player_id,
            self.name,
            self.char_id,
            self.currency,
            self.xp,
            self.level,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn row(&self, character: &Character) -> Vec<String> {
        positional_row(
            self.width(),
            vec![
                (self.player_id, character.player_id.to_string()),
                (self.name, character.name.clone()),
                (self.char_id, character.char_id.to_string()),
                (self.currency, character.cur.to_string()),
                (self.xp, character.xp.to_string()),
                (self.level, character.lvl.to_string()),
            ],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemColumns {
    pub name: usize,
    pub cost: usize,
    pub rarity: usize,
}

impl ItemColumns {
    fn resolve(header: &HeaderRow) -> Result<Self, SchemaError> {
        Ok(Self {
            name: header.index(items::NAME)?,
            cost: header.index(items::COST)?,
            rarity: header.index(items::RARITY)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketLogColumns {
    pub date: usize,
    pub char_id: usize,
    pub item_name: usize,
    pub price: usize,
    pub quantity: usize,
    pub notes: usize,
}

impl MarketLogColumns {
    fn resolve(header: &HeaderRow) -> Result<Self, SchemaError> {
        Ok(Self {
            date: header.index(market_log::DATE)?,
            char_id: header.index(market_log::CHAR_ID)?,
            item_name: header.index(market_log::ITEM_NAME)?,
            price: header.index(market_log::PRICE)?,
            quantity: header.index(market_log::QUANTITY)?,
            notes: header.index(market_log::NOTES)?,
        })
    }

    pub fn width(&self) -> usize {
        [
            self.date,
            self.char_id,
            self.item_name,
            self.price,
            self.quantity,
            self.notes,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn row(&self, entry: &MarketLogEntry) -> Vec<String> {
        positional_row(
            self.width(),
            vec![
                (self.date, entry.date.clone()),
                (self.char_id, entry.char_id.to_string()),
                (self.item_name, entry.item_name.clone()),
                (self.price, entry.price.to_string()),
                (self.quantity, entry.quantity.to_string()),
                (self.notes, entry.notes.clone()),
            ],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameLogColumns {
    pub date: usize,
    pub dm_id: usize,
    pub players: [usize; game_log::MAX_PLAYERS],
}

impl GameLogColumns {
    fn resolve(header: &HeaderRow) -> Result<Self, SchemaError> {
        let mut players = [0; game_log::MAX_PLAYERS];
        for (slot, name) in players.iter_mut().zip(game_log::PLAYER_IDS) {
            *slot = header.index(name)?;
        }
        Ok(Self {
            date: header.index(game_log::DATE)?,
            dm_id: header.index(game_log::DM_ID)?,
            players,
        })
    }

    pub fn width(&self) -> usize {
        self.players
            .iter()
            .copied()
            .chain([self.date, self.dm_id])
            .max()
            .unwrap_or(0)
    }

    /// Seats beyond the entry's players are left blank.
    pub fn row(&self, entry: &GameLogEntry) -> Vec<String> {
        let mut cells = vec![
            (self.date, entry.date.clone()),
            (self.dm_id, entry.dm_id.to_string()),
        ];
        cells.extend(
            self.players
                .iter()
                .zip(&entry.player_ids)
                .map(|(col, id)| (*col, id.to_string())),
        );
        positional_row(self.width(), cells)
    }
}

/// Column indices for every worksheet, resolved at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetSchema {
    pub characters: CharacterColumns,
    pub items: ItemColumns,
    pub market_log: MarketLogColumns,
    pub game_log: GameLogColumns,
}

/// Open worksheets together with their resolved schema.
///
/// This is the only handle to the store the repository holds, and it lives
/// behind the repository's lock.
pub struct Sheets {
    pub characters: Arc<dyn Worksheet>,
    pub items: Arc<dyn Worksheet>,
    pub market_log: Arc<dyn Worksheet>,
    pub game_log: Arc<dyn Worksheet>,
    pub schema: SheetSchema,
}

fn open(
    workbook: &dyn Workbook,
    sheet: &'static str,
) -> Result<(Arc<dyn Worksheet>, HeaderRow), SchemaError> {
    let worksheet = workbook.worksheet(sheet).map_err(|source| match source {
        SheetError::WorksheetNotFound(_) => SchemaError::MissingWorksheet(sheet),
        source => SchemaError::Store { sheet, source },
    })?;
    let cells = worksheet
        .row_values(1)
        .map_err(|source| SchemaError::Store { sheet, source })?;
    Ok((worksheet, HeaderRow { sheet, cells }))
}

/// Open the four ledger worksheets and resolve their columns.
///
/// Blocking; call it from a blocking worker.
pub fn resolve(workbook: &dyn Workbook) -> Result<Sheets, SchemaError> {
    let (characters, header) = open(workbook, characters::SHEET)?;
    let character_columns = CharacterColumns::resolve(&header)?;

    let (items, header) = open(workbook, items::SHEET)?;
    let item_columns = ItemColumns::resolve(&header)?;

    let (market_log, header) = open(workbook, market_log::SHEET)?;
    let market_columns = MarketLogColumns::resolve(&header)?;

    let (game_log, header) = open(workbook, game_log::SHEET)?;
    let game_columns = GameLogColumns::resolve(&header)?;

    tracing::info!("Resolved ledger schema for workbook '{}'", workbook.title());

    Ok(Sheets {
        characters,
        items,
        market_log,
        game_log,
        schema: SheetSchema {
            characters: character_columns,
            items: item_columns,
            market_log: market_columns,
            game_log: game_columns,
        },
    })
}

/// Worksheet titles and header rows of a freshly initialised ledger.
pub fn default_layout() -> [(&'static str, &'static [&'static str]); 4] {
    [
        (characters::SHEET, &characters::ALL[..]),
        (items::SHEET, &items::ALL[..]),
        (market_log::SHEET, &market_log::ALL[..]),
        (game_log::SHEET, &game_log::ALL[..]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheets::MemoryWorkbook;

    fn full_workbook() -> MemoryWorkbook {
        let mut book = MemoryWorkbook::new("test");
        for (sheet, header) in default_layout() {
            book = book.with_sheet(sheet, [header.to_vec()]);
        }
        book
    }

    #[test]
    fn test_resolves_default_layout() {
        let sheets = resolve(&full_workbook()).unwrap();
        let columns = sheets.schema.characters;
        assert_eq!(columns.player_id, 1);
        assert_eq!(columns.name, 2);
        assert_eq!(columns.char_id, 3);
        assert_eq!(columns.currency, 4);
        assert_eq!(columns.xp, 5);
        assert_eq!(columns.level, 6);
        assert_eq!(sheets.schema.game_log.players, [3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_resolves_shuffled_and_padded_headers() {
        let book = full_workbook().with_sheet(
            characters::SHEET,
            [vec![
                "level",
                " character name ",
                "notes",
                "player id",
                "experience",
                "currency",
                "character id",
            ]],
        );
        let columns = resolve(&book).unwrap().schema.characters;
        assert_eq!(columns.level, 1);
        assert_eq!(columns.name, 2);
        assert_eq!(columns.player_id, 4);
        assert_eq!(columns.char_id, 7);
        assert_eq!(columns.width(), 7);
    }

    #[test]
    fn test_missing_header() {
        let book =
            full_workbook().with_sheet(characters::SHEET, [vec!["player id", "character name"]]);
        let err = resolve(&book).err().unwrap();
        assert!(matches!(
            err,
            SchemaError::MissingHeader {
                sheet: "Characters",
                header: "character id",
            }
        ));
    }

    #[test]
    fn test_missing_worksheet() {
        let mut book = MemoryWorkbook::new("test");
        for (sheet, header) in default_layout() {
            if sheet != game_log::SHEET {
                book = book.with_sheet(sheet, [header.to_vec()]);
            }
        }
        let err = resolve(&book).err().unwrap();
        assert!(matches!(err, SchemaError::MissingWorksheet("GameLog")));
    }

    #[test]
    fn test_rows_are_positional() {
        let book = full_workbook().with_sheet(
            characters::SHEET,
            [vec![
                "character name",
                "player id",
                "character id",
                "currency",
                "experience",
                "level",
            ]],
        );
        let columns = resolve(&book).unwrap().schema.characters;
        let row = columns.row(&Character {
            player_id: 42,
            char_id: 7,
            name: "X".to_string(),
            xp: 16,
            lvl: 5,
            cur: 1200,
        });
        assert_eq!(row, vec!["X", "42", "7", "1200", "16", "5"]);
    }

    #[test]
    fn test_game_log_row_leaves_empty_seats_blank() {
        let columns = resolve(&full_workbook()).unwrap().schema.game_log;
        let row = columns.row(&GameLogEntry {
            date: "2025-01-01".to_string(),
            dm_id: 9,
            player_ids: vec![1, 2],
        });
        assert_eq!(row, vec!["2025-01-01", "9", "1", "2", "", "", "", ""]);
    }
}
