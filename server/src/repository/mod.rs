//! Ledger repository.
//!
//! ## Locking
//!
//! The spreadsheet has no transactions, row locks or version checks, and
//! rows are addressed by position. A lookup that finds "row N holds player
//! X" is only valid until the next append or update, so every operation that
//! touches the store (reads included) runs under one process-wide
//! [`tokio::sync::Mutex`]. The mutex owns the [`Sheets`] handle itself, so
//! there is no way to reach a worksheet without holding it.
//!
//! Each critical section runs on a spawned task that owns the guard. A
//! caller that gives up waiting (a timeout, a dropped request) does not
//! release the lock early; the section runs to completion first.
//!
//! Store calls are blocking and run on `spawn_blocking` workers while the
//! lock is held. There is no timeout: a hung store call stalls every later
//! operation, and callers are expected to bound their own wait.
//!
//! ## Row addressing
//!
//! Data starts at row 2 (row 1 is the header), so record index `i` of a bulk
//! read lives at row `i + 2`. Row numbers are never kept past the operation
//! that read them.

mod settlement;

pub use settlement::Settlement;

use rules::headers::{characters, items, market_log};
use rules::{
    record_player_id, record_to_character, record_to_game_log_entry, record_to_item,
    record_to_market_log_entry, Character, EconomyRules, GameLogEntry, Item, MarketLogEntry,
    PlayerId, Record, RecordError,
};
use serde::Serialize;
use sheets::{Cell, Workbook, Worksheet};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::schema::{self, Sheets};

/// Quantity recorded when a caller has no better value.
pub const DEFAULT_QUANTITY: u32 = 1;

/// Notes recorded when a caller has no better value.
pub const DEFAULT_NOTES: &str = "standard";

/// Notes written by [`Repository::purchase_item`].
pub const PURCHASE_NOTES: &str = "purchase";

/// Sheet row of the record at `index` in a bulk read.
fn row_of(index: usize) -> usize {
    index + 2
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Run a blocking store call on a worker thread.
async fn blocking<T, E, F>(f: F) -> Result<T, LedgerError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<LedgerError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?.map_err(Into::into)
}

async fn read_records(sheet: &Arc<dyn Worksheet>) -> Result<Vec<Record>, LedgerError> {
    let sheet = Arc::clone(sheet);
    blocking(move || sheet.get_all_records()).await
}

async fn write_cell(
    sheet: &Arc<dyn Worksheet>,
    row: usize,
    col: usize,
    value: String,
) -> Result<(), LedgerError> {
    let sheet = Arc::clone(sheet);
    blocking(move || sheet.update_cell(row, col, &value)).await
}

async fn write_cells(sheet: &Arc<dyn Worksheet>, cells: Vec<Cell>) -> Result<(), LedgerError> {
    let sheet = Arc::clone(sheet);
    blocking(move || sheet.update_cells(&cells)).await
}

async fn append(sheet: &Arc<dyn Worksheet>, row: Vec<String>) -> Result<(), LedgerError> {
    let sheet = Arc::clone(sheet);
    blocking(move || sheet.append_row(&row)).await
}

/// Index of the first record whose player id coerces to `player_id`.
/// Records whose player id does not parse never match.
fn find_player(records: &[Record], player_id: PlayerId) -> Option<usize> {
    records
        .iter()
        .position(|record| record_player_id(record) == Ok(player_id))
}

/// First well-formed record belonging to `player_id`, with its index.
/// Malformed rows are skipped.
fn find_character(records: &[Record], player_id: PlayerId) -> Option<(usize, Character)> {
    records
        .iter()
        .enumerate()
        .find_map(|(index, record)| match record_to_character(record) {
            Ok(character) if character.player_id == player_id => {
                tracing::debug!("Found player {} on row {}", player_id, row_of(index));
                Some((index, character))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Skipping malformed character row {}: {}", row_of(index), e);
                None
            }
        })
}

/// Map every record, failing on the first that does not coerce.
fn map_all<T>(
    records: &[Record],
    sheet: &'static str,
    map: fn(&Record) -> Result<T, RecordError>,
) -> Result<Vec<T>, LedgerError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            map(record).map_err(|source| LedgerError::MalformedRecord {
                sheet,
                row: row_of(index),
                source,
            })
        })
        .collect()
}

/// Result of a successful [`Repository::purchase_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Purchase {
    pub character: Character,
    pub entry: MarketLogEntry,
}

/// Data-access layer over the ledger workbook.
pub struct Repository {
    sheets: Arc<Mutex<Sheets>>,
    rules: Arc<EconomyRules>,
}

impl Repository {
    /// Resolve the workbook schema and validate the economy rules.
    ///
    /// Any [`LedgerError::Schema`] returned here means the workbook is not
    /// usable at all and the caller should abort.
    pub async fn connect(
        workbook: Arc<dyn Workbook>,
        rules: EconomyRules,
    ) -> Result<Self, LedgerError> {
        rules.validate()?;
        let sheets = blocking(move || schema::resolve(workbook.as_ref())).await?;
        Ok(Self {
            sheets: Arc::new(Mutex::new(sheets)),
            rules: Arc::new(rules),
        })
    }

    /// Run `op` as one critical section.
    ///
    /// The section runs on its own task that owns the lock guard, so it
    /// completes (and keeps the lock) even if the caller stops waiting.
    async fn critical<T, F, Fut>(&self, op: F) -> Result<T, LedgerError>
    where
        F: FnOnce(OwnedMutexGuard<Sheets>) -> Fut,
        Fut: Future<Output = Result<T, LedgerError>> + Send + 'static,
        T: Send + 'static,
    {
        let sheets = Arc::clone(&self.sheets).lock_owned().await;
        tokio::spawn(op(sheets)).await?
    }

    pub async fn get_character_by_player_id(
        &self,
        player_id: PlayerId,
    ) -> Result<Character, LedgerError> {
        self.critical(move |sheets| async move {
            let records = read_records(&sheets.characters).await?;
            find_character(&records, player_id)
                .map(|(_, character)| character)
                .ok_or_else(|| LedgerError::not_found(player_id))
        })
        .await
    }

    /// Characters of every listed player, or `CharacterNotFound` naming all
    /// players without a well-formed row. Never a partial result.
    pub async fn get_characters_by_ids(
        &self,
        player_ids: &[PlayerId],
    ) -> Result<Vec<Character>, LedgerError> {
        if player_ids.is_empty() {
            return Ok(Vec::new());
        }
        let wanted: BTreeSet<PlayerId> = player_ids.iter().copied().collect();

        let records = self
            .critical(|sheets| async move { read_records(&sheets.characters).await })
            .await?;

        let mut seen = BTreeSet::new();
        let mut found = Vec::with_capacity(wanted.len());
        for (index, record) in records.iter().enumerate() {
            match record_to_character(record) {
                Ok(character) if wanted.contains(&character.player_id) => {
                    if seen.insert(character.player_id) {
                        found.push(character);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping malformed character row {}: {}", row_of(index), e);
                }
            }
        }

        let missing: Vec<PlayerId> = wanted.difference(&seen).copied().collect();
        if !missing.is_empty() {
            return Err(LedgerError::CharacterNotFound {
                player_ids: missing,
            });
        }
        Ok(found)
    }

    /// Overwrite a character's currency. Nothing is written if the player
    /// has no row.
    pub async fn set_character_currency(
        &self,
        player_id: PlayerId,
        currency: u64,
    ) -> Result<(), LedgerError> {
        self.critical(move |sheets| async move {
            let records = read_records(&sheets.characters).await?;
            let index = find_player(&records, player_id)
                .ok_or_else(|| LedgerError::not_found(player_id))?;
            sheets.write_currency(index, currency).await?;
            tracing::info!("Set currency of player {} to {}", player_id, currency);
            Ok::<_, LedgerError>(())
        })
        .await
    }

    /// Mint a character for `player_id` at `start_level` (the configured
    /// starting level when `None`).
    ///
    /// The returned character is built from the values that were appended,
    /// not read back from the sheet.
    pub async fn create_new_character(
        &self,
        name: &str,
        player_id: PlayerId,
        start_level: Option<u32>,
    ) -> Result<Character, LedgerError> {
        let level = start_level.unwrap_or(self.rules.starting_level);
        if level == 0 {
            return Err(LedgerError::InvalidLevel);
        }
        let character = Character {
            player_id,
            char_id: Uuid::new_v4().as_u128(),
            name: name.trim().to_string(),
            xp: self.rules.xp_for_level(level),
            lvl: level,
            cur: self.rules.starting_gold(level),
        };

        self.critical(move |sheets| async move {
            let records = read_records(&sheets.characters).await?;
            if let Some(index) = find_player(&records, player_id) {
                let existing = records[index]
                    .get(characters::NAME)
                    .map(|name| name.trim().to_string())
                    .unwrap_or_default();
                return Err(LedgerError::CharacterAlreadyExists {
                    player_id,
                    name: existing,
                });
            }

            append(&sheets.characters, sheets.schema.characters.row(&character)).await?;
            tracing::info!(
                "Created character '{}' ({}) for player {} at level {}",
                character.name,
                character.char_id,
                player_id,
                character.lvl
            );
            Ok(character)
        })
        .await
    }

    pub async fn get_all_items(&self) -> Result<Vec<Item>, LedgerError> {
        self.critical(|sheets| async move { sheets.items().await })
            .await
    }

    /// Case-insensitive exact match on the item name.
    pub async fn get_item(&self, name: &str) -> Result<Item, LedgerError> {
        let name = name.to_string();
        self.critical(move |sheets| async move { sheets.item(&name).await })
            .await
    }

    /// Append one market-ledger row for `item` bought or sold by `character`.
    ///
    /// This is a plain ledger append: funds and stock are the caller's
    /// concern.
    pub async fn new_market_log_entry(
        &self,
        character: &Character,
        item: &Item,
        quantity: u32,
        notes: &str,
    ) -> Result<MarketLogEntry, LedgerError> {
        let (character, item, notes) = (character.clone(), item.clone(), notes.to_string());
        self.critical(move |sheets| async move {
            sheets
                .append_market_entry(&character, &item, quantity, &notes)
                .await
        })
        .await
    }

    pub async fn get_all_market_log_entries(&self) -> Result<Vec<MarketLogEntry>, LedgerError> {
        let records = self
            .critical(|sheets| async move { read_records(&sheets.market_log).await })
            .await?;
        map_all(&records, market_log::SHEET, record_to_market_log_entry)
    }

    pub async fn get_all_game_log_entries(&self) -> Result<Vec<GameLogEntry>, LedgerError> {
        let records = self
            .critical(|sheets| async move { read_records(&sheets.game_log).await })
            .await?;
        map_all(
            &records,
            rules::headers::game_log::SHEET,
            record_to_game_log_entry,
        )
    }

    /// Buy `quantity` of an item for a player's character: check funds,
    /// deduct the total and record the sale, all under one lock.
    pub async fn purchase_item(
        &self,
        player_id: PlayerId,
        item_name: &str,
        quantity: u32,
    ) -> Result<Purchase, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        let item_name = item_name.to_string();

        self.critical(move |sheets| async move {
            let records = read_records(&sheets.characters).await?;
            let (index, mut character) = find_character(&records, player_id)
                .ok_or_else(|| LedgerError::not_found(player_id))?;
            let item = sheets.item(&item_name).await?;

            let needed = item.cost.saturating_mul(u64::from(quantity));
            if needed > character.cur {
                return Err(LedgerError::InsufficientFunds {
                    needed,
                    available: character.cur,
                });
            }

            character.cur -= needed;
            sheets.write_currency(index, character.cur).await?;
            let entry = sheets
                .append_market_entry(&character, &item, quantity, PURCHASE_NOTES)
                .await?;

            tracing::info!(
                "Player {} bought {} x '{}' for {}",
                player_id,
                quantity,
                item.name,
                needed
            );
            Ok(Purchase { character, entry })
        })
        .await
    }
}

/// Operations on already-locked sheets, shared by composite operations.
impl Sheets {
    async fn items(&self) -> Result<Vec<Item>, LedgerError> {
        let records = read_records(&self.items).await?;
        map_all(&records, items::SHEET, record_to_item)
    }

    async fn item(&self, name: &str) -> Result<Item, LedgerError> {
        let wanted = name.trim().to_lowercase();
        self.items()
            .await?
            .into_iter()
            .find(|item| item.name.to_lowercase() == wanted)
            .ok_or_else(|| LedgerError::ItemNotFound(name.to_string()))
    }

    async fn write_currency(&self, index: usize, currency: u64) -> Result<(), LedgerError> {
        write_cell(
            &self.characters,
            row_of(index),
            self.schema.characters.currency,
            currency.to_string(),
        )
        .await
    }

    async fn append_market_entry(
        &self,
        character: &Character,
        item: &Item,
        quantity: u32,
        notes: &str,
    ) -> Result<MarketLogEntry, LedgerError> {
        let entry = MarketLogEntry {
            date: today(),
            char_id: character.char_id,
            item_name: item.name.clone(),
            price: item.cost,
            quantity,
            notes: notes.to_string(),
        };
        append(&self.market_log, self.schema.market_log.row(&entry)).await?;
        tracing::info!(
            "Logged market entry: character {} '{}' x{}",
            entry.char_id,
            entry.item_name,
            entry.quantity
        );
        Ok(entry)
    }
}
