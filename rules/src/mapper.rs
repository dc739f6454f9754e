//! Conversion of raw worksheet records into typed entities.
//!
//! Cells arrive as text. Numeric columns are trimmed and parsed as base-10
//! integers; an integral decimal rendering such as `"100.0"` (what a sheet
//! produces after someone formats a column as a number) is accepted as long
//! as it is exactly representable. Anything else is a [`RecordError`].

use crate::headers::{characters, game_log, items, market_log};
use crate::models::{Character, GameLogEntry, Item, MarketLogEntry, PlayerId, Record};

/// Largest integer an `f64` holds without rounding (2^53).
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// A single record could not be coerced into its entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record is missing field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

fn text<'a>(record: &'a Record, name: &'static str) -> Result<&'a str, RecordError> {
    record
        .get(name)
        .map(|value| value.trim())
        .ok_or(RecordError::MissingField(name))
}

fn parse_unsigned(raw: &str) -> Option<u128> {
    if let Ok(value) = raw.parse::<u128>() {
        return Some(value);
    }
    let float: f64 = raw.parse().ok()?;
    if float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= MAX_EXACT_FLOAT {
        Some(float as u128)
    } else {
        None
    }
}

fn number<T: TryFrom<u128>>(record: &Record, name: &'static str) -> Result<T, RecordError> {
    let raw = text(record, name)?;
    parse_unsigned(raw)
        .and_then(|value| T::try_from(value).ok())
        .ok_or_else(|| RecordError::InvalidNumber {
            field: name,
            value: raw.to_string(),
        })
}

/// Coerce only the player id of a roster record.
///
/// Used by scans that look for one player without paying for (or failing on)
/// the rest of the row.
pub fn record_player_id(record: &Record) -> Result<PlayerId, RecordError> {
    number(record, characters::PLAYER_ID)
}

pub fn record_to_character(record: &Record) -> Result<Character, RecordError> {
    Ok(Character {
        player_id: record_player_id(record)?,
        char_id: number(record, characters::CHAR_ID)?,
        name: text(record, characters::NAME)?.to_string(),
        xp: number(record, characters::XP)?,
        lvl: number(record, characters::LEVEL)?,
        cur: number(record, characters::CURRENCY)?,
    })
}

pub fn record_to_item(record: &Record) -> Result<Item, RecordError> {
    Ok(Item {
        name: text(record, items::NAME)?.to_string(),
        cost: number(record, items::COST)?,
        rarity: text(record, items::RARITY)?.to_string(),
    })
}

pub fn record_to_market_log_entry(record: &Record) -> Result<MarketLogEntry, RecordError> {
    Ok(MarketLogEntry {
        date: text(record, market_log::DATE)?.to_string(),
        char_id: number(record, market_log::CHAR_ID)?,
        item_name: text(record, market_log::ITEM_NAME)?.to_string(),
        price: number(record, market_log::PRICE)?,
        quantity: number(record, market_log::QUANTITY)?,
        notes: text(record, market_log::NOTES)?.to_string(),
    })
}

/// Empty or absent seat columns are skipped; a filled seat must be numeric.
pub fn record_to_game_log_entry(record: &Record) -> Result<GameLogEntry, RecordError> {
    let mut player_ids = Vec::with_capacity(game_log::MAX_PLAYERS);
    for seat in game_log::PLAYER_IDS {
        match record.get(seat).map(|value| value.trim()) {
            None | Some("") => continue,
            Some(_) => player_ids.push(number(record, seat)?),
        }
    }

    Ok(GameLogEntry {
        date: text(record, game_log::DATE)?.to_string(),
        dm_id: number(record, game_log::DM_ID)?,
        player_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn character_record() -> Record {
        record(&[
            ("player id", "12345"),
            ("character name", "Test Character"),
            ("character id", "123456789"),
            ("currency", "100"),
            ("experience", "4"),
            ("level", "2"),
        ])
    }

    #[test]
    fn test_character_from_well_formed_record() {
        let character = record_to_character(&character_record()).unwrap();
        assert_eq!(
            character,
            Character {
                player_id: 12345,
                char_id: 123456789,
                name: "Test Character".to_string(),
                xp: 4,
                lvl: 2,
                cur: 100,
            }
        );
    }

    #[test]
    fn test_character_missing_field() {
        let rec = record(&[("player id", "1")]);
        assert!(matches!(
            record_to_character(&rec),
            Err(RecordError::MissingField(_))
        ));
    }

    #[test]
    fn test_character_non_numeric_currency() {
        let mut rec = character_record();
        rec.insert("currency".to_string(), "lots".to_string());
        assert_eq!(
            record_to_character(&rec),
            Err(RecordError::InvalidNumber {
                field: "currency",
                value: "lots".to_string(),
            })
        );
    }

    #[test]
    fn test_numbers_are_trimmed_and_float_rendering_accepted() {
        let mut rec = character_record();
        rec.insert("currency".to_string(), " 250 ".to_string());
        rec.insert("experience".to_string(), "8.0".to_string());
        let character = record_to_character(&rec).unwrap();
        assert_eq!(character.cur, 250);
        assert_eq!(character.xp, 8);
    }

    #[test]
    fn test_rejects_fractions_negatives_and_blanks() {
        for bad in ["1.5", "-3", "", "1e400"] {
            let mut rec = character_record();
            rec.insert("level".to_string(), bad.to_string());
            assert!(
                matches!(record_to_character(&rec), Err(RecordError::InvalidNumber { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_level_overflow_is_invalid() {
        let mut rec = character_record();
        rec.insert("level".to_string(), "4294967296".to_string());
        assert!(record_to_character(&rec).is_err());
    }

    #[test]
    fn test_player_id_only_needs_its_own_column() {
        let rec = record(&[("player id", "77")]);
        assert_eq!(record_player_id(&rec), Ok(77));
    }

    #[test]
    fn test_item_with_bad_cost_fails() {
        let rec = record(&[
            ("item name", "Bad Item"),
            ("cost", "not_a_number"),
            ("rarity", "Rare"),
        ]);
        assert!(matches!(
            record_to_item(&rec),
            Err(RecordError::InvalidNumber { field: "cost", .. })
        ));
    }

    #[test]
    fn test_market_log_entry() {
        let rec = record(&[
            ("date", "2025-01-02"),
            ("character id", "102"),
            ("item name", "Sword"),
            ("price", "1000"),
            ("quantity", "1"),
            ("notes", "Sold"),
        ]);
        let entry = record_to_market_log_entry(&rec).unwrap();
        assert_eq!(entry.char_id, 102);
        assert_eq!(entry.price, 1000);
        assert_eq!(entry.notes, "Sold");
    }

    #[test]
    fn test_game_log_entry_skips_empty_seats() {
        let rec = record(&[
            ("date", "2025-03-01"),
            ("dm id", "98765"),
            ("p1 id", "1"),
            ("p2 id", "2"),
            ("p3 id", ""),
            ("p4 id", "4"),
        ]);
        let entry = record_to_game_log_entry(&rec).unwrap();
        assert_eq!(entry.dm_id, 98765);
        assert_eq!(entry.player_ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_game_log_entry_bad_seat() {
        let rec = record(&[("date", "2025-03-01"), ("dm id", "1"), ("p1 id", "someone")]);
        assert!(record_to_game_log_entry(&rec).is_err());
    }
}
