use rules::headers::game_log;
use rules::{record_to_character, Character, EconomyRules, GameLogEntry, PlayerId, Record};
use serde::Serialize;
use sheets::Cell;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::{append, read_records, row_of, today, write_cells, Repository};
use crate::error::LedgerError;
use crate::schema::CharacterColumns;

/// Outcome of [`Repository::log_game`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settlement {
    /// Characters as written back, in sheet order.
    pub rewarded: Vec<Character>,
    /// Requested players with no well-formed roster row.
    pub unmatched: Vec<PlayerId>,
    pub cells_staged: usize,
    /// The game-ledger row, if one was appended.
    pub logged: Option<GameLogEntry>,
}

struct Staged {
    cells: Vec<Cell>,
    rewarded: Vec<Character>,
    unmatched: Vec<PlayerId>,
}

/// Apply one session's rewards to every roster row belonging to `players`.
///
/// Gold is paid at the rate of the level the character held before the
/// session, so a level-up takes effect from the next game.
fn stage(
    records: &[Record],
    columns: &CharacterColumns,
    rules: &EconomyRules,
    players: &[PlayerId],
) -> Staged {
    let wanted: BTreeSet<PlayerId> = players.iter().copied().collect();
    let mut matched = BTreeSet::new();
    let mut cells = Vec::new();
    let mut rewarded = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let character = match record_to_character(record) {
            Ok(character) => character,
            Err(e) => {
                tracing::warn!("Skipping malformed character row {}: {}", row_of(index), e);
                continue;
            }
        };
        if !wanted.contains(&character.player_id) {
            continue;
        }

        let xp = character.xp.saturating_add(rules.xp_per_game);
        let lvl = rules.level_from_xp(xp);
        let cur = character.cur.saturating_add(rules.tier_rate(character.lvl));

        let row = row_of(index);
        cells.push(Cell::new(row, columns.xp, xp.to_string()));
        cells.push(Cell::new(row, columns.level, lvl.to_string()));
        cells.push(Cell::new(row, columns.currency, cur.to_string()));

        matched.insert(character.player_id);
        rewarded.push(Character {
            xp,
            lvl,
            cur,
            ..character
        });
    }

    let mut unmatched = Vec::new();
    for id in players {
        if !matched.contains(id) && !unmatched.contains(id) {
            unmatched.push(*id);
        }
    }

    Staged {
        cells,
        rewarded,
        unmatched,
    }
}

impl Repository {
    /// Settle one played session.
    ///
    /// Every listed player with a roster row gains experience, a possibly
    /// new level and their tier's gold in a single batched write. The game
    /// ledger row, listing all `players` as given, is appended only if that
    /// batch staged at least one cell. The two writes are not atomic: if
    /// the append fails the rewards stay applied.
    pub async fn log_game(
        &self,
        dm_id: PlayerId,
        players: &[PlayerId],
    ) -> Result<Settlement, LedgerError> {
        if players.is_empty() {
            return Ok(Settlement::default());
        }
        if players.len() > game_log::MAX_PLAYERS {
            return Err(LedgerError::TooManyPlayers {
                got: players.len(),
                max: game_log::MAX_PLAYERS,
            });
        }

        let players = players.to_vec();
        let rules = Arc::clone(&self.rules);
        self.critical(move |sheets| async move {
            let records = read_records(&sheets.characters).await?;
            let staged = stage(&records, &sheets.schema.characters, &rules, &players);

            if staged.cells.is_empty() {
                tracing::info!("No characters matched game run by {}; nothing logged", dm_id);
                return Ok(Settlement {
                    unmatched: staged.unmatched,
                    ..Settlement::default()
                });
            }

            let cells_staged = staged.cells.len();
            write_cells(&sheets.characters, staged.cells).await?;

            let entry = GameLogEntry {
                date: today(),
                dm_id,
                player_ids: players,
            };
            append(&sheets.game_log, sheets.schema.game_log.row(&entry)).await?;

            tracing::info!(
                "Logged game run by {}: {} rewarded, {} unmatched",
                dm_id,
                staged.rewarded.len(),
                staged.unmatched.len()
            );
            Ok::<_, LedgerError>(Settlement {
                rewarded: staged.rewarded,
                unmatched: staged.unmatched,
                cells_staged,
                logged: Some(entry),
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> CharacterColumns {
        CharacterColumns {
            player_id: 1,
            name: 2,
            char_id: 3,
            currency: 4,
            xp: 5,
            level: 6,
        }
    }

    fn record(player_id: &str, xp: &str, lvl: &str, cur: &str) -> Record {
        [
            ("player id", player_id),
            ("character name", "Someone"),
            ("character id", "1"),
            ("currency", cur),
            ("experience", xp),
            ("level", lvl),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_stage_pays_pre_update_rate() {
        // Level 4 (xp 15) levels up to 5 but is paid at tier one.
        let records = vec![record("1", "15", "4", "100")];
        let staged = stage(&records, &columns(), &EconomyRules::default(), &[1]);
        assert_eq!(
            staged.cells,
            vec![
                Cell::new(2, 5, "16"),
                Cell::new(2, 6, "5"),
                Cell::new(2, 4, "225"),
            ]
        );
        assert_eq!(staged.rewarded[0].lvl, 5);
    }

    #[test]
    fn test_stage_low_levels_earn_nothing() {
        let records = vec![record("1", "0", "1", "0")];
        let staged = stage(&records, &columns(), &EconomyRules::default(), &[1]);
        assert_eq!(staged.rewarded[0].cur, 0);
        assert_eq!(staged.rewarded[0].xp, 1);
    }

    #[test]
    fn test_stage_skips_malformed_and_reports_unmatched() {
        let records = vec![
            record("1", "oops", "3", "0"),
            record("2", "8", "3", "10"),
        ];
        let staged = stage(&records, &columns(), &EconomyRules::default(), &[1, 2, 3, 3]);
        assert_eq!(staged.cells.len(), 3);
        assert!(staged.cells.iter().all(|cell| cell.row == 3));
        assert_eq!(staged.unmatched, vec![1, 3]);
    }
}
