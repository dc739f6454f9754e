use rules::{PlayerId, RecordError, RulesError};
use sheets::SheetError;

use crate::schema::SchemaError;

/// Errors from the ledger repository.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("malformed record in '{sheet}' row {row}: {source}")]
    MalformedRecord {
        sheet: &'static str,
        row: usize,
        #[source]
        source: RecordError,
    },
    #[error("no character found for player(s) {player_ids:?}")]
    CharacterNotFound { player_ids: Vec<PlayerId> },
    #[error("player {player_id} already has a character: {name}")]
    CharacterAlreadyExists { player_id: PlayerId, name: String },
    #[error("item not found: {0}")]
    ItemNotFound(String),
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("level must be at least 1")]
    InvalidLevel,
    #[error("a game seats at most {max} players, got {got}")]
    TooManyPlayers { got: usize, max: usize },
    #[error("invalid economy rules: {0}")]
    Rules(#[from] RulesError),
    #[error("store error: {0}")]
    Store(#[from] SheetError),
    #[error("store worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl LedgerError {
    pub(crate) fn not_found(player_id: PlayerId) -> Self {
        Self::CharacterNotFound {
            player_ids: vec![player_id],
        }
    }

    /// Message safe to show to an end user. Store and worker failures are
    /// collapsed into one generic line so no internals leak.
    pub fn user_message(&self) -> String {
        match self {
            Self::CharacterNotFound { player_ids } if player_ids.len() == 1 => format!(
                "Player {} does not have a character. Ask a scribe to create one.",
                player_ids[0]
            ),
            Self::CharacterNotFound { player_ids } => format!(
                "These players do not have characters: {}. Ask a scribe to create them.",
                player_ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::CharacterAlreadyExists { name, .. } => {
                format!("This player already has a character ({name}). Cannot create a new one.")
            }
            Self::ItemNotFound(name) => format!("There is no item called '{name}' in the catalog."),
            Self::InsufficientFunds { needed, available } => {
                format!("Not enough gold: this costs {needed} but only {available} is available.")
            }
            Self::InvalidQuantity => "Quantity must be at least 1.".to_string(),
            Self::InvalidLevel => "Starting level must be at least 1.".to_string(),
            Self::TooManyPlayers { max, .. } => {
                format!("A game can be logged for at most {max} players.")
            }
            Self::MalformedRecord { sheet, row, .. } => format!(
                "The {sheet} sheet has a damaged entry on row {row}. Please contact a staff member."
            ),
            Self::Schema(_) | Self::Rules(_) => {
                "The ledger is misconfigured. Please contact a staff member.".to_string()
            }
            Self::Store(_) | Self::Worker(_) => {
                "An error occurred while talking to the ledger. Please contact a staff member."
                    .to_string()
            }
        }
    }
}
