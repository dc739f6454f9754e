use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chat-platform user id of a player or DM.
pub type PlayerId = u64;

/// Identifier minted for a character when it is created.
pub type CharacterId = u128;

/// One data row of a worksheet, keyed by header text.
pub type Record = BTreeMap<String, String>;

/// A player's persistent in-game identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub player_id: PlayerId,
    pub char_id: CharacterId,
    pub name: String,
    pub xp: u64,
    pub lvl: u32,
    pub cur: u64,
}

/// Catalog entry. Read-only from the ledger's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub cost: u64,
    pub rarity: String,
}

/// One purchase or sale recorded in the market ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketLogEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    pub char_id: CharacterId,
    pub item_name: String,
    pub price: u64,
    pub quantity: u32,
    pub notes: String,
}

/// One completed session recorded in the game ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLogEntry {
    pub date: String,
    pub dm_id: PlayerId,
    /// Seat order as logged, at most six.
    pub player_ids: Vec<PlayerId>,
}
