//! Domain rules for the questbook ledger: entities, record mapping and the
//! gold/experience economy. Nothing in this crate performs I/O.

pub mod economy;
pub mod headers;
pub mod mapper;
pub mod models;

pub use economy::{EconomyRules, RulesError, Tier};
pub use mapper::{
    record_player_id, record_to_character, record_to_game_log_entry, record_to_item,
    record_to_market_log_entry, RecordError,
};
pub use models::{Character, CharacterId, GameLogEntry, Item, MarketLogEntry, PlayerId, Record};
