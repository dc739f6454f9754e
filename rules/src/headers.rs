//! Worksheet titles and the header text of every column the ledger uses.
//!
//! The schema resolver looks these names up in row 1 of each worksheet and
//! the mapper uses them as record keys, so both sides always agree.

/// Character roster.
pub mod characters {
    pub const SHEET: &str = "Characters";

    pub const PLAYER_ID: &str = "player id";
    pub const NAME: &str = "character name";
    pub const CHAR_ID: &str = "character id";
    pub const CURRENCY: &str = "currency";
    pub const XP: &str = "experience";
    pub const LEVEL: &str = "level";

    pub const ALL: [&str; 6] = [PLAYER_ID, NAME, CHAR_ID, CURRENCY, XP, LEVEL];
}

/// Item catalog.
pub mod items {
    pub const SHEET: &str = "Items";

    pub const NAME: &str = "item name";
    pub const COST: &str = "cost";
    pub const RARITY: &str = "rarity";

    pub const ALL: [&str; 3] = [NAME, COST, RARITY];
}

/// Market ledger: one row per purchase or sale.
pub mod market_log {
    pub const SHEET: &str = "MarketLog";

    pub const DATE: &str = "date";
    pub const CHAR_ID: &str = "character id";
    pub const ITEM_NAME: &str = "item name";
    pub const PRICE: &str = "price";
    pub const QUANTITY: &str = "quantity";
    pub const NOTES: &str = "notes";

    pub const ALL: [&str; 6] = [DATE, CHAR_ID, ITEM_NAME, PRICE, QUANTITY, NOTES];
}

/// Game ledger: one row per completed session.
pub mod game_log {
    pub const SHEET: &str = "GameLog";

    pub const DATE: &str = "date";
    pub const DM_ID: &str = "dm id";

    /// Seats available in a logged session.
    pub const MAX_PLAYERS: usize = 6;

    pub const PLAYER_IDS: [&str; MAX_PLAYERS] =
        ["p1 id", "p2 id", "p3 id", "p4 id", "p5 id", "p6 id"];

    pub const ALL: [&str; 8] = [
        DATE,
        DM_ID,
        PLAYER_IDS[0],
        PLAYER_IDS[1],
        PLAYER_IDS[2],
        PLAYER_IDS[3],
        PLAYER_IDS[4],
        PLAYER_IDS[5],
    ];
}
