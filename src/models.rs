//! Catalog records shared by the repository facade and the ingestion passes.
use chrono::NaiveDate;
use std::fmt;

pub type GameId = i64;
pub type PublisherId = i64;
pub type TagId = i64;
pub type MarketId = i64;
pub type PriceId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publisher {
    pub id: PublisherId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: GameId,
    pub header_image_url: String,
    /// De-duplication key across storefronts.
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub publisher: Publisher,
}

/// A game that has passed classification but has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    pub header_image_url: String,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub publisher: Publisher,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTag {
    pub id: i64,
    pub game_id: GameId,
    pub tag_id: TagId,
}

/// The fixed set of storefronts the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketName {
    Steam,
    EpicGames,
    Gog,
}

impl MarketName {
    pub const ALL: [MarketName; 3] = [MarketName::Steam, MarketName::EpicGames, MarketName::Gog];

    /// Value stored in `markets.name`.
    pub fn as_str(self) -> &'static str {
        match self {
            MarketName::Steam => "Steam",
            MarketName::EpicGames => "EpicGamesStore",
            MarketName::Gog => "GOG.com",
        }
    }
}

impl fmt::Display for MarketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub id: MarketId,
    pub name: MarketName,
}

/// One price observation for a (game, market) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMarketPrice {
    pub id: PriceId,
    /// Empty when there is no discount to show.
    pub initial_value_formatted: String,
    pub final_value_formatted: String,
    pub discount_percent: i32,
    /// Marketplace-native id or slug of the listing.
    pub market_game_url: String,
    pub game_id: GameId,
    pub market_id: MarketId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGameMarketPrice {
    pub initial_value_formatted: String,
    pub final_value_formatted: String,
    pub discount_percent: i32,
    pub market_game_url: String,
    pub game_id: GameId,
    pub market_id: MarketId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketBlacklistItem {
    pub id: i64,
    pub market_game_url: String,
    pub market_id: MarketId,
}
