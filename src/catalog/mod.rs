//! Persistence boundary for the ingestion pipeline.
//!
//! Finders return `Ok(None)` when a row does not exist; any `Err` is a real
//! persistence failure and aborts the enclosing pass.
use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Game, GameId, GameMarketPrice, GameTag, Market, MarketBlacklistItem, MarketId, MarketName,
    NewGame, NewGameMarketPrice, Publisher, Tag, TagId,
};

#[cfg(test)]
pub mod fixture;
pub mod memory;
pub mod pg;

pub use memory::MemoryCatalog;
pub use pg::PgCatalog;

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn list_games(&self) -> Result<Vec<Game>>;
    async fn find_game_by_name(&self, name: &str) -> Result<Option<Game>>;
    async fn create_game(&self, game: &NewGame) -> Result<Game>;
}

#[async_trait]
pub trait PublisherRepository: Send + Sync {
    async fn find_publisher_by_name(&self, name: &str) -> Result<Option<Publisher>>;
    async fn create_publisher(&self, name: &str) -> Result<Publisher>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;
    async fn create_tag(&self, name: &str) -> Result<Tag>;
}

#[async_trait]
pub trait GameTagRepository: Send + Sync {
    async fn create_game_tag(&self, game_id: GameId, tag_id: TagId) -> Result<GameTag>;
}

/// Markets are seeded with the schema; the pipeline only looks them up.
#[async_trait]
pub trait MarketRepository: Send + Sync {
    async fn find_market_by_name(&self, name: MarketName) -> Result<Option<Market>>;
}

#[async_trait]
pub trait PriceRepository: Send + Sync {
    async fn find_price(&self, game_id: GameId, market_id: MarketId)
        -> Result<Option<GameMarketPrice>>;
    async fn create_price(&self, price: &NewGameMarketPrice) -> Result<GameMarketPrice>;
    /// Overwrite the row with `price.id`. Fails if the row does not exist.
    async fn update_price(&self, price: &GameMarketPrice) -> Result<()>;
}

#[async_trait]
pub trait BlacklistRepository: Send + Sync {
    async fn is_blacklisted(&self, market_id: MarketId, market_game_url: &str) -> Result<bool>;
    /// Every native id blacklisted on `market_id`, for bulk filtering.
    async fn list_blacklisted(&self, market_id: MarketId) -> Result<Vec<String>>;
    async fn create_blacklist_item(
        &self,
        market_id: MarketId,
        market_game_url: &str,
    ) -> Result<MarketBlacklistItem>;
}

/// Everything an ingestion pass needs from storage.
pub trait Catalog:
    GameRepository
    + PublisherRepository
    + TagRepository
    + GameTagRepository
    + MarketRepository
    + PriceRepository
    + BlacklistRepository
{
}

impl<T> Catalog for T where
    T: GameRepository
        + PublisherRepository
        + TagRepository
        + GameTagRepository
        + MarketRepository
        + PriceRepository
        + BlacklistRepository
{
}

/// Look up a seeded market, failing the pass if the seed is missing.
pub async fn require_market(catalog: &dyn Catalog, name: MarketName) -> Result<Market> {
    catalog
        .find_market_by_name(name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("market {name} is not seeded in the catalog"))
}
