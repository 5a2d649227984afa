//! In-process catalog used for dry runs and as the test harness store.
//!
//! Mirrors the relational constraints of the SQL schema that the pipeline
//! relies on: unique game, publisher and tag names, one price row per
//! (game, market), one blacklist row per (market, native id).
use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    BlacklistRepository, GameRepository, GameTagRepository, MarketRepository, PriceRepository,
    PublisherRepository, TagRepository,
};
use crate::models::{
    Game, GameId, GameMarketPrice, GameTag, Market, MarketBlacklistItem, MarketId, MarketName,
    NewGame, NewGameMarketPrice, Publisher, Tag, TagId,
};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    games: Vec<Game>,
    publishers: Vec<Publisher>,
    tags: Vec<Tag>,
    game_tags: Vec<GameTag>,
    markets: Vec<Market>,
    prices: Vec<GameMarketPrice>,
    blacklist: Vec<MarketBlacklistItem>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every known market row present, as the SQL schema seeds it.
    pub fn with_markets() -> Self {
        let mut state = State::default();
        for name in MarketName::ALL {
            let id = state.next_id();
            state.markets.push(Market { id, name });
        }
        Self {
            state: Mutex::new(state),
        }
    }

    #[cfg(test)]
    pub async fn prices_for(&self, game_id: GameId, market_id: MarketId) -> Vec<GameMarketPrice> {
        let state = self.state.lock().await;
        state
            .prices
            .iter()
            .filter(|p| p.game_id == game_id && p.market_id == market_id)
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub async fn price_count(&self) -> usize {
        self.state.lock().await.prices.len()
    }

    #[cfg(test)]
    pub async fn blacklist_items(&self) -> Vec<MarketBlacklistItem> {
        self.state.lock().await.blacklist.clone()
    }

    #[cfg(test)]
    pub async fn tags_for(&self, game_id: GameId) -> Vec<Tag> {
        let state = self.state.lock().await;
        state
            .game_tags
            .iter()
            .filter(|gt| gt.game_id == game_id)
            .filter_map(|gt| state.tags.iter().find(|t| t.id == gt.tag_id).cloned())
            .collect()
    }

    #[cfg(test)]
    pub async fn publisher_count(&self) -> usize {
        self.state.lock().await.publishers.len()
    }
}

#[async_trait]
impl GameRepository for MemoryCatalog {
    async fn list_games(&self) -> Result<Vec<Game>> {
        Ok(self.state.lock().await.games.clone())
    }

    async fn find_game_by_name(&self, name: &str) -> Result<Option<Game>> {
        let state = self.state.lock().await;
        Ok(state.games.iter().find(|g| g.name == name).cloned())
    }

    async fn create_game(&self, game: &NewGame) -> Result<Game> {
        let mut state = self.state.lock().await;
        if state.games.iter().any(|g| g.name == game.name) {
            bail!("game {:?} already exists", game.name);
        }
        let created = Game {
            id: state.next_id(),
            header_image_url: game.header_image_url.clone(),
            name: game.name.clone(),
            description: game.description.clone(),
            release_date: game.release_date,
            publisher: game.publisher.clone(),
        };
        state.games.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl PublisherRepository for MemoryCatalog {
    async fn find_publisher_by_name(&self, name: &str) -> Result<Option<Publisher>> {
        let state = self.state.lock().await;
        Ok(state.publishers.iter().find(|p| p.name == name).cloned())
    }

    async fn create_publisher(&self, name: &str) -> Result<Publisher> {
        let mut state = self.state.lock().await;
        if state.publishers.iter().any(|p| p.name == name) {
            bail!("publisher {name:?} already exists");
        }
        let publisher = Publisher {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.publishers.push(publisher.clone());
        Ok(publisher)
    }
}

#[async_trait]
impl TagRepository for MemoryCatalog {
    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let state = self.state.lock().await;
        Ok(state.tags.iter().find(|t| t.name == name).cloned())
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        let mut state = self.state.lock().await;
        if state.tags.iter().any(|t| t.name == name) {
            bail!("tag {name:?} already exists");
        }
        let tag = Tag {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }
}

#[async_trait]
impl GameTagRepository for MemoryCatalog {
    async fn create_game_tag(&self, game_id: GameId, tag_id: TagId) -> Result<GameTag> {
        let mut state = self.state.lock().await;
        let link = GameTag {
            id: state.next_id(),
            game_id,
            tag_id,
        };
        state.game_tags.push(link.clone());
        Ok(link)
    }
}

#[async_trait]
impl MarketRepository for MemoryCatalog {
    async fn find_market_by_name(&self, name: MarketName) -> Result<Option<Market>> {
        let state = self.state.lock().await;
        Ok(state.markets.iter().find(|m| m.name == name).cloned())
    }
}

#[async_trait]
impl PriceRepository for MemoryCatalog {
    async fn find_price(
        &self,
        game_id: GameId,
        market_id: MarketId,
    ) -> Result<Option<GameMarketPrice>> {
        let state = self.state.lock().await;
        Ok(state
            .prices
            .iter()
            .find(|p| p.game_id == game_id && p.market_id == market_id)
            .cloned())
    }

    async fn create_price(&self, price: &NewGameMarketPrice) -> Result<GameMarketPrice> {
        let mut state = self.state.lock().await;
        if state
            .prices
            .iter()
            .any(|p| p.game_id == price.game_id && p.market_id == price.market_id)
        {
            bail!(
                "price row for game {} on market {} already exists",
                price.game_id,
                price.market_id
            );
        }
        let created = GameMarketPrice {
            id: state.next_id(),
            initial_value_formatted: price.initial_value_formatted.clone(),
            final_value_formatted: price.final_value_formatted.clone(),
            discount_percent: price.discount_percent,
            market_game_url: price.market_game_url.clone(),
            game_id: price.game_id,
            market_id: price.market_id,
        };
        state.prices.push(created.clone());
        Ok(created)
    }

    async fn update_price(&self, price: &GameMarketPrice) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.prices.iter_mut().find(|p| p.id == price.id) {
            Some(row) => {
                *row = price.clone();
                Ok(())
            }
            None => bail!("price row {} not found", price.id),
        }
    }
}

#[async_trait]
impl BlacklistRepository for MemoryCatalog {
    async fn is_blacklisted(&self, market_id: MarketId, market_game_url: &str) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state
            .blacklist
            .iter()
            .any(|b| b.market_id == market_id && b.market_game_url == market_game_url))
    }

    async fn list_blacklisted(&self, market_id: MarketId) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .blacklist
            .iter()
            .filter(|b| b.market_id == market_id)
            .map(|b| b.market_game_url.clone())
            .collect())
    }

    async fn create_blacklist_item(
        &self,
        market_id: MarketId,
        market_game_url: &str,
    ) -> Result<MarketBlacklistItem> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .blacklist
            .iter()
            .find(|b| b.market_id == market_id && b.market_game_url == market_game_url)
        {
            return Ok(existing.clone());
        }
        let item = MarketBlacklistItem {
            id: state.next_id(),
            market_game_url: market_game_url.to_string(),
            market_id,
        };
        state.blacklist.push(item.clone());
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_game(name: &str, publisher: Publisher) -> NewGame {
        NewGame {
            header_image_url: String::new(),
            name: name.into(),
            description: String::new(),
            release_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            publisher,
        }
    }

    #[tokio::test]
    async fn seeded_markets_are_findable() {
        let catalog = MemoryCatalog::with_markets();
        for name in MarketName::ALL {
            let market = catalog.find_market_by_name(name).await.unwrap();
            assert_eq!(market.map(|m| m.name), Some(name));
        }
        assert!(MemoryCatalog::new()
            .find_market_by_name(MarketName::Steam)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn game_names_are_unique() {
        let catalog = MemoryCatalog::with_markets();
        let publisher = catalog.create_publisher("Valve").await.unwrap();
        catalog.create_game(&new_game("Portal", publisher.clone())).await.unwrap();
        assert!(catalog.create_game(&new_game("Portal", publisher)).await.is_err());
        assert!(catalog.find_game_by_name("Portal").await.unwrap().is_some());
        assert!(catalog.find_game_by_name("portal").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_price_row_for_same_pair_is_rejected() {
        let catalog = MemoryCatalog::with_markets();
        let publisher = catalog.create_publisher("Valve").await.unwrap();
        let game = catalog.create_game(&new_game("Portal", publisher)).await.unwrap();
        let row = NewGameMarketPrice {
            initial_value_formatted: String::new(),
            final_value_formatted: "199 руб.".into(),
            discount_percent: 0,
            market_game_url: "400".into(),
            game_id: game.id,
            market_id: 1,
        };
        catalog.create_price(&row).await.unwrap();
        assert!(catalog.create_price(&row).await.is_err());
        assert_eq!(catalog.price_count().await, 1);
    }

    #[tokio::test]
    async fn updating_a_missing_price_row_fails() {
        let catalog = MemoryCatalog::with_markets();
        let ghost = GameMarketPrice {
            id: 999,
            initial_value_formatted: String::new(),
            final_value_formatted: String::new(),
            discount_percent: 0,
            market_game_url: String::new(),
            game_id: 1,
            market_id: 1,
        };
        assert!(catalog.update_price(&ghost).await.is_err());
    }
}
