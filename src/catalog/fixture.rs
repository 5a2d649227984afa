//! Explicit seed data for tests. Each test states the rows it needs instead of
//! sharing module-level reference data.
use chrono::NaiveDate;

use super::{
    require_market, BlacklistRepository, GameRepository, MemoryCatalog, PriceRepository,
    PublisherRepository,
};
use crate::models::{MarketName, NewGame, NewGameMarketPrice};

struct PriceSeed {
    market: MarketName,
    native_id: String,
    final_value: String,
}

struct GameSeed {
    name: String,
    publisher: String,
    prices: Vec<PriceSeed>,
}

#[derive(Default)]
pub struct CatalogFixture {
    games: Vec<GameSeed>,
    blacklisted: Vec<(MarketName, String)>,
}

impl CatalogFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn game(mut self, name: &str) -> Self {
        self.games.push(GameSeed {
            name: name.into(),
            publisher: "Fixture Games".into(),
            prices: Vec::new(),
        });
        self
    }

    /// Seed a game together with an existing quote on `market`.
    pub fn priced_game(mut self, name: &str, market: MarketName, native_id: &str, final_value: &str) -> Self {
        self = self.game(name);
        if let Some(seed) = self.games.last_mut() {
            seed.prices.push(PriceSeed {
                market,
                native_id: native_id.into(),
                final_value: final_value.into(),
            });
        }
        self
    }

    pub fn blacklisted(mut self, market: MarketName, native_id: &str) -> Self {
        self.blacklisted.push((market, native_id.into()));
        self
    }

    pub async fn build(self) -> MemoryCatalog {
        let catalog = MemoryCatalog::with_markets();
        for seed in self.games {
            let publisher = match catalog.find_publisher_by_name(&seed.publisher).await.unwrap() {
                Some(p) => p,
                None => catalog.create_publisher(&seed.publisher).await.unwrap(),
            };
            let game = catalog
                .create_game(&NewGame {
                    header_image_url: format!("https://img.example/{}.jpg", seed.name),
                    name: seed.name.clone(),
                    description: String::new(),
                    release_date: NaiveDate::from_ymd_opt(2015, 6, 1).unwrap(),
                    publisher,
                })
                .await
                .unwrap();
            for price in seed.prices {
                let market = require_market(&catalog, price.market).await.unwrap();
                catalog
                    .create_price(&NewGameMarketPrice {
                        initial_value_formatted: String::new(),
                        final_value_formatted: price.final_value,
                        discount_percent: 0,
                        market_game_url: price.native_id,
                        game_id: game.id,
                        market_id: market.id,
                    })
                    .await
                    .unwrap();
            }
        }
        for (market, native_id) in self.blacklisted {
            let market = require_market(&catalog, market).await.unwrap();
            catalog.create_blacklist_item(market.id, &native_id).await.unwrap();
        }
        catalog
    }
}
