//! PostgreSQL-backed catalog.
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Row};
use tracing::instrument;

use super::{
    BlacklistRepository, GameRepository, GameTagRepository, MarketRepository, PriceRepository,
    PublisherRepository, TagRepository,
};
use crate::models::{
    Game, GameId, GameMarketPrice, GameTag, Market, MarketBlacklistItem, MarketId, MarketName,
    NewGame, NewGameMarketPrice, Publisher, Tag, TagId,
};
use crate::util::db::Db;

const SELECT_GAME: &str = "SELECT g.id, g.header_image_url, g.name, g.description, g.release_date, \
     p.id AS publisher_id, p.name AS publisher_name \
     FROM games g JOIN publishers p ON p.id = g.publisher_id";

const SELECT_PRICE: &str = "SELECT id, initial_value_formatted, final_value_formatted, \
     discount_percent, market_game_url, game_id, market_id FROM game_market_prices";

#[derive(Clone)]
pub struct PgCatalog {
    db: Db,
}

impl PgCatalog {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn game_from_row(row: &PgRow) -> Result<Game> {
    Ok(Game {
        id: row.try_get("id")?,
        header_image_url: row.try_get("header_image_url")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        release_date: row.try_get("release_date")?,
        publisher: Publisher {
            id: row.try_get("publisher_id")?,
            name: row.try_get("publisher_name")?,
        },
    })
}

fn price_from_row(row: &PgRow) -> Result<GameMarketPrice> {
    Ok(GameMarketPrice {
        id: row.try_get("id")?,
        initial_value_formatted: row.try_get("initial_value_formatted")?,
        final_value_formatted: row.try_get("final_value_formatted")?,
        discount_percent: row.try_get("discount_percent")?,
        market_game_url: row.try_get("market_game_url")?,
        game_id: row.try_get("game_id")?,
        market_id: row.try_get("market_id")?,
    })
}

#[async_trait]
impl GameRepository for PgCatalog {
    async fn list_games(&self) -> Result<Vec<Game>> {
        let rows = sqlx::query(&format!("{SELECT_GAME} ORDER BY g.id"))
            .fetch_all(&self.db.pool)
            .await
            .context("games: list failed")?;
        rows.iter().map(game_from_row).collect()
    }

    async fn find_game_by_name(&self, name: &str) -> Result<Option<Game>> {
        let row = sqlx::query(&format!("{SELECT_GAME} WHERE g.name = $1"))
            .bind(name)
            .fetch_optional(&self.db.pool)
            .await
            .context("games: find by name failed")?;
        row.as_ref().map(game_from_row).transpose()
    }

    #[instrument(skip(self, game), fields(name = %game.name))]
    async fn create_game(&self, game: &NewGame) -> Result<Game> {
        let row = sqlx::query(
            "INSERT INTO games (header_image_url, name, description, release_date, publisher_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&game.header_image_url)
        .bind(&game.name)
        .bind(&game.description)
        .bind(game.release_date)
        .bind(game.publisher.id)
        .fetch_one(&self.db.pool)
        .await
        .context("games: create failed")?;
        Ok(Game {
            id: row.try_get("id")?,
            header_image_url: game.header_image_url.clone(),
            name: game.name.clone(),
            description: game.description.clone(),
            release_date: game.release_date,
            publisher: game.publisher.clone(),
        })
    }
}

#[async_trait]
impl PublisherRepository for PgCatalog {
    async fn find_publisher_by_name(&self, name: &str) -> Result<Option<Publisher>> {
        let row = sqlx::query("SELECT id, name FROM publishers WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.db.pool)
            .await
            .context("publishers: find by name failed")?;
        row.map(|r| -> Result<Publisher> {
            Ok(Publisher {
                id: r.try_get("id")?,
                name: r.try_get("name")?,
            })
        })
        .transpose()
    }

    async fn create_publisher(&self, name: &str) -> Result<Publisher> {
        let row = sqlx::query("INSERT INTO publishers (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.db.pool)
            .await
            .context("publishers: create failed")?;
        Ok(Publisher {
            id: row.try_get("id")?,
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl TagRepository for PgCatalog {
    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.db.pool)
            .await
            .context("tags: find by name failed")?;
        row.map(|r| -> Result<Tag> {
            Ok(Tag {
                id: r.try_get("id")?,
                name: r.try_get("name")?,
            })
        })
        .transpose()
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        let row = sqlx::query("INSERT INTO tags (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.db.pool)
            .await
            .context("tags: create failed")?;
        Ok(Tag {
            id: row.try_get("id")?,
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl GameTagRepository for PgCatalog {
    async fn create_game_tag(&self, game_id: GameId, tag_id: TagId) -> Result<GameTag> {
        let row = sqlx::query(
            "INSERT INTO game_tags (game_id, tag_id) VALUES ($1, $2) \
             ON CONFLICT (game_id, tag_id) DO UPDATE SET tag_id = EXCLUDED.tag_id \
             RETURNING id",
        )
        .bind(game_id)
        .bind(tag_id)
        .fetch_one(&self.db.pool)
        .await
        .context("game_tags: create failed")?;
        Ok(GameTag {
            id: row.try_get("id")?,
            game_id,
            tag_id,
        })
    }
}

#[async_trait]
impl MarketRepository for PgCatalog {
    async fn find_market_by_name(&self, name: MarketName) -> Result<Option<Market>> {
        let row = sqlx::query("SELECT id FROM markets WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&self.db.pool)
            .await
            .context("markets: find by name failed")?;
        row.map(|r| -> Result<Market> {
            Ok(Market {
                id: r.try_get("id")?,
                name,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl PriceRepository for PgCatalog {
    async fn find_price(
        &self,
        game_id: GameId,
        market_id: MarketId,
    ) -> Result<Option<GameMarketPrice>> {
        let row = sqlx::query(&format!("{SELECT_PRICE} WHERE game_id = $1 AND market_id = $2"))
            .bind(game_id)
            .bind(market_id)
            .fetch_optional(&self.db.pool)
            .await
            .context("game_market_prices: find by game/market failed")?;
        row.as_ref().map(price_from_row).transpose()
    }

    async fn create_price(&self, price: &NewGameMarketPrice) -> Result<GameMarketPrice> {
        // A concurrent creator for the same pair lands on the unique key and
        // turns into an update instead of a second row.
        let row = sqlx::query(
            "INSERT INTO game_market_prices \
             (initial_value_formatted, final_value_formatted, discount_percent, market_game_url, game_id, market_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (game_id, market_id) DO UPDATE SET \
             initial_value_formatted = EXCLUDED.initial_value_formatted, \
             final_value_formatted = EXCLUDED.final_value_formatted, \
             discount_percent = EXCLUDED.discount_percent, \
             market_game_url = EXCLUDED.market_game_url \
             RETURNING id",
        )
        .bind(&price.initial_value_formatted)
        .bind(&price.final_value_formatted)
        .bind(price.discount_percent)
        .bind(&price.market_game_url)
        .bind(price.game_id)
        .bind(price.market_id)
        .fetch_one(&self.db.pool)
        .await
        .context("game_market_prices: create failed")?;
        Ok(GameMarketPrice {
            id: row.try_get("id")?,
            initial_value_formatted: price.initial_value_formatted.clone(),
            final_value_formatted: price.final_value_formatted.clone(),
            discount_percent: price.discount_percent,
            market_game_url: price.market_game_url.clone(),
            game_id: price.game_id,
            market_id: price.market_id,
        })
    }

    async fn update_price(&self, price: &GameMarketPrice) -> Result<()> {
        let result = sqlx::query(
            "UPDATE game_market_prices SET initial_value_formatted = $1, final_value_formatted = $2, \
             discount_percent = $3, market_game_url = $4 WHERE id = $5",
        )
        .bind(&price.initial_value_formatted)
        .bind(&price.final_value_formatted)
        .bind(price.discount_percent)
        .bind(&price.market_game_url)
        .bind(price.id)
        .execute(&self.db.pool)
        .await
        .context("game_market_prices: update failed")?;
        if result.rows_affected() == 0 {
            bail!("game_market_prices: row {} not found for update", price.id);
        }
        Ok(())
    }
}

#[async_trait]
impl BlacklistRepository for PgCatalog {
    async fn is_blacklisted(&self, market_id: MarketId, market_game_url: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM market_blacklist WHERE market_id = $1 AND market_game_url = $2)",
        )
        .bind(market_id)
        .bind(market_game_url)
        .fetch_one(&self.db.pool)
        .await
        .context("market_blacklist: existence check failed")?;
        Ok(exists)
    }

    async fn list_blacklisted(&self, market_id: MarketId) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT market_game_url FROM market_blacklist WHERE market_id = $1")
            .bind(market_id)
            .fetch_all(&self.db.pool)
            .await
            .context("market_blacklist: list failed")
    }

    async fn create_blacklist_item(
        &self,
        market_id: MarketId,
        market_game_url: &str,
    ) -> Result<MarketBlacklistItem> {
        let row = sqlx::query(
            "INSERT INTO market_blacklist (market_game_url, market_id) VALUES ($1, $2) \
             ON CONFLICT (market_id, market_game_url) DO UPDATE SET market_game_url = EXCLUDED.market_game_url \
             RETURNING id",
        )
        .bind(market_game_url)
        .bind(market_id)
        .fetch_one(&self.db.pool)
        .await
        .context("market_blacklist: create failed")?;
        Ok(MarketBlacklistItem {
            id: row.try_get("id")?,
            market_game_url: market_game_url.to_string(),
            market_id,
        })
    }
}
