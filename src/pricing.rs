//! Price quotes and the (game, market) upsert every source funnels through.
use anyhow::{Context, Result};
use std::fmt::Display;
use tracing::debug;

use crate::catalog::Catalog;
use crate::models::{Game, GameMarketPrice, Market, NewGameMarketPrice};

/// A normalized price observation from one storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceQuote {
    pub initial_formatted: String,
    pub final_formatted: String,
    pub discount_percent: i32,
    /// Marketplace-native id or slug of the listing.
    pub market_game_url: String,
}

impl PriceQuote {
    /// Build a quote; an initial value equal to the final one is cleared since
    /// there is no discount to display.
    pub fn new(
        market_game_url: impl Into<String>,
        initial_formatted: impl Into<String>,
        final_formatted: impl Into<String>,
        discount_percent: i32,
    ) -> Self {
        let final_formatted = final_formatted.into();
        let mut initial_formatted = initial_formatted.into();
        if initial_formatted == final_formatted {
            initial_formatted.clear();
        }
        Self {
            initial_formatted,
            final_formatted,
            discount_percent,
            market_game_url: market_game_url.into(),
        }
    }

    /// Blank quote: the listing exists but carries no price ("not priced", not "free").
    pub fn unpriced(market_game_url: impl Into<String>) -> Self {
        Self {
            market_game_url: market_game_url.into(),
            ..Self::default()
        }
    }
}

/// `"499"` + `"руб."` -> `"499 руб."`
pub fn format_amount(amount: impl Display, suffix: &str) -> String {
    if suffix.is_empty() {
        amount.to_string()
    } else {
        format!("{amount} {suffix}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Create the price row for (game, market) or update the existing one in place.
/// There is never more than one row per pair.
pub async fn upsert_price(
    catalog: &dyn Catalog,
    game: &Game,
    market: &Market,
    quote: &PriceQuote,
) -> Result<UpsertOutcome> {
    let existing = catalog
        .find_price(game.id, market.id)
        .await
        .with_context(|| format!("{}: price lookup for {:?}", market.name, game.name))?;
    match existing {
        Some(row) => {
            let updated = GameMarketPrice {
                initial_value_formatted: quote.initial_formatted.clone(),
                final_value_formatted: quote.final_formatted.clone(),
                discount_percent: quote.discount_percent,
                market_game_url: quote.market_game_url.clone(),
                ..row
            };
            catalog
                .update_price(&updated)
                .await
                .with_context(|| format!("{}: price update for {:?}", market.name, game.name))?;
            debug!(market = %market.name, game = %game.name, "price updated");
            Ok(UpsertOutcome::Updated)
        }
        None => {
            catalog
                .create_price(&NewGameMarketPrice {
                    initial_value_formatted: quote.initial_formatted.clone(),
                    final_value_formatted: quote.final_formatted.clone(),
                    discount_percent: quote.discount_percent,
                    market_game_url: quote.market_game_url.clone(),
                    game_id: game.id,
                    market_id: market.id,
                })
                .await
                .with_context(|| format!("{}: price create for {:?}", market.name, game.name))?;
            debug!(market = %market.name, game = %game.name, "price created");
            Ok(UpsertOutcome::Created)
        }
    }
}
