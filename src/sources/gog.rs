//! GOG.com title search over the catalog's `ajax/filtered` endpoint.
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GogConfig;
use crate::http::HttpClient;
use crate::models::MarketName;
use crate::normalization::{slugify, SlugDialect};
use crate::pricing::{format_amount, PriceQuote};
use crate::sources::enrichment::{Listing, StorefrontSearch};

#[derive(Debug, Deserialize)]
struct FilteredResponse {
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    price: Option<ProductPrice>,
}

/// Amounts arrive as pre-formatted decimal strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductPrice {
    #[serde(default)]
    final_amount: String,
    #[serde(default)]
    base_amount: String,
    #[serde(default)]
    discount: i32,
}

pub struct GogSearch {
    http: HttpClient,
    cfg: GogConfig,
    currency_suffix: String,
}

impl GogSearch {
    pub fn new(http: HttpClient, cfg: GogConfig, currency_suffix: impl Into<String>) -> Self {
        Self {
            http,
            cfg,
            currency_suffix: currency_suffix.into(),
        }
    }
}

#[async_trait]
impl StorefrontSearch for GogSearch {
    fn market(&self) -> MarketName {
        MarketName::Gog
    }

    async fn search(&self, game_name: &str) -> Result<Vec<Listing>> {
        let slug = slugify(game_name, SlugDialect::Gog);
        if slug.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/games/ajax/filtered", self.cfg.base_url.trim_end_matches('/'));
        let query = [("search", slug.clone()), ("language", self.cfg.language.clone())];
        let resp: FilteredResponse = self
            .http
            .get_json(&url, &query)
            .await
            .with_context(|| format!("gog: filtered search {slug:?}"))?;
        Ok(listings(resp, &self.currency_suffix))
    }
}

fn listings(resp: FilteredResponse, suffix: &str) -> Vec<Listing> {
    resp.products
        .into_iter()
        .map(|p| {
            let quote = quote_for(&p, suffix);
            Listing {
                title: p.title,
                quote,
            }
        })
        .collect()
}

fn quote_for(product: &Product, suffix: &str) -> Option<PriceQuote> {
    let native_id = product
        .url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())?;
    let price = product.price.as_ref()?;
    if price.final_amount.is_empty() {
        return None;
    }
    let base = if price.base_amount.is_empty() {
        &price.final_amount
    } else {
        &price.base_amount
    };
    Some(PriceQuote::new(
        native_id,
        format_amount(base, suffix),
        format_amount(&price.final_amount, suffix),
        price.discount,
    ))
}
