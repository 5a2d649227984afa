//! Epic Games Store title search over the public GraphQL catalog endpoint.
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EpicConfig;
use crate::http::HttpClient;
use crate::models::MarketName;
use crate::normalization::{slugify, SlugDialect};
use crate::pricing::{format_amount, PriceQuote};
use crate::sources::enrichment::{Listing, StorefrontSearch};

const SEARCH_QUERY: &str = "query searchStoreQuery($keywords: String, $country: String!, $locale: String, $count: Int) { \
Catalog { searchStore(keywords: $keywords, country: $country, locale: $locale, count: $count) { \
elements { title productSlug price(country: $country) { totalPrice { discountPrice originalPrice discount } } } } } }";

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'static str,
    variables: SearchVariables<'a>,
}

#[derive(Debug, Serialize)]
struct SearchVariables<'a> {
    keywords: &'a str,
    country: &'a str,
    locale: &'a str,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: SearchData,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(rename = "Catalog")]
    catalog: CatalogData,
}

#[derive(Debug, Deserialize)]
struct CatalogData {
    #[serde(rename = "searchStore")]
    search_store: SearchStore,
}

#[derive(Debug, Deserialize)]
struct SearchStore {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Element {
    #[serde(default)]
    title: String,
    product_slug: Option<String>,
    price: Option<ElementPrice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementPrice {
    total_price: TotalPrice,
}

/// Amounts are in minor currency units.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalPrice {
    discount_price: i64,
    original_price: i64,
}

pub struct EpicGamesSearch {
    http: HttpClient,
    cfg: EpicConfig,
    currency_suffix: String,
}

impl EpicGamesSearch {
    pub fn new(http: HttpClient, cfg: EpicConfig, currency_suffix: impl Into<String>) -> Self {
        Self {
            http,
            cfg,
            currency_suffix: currency_suffix.into(),
        }
    }
}

#[async_trait]
impl StorefrontSearch for EpicGamesSearch {
    fn market(&self) -> MarketName {
        MarketName::EpicGames
    }

    async fn search(&self, game_name: &str) -> Result<Vec<Listing>> {
        let keywords = slugify(game_name, SlugDialect::EpicGames);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        let request = GraphqlRequest {
            query: SEARCH_QUERY,
            variables: SearchVariables {
                keywords: &keywords,
                country: &self.cfg.country,
                locale: &self.cfg.locale,
                count: self.cfg.search_count,
            },
        };
        let resp: SearchResponse = self
            .http
            .post_json(&self.cfg.graphql_url, &request)
            .await
            .with_context(|| format!("epic: searchStore {keywords:?}"))?;
        Ok(listings(resp, &self.currency_suffix))
    }
}

fn listings(resp: SearchResponse, suffix: &str) -> Vec<Listing> {
    resp.data
        .catalog
        .search_store
        .elements
        .into_iter()
        .map(|el| {
            let quote = quote_for(&el, suffix);
            Listing {
                title: el.title,
                quote,
            }
        })
        .collect()
}

fn quote_for(el: &Element, suffix: &str) -> Option<PriceQuote> {
    let slug = el
        .product_slug
        .as_deref()
        .and_then(|s| s.split('/').next())
        .filter(|s| !s.is_empty())?;
    let total = &el.price.as_ref()?.total_price;
    Some(PriceQuote::new(
        slug,
        format_amount(total.original_price / 100, suffix),
        format_amount(total.discount_price / 100, suffix),
        discount_percent(total.original_price, total.discount_price),
    ))
}

/// Epic reports the discount as an absolute amount; the catalog stores a percentage.
fn discount_percent(original: i64, current: i64) -> i32 {
    if original <= 0 || current >= original {
        return 0;
    }
    (((original - current) * 100 + original / 2) / original) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{decode_json, stub};

    const TWO_ELEMENTS: &str = r#"{
        "data": {"Catalog": {"searchStore": {"elements": [
            {
                "title": "Celeste",
                "productSlug": "celeste/home",
                "price": {"totalPrice": {"discountPrice": 24700, "originalPrice": 61000, "discount": 36300}}
            },
            {
                "title": "Celeste Classic",
                "productSlug": null,
                "price": {"totalPrice": {"discountPrice": 0, "originalPrice": 0, "discount": 0}}
            }
        ]}}}
    }"#;

    #[test]
    fn decodes_elements_into_listings() {
        let resp: SearchResponse = decode_json(TWO_ELEMENTS, "test").unwrap();
        let found = listings(resp, "руб.");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].title, "Celeste");
        assert_eq!(
            found[0].quote,
            Some(PriceQuote::new("celeste", "610 руб.", "247 руб.", 60))
        );
        assert_eq!(found[1].quote, None);
    }

    #[test]
    fn equal_amounts_clear_initial_value() {
        let body = r#"{"data": {"Catalog": {"searchStore": {"elements": [
            {"title": "Hades", "productSlug": "hades", "price": {"totalPrice": {"discountPrice": 49900, "originalPrice": 49900, "discount": 0}}}
        ]}}}}"#;
        let resp: SearchResponse = decode_json(body, "test").unwrap();
        let quote = listings(resp, "руб.").remove(0).quote.unwrap();
        assert_eq!(quote.initial_formatted, "");
        assert_eq!(quote.final_formatted, "499 руб.");
        assert_eq!(quote.discount_percent, 0);
    }

    #[test]
    fn element_without_price_has_no_quote() {
        let body = r#"{"data": {"Catalog": {"searchStore": {"elements": [
            {"title": "Hades", "productSlug": "hades", "price": null}
        ]}}}}"#;
        let resp: SearchResponse = decode_json(body, "test").unwrap();
        assert_eq!(listings(resp, "руб.")[0].quote, None);
    }

    #[test]
    fn empty_result_set_decodes() {
        let body = r#"{"data": {"Catalog": {"searchStore": {"elements": []}}}}"#;
        let resp: SearchResponse = decode_json(body, "test").unwrap();
        assert!(listings(resp, "руб.").is_empty());
    }

    #[test]
    fn graphql_error_shape_is_a_decode_error() {
        let body = r#"{"errors": [{"message": "boom"}]}"#;
        assert!(decode_json::<SearchResponse>(body, "test").is_err());
    }

    #[test]
    fn discount_rounds_to_whole_percent() {
        assert_eq!(discount_percent(61000, 24700), 60);
        assert_eq!(discount_percent(1000, 667), 33);
        assert_eq!(discount_percent(0, 0), 0);
        assert_eq!(discount_percent(500, 500), 0);
    }

    #[test]
    fn request_carries_variables() {
        let req = GraphqlRequest {
            query: SEARCH_QUERY,
            variables: SearchVariables {
                keywords: "the-witcher--wild-hunt",
                country: "RU",
                locale: "en-US",
                count: 10,
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["variables"]["keywords"], "the-witcher--wild-hunt");
        assert_eq!(json["variables"]["count"], 10);
        assert!(json["query"].as_str().unwrap().contains("searchStore"));
    }

    fn epic_against(server: &stub::StubServer) -> EpicGamesSearch {
        let cfg = EpicConfig {
            graphql_url: format!("{}/graphql", server.base_url),
            ..EpicConfig::default()
        };
        EpicGamesSearch::new(stub::client(0), cfg, "руб.")
    }

    #[tokio::test]
    async fn search_posts_the_slug_as_keywords() {
        let server = stub::StubServer::start(200, TWO_ELEMENTS).await;
        let found = epic_against(&server)
            .search("The Witcher 3: Wild Hunt")
            .await
            .unwrap();

        assert_eq!(found[0].title, "Celeste");
        let seen = server.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].target, "/graphql");
        let sent: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(sent["variables"]["keywords"], "the-witcher--wild-hunt");
        assert_eq!(sent["variables"]["country"], "RU");
    }

    #[tokio::test]
    async fn empty_slug_skips_the_storefront() {
        let server = stub::StubServer::start(200, TWO_ELEMENTS).await;
        let found = epic_against(&server).search("2077").await.unwrap();

        assert!(found.is_empty());
        assert!(server.requests().is_empty());
    }
}
