//! Secondary passes: price games Steam already created on another storefront.
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::catalog::{require_market, Catalog};
use crate::models::MarketName;
use crate::pricing::{upsert_price, PriceQuote, UpsertOutcome};
use crate::sources::{IngestWorker, PassReport};

/// One search hit from a storefront. `quote` is `None` when the listing lacks
/// a usable id or price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub title: String,
    pub quote: Option<PriceQuote>,
}

/// Title search on one secondary storefront.
#[async_trait]
pub trait StorefrontSearch: Send + Sync {
    fn market(&self) -> MarketName;
    async fn search(&self, game_name: &str) -> Result<Vec<Listing>>;
}

/// First quoted listing whose title equals `name` exactly (case-sensitive).
pub fn exact_match<'a>(listings: &'a [Listing], name: &str) -> Option<&'a PriceQuote> {
    listings
        .iter()
        .filter(|l| l.title == name)
        .find_map(|l| l.quote.as_ref())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub searched: usize,
    pub created: usize,
    pub updated: usize,
    pub unmatched: usize,
}

pub struct PriceEnrichment<S> {
    source: S,
}

impl<S: StorefrontSearch> PriceEnrichment<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Search every catalog game by name and upsert the quote of the exact
    /// match. Games without a match keep whatever row they had.
    pub async fn run(&self, catalog: &dyn Catalog) -> Result<EnrichmentReport> {
        let market = require_market(catalog, self.source.market()).await?;
        let games = catalog
            .list_games()
            .await
            .with_context(|| format!("{}: listing games", market.name))?;
        let mut report = EnrichmentReport::default();
        for game in &games {
            report.searched += 1;
            let listings = self
                .source
                .search(&game.name)
                .await
                .with_context(|| format!("{}: search for {:?}", market.name, game.name))?;
            match exact_match(&listings, &game.name) {
                Some(quote) => match upsert_price(catalog, game, &market, quote).await? {
                    UpsertOutcome::Created => report.created += 1,
                    UpsertOutcome::Updated => report.updated += 1,
                },
                None => {
                    report.unmatched += 1;
                    debug!(market = %market.name, game = %game.name, hits = listings.len(), "no exact title match");
                }
            }
        }
        info!(
            market = %market.name,
            searched = report.searched,
            created = report.created,
            updated = report.updated,
            unmatched = report.unmatched,
            "enrichment finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl<S: StorefrontSearch> IngestWorker for PriceEnrichment<S> {
    fn name(&self) -> &'static str {
        self.source.market().as_str()
    }

    async fn run(&self, catalog: &dyn Catalog) -> Result<PassReport> {
        PriceEnrichment::run(self, catalog)
            .await
            .map(PassReport::Enrichment)
    }
}
