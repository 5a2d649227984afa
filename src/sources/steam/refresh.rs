use anyhow::{Context, Result};
use tracing::{debug, info};

use super::client::{AppPrice, SteamApi};
use crate::catalog::Catalog;
use crate::models::{Game, Market};
use crate::pricing::{upsert_price, PriceQuote};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub batches: usize,
    pub refreshed: usize,
    /// Ids Steam did not answer or reported unsuccessful; their rows are left as-is.
    pub unanswered: usize,
}

/// Re-price already known Steam listings, `batch_size` ids per request.
///
/// `targets` pairs each native id with the game it prices. A failed batch
/// request aborts the refresh; batches already applied stay applied.
pub async fn refresh_prices<A: SteamApi + ?Sized>(
    api: &A,
    catalog: &dyn Catalog,
    market: &Market,
    targets: &[(String, Game)],
    batch_size: usize,
) -> Result<RefreshReport> {
    let mut report = RefreshReport::default();
    if targets.is_empty() {
        return Ok(report);
    }
    for (n, batch) in targets.chunks(batch_size.max(1)).enumerate() {
        let ids: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();
        let prices = api
            .app_prices(&ids)
            .await
            .with_context(|| format!("steam: price batch {} ({} ids)", n + 1, ids.len()))?;
        report.batches += 1;
        for (app_id, game) in batch {
            match prices.get(app_id) {
                Some(AppPrice::Listed(overview)) => {
                    let quote = match overview {
                        Some(p) => PriceQuote::new(
                            app_id.as_str(),
                            p.initial_formatted.as_str(),
                            p.final_formatted.as_str(),
                            p.discount_percent,
                        ),
                        None => PriceQuote::unpriced(app_id.as_str()),
                    };
                    upsert_price(catalog, game, market, &quote).await?;
                    report.refreshed += 1;
                }
                Some(AppPrice::Unavailable) | None => {
                    report.unanswered += 1;
                    debug!(app_id = %app_id, game = %game.name, "steam: no price in batch response");
                }
            }
        }
    }
    info!(
        batches = report.batches,
        refreshed = report.refreshed,
        unanswered = report.unanswered,
        "steam: price refresh finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{fixture::CatalogFixture, require_market, GameRepository, MemoryCatalog};
    use crate::models::MarketName;
    use crate::sources::steam::client::{AppDetails, AppListEntry, PriceOverview};
    use anyhow::bail;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers every id with a fixed price, optionally failing on the n-th call.
    #[derive(Default)]
    struct BatchRecorder {
        calls: Mutex<Vec<usize>>,
        fail_on_call: Option<usize>,
        skip_ids: Vec<String>,
    }

    #[async_trait]
    impl SteamApi for BatchRecorder {
        async fn app_list(&self) -> Result<Vec<AppListEntry>> {
            Ok(Vec::new())
        }

        async fn app_details(&self, _app_id: &str) -> Result<Option<AppDetails>> {
            Ok(None)
        }

        async fn app_prices(&self, app_ids: &[String]) -> Result<HashMap<String, AppPrice>> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(app_ids.len());
                calls.len()
            };
            if self.fail_on_call == Some(call) {
                bail!("steam returned 503");
            }
            Ok(app_ids
                .iter()
                .filter(|id| !self.skip_ids.contains(id))
                .map(|id| {
                    let price = AppPrice::Listed(Some(PriceOverview {
                        initial_formatted: "265 руб.".into(),
                        final_formatted: "132 руб.".into(),
                        discount_percent: 50,
                    }));
                    (id.clone(), price)
                })
                .collect())
        }
    }

    async fn seeded(count: usize) -> (MemoryCatalog, Vec<(String, Game)>) {
        let mut fixture = CatalogFixture::new();
        for i in 0..count {
            fixture = fixture.priced_game(&format!("Game {i}"), MarketName::Steam, &i.to_string(), "999 руб.");
        }
        let catalog = fixture.build().await;
        let mut targets = Vec::new();
        for i in 0..count {
            let game = catalog.find_game_by_name(&format!("Game {i}")).await.unwrap().unwrap();
            targets.push((i.to_string(), game));
        }
        (catalog, targets)
    }

    #[tokio::test]
    async fn splits_ids_into_batches_of_width() {
        let (catalog, targets) = seeded(250).await;
        let market = require_market(&catalog, MarketName::Steam).await.unwrap();
        let api = BatchRecorder::default();

        let report = refresh_prices(&api, &catalog, &market, &targets, 100).await.unwrap();

        assert_eq!(*api.calls.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(report.batches, 3);
        assert_eq!(report.refreshed, 250);
        let row = &catalog.prices_for(targets[249].1.id, market.id).await[0];
        assert_eq!(row.final_value_formatted, "132 руб.");
        assert_eq!(row.discount_percent, 50);
    }

    #[tokio::test]
    async fn failed_batch_aborts_remaining_batches() {
        let (catalog, targets) = seeded(250).await;
        let market = require_market(&catalog, MarketName::Steam).await.unwrap();
        let api = BatchRecorder {
            fail_on_call: Some(2),
            ..Default::default()
        };

        let err = refresh_prices(&api, &catalog, &market, &targets, 100).await.unwrap_err();

        assert_eq!(api.calls.lock().unwrap().len(), 2);
        assert!(format!("{err:#}").contains("price batch 2"));
        // First batch was applied, the third never requested.
        let first = &catalog.prices_for(targets[0].1.id, market.id).await[0];
        assert_eq!(first.final_value_formatted, "132 руб.");
        let last = &catalog.prices_for(targets[249].1.id, market.id).await[0];
        assert_eq!(last.final_value_formatted, "999 руб.");
    }

    #[tokio::test]
    async fn ids_missing_from_response_keep_their_row() {
        let (catalog, targets) = seeded(3).await;
        let market = require_market(&catalog, MarketName::Steam).await.unwrap();
        let api = BatchRecorder {
            skip_ids: vec!["1".into()],
            ..Default::default()
        };

        let report = refresh_prices(&api, &catalog, &market, &targets, 100).await.unwrap();

        assert_eq!(report.refreshed, 2);
        assert_eq!(report.unanswered, 1);
        let untouched = &catalog.prices_for(targets[1].1.id, market.id).await[0];
        assert_eq!(untouched.final_value_formatted, "999 руб.");
        assert_eq!(catalog.price_count().await, 3);
    }

    #[tokio::test]
    async fn nothing_to_refresh_makes_no_requests() {
        let catalog = MemoryCatalog::with_markets();
        let market = require_market(&catalog, MarketName::Steam).await.unwrap();
        let api = BatchRecorder::default();
        let report = refresh_prices(&api, &catalog, &market, &[], 100).await.unwrap();
        assert_eq!(report, RefreshReport::default());
        assert!(api.calls.lock().unwrap().is_empty());
    }
}
