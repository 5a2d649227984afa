//! Runs the Steam bootstrap, then every secondary enrichment pass concurrently.
use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::config::IngestConfig;
use crate::http::HttpClient;
use crate::models::MarketName;
use crate::sources::{
    EpicGamesSearch, GogSearch, IngestWorker, PassReport, PriceEnrichment, SteamCatalogBootstrap,
    SteamClient,
};

/// Per-pass results of one complete run, primary first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub passes: Vec<(&'static str, PassReport)>,
}

pub struct Orchestrator {
    catalog: Arc<dyn Catalog>,
    primary: Arc<dyn IngestWorker>,
    secondaries: Vec<Arc<dyn IngestWorker>>,
}

impl Orchestrator {
    pub fn new(catalog: Arc<dyn Catalog>, primary: Arc<dyn IngestWorker>) -> Self {
        Self {
            catalog,
            primary,
            secondaries: Vec::new(),
        }
    }

    pub fn with_secondary(mut self, worker: Arc<dyn IngestWorker>) -> Self {
        self.secondaries.push(worker);
        self
    }

    /// The primary pass must finish before any secondary starts, since
    /// secondaries only price games it created. Secondaries run concurrently;
    /// all of them finish before the earliest failure (if any) is returned.
    pub async fn run(&self) -> Result<IngestionReport> {
        let mut report = IngestionReport::default();
        let name = self.primary.name();
        info!(worker = name, "starting primary pass");
        let primary = match self.primary.run(self.catalog.as_ref()).await {
            Ok(r) => r,
            Err(e) => {
                error!(worker = name, error = %e, "primary pass failed; skipping secondary passes");
                return Err(e.context(format!("{name} pass failed")));
            }
        };
        info!(worker = name, "primary pass finished");
        report.passes.push((name, primary));

        let mut tasks = FuturesUnordered::new();
        for w in &self.secondaries {
            let w = Arc::clone(w);
            let catalog = Arc::clone(&self.catalog);
            tasks.push(tokio::spawn(async move {
                info!(worker = w.name(), "starting worker");
                let res = w
                    .run(catalog.as_ref())
                    .await
                    .with_context(|| format!("{} pass failed", w.name()));
                match &res {
                    Ok(_) => info!(worker = w.name(), "worker finished"),
                    Err(e) => error!(worker = w.name(), error = %e, "worker failed"),
                }
                res.map(|r| (w.name(), r))
            }));
        }
        // Drained in completion order, so `first_err` is the earliest failure.
        let mut first_err: Option<anyhow::Error> = None;
        while let Some(r) = tasks.next().await {
            match r {
                Ok(Ok(pass)) => report.passes.push(pass),
                Ok(Err(e)) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
                Err(join_err) => {
                    if first_err.is_none() {
                        first_err = Some(anyhow::anyhow!(join_err));
                    }
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// Wire the real storefront clients and run one full ingestion.
/// `skip` names secondary markets to leave out; Steam always runs.
pub async fn run_ingestion(
    catalog: Arc<dyn Catalog>,
    cfg: &IngestConfig,
    skip: &[MarketName],
) -> Result<IngestionReport> {
    let http = HttpClient::new(&cfg.http)?;
    let steam = SteamClient::new(http.clone(), cfg.steam.clone());
    let mut orchestrator = Orchestrator::new(
        catalog,
        Arc::new(SteamCatalogBootstrap::new(steam, cfg.steam.clone())),
    );
    if !skip.contains(&MarketName::EpicGames) {
        let epic = EpicGamesSearch::new(http.clone(), cfg.epic.clone(), cfg.currency_suffix.clone());
        orchestrator = orchestrator.with_secondary(Arc::new(PriceEnrichment::new(epic)));
    }
    if !skip.contains(&MarketName::Gog) {
        let gog = GogSearch::new(http, cfg.gog.clone(), cfg.currency_suffix.clone());
        orchestrator = orchestrator.with_secondary(Arc::new(PriceEnrichment::new(gog)));
    }
    orchestrator.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{require_market, GameRepository, MemoryCatalog};
    use crate::config::SteamConfig;
    use crate::pricing::PriceQuote;
    use crate::sources::steam::{AppDetails, AppListEntry, AppPrice, ReleaseDate, SteamApi};
    use crate::sources::{EnrichmentReport, Listing, StorefrontSearch};
    use anyhow::bail;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Scripted {
        name: &'static str,
        fail: bool,
        delay: Duration,
        log: Log,
    }

    #[async_trait]
    impl IngestWorker for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _catalog: &dyn Catalog) -> Result<PassReport> {
            self.log.lock().unwrap().push(self.name.to_string());
            tokio::time::sleep(self.delay).await;
            if self.fail {
                bail!("{} exploded", self.name);
            }
            Ok(PassReport::Enrichment(EnrichmentReport::default()))
        }
    }

    fn worker(name: &'static str, fail: bool, log: &Log) -> Arc<dyn IngestWorker> {
        slow_worker(name, fail, Duration::ZERO, log)
    }

    fn slow_worker(name: &'static str, fail: bool, delay: Duration, log: &Log) -> Arc<dyn IngestWorker> {
        Arc::new(Scripted {
            name,
            fail,
            delay,
            log: Arc::clone(log),
        })
    }

    fn catalog() -> Arc<dyn Catalog> {
        Arc::new(MemoryCatalog::with_markets())
    }

    #[tokio::test]
    async fn primary_runs_before_secondaries() {
        let log = Log::default();
        let report = Orchestrator::new(catalog(), worker("steam", false, &log))
            .with_secondary(worker("epic", false, &log))
            .with_secondary(worker("gog", false, &log))
            .run()
            .await
            .unwrap();

        let order = log.lock().unwrap().clone();
        assert_eq!(order[0], "steam");
        assert_eq!(order.len(), 3);
        assert_eq!(report.passes.len(), 3);
        assert_eq!(report.passes[0].0, "steam");
    }

    #[tokio::test]
    async fn primary_failure_skips_secondaries() {
        let log = Log::default();
        let err = Orchestrator::new(catalog(), worker("steam", true, &log))
            .with_secondary(worker("epic", false, &log))
            .run()
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("steam exploded"));
        assert_eq!(*log.lock().unwrap(), vec!["steam".to_string()]);
    }

    #[tokio::test]
    async fn secondary_failure_surfaces_after_all_finish() {
        let log = Log::default();
        let err = Orchestrator::new(catalog(), worker("steam", false, &log))
            .with_secondary(worker("epic", true, &log))
            .with_secondary(worker("gog", false, &log))
            .run()
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("epic pass failed"));
        let mut ran = log.lock().unwrap().clone();
        ran.sort();
        assert_eq!(ran, vec!["epic", "gog", "steam"]);
    }

    #[tokio::test]
    async fn earliest_secondary_failure_wins() {
        let log = Log::default();
        let err = Orchestrator::new(catalog(), worker("steam", false, &log))
            .with_secondary(slow_worker("epic", true, Duration::from_millis(300), &log))
            .with_secondary(slow_worker("gog", true, Duration::from_millis(10), &log))
            .run()
            .await
            .unwrap_err();

        let chain = format!("{err:#}");
        assert!(chain.contains("gog exploded"), "{chain}");
        assert!(!chain.contains("epic"), "{chain}");
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    struct OneGameSteam;

    #[async_trait]
    impl SteamApi for OneGameSteam {
        async fn app_list(&self) -> Result<Vec<AppListEntry>> {
            Ok(vec![AppListEntry {
                appid: 504230,
                name: "Celeste".into(),
            }])
        }

        async fn app_details(&self, _app_id: &str) -> Result<Option<AppDetails>> {
            Ok(Some(AppDetails {
                kind: "game".into(),
                name: "Celeste".into(),
                header_image: String::new(),
                short_description: String::new(),
                release_date: Some(ReleaseDate {
                    coming_soon: false,
                    date: "25 Jan, 2018".into(),
                }),
                genres: Vec::new(),
                publishers: vec!["Maddy Makes Games".into()],
                price_overview: None,
            }))
        }

        async fn app_prices(&self, _app_ids: &[String]) -> Result<HashMap<String, AppPrice>> {
            Ok(HashMap::new())
        }
    }

    struct GogByTitle;

    #[async_trait]
    impl StorefrontSearch for GogByTitle {
        fn market(&self) -> MarketName {
            MarketName::Gog
        }

        async fn search(&self, game_name: &str) -> Result<Vec<Listing>> {
            Ok(vec![Listing {
                title: game_name.to_string(),
                quote: Some(PriceQuote::new("celeste", "610 руб.", "247 руб.", 60)),
            }])
        }
    }

    #[tokio::test]
    async fn secondaries_price_games_created_by_primary() {
        let memory = Arc::new(MemoryCatalog::with_markets());
        let shared: Arc<dyn Catalog> = memory.clone();
        let report = Orchestrator::new(
            shared,
            Arc::new(SteamCatalogBootstrap::new(OneGameSteam, SteamConfig::default())),
        )
        .with_secondary(Arc::new(PriceEnrichment::new(GogByTitle)))
        .run()
        .await
        .unwrap();

        assert_eq!(report.passes.len(), 2);
        let game = memory.find_game_by_name("Celeste").await.unwrap().unwrap();
        let gog = require_market(memory.as_ref(), MarketName::Gog).await.unwrap();
        let steam = require_market(memory.as_ref(), MarketName::Steam).await.unwrap();
        assert_eq!(memory.prices_for(game.id, gog.id).await[0].final_value_formatted, "247 руб.");
        assert_eq!(memory.prices_for(game.id, steam.id).await[0].market_game_url, "504230");
    }
}
