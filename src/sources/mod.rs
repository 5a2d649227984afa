//! Storefront adapters and the passes that feed the catalog from them.
use anyhow::Result;
use async_trait::async_trait;

use crate::catalog::Catalog;

pub mod enrichment;
pub mod epic;
pub mod gog;
pub mod steam;

pub use enrichment::{exact_match, EnrichmentReport, Listing, PriceEnrichment, StorefrontSearch};
pub use epic::EpicGamesSearch;
pub use gog::GogSearch;
pub use steam::{BootstrapReport, SteamCatalogBootstrap, SteamClient};

/// Outcome counters of one finished pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassReport {
    Bootstrap(BootstrapReport),
    Enrichment(EnrichmentReport),
}

/// One unit of ingestion work the orchestrator can schedule.
#[async_trait]
pub trait IngestWorker: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, catalog: &dyn Catalog) -> Result<PassReport>;
}
