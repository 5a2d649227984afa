use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use price_hunter_ingest::{
    catalog::{Catalog, MemoryCatalog, PgCatalog},
    config::{clamp_batch, IngestConfig},
    models::MarketName,
    run_ingestion,
    sources::PassReport,
    tracing::init_tracing,
    util::{db::Db, env as env_util},
};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "ingest", version, about = "Steam-first game catalog and price ingestion")]
struct Cli {
    /// Run the whole pipeline against an in-memory catalog; nothing is persisted
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,
    /// Skip the specified secondary sources (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    skip: Vec<SourceKey>,
    /// Max Steam detail fetches this run (overrides STEAM_DETAIL_CAP)
    #[arg(long)]
    detail_cap: Option<usize>,
    /// Skip Steam discovery once this many games are known (overrides STEAM_KNOWN_GAMES_CAP)
    #[arg(long)]
    known_games_cap: Option<usize>,
    /// Steam price refresh batch width, 1..=100 (overrides STEAM_BATCH_SIZE)
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKey {
    #[value(name = "epic_games", alias = "epic", alias = "egs")]
    Epic,
    #[value(name = "gog", alias = "gog_com")]
    Gog,
}

impl SourceKey {
    fn market(self) -> MarketName {
        match self {
            SourceKey::Epic => MarketName::EpicGames,
            SourceKey::Gog => MarketName::Gog,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    init_tracing("info,sqlx=warn")?;
    let cli = Cli::parse();

    let mut cfg = IngestConfig::from_env();
    if let Some(cap) = cli.detail_cap {
        cfg.steam.detail_cap = cap;
    }
    if let Some(cap) = cli.known_games_cap {
        cfg.steam.known_games_cap = cap;
    }
    if let Some(width) = cli.batch_size {
        cfg.steam.batch_size = clamp_batch(width);
    }
    let skip: Vec<MarketName> = cli.skip.iter().map(|k| k.market()).collect();

    let catalog: Arc<dyn Catalog> = if cli.dry_run {
        warn!("dry run: using an in-memory catalog, nothing will be persisted");
        Arc::new(MemoryCatalog::with_markets())
    } else {
        let database_url = env_util::db_url().context("no database URL configured for ingest")?;
        let max_conns: u32 = env_util::env_parse("DB_MAX_CONNS", 5);
        let db = Db::connect(&database_url, max_conns).await?;
        db.ensure_schema().await?;
        Arc::new(PgCatalog::new(db))
    };

    info!(
        dry_run = cli.dry_run,
        detail_cap = cfg.steam.detail_cap,
        known_games_cap = cfg.steam.known_games_cap,
        batch_size = cfg.steam.batch_size,
        skip = ?skip,
        "starting ingestion"
    );
    let started = Instant::now();
    match run_ingestion(catalog, &cfg, &skip).await {
        Ok(report) => {
            for (pass, outcome) in &report.passes {
                match outcome {
                    PassReport::Bootstrap(r) => info!(
                        pass = %pass,
                        refreshed = r.refresh.refreshed,
                        unanswered = r.refresh.unanswered,
                        queued = r.queued,
                        created = r.created,
                        blacklisted = r.blacklisted,
                        dropped = r.dropped,
                        "pass summary"
                    ),
                    PassReport::Enrichment(r) => info!(
                        pass = %pass,
                        searched = r.searched,
                        created = r.created,
                        updated = r.updated,
                        unmatched = r.unmatched,
                        "pass summary"
                    ),
                }
            }
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "ingestion finished");
            Ok(())
        }
        Err(e) => {
            let chain = format!("{e:#}");
            error!(error = %chain, "ingestion failed");
            Err(e)
        }
    }
}
