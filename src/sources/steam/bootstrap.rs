//! Steam catalog bootstrap: refresh known prices, then discover new games.
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::client::{AppDetails, AppListEntry, SteamApi};
use super::refresh::{refresh_prices, RefreshReport};
use crate::blacklist::BlacklistLedger;
use crate::catalog::{require_market, Catalog};
use crate::config::SteamConfig;
use crate::models::{Game, Market, MarketName, NewGame, Publisher, Tag};
use crate::normalization::{clean_tag, clean_title, is_likely_base_game};
use crate::pricing::{upsert_price, PriceQuote};
use crate::sources::{IngestWorker, PassReport};

const STEAM_DATE_FORMATS: [&str; 2] = ["%d %b, %Y", "%b %d, %Y"];

/// Why a Steam id was rejected for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    DetailsUnavailable,
    NotAGame(String),
    ComingSoon,
    UnparsableReleaseDate(String),
    FilteredName(String),
}

/// Why a Steam id was skipped this run without being blacklisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    EmptyName,
    NoPublisher,
}

/// A detail response that passed every check, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub header_image_url: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub publisher: String,
    pub genres: Vec<String>,
    pub quote: PriceQuote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Accept(Candidate),
    Reject(RejectReason),
    Drop(DropReason),
}

/// Decide what to do with one `appdetails` answer. Checks run in a fixed order
/// and the first failing one wins.
pub fn classify(app_id: &str, details: Option<AppDetails>) -> Classification {
    let Some(details) = details else {
        return Classification::Reject(RejectReason::DetailsUnavailable);
    };
    if details.kind != "game" {
        return Classification::Reject(RejectReason::NotAGame(details.kind));
    }
    let (coming_soon, raw_date) = match details.release_date {
        Some(r) => (r.coming_soon, r.date),
        None => (false, String::new()),
    };
    if coming_soon {
        return Classification::Reject(RejectReason::ComingSoon);
    }
    let Some(release_date) = parse_release_date(&raw_date) else {
        return Classification::Reject(RejectReason::UnparsableReleaseDate(raw_date));
    };
    let name = clean_title(&details.name);
    if !is_likely_base_game(&name) {
        return Classification::Reject(RejectReason::FilteredName(name));
    }
    if name.is_empty() {
        return Classification::Drop(DropReason::EmptyName);
    }
    let Some(publisher) = details
        .publishers
        .iter()
        .map(|p| p.trim())
        .find(|p| !p.is_empty())
    else {
        return Classification::Drop(DropReason::NoPublisher);
    };
    let quote = match details.price_overview {
        Some(p) => PriceQuote::new(app_id, p.initial_formatted, p.final_formatted, p.discount_percent),
        None => PriceQuote::unpriced(app_id),
    };
    Classification::Accept(Candidate {
        name,
        header_image_url: details.header_image,
        description: details.short_description,
        release_date,
        publisher: publisher.to_string(),
        genres: details.genres.into_iter().map(|g| g.description).collect(),
        quote,
    })
}

/// Steam prints dates as `2 Jan, 2006`; some locales swap to `Jan 2, 2006`.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    STEAM_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppOutcome {
    Created(Game),
    Blacklisted(RejectReason),
    Dropped(DropReason),
    /// Another id already produced a game with the same name.
    AlreadyKnown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub refresh: RefreshReport,
    /// Known-games cap was reached, discovery did not run.
    pub discovery_skipped: bool,
    pub directory_size: usize,
    pub queued: usize,
    pub detail_fetches: usize,
    pub created: usize,
    pub blacklisted: usize,
    pub dropped: usize,
    pub already_known: usize,
}

/// The primary pass: Steam decides which games exist in the catalog.
pub struct SteamCatalogBootstrap<A> {
    api: A,
    cfg: SteamConfig,
}

impl<A: SteamApi> SteamCatalogBootstrap<A> {
    pub fn new(api: A, cfg: SteamConfig) -> Self {
        Self { api, cfg }
    }

    pub async fn run(&self, catalog: &dyn Catalog) -> Result<BootstrapReport> {
        let market = require_market(catalog, MarketName::Steam).await?;
        let games = catalog.list_games().await.context("steam: listing known games")?;
        let mut report = BootstrapReport::default();

        let mut targets: Vec<(String, Game)> = Vec::new();
        for game in &games {
            if let Some(row) = catalog
                .find_price(game.id, market.id)
                .await
                .with_context(|| format!("steam: price lookup for {:?}", game.name))?
            {
                targets.push((row.market_game_url, game.clone()));
            }
        }
        report.refresh = refresh_prices(&self.api, catalog, &market, &targets, self.cfg.batch_size).await?;

        if games.len() >= self.cfg.known_games_cap {
            info!(
                known = games.len(),
                cap = self.cfg.known_games_cap,
                "steam: known-games cap reached; skipping discovery"
            );
            report.discovery_skipped = true;
            return Ok(report);
        }

        let directory = self.api.app_list().await.context("steam: fetching app directory")?;
        report.directory_size = directory.len();
        let known: HashSet<&str> = games.iter().map(|g| g.name.as_str()).collect();
        let ledger = BlacklistLedger::new(catalog, &market);
        let blacklisted = ledger.snapshot().await?;
        let queue = select_candidates(directory, &blacklisted, &known);
        report.queued = queue.len();
        info!(directory = report.directory_size, queued = report.queued, "steam: discovery queue built");

        for app_id in queue.iter().take(self.cfg.detail_cap) {
            report.detail_fetches += 1;
            match self.ingest_app(catalog, &market, &ledger, app_id).await? {
                AppOutcome::Created(game) => {
                    report.created += 1;
                    debug!(app_id = %app_id, name = %game.name, "steam: game created");
                }
                AppOutcome::Blacklisted(reason) => {
                    report.blacklisted += 1;
                    debug!(app_id = %app_id, ?reason, "steam: rejected");
                }
                AppOutcome::Dropped(reason) => {
                    report.dropped += 1;
                    debug!(app_id = %app_id, ?reason, "steam: skipped");
                }
                AppOutcome::AlreadyKnown => report.already_known += 1,
            }
            if report.detail_fetches % 100 == 0 {
                info!(fetched = report.detail_fetches, created = report.created, "steam: discovery progress");
            }
        }
        if report.queued > self.cfg.detail_cap {
            warn!(
                queued = report.queued,
                cap = self.cfg.detail_cap,
                "steam: detail cap reached; remaining ids wait for the next run"
            );
        }
        info!(
            refreshed = report.refresh.refreshed,
            created = report.created,
            blacklisted = report.blacklisted,
            dropped = report.dropped,
            "steam: bootstrap finished"
        );
        Ok(report)
    }

    /// Fetch, classify and persist one newly discovered id.
    pub async fn ingest_app(
        &self,
        catalog: &dyn Catalog,
        market: &Market,
        ledger: &BlacklistLedger<'_>,
        app_id: &str,
    ) -> Result<AppOutcome> {
        let details = self
            .api
            .app_details(app_id)
            .await
            .with_context(|| format!("steam: detail fetch for app {app_id}"))?;
        match classify(app_id, details) {
            Classification::Reject(reason) => {
                ledger.blacklist(app_id).await?;
                Ok(AppOutcome::Blacklisted(reason))
            }
            Classification::Drop(reason) => Ok(AppOutcome::Dropped(reason)),
            Classification::Accept(candidate) => {
                // Two directory ids can resolve to the same display name.
                if catalog
                    .find_game_by_name(&candidate.name)
                    .await
                    .with_context(|| format!("steam: name check for app {app_id}"))?
                    .is_some()
                {
                    return Ok(AppOutcome::AlreadyKnown);
                }
                let game = store_candidate(catalog, &candidate)
                    .await
                    .with_context(|| format!("steam: storing app {app_id}"))?;
                upsert_price(catalog, &game, market, &candidate.quote).await?;
                Ok(AppOutcome::Created(game))
            }
        }
    }
}

/// Directory ids worth a detail fetch, in directory order.
fn select_candidates(
    directory: Vec<AppListEntry>,
    blacklisted: &HashSet<String>,
    known: &HashSet<&str>,
) -> Vec<String> {
    let mut queued_names: HashSet<String> = HashSet::new();
    let mut queue = Vec::new();
    for entry in directory {
        let name = clean_title(&entry.name);
        if name.is_empty() || !is_likely_base_game(&name) {
            continue;
        }
        let app_id = entry.appid.to_string();
        if blacklisted.contains(&app_id) {
            continue;
        }
        if known.contains(name.as_str()) || !queued_names.insert(name) {
            continue;
        }
        queue.push(app_id);
    }
    queue
}

async fn store_candidate(catalog: &dyn Catalog, candidate: &Candidate) -> Result<Game> {
    let publisher = find_or_create_publisher(catalog, &candidate.publisher).await?;
    let game = catalog
        .create_game(&NewGame {
            header_image_url: candidate.header_image_url.clone(),
            name: candidate.name.clone(),
            description: candidate.description.clone(),
            release_date: candidate.release_date,
            publisher,
        })
        .await?;
    let mut linked: HashSet<i64> = HashSet::new();
    for genre in &candidate.genres {
        let token = clean_tag(genre);
        if token.is_empty() {
            continue;
        }
        let tag = find_or_create_tag(catalog, &token).await?;
        if linked.insert(tag.id) {
            catalog.create_game_tag(game.id, tag.id).await?;
        }
    }
    Ok(game)
}

async fn find_or_create_publisher(catalog: &dyn Catalog, name: &str) -> Result<Publisher> {
    match catalog.find_publisher_by_name(name).await? {
        Some(p) => Ok(p),
        None => catalog.create_publisher(name).await,
    }
}

async fn find_or_create_tag(catalog: &dyn Catalog, name: &str) -> Result<Tag> {
    match catalog.find_tag_by_name(name).await? {
        Some(t) => Ok(t),
        None => catalog.create_tag(name).await,
    }
}

#[async_trait]
impl<A: SteamApi> IngestWorker for SteamCatalogBootstrap<A> {
    fn name(&self) -> &'static str {
        MarketName::Steam.as_str()
    }

    async fn run(&self, catalog: &dyn Catalog) -> Result<PassReport> {
        SteamCatalogBootstrap::run(self, catalog)
            .await
            .map(PassReport::Bootstrap)
    }
}
