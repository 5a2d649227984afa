//! Runtime configuration for an ingestion run, resolved from the environment.
use std::time::Duration;

use crate::util::env::{env_opt, env_parse};

/// Hard upper bound Steam accepts for a multi-id `appdetails` request.
pub const STEAM_MAX_BATCH: usize = 100;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    /// Upper bound on a server-requested `Retry-After` wait.
    pub retry_after_cap: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            retry_after_cap: Duration::from_secs(60),
            user_agent: format!("price-hunter-ingest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SteamConfig {
    pub api_key: Option<String>,
    pub store_base_url: String,
    pub api_base_url: String,
    pub country: String,
    pub language: String,
    /// Ceiling on detail fetches for newly discovered ids in one run.
    pub detail_cap: usize,
    /// Once this many games are known the discovery phase is skipped.
    pub known_games_cap: usize,
    pub batch_size: usize,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            store_base_url: "https://store.steampowered.com".into(),
            api_base_url: "https://api.steampowered.com".into(),
            country: "ru".into(),
            language: "en".into(),
            detail_cap: 5000,
            known_games_cap: 1000,
            batch_size: STEAM_MAX_BATCH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EpicConfig {
    pub graphql_url: String,
    pub country: String,
    pub locale: String,
    pub search_count: u32,
}

impl Default for EpicConfig {
    fn default() -> Self {
        Self {
            graphql_url: "https://graphql.epicgames.com/graphql".into(),
            country: "RU".into(),
            locale: "en-US".into(),
            search_count: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GogConfig {
    pub base_url: String,
    pub language: String,
}

impl Default for GogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://embed.gog.com".into(),
            language: "en".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub http: HttpConfig,
    pub steam: SteamConfig,
    pub epic: EpicConfig,
    pub gog: GogConfig,
    /// Appended to amounts from sources that report bare numbers.
    pub currency_suffix: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            steam: SteamConfig::default(),
            epic: EpicConfig::default(),
            gog: GogConfig::default(),
            currency_suffix: "руб.".into(),
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let http = HttpConfig {
            timeout: Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS", 15u64)),
            max_retries: env_parse("HTTP_MAX_RETRIES", d.http.max_retries),
            backoff_base: Duration::from_millis(env_parse("HTTP_BACKOFF_MS", 500u64)),
            retry_after_cap: Duration::from_secs(env_parse("HTTP_RETRY_AFTER_CAP_SECS", 60u64)),
            user_agent: d.http.user_agent,
        };
        let steam = SteamConfig {
            api_key: env_opt("STEAM_API_KEY"),
            store_base_url: env_opt("STEAM_BASE_URL").unwrap_or(d.steam.store_base_url),
            api_base_url: env_opt("STEAM_API_BASE_URL").unwrap_or(d.steam.api_base_url),
            country: env_opt("STEAM_COUNTRY").unwrap_or(d.steam.country),
            language: env_opt("STEAM_LANGUAGE").unwrap_or(d.steam.language),
            detail_cap: env_parse("STEAM_DETAIL_CAP", d.steam.detail_cap),
            known_games_cap: env_parse("STEAM_KNOWN_GAMES_CAP", d.steam.known_games_cap),
            batch_size: clamp_batch(env_parse("STEAM_BATCH_SIZE", d.steam.batch_size)),
        };
        let epic = EpicConfig {
            graphql_url: env_opt("EPIC_GRAPHQL_URL").unwrap_or(d.epic.graphql_url),
            country: env_opt("EPIC_COUNTRY").unwrap_or(d.epic.country),
            locale: env_opt("EPIC_LOCALE").unwrap_or(d.epic.locale),
            search_count: env_parse("EPIC_SEARCH_COUNT", d.epic.search_count),
        };
        let gog = GogConfig {
            base_url: env_opt("GOG_BASE_URL").unwrap_or(d.gog.base_url),
            language: env_opt("GOG_LANGUAGE").unwrap_or(d.gog.language),
        };
        Self {
            http,
            steam,
            epic,
            gog,
            currency_suffix: env_opt("PRICE_CURRENCY_SUFFIX").unwrap_or(d.currency_suffix),
        }
    }
}

pub fn clamp_batch(size: usize) -> usize {
    size.clamp(1, STEAM_MAX_BATCH)
}
