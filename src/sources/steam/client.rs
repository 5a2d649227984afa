use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::SteamConfig;
use crate::http::HttpClient;

#[derive(Debug, Deserialize)]
struct AppListResp {
    applist: AppList,
}

#[derive(Debug, Deserialize)]
struct AppList {
    apps: Vec<AppListEntry>,
}

/// One row of the Steam app directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppListEntry {
    pub appid: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PriceOverview {
    #[serde(default)]
    pub initial_formatted: String,
    #[serde(default)]
    pub final_formatted: String,
    #[serde(default)]
    pub discount_percent: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseDate {
    #[serde(default)]
    pub coming_soon: bool,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Genre {
    #[serde(default)]
    pub description: String,
}

/// The slice of `appdetails` the bootstrap pass consumes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppDetails {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub header_image: String,
    #[serde(default)]
    pub short_description: String,
    pub release_date: Option<ReleaseDate>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub publishers: Vec<String>,
    pub price_overview: Option<PriceOverview>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsWrapper {
    success: bool,
    data: Option<AppDetails>,
}

#[derive(Debug, Deserialize)]
struct PriceWrapper {
    success: bool,
    data: Option<PriceData>,
}

// Steam answers `"data": []` instead of an object when the app has no price.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceData {
    Empty(Vec<serde_json::Value>),
    Listed { price_overview: Option<PriceOverview> },
}

/// Result of a `filters=price_overview` lookup for one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppPrice {
    /// Steam reported `success: false` for the id.
    Unavailable,
    /// The app is listed; `None` means it carries no price (free or unpriced).
    Listed(Option<PriceOverview>),
}

/// The three Steam calls the ingestion passes depend on.
#[async_trait]
pub trait SteamApi: Send + Sync {
    async fn app_list(&self) -> Result<Vec<AppListEntry>>;
    /// `Ok(None)` when Steam reports the id as unsuccessful.
    async fn app_details(&self, app_id: &str) -> Result<Option<AppDetails>>;
    /// Ids absent from the returned map were not answered by Steam.
    async fn app_prices(&self, app_ids: &[String]) -> Result<HashMap<String, AppPrice>>;
}

pub struct SteamClient {
    http: HttpClient,
    cfg: SteamConfig,
}

impl SteamClient {
    pub fn new(http: HttpClient, cfg: SteamConfig) -> Self {
        Self { http, cfg }
    }

    fn appdetails_url(&self) -> String {
        format!("{}/api/appdetails", self.cfg.store_base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SteamApi for SteamClient {
    async fn app_list(&self) -> Result<Vec<AppListEntry>> {
        let url = format!(
            "{}/ISteamApps/GetAppList/v2/",
            self.cfg.api_base_url.trim_end_matches('/')
        );
        let mut query = vec![("format", "json".to_string())];
        if let Some(key) = &self.cfg.api_key {
            query.push(("key", key.clone()));
        }
        let resp: AppListResp = self
            .http
            .get_json(&url, &query)
            .await
            .context("steam: app list")?;
        Ok(resp.applist.apps)
    }

    async fn app_details(&self, app_id: &str) -> Result<Option<AppDetails>> {
        let query = [
            ("appids", app_id.to_string()),
            ("cc", self.cfg.country.clone()),
            ("l", self.cfg.language.clone()),
        ];
        let resp: HashMap<String, AppDetailsWrapper> = self
            .http
            .get_json(&self.appdetails_url(), &query)
            .await
            .with_context(|| format!("steam: appdetails {app_id}"))?;
        Ok(details_for(resp, app_id))
    }

    async fn app_prices(&self, app_ids: &[String]) -> Result<HashMap<String, AppPrice>> {
        let query = [
            ("appids", app_ids.join(",")),
            ("filters", "price_overview".to_string()),
            ("cc", self.cfg.country.clone()),
            ("l", self.cfg.language.clone()),
        ];
        let resp: HashMap<String, PriceWrapper> = self
            .http
            .get_json(&self.appdetails_url(), &query)
            .await
            .with_context(|| format!("steam: price batch of {} ids", app_ids.len()))?;
        Ok(prices_from(resp))
    }
}

fn details_for(mut resp: HashMap<String, AppDetailsWrapper>, app_id: &str) -> Option<AppDetails> {
    match resp.remove(app_id) {
        Some(AppDetailsWrapper {
            success: true,
            data: Some(data),
        }) => Some(data),
        _ => None,
    }
}

fn prices_from(resp: HashMap<String, PriceWrapper>) -> HashMap<String, AppPrice> {
    resp.into_iter()
        .map(|(id, wrapper)| {
            let price = if !wrapper.success {
                AppPrice::Unavailable
            } else {
                match wrapper.data {
                    Some(PriceData::Listed { price_overview }) => AppPrice::Listed(price_overview),
                    Some(PriceData::Empty(_)) | None => AppPrice::Listed(None),
                }
            };
            (id, price)
        })
        .collect()
}
