//! Steam: the primary marketplace and the source of game identity.
mod bootstrap;
mod client;
mod refresh;

pub use bootstrap::{
    classify, parse_release_date, AppOutcome, BootstrapReport, Candidate, Classification,
    DropReason, RejectReason, SteamCatalogBootstrap,
};
pub use client::{
    AppDetails, AppListEntry, AppPrice, Genre, PriceOverview, ReleaseDate, SteamApi, SteamClient,
};
pub use refresh::{refresh_prices, RefreshReport};
