pub mod blacklist;
pub mod catalog;
pub mod config;
pub mod http;
pub mod models;
pub mod normalization;
pub mod orchestrator;
pub mod pricing;
pub mod sources;
pub mod tracing;

pub mod util {
    pub mod db;
    pub mod env;
}

pub use orchestrator::{run_ingestion, IngestionReport, Orchestrator};
