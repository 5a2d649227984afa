//! Permanent negative memory of native ids that are not standalone games.
use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::debug;

use crate::catalog::Catalog;
use crate::models::Market;

/// Blacklist view scoped to one marketplace.
pub struct BlacklistLedger<'a> {
    catalog: &'a dyn Catalog,
    market: &'a Market,
}

impl<'a> BlacklistLedger<'a> {
    pub fn new(catalog: &'a dyn Catalog, market: &'a Market) -> Self {
        Self { catalog, market }
    }

    pub async fn is_blacklisted(&self, native_id: &str) -> Result<bool> {
        self.catalog
            .is_blacklisted(self.market.id, native_id)
            .await
            .with_context(|| format!("{}: blacklist check for {native_id}", self.market.name))
    }

    /// Load the whole market blacklist in one query.
    pub async fn snapshot(&self) -> Result<HashSet<String>> {
        let ids = self
            .catalog
            .list_blacklisted(self.market.id)
            .await
            .with_context(|| format!("{}: loading blacklist", self.market.name))?;
        Ok(ids.into_iter().collect())
    }

    /// Remember `native_id` as rejected. Calling this again for the same id is a no-op.
    pub async fn blacklist(&self, native_id: &str) -> Result<()> {
        if self.is_blacklisted(native_id).await? {
            return Ok(());
        }
        self.catalog
            .create_blacklist_item(self.market.id, native_id)
            .await
            .with_context(|| format!("{}: blacklisting {native_id}", self.market.name))?;
        debug!(market = %self.market.name, native_id, "blacklisted");
        Ok(())
    }
}
