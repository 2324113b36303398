//! Primary → fallback pool resolution

use dayfeed_common::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Category, ContentItem, ContentStore, SourceTier};

/// Resolves a client's pool for one category across store tiers
///
/// Each tier gets exactly one attempt. When neither tier yields a usable
/// pool the result is empty and the caller degrades to default content.
#[derive(Clone, Default)]
pub struct ContentPoolResolver {
    primary: Option<Arc<dyn ContentStore>>,
    fallback: Option<Arc<dyn ContentStore>>,
}

impl ContentPoolResolver {
    pub fn new(
        primary: Option<Arc<dyn ContentStore>>,
        fallback: Option<Arc<dyn ContentStore>>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Pool for `client_id` in `category`; empty when no tier could serve it
    pub async fn resolve(&self, client_id: &str, category: Category) -> Vec<ContentItem> {
        match query_tier(self.primary.as_deref(), client_id, category, SourceTier::Primary).await {
            Ok(pool) if !pool.is_empty() => {
                info!(
                    client_id = %client_id,
                    category = %category,
                    tier = "primary",
                    items = pool.len(),
                    "Content pool resolved"
                );
                return pool;
            }
            Ok(_) => {
                debug!(client_id = %client_id, category = %category, "Primary pool empty");
            }
            Err(e) => {
                warn!(
                    client_id = %client_id,
                    category = %category,
                    "Primary store unavailable: {}",
                    e
                );
            }
        }

        match query_tier(self.fallback.as_deref(), client_id, category, SourceTier::Fallback).await {
            Ok(pool) if !pool.is_empty() => {
                info!(
                    client_id = %client_id,
                    category = %category,
                    tier = "fallback",
                    items = pool.len(),
                    "Content pool resolved"
                );
                pool
            }
            Ok(_) => {
                info!(
                    client_id = %client_id,
                    category = %category,
                    tier = "none",
                    "No content in any tier"
                );
                Vec::new()
            }
            Err(e) => {
                warn!(
                    client_id = %client_id,
                    category = %category,
                    tier = "none",
                    "Fallback store unavailable: {}",
                    e
                );
                Vec::new()
            }
        }
    }
}

/// One attempt against one tier, with its items sanitized and tagged
async fn query_tier(
    store: Option<&dyn ContentStore>,
    client_id: &str,
    category: Category,
    tier: SourceTier,
) -> Result<Vec<ContentItem>> {
    let store = store.ok_or_else(|| {
        Error::ConfigurationMissing(format!("No {} content store", tier))
    })?;

    let items = store.fetch(client_id, category).await?;
    let total = items.len();

    let pool: Vec<ContentItem> = items
        .into_iter()
        .filter(|item| {
            item.client_id == client_id
                && item.category == category
                && !item.payload.trim().is_empty()
        })
        .map(|mut item| {
            item.source_tier = tier;
            item
        })
        .collect();

    if pool.len() < total {
        warn!(
            store = store.name(),
            dropped = total - pool.len(),
            "Dropped invalid items from content pool"
        );
    }

    Ok(pool)
}
