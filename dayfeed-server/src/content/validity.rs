//! Validity filtering of rotation picks
//!
//! The rotation index only says where to start looking. Items are probed
//! in circular order from there and the first one that still checks out
//! is served. Probes are pluggable so each store tier can verify its own
//! reference format.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Category, ContentItem, SourceTier};
use dayfeed_common::{Error, Result};

/// Checks whether an item can still be shown
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn is_valid(&self, item: &ContentItem) -> bool;
}

/// First valid item at or after `start`, wrapping around the pool
///
/// `None` means nothing in the pool is usable.
pub async fn pick_valid<'a>(
    pool: &'a [ContentItem],
    start: usize,
    probe: &dyn MediaProbe,
) -> Option<&'a ContentItem> {
    if pool.is_empty() {
        return None;
    }

    let len = pool.len();
    let start = start % len;
    for offset in 0..len {
        let item = &pool[(start + offset) % len];
        if probe.is_valid(item).await {
            if offset > 0 {
                debug!(
                    item = %item.id,
                    skipped = offset,
                    "Rotation pick replaced by next valid item"
                );
            }
            return Some(item);
        }
        debug!(item = %item.id, "Content item failed validity probe");
    }

    warn!(pool_size = len, "Every item in pool failed validity probe");
    None
}

// ========================================
// Probes
// ========================================

/// Accepts every item
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustAllProbe;

#[async_trait]
impl MediaProbe for TrustAllProbe {
    async fn is_valid(&self, _item: &ContentItem) -> bool {
        true
    }
}

/// Probes photo URLs inside the household's own storage namespaces
///
/// Anything outside those namespaces (third-party links, greeting and
/// activity text) is accepted unverified.
pub struct HttpMediaProbe {
    http_client: reqwest::Client,
    namespaces: Vec<String>,
}

impl HttpMediaProbe {
    pub fn new(namespaces: Vec<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http_client,
            namespaces,
        })
    }

    fn is_probeable(&self, item: &ContentItem) -> bool {
        item.payload.starts_with("http")
            && self
                .namespaces
                .iter()
                .any(|ns| !ns.is_empty() && item.payload.starts_with(ns.as_str()))
    }

    async fn request(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        let response = self.http_client.head(url).send().await?;

        // Some blob hosts refuse HEAD; a one-byte ranged GET is the cheapest substitute
        if response.status() == StatusCode::METHOD_NOT_ALLOWED
            || response.status() == StatusCode::NOT_IMPLEMENTED
        {
            return self
                .http_client
                .get(url)
                .header(header::RANGE, "bytes=0-0")
                .send()
                .await;
        }

        Ok(response)
    }
}

#[async_trait]
impl MediaProbe for HttpMediaProbe {
    async fn is_valid(&self, item: &ContentItem) -> bool {
        if !self.is_probeable(item) {
            return true;
        }

        let response = match self.request(&item.payload).await {
            Ok(r) => r,
            Err(e) => {
                debug!(url = %item.payload, "Media probe request failed: {}", e);
                return false;
            }
        };

        if !response.status().is_success() {
            debug!(url = %item.payload, status = %response.status(), "Media probe rejected item");
            return false;
        }

        if item.category == Category::Photo {
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            if let Some(ct) = content_type {
                if !ct.starts_with("image/") {
                    debug!(url = %item.payload, content_type = %ct, "Media probe: not an image");
                    return false;
                }
            }
        }

        true
    }
}

/// Routes each item to the probe for its source tier
pub struct TieredProbe {
    primary: Arc<dyn MediaProbe>,
    fallback: Arc<dyn MediaProbe>,
}

impl TieredProbe {
    pub fn new(primary: Arc<dyn MediaProbe>, fallback: Arc<dyn MediaProbe>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl MediaProbe for TieredProbe {
    async fn is_valid(&self, item: &ContentItem) -> bool {
        match item.source_tier {
            SourceTier::Primary => self.primary.is_valid(item).await,
            SourceTier::Fallback => self.fallback.is_valid(item).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rejects items whose payload contains "bad"
    struct RejectBad;

    #[async_trait]
    impl MediaProbe for RejectBad {
        async fn is_valid(&self, item: &ContentItem) -> bool {
            !item.payload.contains("bad")
        }
    }

    struct RejectAll;

    #[async_trait]
    impl MediaProbe for RejectAll {
        async fn is_valid(&self, _item: &ContentItem) -> bool {
            false
        }
    }

    fn pool(payloads: &[&str]) -> Vec<ContentItem> {
        payloads
            .iter()
            .map(|p| ContentItem::new("mom", Category::Photo, *p))
            .collect()
    }

    #[tokio::test]
    async fn test_invalid_start_skips_to_next() {
        let pool = pool(&["A-bad", "B", "C"]);
        let picked = pick_valid(&pool, 0, &RejectBad).await.unwrap();
        assert_eq!(picked.payload, "B");
    }

    #[tokio::test]
    async fn test_valid_start_returned_as_is() {
        let pool = pool(&["A", "B", "C"]);
        let picked = pick_valid(&pool, 2, &RejectBad).await.unwrap();
        assert_eq!(picked.payload, "C");
    }

    #[tokio::test]
    async fn test_search_wraps_around() {
        let pool = pool(&["A", "B-bad", "C-bad"]);
        let picked = pick_valid(&pool, 1, &RejectBad).await.unwrap();
        assert_eq!(picked.payload, "A");
    }

    #[tokio::test]
    async fn test_nothing_valid_is_none() {
        let pool = pool(&["A", "B"]);
        assert!(pick_valid(&pool, 0, &RejectAll).await.is_none());
        assert!(pick_valid(&[], 0, &TrustAllProbe).await.is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_start_wraps() {
        let pool = pool(&["A", "B"]);
        let picked = pick_valid(&pool, 3, &TrustAllProbe).await.unwrap();
        assert_eq!(picked.payload, "B");
    }

    #[tokio::test]
    async fn test_tiered_probe_dispatches_by_tier() {
        let probe = TieredProbe::new(Arc::new(TrustAllProbe), Arc::new(RejectAll));

        let primary = ContentItem::new("mom", Category::Photo, "A");
        let mut fallback = ContentItem::new("mom", Category::Photo, "B");
        fallback.source_tier = SourceTier::Fallback;

        assert!(probe.is_valid(&primary).await);
        assert!(!probe.is_valid(&fallback).await);
    }

    #[tokio::test]
    async fn test_http_probe_trusts_outside_namespace() {
        let probe = HttpMediaProbe::new(
            vec!["http://127.0.0.1:1/family/".to_string()],
            Duration::from_millis(200),
        )
        .unwrap();

        let third_party = ContentItem::new("mom", Category::Photo, "https://example.org/cat.jpg");
        let text = ContentItem::new("mom", Category::Greeting, "Hyvää huomenta");
        assert!(probe.is_valid(&third_party).await);
        assert!(probe.is_valid(&text).await);

        // Inside the namespace but nothing listens on port 1
        let own = ContentItem::new("mom", Category::Photo, "http://127.0.0.1:1/family/a.jpg");
        assert!(!probe.is_valid(&own).await);
    }
}
