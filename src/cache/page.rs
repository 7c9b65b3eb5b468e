//! Homepage content caching.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::cache::client::{CacheClient, Degrade};
use crate::cache::keys;
use crate::config::TtlPolicy;
use crate::error::Result;

/// Facade over the `homepage:*` key space.
#[derive(Debug, Clone)]
pub struct PageCache {
    client: CacheClient,
    ttl: TtlPolicy,
}

impl PageCache {
    pub fn new(client: CacheClient, ttl: TtlPolicy) -> Self {
        Self { client, ttl }
    }

    pub fn ttl(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub async fn set_testimonials<T: Serialize + ?Sized>(
        &self,
        testimonials: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.ttl.testimonials);
        self.client
            .set_json(keys::HOMEPAGE_TESTIMONIALS.to_string(), testimonials, ttl)
            .await
    }

    pub async fn get_testimonials<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.client
            .get_json(keys::HOMEPAGE_TESTIMONIALS.to_string())
            .await
    }

    pub async fn set_faq<T: Serialize + ?Sized>(&self, faq: &T, ttl: Option<u64>) -> Result<()> {
        let ttl = ttl.unwrap_or(self.ttl.faq);
        self.client
            .set_json(keys::HOMEPAGE_FAQ.to_string(), faq, ttl)
            .await
    }

    pub async fn get_faq<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.client.get_json(keys::HOMEPAGE_FAQ.to_string()).await
    }

    pub async fn set_course_levels<T: Serialize + ?Sized>(
        &self,
        levels: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.ttl.course_levels);
        self.client
            .set_json(keys::HOMEPAGE_COURSE_LEVELS.to_string(), levels, ttl)
            .await
    }

    pub async fn get_course_levels<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.client
            .get_json(keys::HOMEPAGE_COURSE_LEVELS.to_string())
            .await
    }

    /// Drops every `homepage:*` key.
    pub async fn clear_page_cache(&self) -> Result<()> {
        self.clear_page_cache_with(Degrade::Fallback).await.map(|_| ())
    }

    pub(crate) async fn clear_page_cache_with(&self, degrade: Degrade) -> Result<u64> {
        let removed = self
            .client
            .delete_pattern(keys::domain_pattern(keys::HOMEPAGE), Vec::new(), degrade)
            .await?;
        info!(removed, "Cleared homepage cache");
        Ok(removed)
    }
}
