//! Shop catalog, inventory, flash sale and profile caching.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::cache::client::{CacheClient, Degrade};
use crate::cache::keys;
use crate::config::TtlPolicy;
use crate::error::Result;

/// Facade over the `shop_items`, `user_inventory`, `user_profile` and
/// `flash_sale` key spaces.
///
/// Reads return `Ok(None)` and writes return `Ok(())` whenever the store is
/// absent or a command fails. `Err` only carries a connection fault under
/// the throwing fault policy.
#[derive(Debug, Clone)]
pub struct ShopCache {
    client: CacheClient,
    ttl: TtlPolicy,
}

impl ShopCache {
    pub fn new(client: CacheClient, ttl: TtlPolicy) -> Self {
        Self { client, ttl }
    }

    // == Shop Items ==
    pub async fn set_shop_items<T: Serialize + ?Sized>(
        &self,
        category: &str,
        items: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.ttl.shop_items);
        self.client
            .set_json(keys::shop_items(category), items, ttl)
            .await
    }

    pub async fn get_shop_items<T: DeserializeOwned>(&self, category: &str) -> Result<Option<T>> {
        self.client.get_json(keys::shop_items(category)).await
    }

    // == User Inventory ==
    pub async fn set_user_inventory<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        inventory: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.ttl.user_inventory);
        self.client
            .set_json(keys::user_inventory(user_id), inventory, ttl)
            .await
    }

    pub async fn get_user_inventory<T: DeserializeOwned>(&self, user_id: &str) -> Result<Option<T>> {
        self.client.get_json(keys::user_inventory(user_id)).await
    }

    // == Flash Sale ==
    pub async fn set_flash_sale<T: Serialize + ?Sized>(
        &self,
        sale: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.ttl.flash_sale);
        self.client
            .set_json(keys::FLASH_SALE_CURRENT.to_string(), sale, ttl)
            .await
    }

    pub async fn get_flash_sale<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.client
            .get_json(keys::FLASH_SALE_CURRENT.to_string())
            .await
    }

    // == User Profile ==
    pub async fn set_user_profile<T: Serialize + ?Sized>(
        &self,
        user_id: &str,
        profile: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.ttl.user_profile);
        self.client
            .set_json(keys::user_profile(user_id), profile, ttl)
            .await
    }

    pub async fn get_user_profile<T: DeserializeOwned>(&self, user_id: &str) -> Result<Option<T>> {
        self.client.get_json(keys::user_profile(user_id)).await
    }

    // == Clearing ==
    /// Drops one user's inventory and profile together.
    pub async fn clear_user_cache(&self, user_id: &str) -> Result<()> {
        self.clear_user_cache_with(user_id, Degrade::Fallback)
            .await
            .map(|_| ())
    }

    /// Drops every `shop_items:*` key and the current flash sale.
    pub async fn clear_shop_cache(&self) -> Result<()> {
        self.clear_shop_cache_with(Degrade::Fallback).await.map(|_| ())
    }

    pub(crate) async fn clear_user_cache_with(&self, user_id: &str, degrade: Degrade) -> Result<u64> {
        let removed = self
            .client
            .delete_keys(
                vec![keys::user_inventory(user_id), keys::user_profile(user_id)],
                degrade,
            )
            .await?;
        info!(user_id, removed, "Cleared user cache");
        Ok(removed)
    }

    pub(crate) async fn clear_shop_cache_with(&self, degrade: Degrade) -> Result<u64> {
        let removed = self
            .client
            .delete_pattern(
                keys::domain_pattern(keys::SHOP_ITEMS),
                vec![keys::FLASH_SALE_CURRENT.to_string()],
                degrade,
            )
            .await?;
        info!(removed, "Cleared shop cache");
        Ok(removed)
    }
}
