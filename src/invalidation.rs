//! Cache clearing for operators.
//!
//! Clears run with [`Degrade::Rethrow`], so a store that is connected but
//! failing is reported instead of silently ignored. An absent store still
//! counts as a successful clear.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::cache::{Degrade, PageCache, ShopCache};
use crate::error::{CacheError, Result};

/// Which part of the cache to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearKind {
    Shop,
    Homepage,
    User,
    All,
}

impl ClearKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClearKind::Shop => "shop",
            ClearKind::Homepage => "homepage",
            ClearKind::User => "user",
            ClearKind::All => "all",
        }
    }
}

impl fmt::Display for ClearKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClearKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shop" => Ok(ClearKind::Shop),
            "homepage" => Ok(ClearKind::Homepage),
            "user" => Ok(ClearKind::User),
            "all" => Ok(ClearKind::All),
            _ => Err(CacheError::InvalidRequest("Invalid cache type".to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    shop: ShopCache,
    page: PageCache,
}

impl CacheInvalidator {
    pub fn new(shop: ShopCache, page: PageCache) -> Self {
        Self { shop, page }
    }

    /// Clears `kind`, plus the user's entries when `user_id` is given.
    ///
    /// Returns the confirmation message for the caller.
    pub async fn clear(&self, kind: ClearKind, user_id: Option<&str>) -> Result<String> {
        let user_id = user_id.filter(|id| !id.is_empty());

        match kind {
            ClearKind::Shop => {
                self.shop.clear_shop_cache_with(Degrade::Rethrow).await?;
                if let Some(user_id) = user_id {
                    self.shop
                        .clear_user_cache_with(user_id, Degrade::Rethrow)
                        .await?;
                }
            }
            ClearKind::Homepage => {
                self.page.clear_page_cache_with(Degrade::Rethrow).await?;
            }
            ClearKind::User => {
                let user_id = user_id.ok_or_else(|| {
                    CacheError::InvalidRequest("User ID required for user cache clear".to_string())
                })?;
                self.shop
                    .clear_user_cache_with(user_id, Degrade::Rethrow)
                    .await?;
            }
            ClearKind::All => {
                tokio::try_join!(
                    self.shop.clear_shop_cache_with(Degrade::Rethrow),
                    self.page.clear_page_cache_with(Degrade::Rethrow),
                )?;
                if let Some(user_id) = user_id {
                    self.shop
                        .clear_user_cache_with(user_id, Degrade::Rethrow)
                        .await?;
                }
            }
        }

        info!(kind = %kind, user_id = ?user_id, "Cache cleared");
        Ok(format!("{} cache cleared successfully", kind))
    }
}
