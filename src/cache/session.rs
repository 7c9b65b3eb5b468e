//! Session storage.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::client::{CacheClient, Degrade};
use crate::cache::keys;
use crate::config::TtlPolicy;
use crate::error::Result;

/// Facade over the `session:*` key space; entries default to one day.
#[derive(Debug, Clone)]
pub struct SessionCache {
    client: CacheClient,
    ttl: u64,
}

impl SessionCache {
    pub fn new(client: CacheClient, ttl: &TtlPolicy) -> Self {
        Self {
            client,
            ttl: ttl.session,
        }
    }

    pub async fn set_session<T: Serialize + ?Sized>(
        &self,
        session_id: &str,
        user_data: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        self.client
            .set_json(keys::session(session_id), user_data, ttl.unwrap_or(self.ttl))
            .await
    }

    pub async fn get_session<T: DeserializeOwned>(&self, session_id: &str) -> Result<Option<T>> {
        self.client.get_json(keys::session(session_id)).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.client
            .delete_keys(vec![keys::session(session_id)], Degrade::Fallback)
            .await
            .map(|_| ())
    }
}
