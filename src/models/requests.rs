//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::Result;
use crate::invalidation::ClearKind;

/// Request body for `POST /cache/clear`
///
/// # Fields
/// - `type`: `shop`, `homepage`, `user` or `all`
/// - `userId`: also clears this user's inventory and profile; required for `user`
///
/// A non-string `type` decodes as missing. A numeric `userId` is kept as its
/// decimal text; other non-string ids decode as missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearCacheRequest {
    #[serde(rename = "type", default, deserialize_with = "string_only")]
    pub cache_type: Option<String>,
    #[serde(rename = "userId", default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
}

fn string_only<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl ClearCacheRequest {
    /// Parses the requested cache type; a missing type is invalid.
    pub fn kind(&self) -> Result<ClearKind> {
        self.cache_type.as_deref().unwrap_or_default().parse()
    }
}
