//! Cache provider abstraction
//!
//! The restore and save operations only orchestrate; moving archives in and
//! out of storage is the provider's job. Providers receive already-prefixed
//! keys.

mod local;

pub use local::{format_bytes, EntryMeta, LocalProvider};

use crate::error::CacheResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How well a restore matched the requested keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheHit {
    /// Nothing restored
    None,
    /// Restored from a fallback key
    Partial,
    /// Restored from the primary key
    Exact,
}

/// Restore request as sent to a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    /// Identifier of the calling step
    pub step_id: String,
    pub verbose: bool,
    /// Candidate keys, primary first
    pub keys: Vec<String>,
    /// Extra attempts after a transient failure
    pub retries: u32,
}

/// Result of a successful restore call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreResult {
    pub hit: CacheHit,
    /// Provider-side key of the entry that was restored
    pub matched_key: Option<String>,
}

impl RestoreResult {
    /// A lookup that found nothing
    pub fn miss() -> Self {
        Self {
            hit: CacheHit::None,
            matched_key: None,
        }
    }
}

/// Save request as sent to a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Identifier of the calling step
    pub step_id: String,
    pub verbose: bool,
    pub key: String,
    pub paths: Vec<String>,
    /// Keep an existing entry under the same key instead of replacing it
    pub is_key_unique: bool,
    pub compression_level: i32,
}

/// Storage backend for cache archives
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Find the best entry for `request.keys` and unpack it in place
    async fn restore(&self, request: &RestoreRequest) -> CacheResult<RestoreResult>;

    /// Archive `request.paths` under `request.key`
    async fn save(&self, request: &SaveRequest) -> CacheResult<()>;

    /// Human-readable provider name for logs
    fn provider_name(&self) -> &'static str;
}

/// Run `op`, retrying retryable failures up to `retries` more times
///
/// The wait grows linearly with the attempt number.
pub async fn with_retries<T, F, Fut>(retries: u32, delay: Duration, mut op: F) -> CacheResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CacheResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                warn!("Attempt {} of {} failed: {}", attempt, retries + 1, e);
                tokio::time::sleep(delay * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}
