//! Restore phase - look up and unpack the best cache entry

use crate::action::{Inputs, StateSlot, CACHE_HIT};
use crate::cli::commands::StepContext;
use crate::error::{CacheError, CacheResult};
use crate::key::candidate_keys;
use crate::provider::{CacheHit, RestoreRequest};
use tracing::{debug, info};

/// What the restore phase found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    NoMatch,
    PartialMatch,
    ExactMatch,
}

impl RestoreOutcome {
    /// Value of the `cache-hit` output
    pub fn cache_hit(&self) -> bool {
        matches!(self, Self::ExactMatch)
    }
}

/// Execute the restore phase
pub async fn execute(inputs: &Inputs, ctx: &mut StepContext<'_>) -> CacheResult<RestoreOutcome> {
    let primary_key = inputs.key.as_str();
    if primary_key.is_empty() {
        return Err(CacheError::MissingInput("key"));
    }

    ctx.state.set(StateSlot::PrimaryKey, primary_key)?;
    ctx.state.clear(StateSlot::MatchedKey)?;

    let keys = candidate_keys(primary_key, &inputs.restore_keys);
    let prefixed_keys = ctx.prefix.apply_all(&keys);

    info!("Searching for cache with keys: {}", keys.join(", "));
    debug!("Prefixed cache keys: {}", prefixed_keys.join(", "));

    if inputs.lookup_only {
        info!("Lookup-only mode: checking if cache exists");
    }

    let request = RestoreRequest {
        step_id: ctx.config.restore.step_id.clone(),
        verbose: inputs.verbose,
        keys: prefixed_keys,
        retries: ctx.config.restore.retries,
    };
    debug!("Restoring through {} provider", ctx.provider.provider_name());

    let result = match ctx.provider.restore(&request).await {
        Ok(result) => result,
        Err(e) => {
            if inputs.fail_on_cache_miss {
                return Err(CacheError::RestoreFailed {
                    key: primary_key.to_string(),
                    source: Box::new(e),
                });
            }
            info!("Cache not found for input keys: {} {}", keys.join(", "), e);
            ctx.outputs.set_output(CACHE_HIT, "false")?;
            return Ok(RestoreOutcome::NoMatch);
        }
    };

    let outcome = match result.hit {
        CacheHit::None => {
            if inputs.fail_on_cache_miss {
                return Err(CacheError::RestoreFailed {
                    key: primary_key.to_string(),
                    source: Box::new(CacheError::CacheNotFound {
                        keys: keys.join(", "),
                    }),
                });
            }
            info!("Cache not found for input keys: {}", keys.join(", "));
            RestoreOutcome::NoMatch
        }
        CacheHit::Partial => {
            if let Some(matched) = &result.matched_key {
                debug!("Matched cache entry: {}", matched);
            }
            info!("Cache restored from key (partial match)");
            RestoreOutcome::PartialMatch
        }
        CacheHit::Exact => {
            ctx.state.set(StateSlot::MatchedKey, primary_key)?;
            info!("Cache restored from key: {} (exact match)", primary_key);
            RestoreOutcome::ExactMatch
        }
    };

    ctx.outputs
        .set_output(CACHE_HIT, &outcome.cache_hit().to_string())?;

    Ok(outcome)
}
