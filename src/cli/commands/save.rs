//! Save phase - archive paths under the primary key
//!
//! Saving is best-effort: a missing key or a provider failure is reported
//! and the step still succeeds. Only a missing `path` input is fatal.

use crate::action::{Inputs, StateSlot};
use crate::cli::commands::StepContext;
use crate::error::{CacheError, CacheResult};
use crate::provider::SaveRequest;
use tracing::{debug, info, warn};

/// Why the save phase did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither state nor input named a key
    NoKey,
    /// Restore already hit the primary key exactly
    ExactHit,
}

/// What the save phase did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Skipped(SkipReason),
    /// The provider rejected the save; logged, not fatal
    Failed,
}

/// Execute the save phase
pub async fn execute(inputs: &Inputs, ctx: &mut StepContext<'_>) -> CacheResult<SaveOutcome> {
    let primary_key = ctx
        .state
        .get(StateSlot::PrimaryKey)
        .filter(|key| !key.is_empty())
        .or_else(|| Some(inputs.key.clone()).filter(|key| !key.is_empty()));

    let Some(primary_key) = primary_key else {
        warn!("Key is not specified.");
        return Ok(SaveOutcome::Skipped(SkipReason::NoKey));
    };

    if ctx.state.get(StateSlot::MatchedKey).as_deref() == Some(primary_key.as_str()) {
        info!(
            "Cache hit occurred on the primary key {}, not saving cache.",
            primary_key
        );
        return Ok(SaveOutcome::Skipped(SkipReason::ExactHit));
    }

    if inputs.paths.is_empty() {
        return Err(CacheError::MissingInput("path"));
    }

    let prefixed_key = ctx.prefix.apply(&primary_key);

    info!("Saving cache with key: {}", primary_key);
    debug!("Prefixed cache key: {}", prefixed_key);
    info!("Paths: {}", inputs.paths.join(", "));

    let request = SaveRequest {
        step_id: ctx.config.save.step_id.clone(),
        verbose: inputs.verbose,
        key: prefixed_key,
        paths: inputs.paths.clone(),
        is_key_unique: ctx.config.save.is_key_unique,
        compression_level: ctx.config.save.compression_level,
    };
    debug!("Saving through {} provider", ctx.provider.provider_name());

    if let Err(e) = ctx.provider.save(&request).await {
        warn!("Cache save failed: {}", e);
        return Ok(SaveOutcome::Failed);
    }

    info!("Cache saved with key: {}", primary_key);
    Ok(SaveOutcome::Saved)
}
