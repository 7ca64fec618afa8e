//! Phase implementations

pub mod restore;
pub mod save;

pub use restore::{execute as restore, RestoreOutcome};
pub use save::{execute as save, SaveOutcome, SkipReason};

use crate::action::{OutputSink, StateStore};
use crate::config::Config;
use crate::key::KeyPrefix;
use crate::provider::CacheProvider;

/// Collaborators shared by both phases
pub struct StepContext<'a> {
    pub config: &'a Config,
    pub provider: &'a dyn CacheProvider,
    pub state: &'a mut dyn StateStore,
    pub outputs: &'a mut dyn OutputSink,
    /// Prefix applied to keys sent to the provider
    pub prefix: KeyPrefix,
}
