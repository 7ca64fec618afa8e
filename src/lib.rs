//! bitrise-cache - Key-based build cache for CI pipelines
//!
//! Restores a cache entry before the build and saves one after it, with
//! fallback restore keys and repository-scoped key prefixes.

pub mod action;
pub mod cli;
pub mod config;
pub mod error;
pub mod key;
pub mod phase;
pub mod provider;

pub use error::{CacheError, CacheResult};
pub use phase::Phase;
