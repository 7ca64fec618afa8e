//! Cache key handling
//!
//! Keys shown to the user and recorded in state are always unprefixed. The
//! repository prefix is only applied to what goes to the provider, so state
//! comparisons and log lines stay stable if the scoping policy changes.

use crate::action::context::{self, Repository};
use crate::action::ActionEnv;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Marker some callers use for glob exclusion; stripped, not honoured
const NEGATION_MARKER: &str = "!";

/// Split a multiline input into its non-blank entries
///
/// Each line is trimmed, a leading `"! "` is stripped, and lines that end up
/// empty (or are only the marker) are dropped.
pub fn parse_multiline(input: &str) -> Vec<String> {
    input
        .split('\n')
        .map(str::trim)
        .filter(|line| *line != NEGATION_MARKER)
        .map(|line| line.strip_prefix("! ").unwrap_or(line).trim())
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Restore candidates: the primary key, then the fallbacks in order
pub fn candidate_keys(primary: &str, restore_keys: &[String]) -> Vec<String> {
    std::iter::once(primary.to_string())
        .chain(restore_keys.iter().cloned())
        .collect()
}

/// How much of the repository identity scopes cache keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScope {
    /// `owner/name-`
    #[default]
    Repository,
    /// `name-`
    Name,
    /// No prefix
    #[serde(rename = "none")]
    Unscoped,
}

/// Prefix prepended to every key sent to the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Use a literal prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Derive the prefix for a repository under the given scope
    pub fn for_repository(scope: KeyScope, repository: Option<&Repository>) -> Self {
        match (scope, repository) {
            (KeyScope::Repository, Some(repo)) => Self(format!("{}-", repo.full_name())),
            (KeyScope::Name, Some(repo)) => Self(format!("{}-", repo.name)),
            _ => Self::default(),
        }
    }

    /// Resolve the prefix from the CI context
    ///
    /// Context lookup failures degrade to an empty prefix.
    pub fn resolve(scope: KeyScope, env: &ActionEnv) -> Self {
        if scope == KeyScope::Unscoped {
            debug!("Key scoping disabled");
            return Self::default();
        }

        match context::repository(env) {
            Ok(Some(repo)) => {
                let prefix = Self::for_repository(scope, Some(&repo));
                debug!("Scoping cache keys to {} with prefix {}", repo, prefix.0);
                prefix
            }
            Ok(None) => {
                debug!("No repository context, cache keys are not scoped");
                Self::default()
            }
            Err(e) => {
                debug!("Failed to get GitHub context: {}", e);
                Self::default()
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefix a single key
    pub fn apply(&self, key: &str) -> String {
        format!("{}{}", self.0, key)
    }

    /// Prefix every key, preserving order
    pub fn apply_all(&self, keys: &[String]) -> Vec<String> {
        keys.iter().map(|key| self.apply(key)).collect()
    }
}
