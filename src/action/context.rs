//! Repository identity from the CI context

use crate::action::env::{ActionEnv, GITHUB_EVENT_PATH, GITHUB_REPOSITORY};
use crate::error::{CacheError, CacheResult};
use std::fmt;
use std::fs;

/// Repository the job runs for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Owning user or organisation
    pub owner: String,
    /// Repository name without the owner
    pub name: String,
}

impl Repository {
    /// Parse an `owner/name` string
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.split_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Look up the current repository
///
/// `GITHUB_REPOSITORY` wins; otherwise the event payload is consulted.
/// Returns `Ok(None)` when neither is available.
pub fn repository(env: &ActionEnv) -> CacheResult<Option<Repository>> {
    if let Some(full_name) = env.non_empty(GITHUB_REPOSITORY) {
        return Repository::parse(full_name).map(Some).ok_or_else(|| {
            CacheError::Context(format!(
                "{} is not in owner/name form: {}",
                GITHUB_REPOSITORY, full_name
            ))
        });
    }

    let Some(event_path) = env.path(GITHUB_EVENT_PATH) else {
        return Ok(None);
    };

    let content = fs::read_to_string(&event_path).map_err(|e| {
        CacheError::Context(format!(
            "reading event payload {}: {}",
            event_path.display(),
            e
        ))
    })?;
    let payload: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| CacheError::Context(format!("parsing event payload: {}", e)))?;

    let repo = &payload["repository"];
    let owner = repo["owner"]["login"].as_str().unwrap_or_default();
    let name = repo["name"].as_str().unwrap_or_default();

    if owner.is_empty() || name.is_empty() {
        return Ok(None);
    }

    Ok(Some(Repository {
        owner: owner.to_string(),
        name: name.to_string(),
    }))
}
