//! Phase-crossing state
//!
//! Restore records the primary key (and, on an exact hit, the matched key)
//! for the save phase of a later, separate invocation. The record is
//! write-once by restore, read-once by save, and never torn down by the tool.
//!
//! | Slot | Host name | Written by | Read by |
//! |------|-----------|------------|---------|
//! | `PrimaryKey` | `CACHE_KEY` | restore | save (dispatch + key) |
//! | `MatchedKey` | `CACHE_RESULT` | restore, exact hit only | save (skip) |

use crate::action::command::{append_record, workflow_command};
use crate::action::env::{ActionEnv, GITHUB_STATE};
use crate::error::{CacheError, CacheResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Named state slots shared between restore and save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSlot {
    /// Primary key used during restore
    PrimaryKey,
    /// Key that produced an exact match during restore
    MatchedKey,
}

impl StateSlot {
    /// Name the host stores the slot under
    pub fn name(&self) -> &'static str {
        match self {
            Self::PrimaryKey => "CACHE_KEY",
            Self::MatchedKey => "CACHE_RESULT",
        }
    }

    /// Environment variable the host exposes the slot through on later steps
    pub fn env_var(&self) -> String {
        format!("STATE_{}", self.name())
    }

    fn all() -> [Self; 2] {
        [Self::PrimaryKey, Self::MatchedKey]
    }
}

/// Key-value store for phase-crossing state
pub trait StateStore: Send {
    /// Read a slot, `None` when it was never written
    fn get(&self, slot: StateSlot) -> Option<String>;

    /// Write a slot
    fn set(&mut self, slot: StateSlot, value: &str) -> CacheResult<()>;

    /// Forget a slot left by an earlier run
    fn clear(&mut self, slot: StateSlot) -> CacheResult<()>;
}

/// State persisted through the CI host's state-passing mechanism
///
/// Reads come from `STATE_*` variables captured at startup; writes go to the
/// `GITHUB_STATE` file, or to a `::save-state` command on stdout.
#[derive(Debug)]
pub struct ActionState {
    values: HashMap<StateSlot, String>,
    state_file: Option<PathBuf>,
}

impl ActionState {
    /// Load state slots from the environment snapshot
    pub fn new(env: &ActionEnv) -> Self {
        let values = StateSlot::all()
            .into_iter()
            .filter_map(|slot| {
                env.get(&slot.env_var())
                    .map(|value| (slot, value.to_string()))
            })
            .collect();

        Self {
            values,
            state_file: env.path(GITHUB_STATE),
        }
    }
}

impl StateStore for ActionState {
    fn get(&self, slot: StateSlot) -> Option<String> {
        self.values.get(&slot).cloned()
    }

    fn set(&mut self, slot: StateSlot, value: &str) -> CacheResult<()> {
        match &self.state_file {
            Some(path) => append_record(path, slot.name(), value)?,
            None => println!("{}", workflow_command("save-state", slot.name(), value)),
        }
        debug!("Saved state {}", slot.name());
        self.values.insert(slot, value.to_string());
        Ok(())
    }

    fn clear(&mut self, slot: StateSlot) -> CacheResult<()> {
        // Host state only exists when a previous step wrote it
        if self.values.contains_key(&slot) {
            self.set(slot, "")?;
            self.values.remove(&slot);
        }
        Ok(())
    }
}

/// On-disk record backing `FileState`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateRecord {
    /// Primary key used during restore
    pub primary_key: Option<String>,

    /// Key of an exact restore hit
    pub matched_key: Option<String>,

    /// When the record was last written
    pub updated_at: Option<DateTime<Utc>>,
}

/// State kept in a JSON file, for running both phases outside a CI host
#[derive(Debug)]
pub struct FileState {
    path: PathBuf,
    record: StateRecord,
}

impl FileState {
    /// Open the state file, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> CacheResult<Self> {
        let path = path.into();

        if !path.exists() {
            debug!("State file {} not found, starting empty", path.display());
            return Ok(Self {
                path,
                record: StateRecord::default(),
            });
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| CacheError::io(format!("reading state file {}", path.display()), e))?;
        let record = serde_json::from_str(&content)?;

        Ok(Self { path, record })
    }

    fn persist(&self) -> CacheResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CacheError::io("creating state directory", e))?;
        }

        let content = serde_json::to_string_pretty(&self.record)?;
        fs::write(&self.path, content).map_err(|e| {
            CacheError::io(format!("writing state file {}", self.path.display()), e)
        })
    }
}

impl StateStore for FileState {
    fn get(&self, slot: StateSlot) -> Option<String> {
        match slot {
            StateSlot::PrimaryKey => self.record.primary_key.clone(),
            StateSlot::MatchedKey => self.record.matched_key.clone(),
        }
    }

    fn set(&mut self, slot: StateSlot, value: &str) -> CacheResult<()> {
        let value = Some(value.to_string());
        match slot {
            StateSlot::PrimaryKey => self.record.primary_key = value,
            StateSlot::MatchedKey => self.record.matched_key = value,
        }
        self.record.updated_at = Some(Utc::now());
        self.persist()
    }

    fn clear(&mut self, slot: StateSlot) -> CacheResult<()> {
        let field = match slot {
            StateSlot::PrimaryKey => &mut self.record.primary_key,
            StateSlot::MatchedKey => &mut self.record.matched_key,
        };
        if field.take().is_none() {
            return Ok(());
        }
        self.record.updated_at = Some(Utc::now());
        self.persist()
    }
}

/// Process-local state, for tests and library callers
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    values: HashMap<StateSlot, String>,
}

impl StateStore for MemoryState {
    fn get(&self, slot: StateSlot) -> Option<String> {
        self.values.get(&slot).cloned()
    }

    fn set(&mut self, slot: StateSlot, value: &str) -> CacheResult<()> {
        self.values.insert(slot, value.to_string());
        Ok(())
    }

    fn clear(&mut self, slot: StateSlot) -> CacheResult<()> {
        self.values.remove(&slot);
        Ok(())
    }
}
