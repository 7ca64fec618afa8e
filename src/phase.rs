//! Phase dispatch
//!
//! The step binary runs twice per job. An explicit argument selects the
//! phase; without one, the phase is inferred from whether restore already
//! recorded its primary key in the step state.

use crate::action::state::{StateSlot, StateStore};
use crate::error::{CacheError, CacheResult};
use std::fmt;
use std::str::FromStr;

/// Which half of the cache step this invocation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Runs before the build: look up and unpack a cache entry
    Restore,
    /// Runs after the build: archive paths under the primary key
    Save,
}

impl Phase {
    /// Resolve the phase from the optional CLI argument, falling back to state
    pub fn detect(arg: Option<&str>, state: &dyn StateStore) -> CacheResult<Self> {
        match arg {
            Some(arg) => arg.parse(),
            None => {
                let restored = state
                    .get(StateSlot::PrimaryKey)
                    .is_some_and(|key| !key.is_empty());
                Ok(if restored { Self::Save } else { Self::Restore })
            }
        }
    }
}

impl FromStr for Phase {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restore" => Ok(Self::Restore),
            "save" => Ok(Self::Save),
            other => Err(CacheError::UnknownPhase(other.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restore => write!(f, "restore"),
            Self::Save => write!(f, "save"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::state::MemoryState;

    #[test]
    fn explicit_argument_wins() {
        let mut state = MemoryState::default();
        state.set(StateSlot::PrimaryKey, "v1-deps").unwrap();

        assert_eq!(Phase::detect(Some("restore"), &state).unwrap(), Phase::Restore);
        assert_eq!(Phase::detect(Some("save"), &state).unwrap(), Phase::Save);
    }

    #[test]
    fn unknown_argument_is_fatal() {
        let state = MemoryState::default();
        let err = Phase::detect(Some("build"), &state).unwrap_err();
        assert!(matches!(err, CacheError::UnknownPhase(ref p) if p == "build"));
    }

    #[test]
    fn empty_state_means_restore() {
        let state = MemoryState::default();
        assert_eq!(Phase::detect(None, &state).unwrap(), Phase::Restore);
    }

    #[test]
    fn recorded_key_means_save() {
        let mut state = MemoryState::default();
        state.set(StateSlot::PrimaryKey, "v1-deps").unwrap();
        assert_eq!(Phase::detect(None, &state).unwrap(), Phase::Save);
    }

    #[test]
    fn blank_recorded_key_means_restore() {
        let mut state = MemoryState::default();
        state.set(StateSlot::PrimaryKey, "").unwrap();
        assert_eq!(Phase::detect(None, &state).unwrap(), Phase::Restore);
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::Restore.to_string(), "restore");
        assert_eq!(Phase::Save.to_string(), "save");
    }
}
