//! Snapshot of the CI process environment
//!
//! Everything the step reads from its host (inputs, state, file command
//! paths, repository context) goes through an `ActionEnv` so tests can build
//! one from a plain list of variables instead of mutating the process env.

use std::collections::HashMap;
use std::path::PathBuf;

/// File the host reads step outputs from
pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";
/// File the host reads saved step state from
pub const GITHUB_STATE: &str = "GITHUB_STATE";
/// `owner/name` of the repository the job runs for
pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
/// JSON payload of the triggering event
pub const GITHUB_EVENT_PATH: &str = "GITHUB_EVENT_PATH";

/// Immutable view of environment variables
#[derive(Debug, Clone, Default)]
pub struct ActionEnv {
    vars: HashMap<String, String>,
}

impl ActionEnv {
    /// Capture the current process environment, skipping non-UTF-8 entries
    pub fn from_env() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    /// Build an environment from explicit variables
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw variable lookup
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Variable lookup treating empty values as unset
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// Path-valued variable, `None` when unset or empty
    pub fn path(&self, name: &str) -> Option<PathBuf> {
        self.non_empty(name).map(PathBuf::from)
    }

    /// Read a step input (`INPUT_<NAME>`), trimmed, empty when unset
    pub fn input(&self, name: &str) -> String {
        let var = format!("INPUT_{}", name.to_uppercase().replace(' ', "_"));
        self.get(&var).map(|v| v.trim().to_string()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn input_name_is_uppercased() {
        let env = ActionEnv::from_vars([("INPUT_RESTORE-KEYS", "v1-\nv0-")]);
        assert_eq!(env.input("restore-keys"), "v1-\nv0-");
    }

    #[test]
    fn input_spaces_become_underscores() {
        let env = ActionEnv::from_vars([("INPUT_CACHE_KEY", "abc")]);
        assert_eq!(env.input("cache key"), "abc");
    }

    #[test]
    fn input_is_trimmed() {
        let env = ActionEnv::from_vars([("INPUT_KEY", "  v1-deps \n")]);
        assert_eq!(env.input("key"), "v1-deps");
    }

    #[test]
    fn missing_input_is_empty() {
        let env = ActionEnv::default();
        assert_eq!(env.input("key"), "");
    }

    #[test]
    fn empty_path_is_none() {
        let env = ActionEnv::from_vars([(GITHUB_STATE, "")]);
        assert!(env.path(GITHUB_STATE).is_none());
    }

    #[test]
    #[serial]
    fn captures_process_env() {
        std::env::set_var("INPUT_BITRISE_CACHE_PROBE", "present");
        let env = ActionEnv::from_env();
        std::env::remove_var("INPUT_BITRISE_CACHE_PROBE");

        assert_eq!(env.input("bitrise_cache_probe"), "present");
    }
}
