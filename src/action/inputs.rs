//! Typed step inputs

use crate::action::env::ActionEnv;
use crate::key::parse_multiline;

/// Input names as declared by the step
pub mod names {
    pub const KEY: &str = "key";
    pub const RESTORE_KEYS: &str = "restore-keys";
    pub const PATH: &str = "path";
    pub const FAIL_ON_CACHE_MISS: &str = "fail-on-cache-miss";
    pub const LOOKUP_ONLY: &str = "lookup-only";
    pub const VERBOSE: &str = "verbose";
}

/// Inputs shared by both phases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    /// Primary cache key (required for restore, fallback for save)
    pub key: String,

    /// Ordered fallback keys, most specific first
    pub restore_keys: Vec<String>,

    /// Paths to persist on save
    pub paths: Vec<String>,

    /// Fail restore when no entry is found
    pub fail_on_cache_miss: bool,

    /// Accepted for compatibility; only logged
    pub lookup_only: bool,

    /// Enable debug logging
    pub verbose: bool,
}

impl Inputs {
    /// Read all inputs from the environment
    pub fn from_env(env: &ActionEnv) -> Self {
        Self {
            key: env.input(names::KEY),
            restore_keys: parse_multiline(&env.input(names::RESTORE_KEYS)),
            paths: parse_multiline(&env.input(names::PATH)),
            fail_on_cache_miss: parse_bool(&env.input(names::FAIL_ON_CACHE_MISS)),
            lookup_only: parse_bool(&env.input(names::LOOKUP_ONLY)),
            verbose: parse_bool(&env.input(names::VERBOSE)),
        }
    }
}

/// Boolean inputs are true only for a case-insensitive `true`
pub fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_values() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("True"));
        assert!(!parse_bool("yes"));
        assert!(!parse_bool("1"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn reads_all_inputs() {
        let env = ActionEnv::from_vars([
            ("INPUT_KEY", "v1-deps"),
            ("INPUT_RESTORE-KEYS", "v1-\n\nv0-\n"),
            ("INPUT_PATH", "node_modules\n! dist/tmp"),
            ("INPUT_FAIL-ON-CACHE-MISS", "true"),
            ("INPUT_LOOKUP-ONLY", "false"),
            ("INPUT_VERBOSE", "True"),
        ]);

        let inputs = Inputs::from_env(&env);

        assert_eq!(inputs.key, "v1-deps");
        assert_eq!(inputs.restore_keys, vec!["v1-", "v0-"]);
        assert_eq!(inputs.paths, vec!["node_modules", "dist/tmp"]);
        assert!(inputs.fail_on_cache_miss);
        assert!(!inputs.lookup_only);
        assert!(inputs.verbose);
    }

    #[test]
    fn defaults_when_unset() {
        let inputs = Inputs::from_env(&ActionEnv::default());
        assert_eq!(inputs, Inputs::default());
    }
}
