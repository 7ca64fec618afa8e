//! Step outputs

use crate::action::command::{append_record, workflow_command};
use crate::action::env::{ActionEnv, GITHUB_OUTPUT};
use crate::error::CacheResult;
use std::collections::HashMap;
use std::path::PathBuf;

/// Output reporting whether the primary key matched exactly
pub const CACHE_HIT: &str = "cache-hit";

/// Destination for step outputs
pub trait OutputSink: Send {
    /// Publish a named output value
    fn set_output(&mut self, name: &str, value: &str) -> CacheResult<()>;
}

/// Outputs written through the CI host (`GITHUB_OUTPUT` or `::set-output`)
#[derive(Debug)]
pub struct ActionOutput {
    output_file: Option<PathBuf>,
}

impl ActionOutput {
    pub fn new(env: &ActionEnv) -> Self {
        Self {
            output_file: env.path(GITHUB_OUTPUT),
        }
    }
}

impl OutputSink for ActionOutput {
    fn set_output(&mut self, name: &str, value: &str) -> CacheResult<()> {
        match &self.output_file {
            Some(path) => append_record(path, name, value),
            None => {
                println!("{}", workflow_command("set-output", name, value));
                Ok(())
            }
        }
    }
}

/// Outputs collected in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    values: HashMap<String, String>,
}

impl MemoryOutput {
    /// Value of an output, if it was set
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

impl OutputSink for MemoryOutput {
    fn set_output(&mut self, name: &str, value: &str) -> CacheResult<()> {
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_output_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output");
        let env = ActionEnv::from_vars([(GITHUB_OUTPUT, path.to_str().unwrap())]);

        let mut output = ActionOutput::new(&env);
        output.set_output(CACHE_HIT, "false").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("cache-hit<<"));
        assert_eq!(content.lines().nth(1), Some("false"));
    }

    #[test]
    fn memory_output_overwrites() {
        let mut output = MemoryOutput::default();
        output.set_output(CACHE_HIT, "false").unwrap();
        output.set_output(CACHE_HIT, "true").unwrap();
        assert_eq!(output.get(CACHE_HIT), Some("true"));
    }
}
