//! Workflow file commands
//!
//! Outputs and state are handed to the host by appending `name<<delimiter`
//! records to the files it names in `GITHUB_OUTPUT` / `GITHUB_STATE`. When
//! those are not set, the legacy `::command name=..::value` stdout form is
//! used instead.

use crate::error::{CacheError, CacheResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

/// Append a heredoc-style record to a file command target
pub(crate) fn append_record(path: &Path, name: &str, value: &str) -> CacheResult<()> {
    let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());

    if name.contains(&delimiter) {
        return Err(CacheError::FileCommand {
            name: name.to_string(),
            reason: "name must not contain the record delimiter".to_string(),
        });
    }
    if value.contains(&delimiter) {
        return Err(CacheError::FileCommand {
            name: name.to_string(),
            reason: "value must not contain the record delimiter".to_string(),
        });
    }

    let record = format!("{name}<<{delimiter}\n{value}\n{delimiter}\n");

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CacheError::io(format!("opening {}", path.display()), e))?;

    file.write_all(record.as_bytes())
        .map_err(|e| CacheError::io(format!("writing {}", path.display()), e))
}

/// Render a legacy stdout workflow command with a `name` property
pub(crate) fn workflow_command(command: &str, name: &str, value: &str) -> String {
    format!(
        "::{} name={}::{}",
        command,
        escape_property(name),
        escape_data(value)
    )
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_heredoc_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output");

        append_record(&path, "cache-hit", "true").unwrap();
        append_record(&path, "other", "a\nb").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("cache-hit<<ghadelimiter_"));
        assert_eq!(lines[1], "true");
        assert_eq!(lines[2], lines[0].trim_start_matches("cache-hit<<"));
        assert!(lines[3].starts_with("other<<ghadelimiter_"));
        assert_eq!(&lines[4..6], &["a", "b"]);
    }

    #[test]
    fn workflow_command_escapes() {
        assert_eq!(
            workflow_command("save-state", "CACHE_KEY", "v1\n50%"),
            "::save-state name=CACHE_KEY::v1%0A50%25"
        );
        assert_eq!(
            workflow_command("set-output", "a:b,c", "x"),
            "::set-output name=a%3Ab%2Cc::x"
        );
    }
}
