//! Integration tests for bitrise-cache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Layout shared by one simulated job
    struct Job {
        root: TempDir,
    }

    impl Job {
        fn new() -> Self {
            let job = Self {
                root: TempDir::new().unwrap(),
            };
            fs::create_dir_all(job.workspace()).unwrap();
            job
        }

        fn workspace(&self) -> PathBuf {
            self.root.path().join("workspace")
        }

        fn cache_dir(&self) -> PathBuf {
            self.root.path().join("cache")
        }

        fn output_file(&self) -> PathBuf {
            self.root.path().join("github_output")
        }

        fn state_file(&self) -> PathBuf {
            self.root.path().join("github_state")
        }

        /// Binary with a clean environment pointed at this job's files
        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("bitrise-cache");
            cmd.env_clear()
                .current_dir(self.workspace())
                .env("GITHUB_OUTPUT", self.output_file())
                .env("GITHUB_STATE", self.state_file())
                .env("GITHUB_REPOSITORY", "acme/widget")
                .args(["--config"])
                .arg(self.root.path().join("missing-config.toml"))
                .args(["--cache-dir"])
                .arg(self.cache_dir());
            cmd
        }

        fn output(&self, name: &str) -> Option<String> {
            read_record(&self.output_file(), name)
        }

        fn state(&self, name: &str) -> Option<String> {
            read_record(&self.state_file(), name)
        }
    }

    /// Last value written for `name` in a file command target
    fn read_record(path: &Path, name: &str) -> Option<String> {
        let content = fs::read_to_string(path).ok()?;
        let header = format!("{name}<<");
        let lines: Vec<&str> = content.lines().collect();
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.starts_with(&header))
            .filter_map(|(i, _)| lines.get(i + 1).map(|v| v.to_string()))
            .last()
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("bitrise-cache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Key-based build cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("bitrise-cache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("bitrise-cache"));
    }

    #[test]
    fn unknown_phase_fails() {
        let job = Job::new();
        job.cmd()
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown phase: build"));
    }

    #[test]
    fn restore_without_key_fails() {
        let job = Job::new();
        job.cmd()
            .arg("restore")
            .assert()
            .failure()
            .stderr(predicate::str::contains("restore failed: key is required"));
    }

    #[test]
    fn save_without_key_succeeds() {
        let job = Job::new();
        job.cmd()
            .arg("save")
            .env("INPUT_PATH", "deps")
            .assert()
            .success()
            .stdout(predicate::str::contains("Key is not specified."));
    }

    #[test]
    fn save_without_path_fails() {
        let job = Job::new();
        job.cmd()
            .arg("save")
            .env("INPUT_KEY", "v1-deps")
            .assert()
            .failure()
            .stderr(predicate::str::contains("save failed: path is required"));
    }

    #[test]
    fn save_with_missing_paths_is_not_fatal() {
        let job = Job::new();
        job.cmd()
            .arg("save")
            .env("INPUT_KEY", "v1-deps")
            .env("INPUT_PATH", "does-not-exist")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache save failed"));
    }

    #[test]
    fn restore_miss_reports_false() {
        let job = Job::new();
        job.cmd()
            .arg("restore")
            .env("INPUT_KEY", "v1-deps")
            .env("INPUT_RESTORE-KEYS", "v1-\nv0-")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Searching for cache with keys: v1-deps, v1-, v0-",
            ));

        assert_eq!(job.output("cache-hit").as_deref(), Some("false"));
        assert_eq!(job.state("CACHE_KEY").as_deref(), Some("v1-deps"));
        assert!(job.state("CACHE_RESULT").is_none());
    }

    #[test]
    fn verbose_input_enables_debug_logging() {
        let job = Job::new();
        job.cmd()
            .arg("restore")
            .env("INPUT_KEY", "v1-deps")
            .env("INPUT_VERBOSE", "true")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Prefixed cache keys: acme/widget-v1-deps",
            ));

        job.cmd()
            .arg("restore")
            .env("INPUT_KEY", "v1-deps")
            .assert()
            .success()
            .stdout(predicate::str::contains("Prefixed cache keys").not());
    }

    #[test]
    fn restore_miss_fails_when_requested() {
        let job = Job::new();
        job.cmd()
            .arg("restore")
            .env("INPUT_KEY", "v1-deps")
            .env("INPUT_FAIL-ON-CACHE-MISS", "true")
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "failed to restore cache entry. Input key: v1-deps",
            ));
    }

    #[test]
    fn full_job_roundtrip() {
        let job = Job::new();
        let deps = job.workspace().join("deps");
        fs::create_dir_all(&deps).unwrap();
        fs::write(deps.join("lib.txt"), "library").unwrap();

        // First job: miss, then save
        job.cmd()
            .arg("restore")
            .env("INPUT_KEY", "v1-deps")
            .assert()
            .success();
        assert_eq!(job.output("cache-hit").as_deref(), Some("false"));

        job.cmd()
            .arg("save")
            .env("INPUT_PATH", "deps")
            .env("STATE_CACHE_KEY", "v1-deps")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache saved with key: v1-deps"));

        // Entry is stored under the repository-scoped key
        let metas: Vec<String> = fs::read_dir(job.cache_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();
        assert_eq!(metas.len(), 1);
        assert!(metas[0].contains("\"acme/widget-v1-deps\""));

        // Second job: exact hit restores the files and skips the save
        fs::remove_dir_all(&deps).unwrap();

        job.cmd()
            .arg("restore")
            .env("INPUT_KEY", "v1-deps")
            .assert()
            .success()
            .stdout(predicate::str::contains("(exact match)"));
        assert_eq!(job.output("cache-hit").as_deref(), Some("true"));
        assert_eq!(job.state("CACHE_RESULT").as_deref(), Some("v1-deps"));
        assert_eq!(fs::read_to_string(deps.join("lib.txt")).unwrap(), "library");

        job.cmd()
            .arg("save")
            .env("INPUT_PATH", "deps")
            .env("STATE_CACHE_KEY", "v1-deps")
            .env("STATE_CACHE_RESULT", "v1-deps")
            .assert()
            .success()
            .stdout(predicate::str::contains("not saving cache"));
    }

    #[test]
    fn fallback_key_is_partial() {
        let job = Job::new();
        fs::write(job.workspace().join("data.txt"), "v1").unwrap();

        job.cmd()
            .arg("save")
            .env("INPUT_KEY", "v1-old")
            .env("INPUT_PATH", "data.txt")
            .assert()
            .success();

        job.cmd()
            .arg("restore")
            .env("INPUT_KEY", "v1-new")
            .env("INPUT_RESTORE-KEYS", "v1-")
            .assert()
            .success()
            .stdout(predicate::str::contains("partial match"));

        assert_eq!(job.output("cache-hit").as_deref(), Some("false"));
        assert!(job.state("CACHE_RESULT").is_none());
    }

    #[test]
    fn state_file_drives_phase_detection() {
        let job = Job::new();
        let state_path = job.root.path().join("state.json");
        fs::write(job.workspace().join("data.txt"), "payload").unwrap();

        // No phase argument and empty state: restore
        job.cmd()
            .arg("--state-file")
            .arg(&state_path)
            .env("INPUT_KEY", "v1-deps")
            .assert()
            .success()
            .stdout(predicate::str::contains("Searching for cache"));

        let state = fs::read_to_string(&state_path).unwrap();
        assert!(state.contains("\"primary_key\": \"v1-deps\""));

        // No phase argument and recorded key: save
        job.cmd()
            .arg("--state-file")
            .arg(&state_path)
            .env("INPUT_PATH", "data.txt")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache saved with key: v1-deps"));
    }
}
