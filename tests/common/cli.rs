//! CLI test runner with fluent assertions.
//!
//! Runs the `gkm` binary against a private configuration directory, so no
//! test ever reads or writes the user's real profiles.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::TempDir;

/// Runner for the `gkm` binary.
///
/// # Example
///
/// ```ignore
/// let cli = CliRunner::new();
/// cli.run_robot(&["profiles"])
///    .assert_success()
///    .assert_stdout_contains("Default");
/// ```
pub struct CliRunner {
    binary_path: PathBuf,
    config_dir: TempDir,
    env_vars: HashMap<String, String>,
    stdin: Option<String>,
}

impl Default for CliRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CliRunner {
    /// Create a runner with an empty configuration directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_gkm")),
            config_dir: TempDir::new().expect("Failed to create config directory"),
            env_vars: HashMap::new(),
            stdin: None,
        }
    }

    /// The configuration directory passed as `GKM_CONFIG_DIR`.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        self.config_dir.path()
    }

    /// Add an environment variable for every run.
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env_vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Set standard input for every run.
    #[must_use]
    pub fn with_stdin(mut self, stdin: &str) -> Self {
        self.stdin = Some(stdin.to_string());
        self
    }

    /// Execute the binary with the given arguments.
    ///
    /// # Panics
    ///
    /// Panics if the command fails to execute.
    #[must_use]
    pub fn run(&self, args: &[&str]) -> CliResult {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(args)
            .env("GKM_CONFIG_DIR", self.config_dir.path())
            .env("RUST_LOG", "off")
            .env_remove("GKM_FORMAT")
            .env_remove("GKM_DEVICE")
            .env_remove("GKM_MODEL")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        if self.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }

        let mut child = cmd.spawn().expect("Failed to execute command");
        if let Some(input) = &self.stdin {
            child
                .stdin
                .take()
                .expect("stdin is piped")
                .write_all(input.as_bytes())
                .expect("Failed to write stdin");
        }
        let output = child.wait_with_output().expect("Failed to wait for command");

        CliResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            args: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Execute with `--robot` for JSON output.
    #[must_use]
    pub fn run_robot(&self, args: &[&str]) -> CliResult {
        let mut full_args = vec!["--robot"];
        full_args.extend(args);
        self.run(&full_args)
    }
}

/// Captured output from one run.
#[derive(Debug, Clone)]
pub struct CliResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub args: Vec<String>,
}

impl CliResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// # Panics
    ///
    /// Panics if the command did not exit with code 0.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success(),
            "Command {:?} failed with exit code {}: {}",
            self.args,
            self.exit_code,
            self.stderr
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the command exited with code 0.
    pub fn assert_failure(&self) -> &Self {
        assert!(!self.success(), "Command {:?} unexpectedly succeeded", self.args);
        self
    }

    /// # Panics
    ///
    /// Panics if stdout doesn't contain the text.
    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "stdout does not contain \"{text}\"\nActual stdout:\n{}",
            self.stdout
        );
        self
    }

    /// # Panics
    ///
    /// Panics if stderr doesn't contain the text.
    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "stderr does not contain \"{text}\"\nActual stderr:\n{}",
            self.stderr
        );
        self
    }

    // === JSON (robot mode) ===

    /// Parse stdout as one JSON document.
    ///
    /// # Panics
    ///
    /// Panics if stdout is not valid JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(self.stdout.trim())
            .unwrap_or_else(|_| panic!("Failed to parse JSON from stdout:\n{}", self.stdout))
    }

    /// Parse stdout as JSON lines.
    ///
    /// # Panics
    ///
    /// Panics if any non-empty line is not valid JSON.
    #[must_use]
    pub fn json_lines(&self) -> Vec<Value> {
        self.stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l).unwrap_or_else(|_| panic!("Invalid JSON line: {l}"))
            })
            .collect()
    }

    /// Parse stderr as the robot error document.
    ///
    /// # Panics
    ///
    /// Panics if stderr is not valid JSON.
    #[must_use]
    pub fn error_json(&self) -> Value {
        serde_json::from_str(self.stderr.trim())
            .unwrap_or_else(|_| panic!("Failed to parse JSON from stderr:\n{}", self.stderr))
    }

    /// # Panics
    ///
    /// Panics if the field doesn't exist or doesn't match.
    pub fn assert_json_field(&self, json_pointer: &str, expected: &Value) -> &Self {
        let json = self.json();
        let actual = json
            .pointer(json_pointer)
            .unwrap_or_else(|| panic!("JSON path {json_pointer} not found in:\n{json:#}"));
        assert_eq!(actual, expected, "JSON field {json_pointer} mismatch");
        self
    }

    /// # Panics
    ///
    /// Panics if the field is not an array or has the wrong length.
    pub fn assert_json_array_len(&self, json_pointer: &str, expected_len: usize) -> &Self {
        let json = self.json();
        let len = json
            .pointer(json_pointer)
            .and_then(Value::as_array)
            .unwrap_or_else(|| panic!("JSON path {json_pointer} is not an array"))
            .len();
        assert_eq!(len, expected_len, "Array at {json_pointer} has {len} elements");
        self
    }
}
