//! Common test utilities for payfinder-cli integration tests

use payfinder_lib::CandidateApp;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test context with a temporary directory for registry and manifest files
#[allow(dead_code)]
pub struct TestContext {
    pub temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Write `contents` to `name` inside the temp directory
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write an app registry file
    pub fn write_registry(&self, apps: &[CandidateApp]) -> PathBuf {
        self.write("apps.json", serde_json::to_vec(apps).unwrap())
    }
}

/// Run the `payfinder` binary with `args`
#[allow(dead_code)]
pub fn payfinder(args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_payfinder"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("PAYFINDER_ALLOW_HTTP_LOOPBACK")
        .env_remove("PAYFINDER_BYPASS_READY_TO_PAY")
        .output()
        .expect("Failed to execute payfinder");

    if !output.status.success() {
        eprintln!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        eprintln!("stderr: {}", String::from_utf8_lossy(&output.stderr));
    }
    output
}

/// Stdout as a string
#[allow(dead_code)]
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
