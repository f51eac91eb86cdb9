#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    /// Scratch root with `taskraffle init` already run
    pub fn init() -> Self {
        let root = Self::empty();
        root.cmd().arg("init").assert().success();
        root
    }

    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_dir(&self) -> PathBuf {
        self.dir.path().join(".taskraffle")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(".taskraffle.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = taskraffle_cmd();
        cmd.current_dir(self.path())
            .env("TASKRAFFLE_ROOT", self.path());
        cmd
    }

    /// Run with `--json` and return the parsed envelope
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    /// Add a task and return its id
    pub fn add(&self, title: &str, priority: &str) -> String {
        let value = self.json(&[
            "add",
            title,
            "--description",
            &format!("details for {title}"),
            "--priority",
            priority,
        ]);
        value["data"]["id"].as_str().expect("task id").to_string()
    }
}

pub fn taskraffle_cmd() -> Command {
    let mut cmd = Command::cargo_bin("taskraffle").expect("taskraffle binary");
    cmd.env_remove("RUST_LOG").env_remove("TASKRAFFLE_ROOT");
    cmd
}
