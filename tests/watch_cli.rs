mod support;

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use support::TestRoot;

#[test]
fn watch_reports_changes_from_other_commands() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init();
    let mut child = Command::new(assert_cmd::cargo::cargo_bin("taskraffle"))
        .args(["--json", "watch", "--count", "1"])
        .env("TASKRAFFLE_ROOT", root.path())
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    thread::sleep(Duration::from_millis(750));
    let id = root.add("Seen by watcher", "high");

    let deadline = Instant::now() + Duration::from_secs(20);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            break None;
        }
        thread::sleep(Duration::from_millis(50));
    };
    let status = status.expect("watch did not exit after one update");
    assert!(status.success());

    let mut stdout = String::new();
    child
        .stdout
        .take()
        .expect("stdout")
        .read_to_string(&mut stdout)?;
    let value: Value = serde_json::from_str(stdout.trim())?;
    assert_eq!(value["command"], "watch");
    assert_eq!(value["data"]["update"], 1);
    assert_eq!(value["data"]["stats"]["pending"], 1);
    assert_eq!(value["data"]["tasks"][0]["id"], id.as_str());
    Ok(())
}

#[test]
fn watch_requires_init() {
    let root = TestRoot::empty();
    root.cmd().args(["watch", "--count", "1"]).assert().code(2);
}
