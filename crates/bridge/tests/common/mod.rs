#![allow(dead_code)]

use std::fs;
use std::path::Path;

use bridge::BridgeConfig;
use tempfile::TempDir;

/// Writes an executable `python.sh` running `body` and returns a config
/// that uses it as the interpreter.
pub fn mock_interpreter(dir: &TempDir, body: &str) -> BridgeConfig {
    let path = dir.path().join("python.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    BridgeConfig::default().with_interpreter(path.to_string_lossy())
}

/// Interpreter that drains its request and answers with `answer`.
pub fn answering_interpreter(dir: &TempDir, answer: &str) -> BridgeConfig {
    let answer_path = dir.path().join("answer.json");
    fs::write(&answer_path, answer).unwrap();
    mock_interpreter(
        dir,
        &format!(
            "cat <&3 > \"{request}\"\ncat \"{answer}\" >&4",
            request = dir.path().join("request.json").display(),
            answer = answer_path.display()
        ),
    )
}

/// Request captured by [`answering_interpreter`].
pub fn captured_request(dir: &TempDir) -> serde_json::Value {
    let text = fs::read_to_string(dir.path().join("request.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

pub fn python3_available() -> bool {
    std::process::Command::new("python3")
        .arg("-c")
        .arg("pass")
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn copy_fixture(name: &str, dir: &Path) -> String {
    let source = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let target = dir.join(name);
    fs::copy(source, &target).unwrap();
    target.to_string_lossy().into_owned()
}
