#![cfg(unix)]

mod common;

use std::fs;
use std::time::{Duration, Instant};

use bridge::{run_python_command, start_python_interpreter, stop_python_interpreter, BridgeConfig};
use common::{init_tracing, mock_interpreter};
use plugin_core::ErrorKind;
use tempfile::TempDir;

const ECHO: &str = "cat <&3 >&4";

#[test]
fn echoes_input() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = mock_interpreter(&dir, ECHO);

    assert_eq!(run_python_command(&config, "dummy", "").unwrap(), "");
    assert_eq!(
        run_python_command(&config, "dummy", "some data").unwrap(),
        "some data"
    );
    assert_eq!(
        run_python_command(&config, "dummy", "line one\nline two\n").unwrap(),
        "line one\nline two\n"
    );
}

#[test]
fn transfers_large_documents() {
    let dir = TempDir::new().unwrap();
    // Buffer the whole request first so neither side blocks on a full pipe.
    let spool = dir.path().join("spool");
    let config = mock_interpreter(
        &dir,
        &format!(
            "cat <&3 > \"{0}\"\ncat \"{0}\" >&4",
            spool.display()
        ),
    );
    let input: String = "0123456789abcdef"
        .chars()
        .cycle()
        .take(24 * 1024 * 1024 + 5)
        .collect();

    let output = run_python_command(&config, "dummy", &input).unwrap();
    assert_eq!(output.len(), input.len());
    assert_eq!(output, input);
}

#[test]
fn standard_streams_are_not_captured() {
    let dir = TempDir::new().unwrap();
    let config = mock_interpreter(
        &dir,
        "echo to-stdout\necho to-stderr >&2\nprintf answer >&4\ncat <&3 >/dev/null",
    );
    assert_eq!(run_python_command(&config, "dummy", "x").unwrap(), "answer");
}

#[test]
fn command_is_passed_with_dash_c() {
    let dir = TempDir::new().unwrap();
    let config = mock_interpreter(&dir, r#"printf '%s %s' "$1" "$2" >&4"#);
    assert_eq!(
        run_python_command(&config, "print('hi')", "").unwrap(),
        "-c print('hi')"
    );
}

#[test]
fn write_failure_stops_worker_and_keeps_error() {
    let dir = TempDir::new().unwrap();
    let pid_file = dir.path().join("worker.pid");
    let config = mock_interpreter(
        &dir,
        &format!("echo $$ > \"{}\"\nexec 3<&-\nexit 0", pid_file.display()),
    );
    let input = "x".repeat(8 * 1024 * 1024);

    let err = run_python_command(&config, "dummy", &input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileIo);
    assert!(
        err.message().starts_with("Failed to write commands"),
        "{}",
        err.message()
    );

    let pid: libc::pid_t = fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
    let alive = unsafe { libc::kill(pid, 0) } == 0;
    assert!(!alive, "worker {pid} was not reaped");
    assert_eq!(
        std::io::Error::last_os_error().raw_os_error(),
        Some(libc::ESRCH)
    );
}

#[test]
fn empty_command_is_rejected() {
    let err = run_python_command(&BridgeConfig::default(), "", "input").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullInput);
}

#[test]
fn failing_interpreter_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let config = mock_interpreter(&dir, "exit 99");
    let err = run_python_command(&config, "dummy", "some data").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileIo);
}

#[test]
fn output_is_discarded_on_error_exit() {
    let dir = TempDir::new().unwrap();
    let config = mock_interpreter(&dir, "printf partial >&4\nexit 3");
    let err = run_python_command(&config, "dummy", "").unwrap_err();
    assert_eq!(err.message(), "Python process exited with error code 3");
}

#[test]
fn missing_interpreter_is_an_io_error() {
    let config = BridgeConfig::default().with_interpreter("/nonexistent/python-for-tests");
    let err = run_python_command(&config, "dummy", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileIo);
}

#[test]
fn hanging_interpreter_is_terminated_after_timeout() {
    let dir = TempDir::new().unwrap();
    let config = mock_interpreter(&dir, "exec 3<&- 4>&-\nexec sleep 601")
        .with_join_timeout(Duration::from_secs(1));

    let started = Instant::now();
    let err = run_python_command(&config, "dummy", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileIo);
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[test]
fn start_and_stop_without_traffic() {
    let dir = TempDir::new().unwrap();
    let config = mock_interpreter(&dir, "exit 0");
    let process = start_python_interpreter(&config, "dummy").unwrap();
    assert!(process.id() > 0);
    stop_python_interpreter(process).unwrap();
}
