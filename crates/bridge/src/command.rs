use plugin_core::{PluginError, Result};
use tracing::{debug, enabled, Level};

use crate::config::BridgeConfig;
use crate::interpreter::{start_python_interpreter, PythonProcess};
use crate::pipe::{read_from_pipe, write_to_pipe};

/// Runs `command` in a fresh interpreter, sends it `input` and returns
/// everything the interpreter wrote to its output pipe.
///
/// On any failure the interpreter is still stopped and the first error is
/// returned. A non-zero exit status is an error even if output was read.
pub fn run_python_command(config: &BridgeConfig, command: &str, input: &str) -> Result<String> {
    if command.is_empty() {
        return Err(PluginError::NullInput(
            "No command given for the Python interpreter.".into(),
        ));
    }
    log_numbered("Command sent to Python interpreter:", command);
    log_numbered("Input to Python interpreter:", input);

    let mut process = start_python_interpreter(config, command)?;

    if let Err(err) = process
        .input()
        .and_then(|pipe| write_to_pipe(pipe, input.as_bytes()))
    {
        return Err(stop_after(process, err));
    }
    if let Err(err) = process.close_input() {
        process.terminate();
        return Err(stop_after(process, err));
    }
    let output = match process.output().and_then(|pipe| read_from_pipe(pipe)) {
        Ok(output) => output,
        Err(err) => return Err(stop_after(process, err)),
    };
    process.stop()?;

    if output.is_empty() {
        debug!("Output from Python interpreter: (none)");
    } else {
        log_numbered("Output from Python interpreter:", &output);
    }
    Ok(output)
}

fn stop_after(process: PythonProcess, err: PluginError) -> PluginError {
    if let Err(stop_err) = process.stop() {
        debug!(error = %stop_err, "Python interpreter also failed to stop");
    }
    err
}

/// Logs `text` below `header`, one line per event, prefixed with a four
/// digit line number.
fn log_numbered(header: &str, text: &str) {
    if !enabled!(Level::DEBUG) {
        return;
    }
    debug!("{header}");
    for (number, line) in text.lines().enumerate() {
        debug!("{:04} {line}", number + 1);
    }
}
