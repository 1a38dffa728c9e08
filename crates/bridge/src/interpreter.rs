use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use plugin_core::{PluginError, Result};
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::fds::{anonymous_pipe, close_file, remap_fds};
use crate::{PYTHON_INPUT_FD, PYTHON_OUTPUT_FD};

/// A running interpreter together with the parent ends of its protocol
/// pipes.
///
/// Dropping a process that was never stopped kills and reaps it.
pub struct PythonProcess {
    child: Child,
    input: Option<File>,
    output: Option<File>,
    join_timeout: Duration,
    poll_interval: Duration,
    reaped: bool,
}

/// Starts `<interpreter> -c <command>` with the protocol pipes on
/// descriptors 3 and 4. Standard streams are shared with the caller.
pub fn start_python_interpreter(config: &BridgeConfig, command: &str) -> Result<PythonProcess> {
    let (program, args) = config.command_line()?;
    let (child_input, input) = anonymous_pipe().map_err(|err| pipe_error("input", err))?;
    let (output, child_output) = anonymous_pipe().map_err(|err| pipe_error("output", err))?;

    debug!(program = %program, "Spawning Python interpreter");
    let mut cmd = if Path::new(&program).extension().is_some_and(|ext| ext == "sh") {
        let mut cmd = Command::new("sh");
        cmd.arg(&program);
        cmd
    } else {
        Command::new(&program)
    };
    cmd.args(&args).arg("-c").arg(command);
    remap_fds(
        &mut cmd,
        [(&child_input, PYTHON_INPUT_FD), (&child_output, PYTHON_OUTPUT_FD)],
    );
    let child = cmd.spawn().map_err(|err| {
        PluginError::FileIo(format!(
            "Failed to start Python process '{program}': {err}"
        ))
    })?;
    debug!(pid = child.id(), program = %program, "Python interpreter started");

    // The child holds its own copies now.
    drop(child_input);
    drop(child_output);

    Ok(PythonProcess {
        child,
        input: Some(input),
        output: Some(output),
        join_timeout: config.join_timeout,
        poll_interval: config.poll_interval,
        reaped: false,
    })
}

/// Closes both pipes and waits for the interpreter to exit.
///
/// See [`PythonProcess::stop`].
pub fn stop_python_interpreter(process: PythonProcess) -> Result<()> {
    process.stop()
}

impl PythonProcess {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Pipe feeding the interpreter's descriptor 3.
    pub fn input(&mut self) -> Result<&mut File> {
        self.input
            .as_mut()
            .ok_or_else(|| PluginError::FileIo("Python input pipe is already closed".into()))
    }

    /// Pipe fed by the interpreter's descriptor 4.
    pub fn output(&mut self) -> Result<&mut File> {
        self.output
            .as_mut()
            .ok_or_else(|| PluginError::FileIo("Python output pipe is already closed".into()))
    }

    /// Closes the input pipe so the interpreter sees end of file.
    pub fn close_input(&mut self) -> Result<()> {
        match self.input.take() {
            Some(input) => close_file(input).map_err(|err| {
                PluginError::FileIo(format!(
                    "Failed to close the pipe to the Python interpreter: {err}"
                ))
            }),
            None => Ok(()),
        }
    }

    /// Asks the interpreter to terminate.
    #[cfg(unix)]
    #[allow(unsafe_code)]
    pub fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        let Ok(pid) = libc::pid_t::try_from(self.child.id()) else {
            return;
        };
        // Safety: the child has not been reaped, so `pid` still names it.
        if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
            warn!(pid, error = %io::Error::last_os_error(), "failed to signal Python process");
        }
    }

    #[cfg(not(unix))]
    pub fn terminate(&mut self) {
        if !self.reaped {
            if let Err(err) = self.child.kill() {
                warn!(error = %err, "failed to kill Python process");
            }
        }
    }

    /// Closes any open pipe and polls until the interpreter exits. Once the
    /// join timeout has passed, every poll also sends `SIGTERM`.
    ///
    /// Pipe close failures are logged and ignored. Succeeds only when the
    /// interpreter exited normally with status 0.
    pub fn stop(mut self) -> Result<()> {
        for (name, pipe) in [("input", self.input.take()), ("output", self.output.take())] {
            if let Some(pipe) = pipe {
                if let Err(err) = close_file(pipe) {
                    warn!(pipe = name, error = %err, "failed to close Python pipe");
                }
            }
        }

        let started = Instant::now();
        let status = loop {
            match self.child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() > self.join_timeout {
                        self.terminate();
                    }
                    thread::sleep(self.poll_interval);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(PluginError::FileIo(format!(
                        "Failed to join with the Python process: {err}"
                    )))
                }
            }
        };
        self.reaped = true;
        debug!(pid = self.child.id(), %status, "Python interpreter exited");
        exit_result(status)
    }
}

impl Drop for PythonProcess {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(err) = self.child.kill() {
            warn!(error = %err, "failed to kill Python process");
        }
        if let Err(err) = self.child.wait() {
            warn!(error = %err, "failed to reap Python process");
        }
    }
}

fn exit_result(status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(PluginError::FileIo(format!(
            "Python process exited with error code {code}"
        )));
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(PluginError::FileIo(format!(
                "Python process was terminated by signal {signal}"
            )));
        }
    }
    Err(PluginError::FileIo(format!(
        "Python process exited abnormally: {status}"
    )))
}

fn pipe_error(which: &str, err: io::Error) -> PluginError {
    PluginError::FileIo(format!(
        "Failed to create the {which} pipe for the Python interpreter: {err}"
    ))
}
