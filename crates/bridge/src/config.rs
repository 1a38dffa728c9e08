use std::path::Path;
use std::time::Duration;

use plugin_core::{PluginError, Result};

/// Interpreter used when nothing else is configured.
pub const DEFAULT_INTERPRETER: &str = "python";
/// Grace period before a lingering interpreter receives `SIGTERM`.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Delay between two non-blocking checks for interpreter exit.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How interpreter processes are launched and joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Interpreter command. Either the path of an existing file or a
    /// shell-quoted command line such as `conda run -n astro python`.
    pub interpreter: String,
    pub join_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl BridgeConfig {
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Splits the interpreter setting into program and leading arguments.
    pub(crate) fn command_line(&self) -> Result<(String, Vec<String>)> {
        if Path::new(&self.interpreter).is_file() {
            return Ok((self.interpreter.clone(), Vec::new()));
        }
        let mut parts = shlex::split(&self.interpreter)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| {
                PluginError::FileIo(format!(
                    "Failed to start Python process: invalid interpreter command '{}'",
                    self.interpreter
                ))
            })?;
        let program = parts.remove(0);
        Ok((program, parts))
    }
}
