//! Host recipe plugins written in Python.
//!
//! Every operation starts a fresh interpreter with two extra pipes: the
//! request document is read by the interpreter on descriptor
//! [`PYTHON_INPUT_FD`] and the answer comes back on [`PYTHON_OUTPUT_FD`].
//! Standard streams are shared with the host, so recipe output and
//! tracebacks stay visible.

pub mod adapter;
mod command;
pub mod config;
pub mod discovery;
mod fds;
mod interpreter;
pub mod pipe;
pub mod registry;
pub mod scripts;

/// Descriptor the interpreter reads its request from.
pub const PYTHON_INPUT_FD: i32 = 3;
/// Descriptor the interpreter writes its answer to.
pub const PYTHON_OUTPUT_FD: i32 = 4;

pub use adapter::{update_plugin, PythonAdapter};
pub use command::run_python_command;
pub use config::BridgeConfig;
pub use discovery::find_modules;
pub use interpreter::{start_python_interpreter, stop_python_interpreter, PythonProcess};
pub use pipe::{read_from_pipe, write_to_pipe};
pub use registry::RecipeBridge;
