//! Blocking transfer of whole messages over the interpreter pipes.

use std::io::{self, Read, Write};

use plugin_core::{PluginError, Result};

/// Capacity of the receive buffer before any growth.
pub const INITIAL_BUFFER_SIZE: usize = 4096;

/// Writes all of `data`, retrying interrupted and partial writes.
pub fn write_to_pipe<W: Write>(mut pipe: W, data: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < data.len() {
        match pipe.write(&data[written..]) {
            Ok(0) => {
                return Err(write_error(io::Error::from(io::ErrorKind::WriteZero)));
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(write_error(err)),
        }
    }
    Ok(())
}

/// Reads until end of stream and returns everything received as text.
///
/// The buffer doubles whenever it is more than half full, so the pipe is
/// drained in a bounded number of reallocations.
pub fn read_from_pipe<R: Read>(mut pipe: R) -> Result<String> {
    let mut buffer = Vec::new();
    grow(&mut buffer, INITIAL_BUFFER_SIZE)?;
    let mut filled = 0;
    loop {
        let capacity = buffer.len();
        if filled > capacity / 2 {
            grow(&mut buffer, capacity * 2)?;
        }
        match pipe.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(PluginError::FileIo(format!(
                    "Failed to read output from the Python interpreter: {err}"
                )))
            }
        }
    }
    buffer.truncate(filled);
    buffer.shrink_to_fit();
    String::from_utf8(buffer).map_err(|err| {
        PluginError::IllegalOutput(format!(
            "Output from the Python interpreter is not valid UTF-8: {err}"
        ))
    })
}

fn grow(buffer: &mut Vec<u8>, len: usize) -> Result<()> {
    buffer
        .try_reserve_exact(len - buffer.len())
        .map_err(|_| PluginError::FileIo("Buffer allocation failed".into()))?;
    buffer.resize(len, 0);
    Ok(())
}

fn write_error(err: io::Error) -> PluginError {
    PluginError::FileIo(format!(
        "Failed to write commands to the Python interpreter: {err}"
    ))
}
