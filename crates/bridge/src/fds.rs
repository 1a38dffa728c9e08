use std::fs::File;
use std::io;
use std::process::Command;

/// Creates an anonymous pipe as `(read end, write end)`.
///
/// Both ends are close-on-exec so no interpreter inherits them by accident.
#[cfg(unix)]
#[allow(unsafe_code)]
pub(crate) fn anonymous_pipe() -> io::Result<(File, File)> {
    use std::os::fd::{FromRawFd, OwnedFd};

    let mut fds: [libc::c_int; 2] = [-1, -1];

    #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
    // Safety: `fds` has room for the two descriptors `pipe2` writes.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };

    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
    // Safety: `fds` has room for the two descriptors `pipe` writes, and
    // `fcntl` only touches descriptors this function just created.
    let rc = unsafe {
        let rc = libc::pipe(fds.as_mut_ptr());
        if rc == 0 {
            for fd in fds {
                libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC);
            }
        }
        rc
    };

    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // Safety: both descriptors were just returned by the kernel and nothing
    // else owns them.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    Ok((File::from(read), File::from(write)))
}

#[cfg(not(unix))]
pub(crate) fn anonymous_pipe() -> io::Result<(File, File)> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interpreter pipes need a Unix host",
    ))
}

/// Makes each `(source, target)` descriptor pair appear as `target` in the
/// spawned child. Only the targets survive `exec`.
#[cfg(unix)]
#[allow(unsafe_code)]
pub(crate) fn remap_fds(cmd: &mut Command, mappings: [(&File, i32); 2]) {
    use std::os::fd::AsRawFd;
    use std::os::unix::process::CommandExt;

    let pairs = mappings.map(|(file, target)| (file.as_raw_fd(), target));
    let lowest_free = pairs.iter().map(|(_, target)| *target).max().unwrap_or(2) + 1;
    // Safety: `pre_exec` runs after `fork` in the child; the closure only
    // calls the async-signal-safe `fcntl` and `dup2` on copied integers.
    unsafe {
        cmd.pre_exec(move || {
            // Move every source above all targets first, so a source that
            // already sits on another pair's target is not clobbered.
            let mut staged = [(-1, -1); 2];
            for (slot, (source, target)) in staged.iter_mut().zip(pairs) {
                let moved = libc::fcntl(source, libc::F_DUPFD_CLOEXEC, lowest_free);
                if moved == -1 {
                    return Err(io::Error::last_os_error());
                }
                *slot = (moved, target);
            }
            for (moved, target) in staged {
                if libc::dup2(moved, target) == -1 {
                    return Err(io::Error::last_os_error());
                }
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub(crate) fn remap_fds(_cmd: &mut Command, _mappings: [(&File, i32); 2]) {}

/// Closes `file`, reporting what `close` says instead of discarding it.
#[cfg(unix)]
#[allow(unsafe_code)]
pub(crate) fn close_file(file: File) -> io::Result<()> {
    use std::os::fd::IntoRawFd;

    let fd = file.into_raw_fd();
    // Safety: `fd` came out of an owned `File`, so it is closed exactly once.
    if unsafe { libc::close(fd) } == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    // The descriptor is released even when close is interrupted.
    if err.kind() == io::ErrorKind::Interrupted {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
pub(crate) fn close_file(file: File) -> io::Result<()> {
    drop(file);
    Ok(())
}
