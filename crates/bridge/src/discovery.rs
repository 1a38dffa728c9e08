use std::collections::{BTreeSet, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Lists the Python source files below `dirs`, searching recursively.
///
/// A leading `~` is expanded to `$HOME`. Missing or unreadable directories
/// are skipped. A path given directly as a `.py` file is taken as is. The
/// result is sorted and free of duplicates. Each directory is searched once,
/// however many symlinks lead to it.
pub fn find_modules<P: AsRef<Path>>(dirs: &[P]) -> Vec<String> {
    let mut found = BTreeSet::new();
    let mut visited = HashSet::new();
    for dir in dirs {
        let dir = expand_tilde(dir.as_ref());
        if is_python_file(&dir) {
            found.insert(dir);
        } else if dir.is_dir() {
            collect(&dir, &mut found, &mut visited);
        } else {
            debug!(path = %dir.display(), "Skipping missing recipe directory");
        }
    }
    found
        .into_iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect()
}

fn collect(dir: &Path, found: &mut BTreeSet<PathBuf>, visited: &mut HashSet<PathBuf>) {
    match fs::canonicalize(dir) {
        Ok(real) => {
            if !visited.insert(real) {
                debug!(path = %dir.display(), "Skipping already searched directory");
                return;
            }
        }
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "Cannot resolve recipe directory");
            return;
        }
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "Cannot read recipe directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, found, visited);
        } else if is_python_file(&path) {
            found.insert(path);
        }
    }
}

fn is_python_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "py") && path.is_file()
}

/// Replaces a leading `~` component with the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
