//! Path normalization applied to every path before it reaches the OS.

use std::path::{Path, PathBuf};

pub const EXTENDED_PATH_PREFIX: &str = r"\\?\";
pub const UNC_PATH_PREFIX: &str = r"\\?\UNC\";

/// Rewrites `path` into the form the host expects.
///
/// This is the identity on unix. On Windows the path is made absolute and
/// put in extended-length form so it is not subject to `MAX_PATH`.
#[cfg(not(windows))]
pub fn fixpath(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(windows)]
pub fn fixpath(path: &Path) -> PathBuf {
    let Ok(abs) = std::path::absolute(path) else {
        return path.to_path_buf();
    };
    match abs.to_str() {
        Some(abs) => PathBuf::from(fix_windows_path(abs)),
        // non UTF-16-roundtrippable names are left alone
        None => abs,
    }
}

/// Extended-length form of an absolute Windows path.
pub fn fix_windows_path(abs: &str) -> String {
    if abs.starts_with(UNC_PATH_PREFIX) || abs.starts_with(EXTENDED_PATH_PREFIX) {
        return abs.to_owned();
    }
    if let Some(rest) = abs.strip_prefix(r"\\") {
        return format!("{UNC_PATH_PREFIX}{rest}");
    }
    format!("{EXTENDED_PATH_PREFIX}{abs}")
}
