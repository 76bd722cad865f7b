//! Host filesystem operations.
//!
//! Every function here normalizes its path arguments with [`fixpath`] and
//! forwards to the matching `std::fs` primitive. OS errors are returned as
//! [`FsError`]s that keep the original [`io::Error`] as their source.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::fixpath::fixpath;
use crate::platform::{self, HostFile};
use crate::{FileSystem, FsError, FsErrorKind, OpenFlags, Result};

fn io_result<T>(op: &'static str, path: &Path, result: io::Result<T>) -> Result<T> {
    result.map_err(|err| FsError::from_io(op, path, err))
}

/// Creates a directory. Fails if `path` exists or its parent is missing.
pub fn mkdir(path: &Path, mode: u32) -> Result<()> {
    let path = fixpath(path);
    trace!(path = %path.display(), mode, "mkdir");
    io_result("mkdir", &path, dir_builder(mode).create(&path))
}

/// Creates a directory and any missing parents.
///
/// Succeeds without doing anything if `path` already is a directory.
pub fn mkdir_all(path: &Path, mode: u32) -> Result<()> {
    let path = fixpath(path);
    trace!(path = %path.display(), mode, "mkdir_all");
    let mut builder = dir_builder(mode);
    builder.recursive(true);
    io_result("mkdir_all", &path, builder.create(&path))
}

fn dir_builder(mode: u32) -> fs::DirBuilder {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
}

/// Returns the target of the symbolic link at `path`.
pub fn readlink(path: &Path) -> Result<PathBuf> {
    let path = fixpath(path);
    trace!(path = %path.display(), "readlink");
    io_result("readlink", &path, fs::read_link(&path))
}

/// Removes a file or an empty directory.
pub fn remove(path: &Path) -> Result<()> {
    let path = fixpath(path);
    trace!(path = %path.display(), "remove");

    let unlink_err = match fs::remove_file(&path) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    let rmdir_err = match fs::remove_dir(&path) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    // rmdir on a non-directory reports NotADirectory on every platform,
    // which means the unlink error is the meaningful one
    let err = if rmdir_err.kind() == io::ErrorKind::NotADirectory {
        unlink_err
    } else {
        rmdir_err
    };
    Err(FsError::from_io("remove", &path, err))
}

/// Removes `path` and everything below it.
///
/// Removal continues past failures; the first error encountered is
/// returned. A missing `path` is not an error. Symlinks are removed, never
/// followed, even when one replaces a directory during the walk.
pub fn remove_all(path: &Path) -> Result<()> {
    let path = fixpath(path);
    trace!(path = %path.display(), "remove_all");

    if ends_in_dot(&path) {
        return Err(FsError::new(
            FsErrorKind::InvalidInput,
            format!("remove_all {}: path ends in .", path.display()),
        ));
    }

    platform::remove_tree(&path).inspect_err(|err| {
        debug!(path = %path.display(), error = %err, "remove_all failed");
    })
}

fn ends_in_dot(path: &Path) -> bool {
    let bytes = path.as_os_str().as_encoded_bytes();
    let last = bytes
        .rsplit(|b| *b == b'/' || (cfg!(windows) && *b == b'\\'))
        .next();
    last == Some(b".".as_slice())
}

/// Renames `from` to `to`, replacing `to` if it exists.
pub fn rename(from: &Path, to: &Path) -> Result<()> {
    let from = fixpath(from);
    let to = fixpath(to);
    trace!(from = %from.display(), to = %to.display(), "rename");
    fs::rename(&from, &to).map_err(|err| FsError::from_io_pair("rename", &from, &to, err))
}

/// Creates `link` as a symbolic link to `target`.
///
/// `target` is stored verbatim; only `link` is normalized.
pub fn symlink(target: &Path, link: &Path) -> Result<()> {
    let link = fixpath(link);
    trace!(target = %target.display(), link = %link.display(), "symlink");
    create_symlink(target, &link)
        .map_err(|err| FsError::from_io_pair("symlink", target, &link, err))
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    let resolved = match link.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target.to_path_buf(),
    };
    if resolved.is_dir() {
        symlink_dir(target, link)
    } else {
        symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::ErrorKind::Unsupported.into())
}

/// Creates `link` as a hard link to `target`.
pub fn link(target: &Path, link: &Path) -> Result<()> {
    let target = fixpath(target);
    let link = fixpath(link);
    trace!(target = %target.display(), link = %link.display(), "link");
    fs::hard_link(&target, &link)
        .map_err(|err| FsError::from_io_pair("link", &target, &link, err))
}

/// Returns the metadata of `path` without following a final symlink.
pub fn lstat(path: &Path) -> Result<fs::Metadata> {
    let path = fixpath(path);
    trace!(path = %path.display(), "lstat");
    io_result("lstat", &path, fs::symlink_metadata(&path))
}

/// Opens `path` for reading.
pub fn open(path: &Path) -> Result<File> {
    let path = fixpath(path);
    trace!(path = %path.display(), "open");
    io_result("open", &path, File::open(&path))
}

/// Opens `path` with `flags`; `mode` is used when the file is created.
pub fn open_file(path: &Path, flags: OpenFlags, mode: u32) -> Result<File> {
    let path = fixpath(path);
    trace!(path = %path.display(), ?flags, mode, "open_file");
    io_result("open", &path, flags.to_open_options(mode).open(&path))
}

/// Forces the permissions of `path` to [`DEFAULT_FILE_MODE`](crate::DEFAULT_FILE_MODE).
///
/// Platforms without unix modes only clear the read-only attribute.
pub fn reset_permissions(path: &Path) -> Result<()> {
    let path = fixpath(path);
    trace!(path = %path.display(), "reset_permissions");
    io_result("chmod", &path, set_default_permissions(&path))
}

#[cfg(unix)]
fn set_default_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    use crate::config::DEFAULT_FILE_MODE;
    fs::set_permissions(path, fs::Permissions::from_mode(DEFAULT_FILE_MODE))
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn set_default_permissions(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(false);
    fs::set_permissions(path, perms)
}

/// The host filesystem as a [`FileSystem`].
#[derive(Clone, Copy, Debug, Default)]
pub struct HostFs;

impl FileSystem for HostFs {
    type File = HostFile;

    fn open_file(&self, path: &Path, flags: OpenFlags, mode: u32) -> Result<HostFile> {
        let path = fixpath(path);
        trace!(path = %path.display(), ?flags, "host.open_file");
        let file = io_result("open", &path, flags.to_open_options(mode).open(&path))?;
        Ok(HostFile::new(file, path))
    }
}
