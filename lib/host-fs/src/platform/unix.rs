use std::ffi::{CStr, CString, OsStr};
use std::fs::File;
use std::io;
use std::mem;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use super::remove_each;
use crate::{DirectoryFile, FsError, FsErrorKind, Result};

/// A host file opened through [`HostFs`](crate::HostFs).
#[derive(Debug)]
pub struct HostFile {
    file: File,
    path: PathBuf,
    dir: Option<DirStream>,
}

impl HostFile {
    pub(crate) fn new(file: File, path: PathBuf) -> Self {
        Self {
            file,
            path,
            dir: None,
        }
    }

    /// The normalized path this handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DirectoryFile for HostFile {
    fn read_dir_names(&mut self, limit: Option<usize>) -> Result<Vec<String>> {
        let stream = match self.dir.take() {
            Some(stream) => stream,
            None => DirStream::open(self.file.as_raw_fd())
                .map_err(|err| FsError::from_io("opendir", &self.path, err))?,
        };
        let dir = self.dir.insert(stream);

        let mut names = Vec::new();
        while limit.is_none_or(|n| names.len() < n) {
            match dir.next_name() {
                Ok(Some(name)) => names.push(String::from_utf8_lossy(&name).into_owned()),
                Ok(None) => break,
                Err(err) => return Err(FsError::from_io("readdirent", &self.path, err)),
            }
        }
        Ok(names)
    }

    fn close(self) -> Result<()> {
        let HostFile { file, path, dir } = self;
        let dir_result = dir.map_or(Ok(()), DirStream::close);

        let fd = file.into_raw_fd();
        let res = unsafe { libc::close(fd) };
        let file_result = if res < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        };

        dir_result
            .and(file_result)
            .map_err(|err| FsError::from_io("close", &path, err))
    }
}

/// A `readdir` stream over a duplicate of the handle's descriptor.
#[derive(Debug)]
struct DirStream {
    dirp: NonNull<libc::DIR>,
}

// The stream is only ever used through `&mut`, never shared.
unsafe impl Send for DirStream {}

impl DirStream {
    fn open(fd: RawFd) -> io::Result<Self> {
        let dup_fd = unsafe { libc::dup(fd) };
        if dup_fd < 0 {
            return Err(io::Error::last_os_error());
        }
        let dirp = unsafe { libc::fdopendir(dup_fd) };
        match NonNull::new(dirp) {
            Some(dirp) => Ok(Self { dirp }),
            None => {
                let err = io::Error::last_os_error();
                unsafe { libc::close(dup_fd) };
                Err(err)
            }
        }
    }

    fn next_name(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            set_errno(0);
            let ent = unsafe { libc::readdir(self.dirp.as_ptr()) };
            if ent.is_null() {
                return match errno() {
                    0 => Ok(None),
                    err => Err(io::Error::from_raw_os_error(err)),
                };
            }
            let name = unsafe { CStr::from_ptr((*ent).d_name.as_ptr()) }.to_bytes();
            if name == b"." || name == b".." {
                continue;
            }
            return Ok(Some(name.to_vec()));
        }
    }

    fn close(self) -> io::Result<()> {
        let dirp = self.dirp;
        mem::forget(self);
        let res = unsafe { libc::closedir(dirp.as_ptr()) };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        unsafe { libc::closedir(self.dirp.as_ptr()) };
    }
}

/// Removes `path` and everything below it.
///
/// Each entry is reached through its parent's descriptor and directories
/// are opened with `O_NOFOLLOW`, so a directory swapped for a symlink during
/// the walk gets the link unlinked while its target is left alone.
pub(crate) fn remove_tree(path: &Path) -> Result<()> {
    let Some(name) = path.file_name() else {
        return Err(FsError::new(
            FsErrorKind::InvalidInput,
            format!("remove_all {}: path has no final element", path.display()),
        ));
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent_fd = match open_dir(parent) {
        Ok(fd) => fd,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(FsError::from_io("opendir", parent, err)),
    };
    let name = to_cstring(name.as_bytes()).map_err(|err| FsError::from_io("remove", path, err))?;
    remove_at(&parent_fd, &name, path)
}

fn remove_at(parent: &OwnedFd, name: &CStr, path: &Path) -> Result<()> {
    let unlink_err = match unlink_at(parent, name, 0) {
        Ok(()) => return Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => err,
    };
    let dir = match open_dir_at(parent, name) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        // not a directory, or a symlink to one: the unlink error stands
        Err(err)
            if matches!(
                err.raw_os_error(),
                Some(libc::ENOTDIR | libc::ELOOP | libc::EMLINK)
            ) =>
        {
            return Err(FsError::from_io("remove", path, unlink_err));
        }
        Err(err) => return Err(FsError::from_io("opendir", path, err)),
    };

    let mut first_err = match read_names(&dir) {
        Ok(names) => remove_each(names, |child| {
            let child_path = path.join(OsStr::from_bytes(child.to_bytes()));
            remove_at(&dir, &child, &child_path)
        }),
        Err(err) => Some(FsError::from_io("readdirent", path, err)),
    };
    drop(dir);

    match unlink_at(parent, name, libc::AT_REMOVEDIR) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => {
            first_err.get_or_insert(FsError::from_io("remove", path, err));
        }
        _ => {}
    }
    first_err.map_or(Ok(()), Err)
}

/// Every name in `dir`, read before anything in it is removed.
fn read_names(dir: &OwnedFd) -> io::Result<Vec<CString>> {
    let mut stream = DirStream::open(dir.as_raw_fd())?;
    let mut names = Vec::new();
    while let Some(name) = stream.next_name()? {
        names.push(to_cstring(&name)?);
    }
    stream.close()?;
    Ok(names)
}

fn to_cstring(bytes: &[u8]) -> io::Result<CString> {
    CString::new(bytes).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL"))
}

fn open_dir(path: &Path) -> io::Result<OwnedFd> {
    let cstr = to_cstring(path.as_os_str().as_bytes())?;
    let flags = libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC;
    let fd = unsafe { libc::open(cstr.as_ptr(), flags) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn open_dir_at(parent: &OwnedFd, name: &CStr) -> io::Result<OwnedFd> {
    let flags = libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC | libc::O_NOFOLLOW;
    let fd = unsafe { libc::openat(parent.as_raw_fd(), name.as_ptr(), flags) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn unlink_at(parent: &OwnedFd, name: &CStr, flags: libc::c_int) -> io::Result<()> {
    let res = unsafe { libc::unlinkat(parent.as_raw_fd(), name.as_ptr(), flags) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn set_errno(val: i32) {
    unsafe {
        *libc::__errno_location() = val;
    }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
fn set_errno(val: i32) {
    unsafe {
        *libc::__error() = val;
    }
}

#[cfg(any(target_os = "netbsd", target_os = "openbsd"))]
fn set_errno(val: i32) {
    unsafe {
        *libc::__errno() = val;
    }
}
