use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use super::remove_each;
use crate::{DirectoryFile, FsError, FsErrorKind, Result};

/// A host file opened through [`HostFs`](crate::HostFs).
///
/// Directory names are read through `std::fs::read_dir` on the path the
/// handle was opened with.
#[derive(Debug)]
pub struct HostFile {
    file: File,
    path: PathBuf,
    entries: Option<fs::ReadDir>,
}

impl HostFile {
    pub(crate) fn new(file: File, path: PathBuf) -> Self {
        Self {
            file,
            path,
            entries: None,
        }
    }

    /// The normalized path this handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DirectoryFile for HostFile {
    fn read_dir_names(&mut self, limit: Option<usize>) -> Result<Vec<String>> {
        let entries = match self.entries.take() {
            Some(entries) => entries,
            None => fs::read_dir(&self.path)
                .map_err(|err| FsError::from_io("opendir", &self.path, err))?,
        };
        let entries = self.entries.insert(entries);

        let mut names = Vec::new();
        while limit.is_none_or(|n| names.len() < n) {
            match entries.next() {
                Some(Ok(entry)) => names.push(entry.file_name().to_string_lossy().into_owned()),
                Some(Err(err)) => return Err(FsError::from_io("readdirent", &self.path, err)),
                None => break,
            }
        }
        Ok(names)
    }

    fn close(self) -> Result<()> {
        // the platform reports no error on handle release
        drop(self);
        Ok(())
    }
}

/// Removes `path` and everything below it.
///
/// Each child directory goes to `std::fs::remove_dir_all`, which does not
/// follow symlinks; a failure inside one child stops that child only.
pub(crate) fn remove_tree(path: &Path) -> Result<()> {
    if path.file_name().is_none() {
        return Err(FsError::new(
            FsErrorKind::InvalidInput,
            format!("remove_all {}: path has no final element", path.display()),
        ));
    }
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(FsError::from_io("lstat", path, err)),
    };
    if !meta.is_dir() {
        return ignore_not_found("remove", path, remove_link_or_file(path, &meta));
    }

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(FsError::from_io("opendir", path, err)),
    };
    let mut first_err = remove_each(entries, |entry| {
        let entry = entry.map_err(|err| FsError::from_io("readdirent", path, err))?;
        let child = entry.path();
        let result = match fs::symlink_metadata(&child) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&child),
            Ok(meta) => remove_link_or_file(&child, &meta),
            Err(err) => Err(err),
        };
        ignore_not_found("remove", &child, result)
    });

    if let Err(err) = ignore_not_found("remove", path, fs::remove_dir(path)) {
        first_err.get_or_insert(err);
    }
    first_err.map_or(Ok(()), Err)
}

fn remove_link_or_file(path: &Path, meta: &fs::Metadata) -> io::Result<()> {
    // directory symlinks on windows are removed like directories
    match fs::remove_file(path) {
        Err(err) if meta.file_type().is_symlink() => fs::remove_dir(path).map_err(|_| err),
        other => other,
    }
}

fn ignore_not_found(op: &'static str, path: &Path, result: io::Result<()>) -> Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other.map_err(|err| FsError::from_io(op, path, err)),
    }
}
