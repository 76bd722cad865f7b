//! The filesystem capability consumed by [`read_dir_names`].

use std::path::Path;

use tracing::debug;

use crate::config::READ_DIR_ALL;
use crate::{OpenFlags, Result};

/// A filesystem that can open paths with flags.
pub trait FileSystem {
    type File: DirectoryFile;

    fn open_file(&self, path: &Path, flags: OpenFlags, mode: u32) -> Result<Self::File>;
}

/// An open handle that can list directory entry names.
///
/// The handle must release its resources when dropped; `close` exists so
/// that a failing release can be reported.
pub trait DirectoryFile {
    /// Returns up to `limit` entry names, or all remaining names for `None`.
    ///
    /// `.` and `..` are never returned. Successive calls continue where the
    /// previous one stopped; an empty result means the listing is exhausted.
    fn read_dir_names(&mut self, limit: Option<usize>) -> Result<Vec<String>>;

    fn close(self) -> Result<()>;
}

/// Lists the entry names of `dir`.
///
/// The directory is opened read-only through `fs`; `flags` may add
/// modifiers such as [`OpenFlags::NOFOLLOW`] but any write intent is
/// dropped. The handle is closed on every path. If reading fails the read
/// error is returned even when closing fails as well; if reading succeeds a
/// close failure is returned instead of the names.
pub fn read_dir_names<F>(fs: &F, dir: &Path, flags: OpenFlags) -> Result<Vec<String>>
where
    F: FileSystem + ?Sized,
{
    let mut file = fs
        .open_file(dir, flags.read_only(), 0)
        .map_err(|err| err.wrap("open directory for read_dir_names failed"))?;

    let entries = match file.read_dir_names(READ_DIR_ALL) {
        Ok(entries) => entries,
        Err(err) => {
            if let Err(close_err) = file.close() {
                debug!(
                    dir = %dir.display(),
                    error = %close_err,
                    "close after failed read_dir_names also failed"
                );
            }
            return Err(err.wrap(format!("read_dir_names {} failed", dir.display())));
        }
    };

    file.close()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::{FsError, FsErrorKind};

    #[derive(Default)]
    struct Log {
        opened_with: Option<OpenFlags>,
        closed: bool,
    }

    /// Backend with scripted failures.
    struct Scripted {
        fail_open: Option<FsErrorKind>,
        fail_read: Option<FsErrorKind>,
        fail_close: Option<FsErrorKind>,
        names: Vec<&'static str>,
        log: Rc<RefCell<Log>>,
    }

    impl Scripted {
        fn new(names: Vec<&'static str>) -> Self {
            Self {
                fail_open: None,
                fail_read: None,
                fail_close: None,
                names,
                log: Rc::default(),
            }
        }
    }

    struct ScriptedFile {
        fail_read: Option<FsErrorKind>,
        fail_close: Option<FsErrorKind>,
        names: Vec<String>,
        log: Rc<RefCell<Log>>,
    }

    impl FileSystem for Scripted {
        type File = ScriptedFile;

        fn open_file(&self, _path: &Path, flags: OpenFlags, _mode: u32) -> Result<ScriptedFile> {
            self.log.borrow_mut().opened_with = Some(flags);
            if let Some(kind) = self.fail_open {
                return Err(FsError::new(kind, "scripted open"));
            }
            Ok(ScriptedFile {
                fail_read: self.fail_read,
                fail_close: self.fail_close,
                names: self.names.iter().map(|s| s.to_string()).collect(),
                log: self.log.clone(),
            })
        }
    }

    impl DirectoryFile for ScriptedFile {
        fn read_dir_names(&mut self, limit: Option<usize>) -> Result<Vec<String>> {
            assert_eq!(limit, None, "listing must ask for every entry");
            if let Some(kind) = self.fail_read {
                return Err(FsError::new(kind, "scripted read"));
            }
            Ok(std::mem::take(&mut self.names))
        }

        fn close(self) -> Result<()> {
            self.log.borrow_mut().closed = true;
            match self.fail_close {
                Some(kind) => Err(FsError::new(kind, "scripted close")),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn returns_names_and_closes() {
        let fs = Scripted::new(vec!["a", "b", "c"]);
        let names = read_dir_names(&fs, Path::new("/d"), OpenFlags::empty()).unwrap();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(fs.log.borrow().closed);
    }

    #[test]
    fn opens_read_only_with_extra_flags() {
        let fs = Scripted::new(vec![]);
        read_dir_names(
            &fs,
            Path::new("/d"),
            OpenFlags::NOFOLLOW | OpenFlags::WRITE,
        )
        .unwrap();
        assert_eq!(
            fs.log.borrow().opened_with,
            Some(OpenFlags::READ | OpenFlags::NOFOLLOW)
        );
    }

    #[test]
    fn open_failure_is_reported_as_open_step() {
        let mut fs = Scripted::new(vec![]);
        fs.fail_open = Some(FsErrorKind::NotFound);

        let err = read_dir_names(&fs, Path::new("/missing"), OpenFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::NotFound);
        assert!(err.to_string().starts_with("open directory"), "{err}");
        assert!(!fs.log.borrow().closed);
    }

    #[test]
    #[tracing_test::traced_test]
    fn read_failure_closes_and_wins_over_close_failure() {
        let mut fs = Scripted::new(vec!["a"]);
        fs.fail_read = Some(FsErrorKind::PermissionDenied);
        fs.fail_close = Some(FsErrorKind::Io);

        let err = read_dir_names(&fs, Path::new("/d"), OpenFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::PermissionDenied);
        assert_eq!(err.context(), "read_dir_names /d failed");
        assert!(fs.log.borrow().closed);
        assert!(logs_contain("close after failed read_dir_names also failed"));
    }

    #[test]
    fn close_failure_after_successful_read_is_returned() {
        let mut fs = Scripted::new(vec!["a"]);
        fs.fail_close = Some(FsErrorKind::Io);

        let err = read_dir_names(&fs, Path::new("/d"), OpenFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::Io);
        assert_eq!(err.context(), "scripted close");
    }
}
