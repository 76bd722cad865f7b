#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
))]
#[path = "unix.rs"]
mod imp;

// Targets without a known errno accessor fall back to std.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
#[path = "other.rs"]
mod imp;

pub use imp::HostFile;
pub(crate) use imp::remove_tree;

use crate::{FsError, Result};

/// Runs `remove` on every entry and returns the first failure, if any.
///
/// A failing entry does not stop the others from being removed.
pub(crate) fn remove_each<T>(
    entries: impl IntoIterator<Item = T>,
    mut remove: impl FnMut(T) -> Result<()>,
) -> Option<FsError> {
    let mut first_err = None;
    for entry in entries {
        if let Err(err) = remove(entry) {
            first_err.get_or_insert(err);
        }
    }
    first_err
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{DirectoryFile, FileSystem, FsErrorKind, HostFs, OpenFlags};

    #[test]
    fn remove_each_keeps_going_after_a_failure() {
        let mut removed = Vec::new();
        let err = remove_each(["a", "locked", "b", "busy", "c"], |name| {
            match name {
                "locked" => return Err(FsError::new(FsErrorKind::PermissionDenied, "locked")),
                "busy" => return Err(FsError::new(FsErrorKind::Io, "busy")),
                _ => {}
            }
            removed.push(name);
            Ok(())
        })
        .expect("a failure is reported");

        assert_eq!(err.kind(), FsErrorKind::PermissionDenied);
        assert_eq!(err.context(), "locked");
        assert_eq!(removed, vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_each_without_failures_is_none() {
        let mut count = 0;
        assert!(remove_each(0..4, |_| {
            count += 1;
            Ok(())
        })
        .is_none());
        assert_eq!(count, 4);
    }

    #[test]
    fn limit_continues_where_the_previous_call_stopped() {
        let temp = tempfile::TempDir::new().unwrap();
        for name in ["one", "two", "three"] {
            std::fs::write(temp.path().join(name), b"").unwrap();
        }

        let mut file = HostFs
            .open_file(temp.path(), OpenFlags::READ, 0)
            .expect("open dir");
        assert_eq!(file.path(), crate::fixpath(temp.path()).as_path());

        let mut seen = BTreeSet::new();
        loop {
            let batch = file.read_dir_names(Some(2)).expect("read batch");
            assert!(batch.len() <= 2);
            if batch.is_empty() {
                break;
            }
            seen.extend(batch);
        }
        file.close().expect("close");

        let expected: BTreeSet<String> = ["one", "three", "two"].map(String::from).into();
        assert_eq!(seen, expected);
    }
}
