//! Error types shared by the host facade and the listing backends.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::io;
use std::path::Path;

use thiserror::Error;

pub type Result<T, E = FsError> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Classification of a filesystem failure.
///
/// The OS error that produced a kind is never discarded; it stays reachable
/// through [`FsError::io_error`] and the `source` chain.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FsErrorKind {
    /// The requested file or directory could not be found
    #[error("entity not found")]
    NotFound,
    /// A create operation collided with an existing entry
    #[error("file exists")]
    AlreadyExists,
    /// Caller was not allowed to perform this operation
    #[error("permission denied")]
    PermissionDenied,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    /// Rename or link across filesystems
    #[error("cross-device link")]
    CrossesDevices,
    #[error("read-only filesystem")]
    ReadOnlyFilesystem,
    #[error("invalid input")]
    InvalidInput,
    #[error("operation not supported")]
    Unsupported,
    #[error("operation interrupted")]
    Interrupted,
    /// Something failed when doing IO. These errors can generally not be handled.
    #[error("io error")]
    Io,
}

impl From<io::ErrorKind> for FsErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => FsErrorKind::NotFound,
            io::ErrorKind::AlreadyExists => FsErrorKind::AlreadyExists,
            io::ErrorKind::PermissionDenied => FsErrorKind::PermissionDenied,
            io::ErrorKind::NotADirectory => FsErrorKind::NotADirectory,
            io::ErrorKind::IsADirectory => FsErrorKind::IsADirectory,
            io::ErrorKind::DirectoryNotEmpty => FsErrorKind::DirectoryNotEmpty,
            io::ErrorKind::CrossesDevices => FsErrorKind::CrossesDevices,
            io::ErrorKind::ReadOnlyFilesystem => FsErrorKind::ReadOnlyFilesystem,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidFilename => {
                FsErrorKind::InvalidInput
            }
            io::ErrorKind::Unsupported => FsErrorKind::Unsupported,
            io::ErrorKind::Interrupted => FsErrorKind::Interrupted,
            _ => FsErrorKind::Io,
        }
    }
}

impl From<FsErrorKind> for io::ErrorKind {
    fn from(kind: FsErrorKind) -> Self {
        match kind {
            FsErrorKind::NotFound => io::ErrorKind::NotFound,
            FsErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            FsErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
            FsErrorKind::NotADirectory => io::ErrorKind::NotADirectory,
            FsErrorKind::IsADirectory => io::ErrorKind::IsADirectory,
            FsErrorKind::DirectoryNotEmpty => io::ErrorKind::DirectoryNotEmpty,
            FsErrorKind::CrossesDevices => io::ErrorKind::CrossesDevices,
            FsErrorKind::ReadOnlyFilesystem => io::ErrorKind::ReadOnlyFilesystem,
            FsErrorKind::InvalidInput => io::ErrorKind::InvalidInput,
            FsErrorKind::Unsupported => io::ErrorKind::Unsupported,
            FsErrorKind::Interrupted => io::ErrorKind::Interrupted,
            FsErrorKind::Io => io::ErrorKind::Other,
        }
    }
}

/// Error returned by every operation in this crate.
///
/// Carries a [`FsErrorKind`], a human readable context naming the failed
/// step (usually the operation and the path it was applied to) and,
/// when there is one, the underlying error as its `source`.
#[derive(Error, Debug)]
#[error("{context}: {kind}")]
pub struct FsError {
    kind: FsErrorKind,
    context: Cow<'static, str>,
    #[source]
    source: Option<BoxError>,
}

impl FsError {
    pub fn new(kind: FsErrorKind, context: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            context: context.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: FsErrorKind,
        context: impl Into<Cow<'static, str>>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            context: context.into(),
            source: Some(source.into()),
        }
    }

    /// Wraps `self` under a new context, keeping its kind.
    pub fn wrap(self, context: impl Into<Cow<'static, str>>) -> Self {
        let kind = self.kind;
        Self::with_source(kind, context, self)
    }

    pub(crate) fn from_io(op: &'static str, path: &Path, err: io::Error) -> Self {
        let kind = FsErrorKind::from(err.kind());
        Self::with_source(kind, format!("{op} {}", path.display()), err)
    }

    pub(crate) fn from_io_pair(op: &'static str, from: &Path, to: &Path, err: io::Error) -> Self {
        let kind = FsErrorKind::from(err.kind());
        Self::with_source(
            kind,
            format!("{op} {} {}", from.display(), to.display()),
            err,
        )
    }

    pub fn kind(&self) -> FsErrorKind {
        self.kind
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// The OS error at the bottom of the chain, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        let mut current: Option<&(dyn StdError + 'static)> = self.source();
        while let Some(err) = current {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                return Some(io_err);
            }
            current = err.source();
        }
        None
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_error().and_then(io::Error::raw_os_error)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FsErrorKind::NotFound
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        io::Error::new(err.kind.into(), err)
    }
}

/// Reports whether `err`, or anything in its source chain, is a
/// permission failure.
///
/// Accepts both [`FsError`] and plain [`io::Error`] values.
pub fn is_access_denied(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(fs_err) = err.downcast_ref::<FsError>() {
            if fs_err.kind == FsErrorKind::PermissionDenied {
                return true;
            }
        } else if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::PermissionDenied {
                return true;
            }
        }
        current = err.source();
    }
    false
}
