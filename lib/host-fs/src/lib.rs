//! A thin facade over the host filesystem.
//!
//! Each operation normalizes its path with [`fixpath`] before handing it to
//! the OS, and reports failures as [`FsError`] values that keep the OS error
//! as their cause. [`read_dir_names`] is written against the [`FileSystem`]
//! trait so that it works with [`HostFs`] as well as with [`MemFs`].

pub mod config;
mod error;
mod fixpath;
mod flags;
mod fs;
mod host;
mod mem_fs;
mod platform;

pub use config::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, MemFsConfig};
pub use error::{FsError, FsErrorKind, Result, is_access_denied};
pub use fixpath::{EXTENDED_PATH_PREFIX, UNC_PATH_PREFIX, fix_windows_path, fixpath};
pub use flags::OpenFlags;
pub use fs::{DirectoryFile, FileSystem, read_dir_names};
pub use host::{
    HostFs, link, lstat, mkdir, mkdir_all, open, open_file, readlink, remove, remove_all, rename,
    reset_permissions, symlink,
};
pub use mem_fs::{MemFile, MemFs};
pub use platform::HostFile;
