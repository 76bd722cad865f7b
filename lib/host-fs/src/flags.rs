use std::fs;

use bitflags::bitflags;

bitflags! {
    /// Flags accepted by [`open_file`](crate::open_file) and
    /// [`FileSystem::open_file`](crate::FileSystem::open_file).
    ///
    /// A set with neither `READ` nor `WRITE` opens read-only.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const APPEND = 1 << 2;
        const CREATE = 1 << 3;
        /// Together with `CREATE`, fail if the path exists.
        const EXCL = 1 << 4;
        const TRUNC = 1 << 5;
        const SYNC = 1 << 6;
        /// Fail instead of following a symlink in the last component.
        const NOFOLLOW = 1 << 7;
        const DIRECTORY = 1 << 8;
        /// Do not update the access time. Linux only, ignored elsewhere.
        const NOATIME = 1 << 9;
    }
}

impl OpenFlags {
    /// Every flag that implies modifying the target.
    pub const WRITE_INTENT: Self = Self::WRITE
        .union(Self::APPEND)
        .union(Self::CREATE)
        .union(Self::EXCL)
        .union(Self::TRUNC);

    /// Same flags with any write intent removed and `READ` set.
    pub fn read_only(self) -> Self {
        self.difference(Self::WRITE_INTENT) | Self::READ
    }

    pub(crate) fn to_open_options(self, mode: u32) -> fs::OpenOptions {
        let mut oo = fs::OpenOptions::new();

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            // std refuses create and truncate without write access, so only
            // the access mode goes through it; everything else is raw O_* bits
            let write = self.contains(Self::WRITE);
            oo.read(self.contains(Self::READ) || !write)
                .write(write)
                .mode(mode)
                .custom_flags(self.unix_custom_flags());
        }

        #[cfg(not(unix))]
        {
            let write = self.contains(Self::WRITE);
            // truncate is applied first, so append would be a no-op
            let append = self.contains(Self::APPEND) && !self.contains(Self::TRUNC);
            let read = self.contains(Self::READ) || !(write || append);
            // std insists on write access for these
            let write = write || self.intersects(Self::CREATE | Self::TRUNC);

            oo.read(read)
                .write(write)
                .append(append)
                .truncate(self.contains(Self::TRUNC));
            if self.contains(Self::CREATE) {
                if self.contains(Self::EXCL) {
                    oo.create_new(true);
                } else {
                    oo.create(true);
                }
            }
            let _ = mode;
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::OpenOptionsExt;
            // required to obtain a handle to a directory
            const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;
            oo.custom_flags(FILE_FLAG_BACKUP_SEMANTICS);
        }

        oo
    }

    #[cfg(unix)]
    fn unix_custom_flags(self) -> i32 {
        let mut oflags = 0;
        if self.contains(Self::CREATE) {
            oflags |= libc::O_CREAT;
            if self.contains(Self::EXCL) {
                oflags |= libc::O_EXCL;
            }
        }
        if self.contains(Self::TRUNC) {
            oflags |= libc::O_TRUNC;
        }
        if self.contains(Self::APPEND) {
            oflags |= libc::O_APPEND;
        }
        if self.contains(Self::NOFOLLOW) {
            oflags |= libc::O_NOFOLLOW;
        }
        if self.contains(Self::DIRECTORY) {
            oflags |= libc::O_DIRECTORY;
        }
        if self.contains(Self::SYNC) {
            oflags |= libc::O_SYNC;
        }
        #[cfg(any(target_os = "linux", target_os = "android"))]
        if self.contains(Self::NOATIME) {
            oflags |= libc::O_NOATIME;
        }
        oflags
    }
}
