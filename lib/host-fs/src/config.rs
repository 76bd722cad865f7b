/// Mode applied by [`reset_permissions`](crate::reset_permissions): owner
/// read/write only.
pub const DEFAULT_FILE_MODE: u32 = 0o600;

/// Owner-only mode for directories created by callers of this crate.
pub const DEFAULT_DIR_MODE: u32 = 0o700;

/// Listing limit meaning "every remaining entry".
pub const READ_DIR_ALL: Option<usize> = None;

#[derive(Clone, Debug)]
pub struct MemFsConfig {
    /// If true, listings are returned sorted by name.
    pub deterministic_readdir: bool,
    /// Optional cap on the number of entries a single directory may hold.
    pub max_entries: Option<usize>,
}

impl Default for MemFsConfig {
    fn default() -> Self {
        Self {
            deterministic_readdir: true,
            max_entries: None,
        }
    }
}
