/// Default URL prefix prepended to article titles
pub const DEFAULT_URL_PREFIX: &str = "http://en.wikipedia.org/wiki/";

/// Default maximum size of a record file before rotation
pub const DEFAULT_MAX_FILE_SIZE: u64 = 500 * 1024;

/// Smallest accepted value for --bytes
pub const MIN_FILE_SIZE: u64 = 200 * 1024;

/// Record files per output directory (wiki00..wiki99)
pub const FILES_PER_DIR: u32 = 100;

/// Pages handed to rayon per parallel batch
pub const BATCH_SIZE: usize = 10_000;

/// Progress update interval (tick every N pages)
pub const PROGRESS_INTERVAL: u64 = 1000;
