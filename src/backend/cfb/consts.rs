//! Compound File Binary format constants.

/// Magic bytes that should be at the beginning of every compound file
pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Minimal size of an empty compound file with 512-byte sectors = 1536 bytes
pub const MINIMAL_FILE_SIZE: usize = 1536;

/// Size of a directory entry in bytes
pub const DIRENTRY_SIZE: usize = 128;

/// Sector size for major version 3
pub const SECTOR_SIZE_V3: usize = 512;

/// Sector size for major version 4
pub const SECTOR_SIZE_V4: usize = 4096;

/// Mini sector size
pub const MINI_SECTOR_SIZE: usize = 64;

/// Streams below this size live in the mini stream
pub const MINI_STREAM_CUTOFF: u32 = 4096;

/// FAT sector ids stored directly in the header
pub const HEADER_DIFAT_SLOTS: usize = 109;

/// Longest entry name, in UTF-16 code units, excluding the terminator
pub const MAX_NAME_UNITS: usize = 31;

// Sector IDs (from AAF specifications)
/// Maximum regular sector ID
pub const MAXREGSECT: u32 = 0xFFFFFFFA; // -6
/// Denotes a DIFAT sector in a FAT
pub const DIFSECT: u32 = 0xFFFFFFFC; // -4
/// Denotes a FAT sector in a FAT
pub const FATSECT: u32 = 0xFFFFFFFD; // -3
/// End of a virtual stream chain
pub const ENDOFCHAIN: u32 = 0xFFFFFFFE; // -2
/// Unallocated sector
pub const FREESECT: u32 = 0xFFFFFFFF; // -1

/// Unallocated directory entry
pub const NOSTREAM: u32 = 0xFFFFFFFF; // -1

// Object types in storage (from AAF specifications)
/// Empty directory entry
pub const STGTY_EMPTY: u8 = 0;
/// Element is a storage object
pub const STGTY_STORAGE: u8 = 1;
/// Element is a stream object
pub const STGTY_STREAM: u8 = 2;
/// Element is a root storage
pub const STGTY_ROOT: u8 = 5;
