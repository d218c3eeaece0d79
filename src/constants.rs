// src/constants.rs
//
// Centralized constants for npyshard to avoid hardcoded values throughout the codebase

/// Magic string at offset 0 of every `.npy` file
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Magic (6) + version (2)
pub const NPY_PREAMBLE_LEN: usize = 8;

/// Header-length field width for format version 1.x (little-endian u16)
pub const NPY_V1_LEN_FIELD: usize = 2;

/// Header-length field width for format version 2.x (little-endian u32)
pub const NPY_V2_LEN_FIELD: usize = 4;

/// Data section starts on a multiple of this many bytes (numpy >= 1.14)
pub const NPY_HEADER_ALIGNMENT: usize = 64;

/// File extension tag accepted by the sharded file sampler.
///
/// Compared against the last three bytes of the path, case-sensitive.
pub const NPY_EXTENSION_TAG: &[u8; 3] = b"npy";

/// Keys every header dictionary must carry
pub const HEADER_KEY_DESCR: &str = "descr";
pub const HEADER_KEY_FORTRAN: &str = "fortran_order";
pub const HEADER_KEY_SHAPE: &str = "shape";

/// Default RUST_LOG filter per `-v` count in the CLI
pub const CLI_LOG_LEVELS: [&str; 3] = ["warn", "info", "debug"];
