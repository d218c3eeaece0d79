// src/lib.rs
//
// Crate root: public re-exports.
//
// npyshard draws batches and random samples from numeric datasets stored as
// in-memory `ndarray` arrays or `.npy` shard files, and reads `.npy`
// metadata without loading array contents.

pub mod constants;
pub mod data_formats;
pub mod data_loader;
pub mod progress;

// ===== Re-exports at the crate root =====
pub use data_formats::{
    read_data_offset, read_header, read_shape, to_npy_bytes, write_npy, NpyElement, NpyError,
    NpyHeader, NpyVersion,
};
pub use data_loader::{
    sample_arrays, sample_arrays_with, sample_files, sample_files_with, CyclicBatcher,
    SampleError, SampleOptions, SampleRequest,
};
pub use progress::{NullReporter, ProgressReporter, StatusReporter, TracingReporter};
