// src/data_loader/mod.rs

//! Batching and random sampling over sharded array data.

/// shard layout validation and the error type
pub mod dataset;

/// sizing / replacement / seed knobs
pub mod options;

/// shard allocation, row draws and row shuffles
pub mod sampler;

pub mod batcher;
pub mod in_memory;
pub mod sharded_files;

// Re‐export the key types at this level:
pub use batcher::CyclicBatcher;
pub use dataset::{SampleError, ShardLayout};
pub use in_memory::{sample_arrays, sample_arrays_with};
pub use options::{SampleOptions, SampleRequest};
pub use sharded_files::{has_npy_extension, sample_files, sample_files_with};
