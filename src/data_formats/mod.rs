// src/data_formats/mod.rs
//
// The `.npy` array-serialization format: header, dtypes, rows, writer.

pub mod dtype;
pub mod literal;
pub mod npy;

pub use dtype::{ByteOrder, Dtype, Kind, NpyElement, Scalar};
pub use npy::{
    read_data_offset, read_header, read_shape, to_npy_bytes, write_npy, NpyError, NpyHeader,
    NpyRows, NpyVersion,
};
