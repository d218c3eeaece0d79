// src/data_formats/npy.rs
//
// `.npy` header introspection, row decoding, and a small writer.
//
// Layout:
//   0..6    magic  \x93NUMPY
//   6, 7    version major / minor
//   8..8+L  header length, L = 2 (v1) or 4 (v2), little-endian
//   ...     header dict text, newline terminated
//   ...     packed array data

use bytes::Bytes;
use ndarray::{ArrayBase, Data, Dimension};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;

use super::dtype::{Dtype, NpyElement};
use super::literal::{parse_literal, Literal};
use crate::constants::{
    HEADER_KEY_DESCR, HEADER_KEY_FORTRAN, HEADER_KEY_SHAPE, NPY_HEADER_ALIGNMENT, NPY_MAGIC,
    NPY_PREAMBLE_LEN, NPY_V1_LEN_FIELD, NPY_V2_LEN_FIELD,
};

/// Format-level error type.
#[derive(Error, Debug)]
pub enum NpyError {
    #[error("invalid NPY file: {0}")]
    InvalidFormat(String),

    #[error("unknown NPY file version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("unsupported dtype descriptor '{0}'")]
    UnsupportedDtype(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl NpyError {
    fn truncated(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            NpyError::InvalidFormat("file ends inside the header".into())
        } else {
            NpyError::Io(e)
        }
    }
}

/// Which format version to emit when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NpyVersion {
    /// Version 1.0 unless the header needs more than 65535 bytes.
    #[default]
    Auto,
    V1,
    V2,
}

/// Parsed header of a `.npy` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    /// Offset of the first data byte from the start of the file.
    pub byte_offset: usize,
    pub descr: String,
    pub shape: Vec<usize>,
    pub fortran_order: bool,
    pub version: (u8, u8),
}

impl NpyHeader {
    /// Parse a header from the first bytes of a file.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, NpyError> {
        Self::read_from(&mut io::Cursor::new(buf))
    }

    /// Parse a header from a reader positioned at the start of the file.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, NpyError> {
        let (version, raw, byte_offset) = read_raw_header(reader)?;
        let text = std::str::from_utf8(&raw)
            .map_err(|_| NpyError::InvalidFormat("header is not valid UTF-8".into()))?;
        let dict = parse_literal(text)?;
        if !matches!(dict, Literal::Dict(_)) {
            return Err(NpyError::InvalidFormat("header is not a dict".into()));
        }

        let descr = match dict.get(HEADER_KEY_DESCR) {
            Some(Literal::Str(s)) => s.clone(),
            Some(other) => return Err(NpyError::UnsupportedDtype(format!("{other:?}"))),
            None => return Err(missing_key(HEADER_KEY_DESCR)),
        };
        let fortran_order = match dict.get(HEADER_KEY_FORTRAN) {
            Some(Literal::Bool(b)) => *b,
            Some(_) => return Err(NpyError::InvalidFormat("'fortran_order' is not a bool".into())),
            None => return Err(missing_key(HEADER_KEY_FORTRAN)),
        };
        let shape = match dict.get(HEADER_KEY_SHAPE) {
            Some(Literal::Tuple(items)) => items
                .iter()
                .map(|item| match item {
                    Literal::Int(v) if *v >= 0 => Ok(*v as usize),
                    _ => Err(NpyError::InvalidFormat(
                        "'shape' must hold non-negative ints".into(),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(NpyError::InvalidFormat("'shape' is not a tuple".into())),
            None => return Err(missing_key(HEADER_KEY_SHAPE)),
        };

        Ok(Self {
            byte_offset,
            descr,
            shape,
            fortran_order,
            version,
        })
    }

    /// Decoded `descr`.
    pub fn dtype(&self) -> Result<Dtype, NpyError> {
        Dtype::parse(&self.descr)
    }

    /// Length of the leading axis; a 0-d array counts as one row.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Shape without the leading axis.
    pub fn trailing_shape(&self) -> &[usize] {
        self.shape.get(1..).unwrap_or(&[])
    }

    /// Number of elements in one row.
    pub fn row_len(&self) -> Result<usize, NpyError> {
        checked_product(self.trailing_shape())
    }

    /// Total elements in the array.
    pub fn num_elements(&self) -> Result<usize, NpyError> {
        checked_product(&self.shape)
    }
}

fn checked_product(dims: &[usize]) -> Result<usize, NpyError> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| NpyError::InvalidFormat(format!("shape {dims:?} overflows usize")))
}

fn missing_key(key: &str) -> NpyError {
    NpyError::InvalidFormat(format!("header is missing '{key}'"))
}

/// Read magic, version and the raw header text. Returns the text bytes and
/// the data offset.
fn read_raw_header<R: Read>(reader: &mut R) -> Result<((u8, u8), Vec<u8>, usize), NpyError> {
    let mut preamble = [0u8; NPY_PREAMBLE_LEN];
    reader.read_exact(&mut preamble).map_err(NpyError::truncated)?;
    if &preamble[..6] != NPY_MAGIC {
        return Err(NpyError::InvalidFormat("bad magic string".into()));
    }
    let (major, minor) = (preamble[6], preamble[7]);
    let len_field = match major {
        1 => NPY_V1_LEN_FIELD,
        2 => NPY_V2_LEN_FIELD,
        _ => return Err(NpyError::UnsupportedVersion { major, minor }),
    };

    let mut len_bytes = [0u8; NPY_V2_LEN_FIELD];
    reader
        .read_exact(&mut len_bytes[..len_field])
        .map_err(NpyError::truncated)?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let mut raw = vec![0u8; header_len];
    reader.read_exact(&mut raw).map_err(NpyError::truncated)?;
    if raw.last() != Some(&b'\n') {
        return Err(NpyError::InvalidFormat("header is not newline terminated".into()));
    }
    Ok(((major, minor), raw, NPY_PREAMBLE_LEN + len_field + header_len))
}

/// Read the full header of a `.npy` file. The file is closed before returning.
pub fn read_header(path: impl AsRef<Path>) -> Result<NpyHeader, NpyError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let header = NpyHeader::read_from(&mut reader)?;
    tracing::trace!(
        "{}: v{}.{} descr={} shape={:?} offset={}",
        path.display(),
        header.version.0,
        header.version.1,
        header.descr,
        header.shape,
        header.byte_offset
    );
    Ok(header)
}

/// Shape of the array stored in a `.npy` file, without loading its data.
pub fn read_shape(path: impl AsRef<Path>) -> Result<Vec<usize>, NpyError> {
    read_header(path).map(|h| h.shape)
}

/// Offset of the first data byte. Validates the preamble and terminator
/// but does not parse the dictionary.
pub fn read_data_offset(path: impl AsRef<Path>) -> Result<usize, NpyError> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    read_raw_header(&mut reader).map(|(_, _, offset)| offset)
}

// ---------------------------------------------------------------------------
// Row access
// ---------------------------------------------------------------------------

/// Typed row access over the raw bytes of a whole `.npy` file
/// (loaded or memory-mapped).
pub struct NpyRows<'a> {
    data: &'a [u8],
    dtype: Dtype,
    rows: usize,
    row_len: usize,
    /// `row_len * dtype.size`
    row_bytes: usize,
    /// Fortran-order element offset of each C-order position within a row.
    fortran_index: Option<Vec<usize>>,
}

impl<'a> NpyRows<'a> {
    pub fn new(file: &'a [u8], header: &NpyHeader) -> Result<Self, NpyError> {
        let dtype = header.dtype()?;
        let rows = header.rows();
        let row_len = header.row_len()?;
        let overflow = || NpyError::InvalidFormat(format!("shape {:?} overflows usize", header.shape));
        let row_bytes = row_len.checked_mul(dtype.size).ok_or_else(overflow)?;
        let needed = header
            .num_elements()?
            .checked_mul(dtype.size)
            .ok_or_else(overflow)?;
        let data = file
            .get(header.byte_offset..)
            .filter(|d| d.len() >= needed)
            .ok_or_else(|| {
                NpyError::InvalidFormat(format!(
                    "data section shorter than {needed} bytes for shape {:?}",
                    header.shape
                ))
            })?;

        let fortran_index = (header.fortran_order && header.shape.len() > 1 && row_len > 0)
            .then(|| fortran_offsets(header.trailing_shape(), row_len));
        Ok(Self {
            data: &data[..needed],
            dtype,
            rows,
            row_len,
            row_bytes,
            fortran_index,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Append row `r` to `out` in C order, converted to `T`.
    pub fn push_row<T: NpyElement>(&self, r: usize, out: &mut Vec<T>) {
        let size = self.dtype.size;
        match &self.fortran_index {
            None => {
                let start = r * self.row_bytes;
                let bytes = &self.data[start..start + self.row_bytes];
                out.extend(
                    bytes
                        .chunks_exact(size)
                        .map(|b| T::from_scalar(self.dtype.read_scalar(b))),
                );
            }
            Some(index) => {
                out.extend(index.iter().map(|&f| {
                    let at = (r + self.rows * f) * size;
                    T::from_scalar(self.dtype.read_scalar(&self.data[at..at + size]))
                }));
            }
        }
    }
}

/// For every C-order position within a row, its column-major offset among
/// the trailing dimensions. Element (r, t) then lives at `r + rows * f(t)`.
/// `row_len` is the non-zero product of `dims`, which bounds every stride.
fn fortran_offsets(dims: &[usize], row_len: usize) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    for i in 1..dims.len() {
        strides[i] = strides[i - 1] * dims[i - 1];
    }
    let mut out = Vec::with_capacity(row_len);
    let mut idx = vec![0usize; dims.len()];
    for _ in 0..row_len {
        out.push(idx.iter().zip(&strides).map(|(i, s)| i * s).sum());
        // increment the C-order multi-index, last axis fastest
        for axis in (0..dims.len()).rev() {
            idx[axis] += 1;
            if idx[axis] < dims[axis] {
                break;
            }
            idx[axis] = 0;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

fn header_text(descr: &str, shape: &[usize]) -> String {
    let dims = match shape {
        [d] => format!("{d},"),
        _ => shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", "),
    };
    format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': ({dims}), }}")
}

/// Serialize an array as a C-order `.npy` buffer.
pub fn to_npy_bytes<T, S, D>(array: &ArrayBase<S, D>, version: NpyVersion) -> Result<Bytes, NpyError>
where
    T: NpyElement,
    S: Data<Elem = T>,
    D: Dimension,
{
    let mut text = header_text(T::DESCR, array.shape()).into_bytes();

    let len_field = match version {
        NpyVersion::V1 => NPY_V1_LEN_FIELD,
        NpyVersion::V2 => NPY_V2_LEN_FIELD,
        NpyVersion::Auto => {
            let padded = padded_len(NPY_V1_LEN_FIELD, text.len());
            if padded - NPY_PREAMBLE_LEN - NPY_V1_LEN_FIELD <= u16::MAX as usize {
                NPY_V1_LEN_FIELD
            } else {
                NPY_V2_LEN_FIELD
            }
        }
    };

    let total = padded_len(len_field, text.len());
    let header_len = total - NPY_PREAMBLE_LEN - len_field;
    text.resize(header_len - 1, b' ');
    text.push(b'\n');

    let mut out = Vec::with_capacity(total + array.len() * std::mem::size_of::<T>());
    out.extend_from_slice(NPY_MAGIC);
    if len_field == NPY_V1_LEN_FIELD {
        let len = u16::try_from(header_len)
            .map_err(|_| NpyError::InvalidFormat("header too long for version 1.0".into()))?;
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&len.to_le_bytes());
    } else {
        let len = u32::try_from(header_len)
            .map_err(|_| NpyError::InvalidFormat("header too long for version 2.0".into()))?;
        out.extend_from_slice(&[2, 0]);
        out.extend_from_slice(&len.to_le_bytes());
    }
    out.extend_from_slice(&text);
    // Logical order iteration gives C order for any memory layout.
    for v in array.iter() {
        v.write_le(&mut out);
    }
    Ok(Bytes::from(out))
}

/// Total header size (preamble + length field + text + padding + newline).
fn padded_len(len_field: usize, text_len: usize) -> usize {
    let unpadded = NPY_PREAMBLE_LEN + len_field + text_len + 1;
    unpadded.div_ceil(NPY_HEADER_ALIGNMENT) * NPY_HEADER_ALIGNMENT
}

/// Write an array to `path` as `.npy`.
pub fn write_npy<T, S, D>(
    path: impl AsRef<Path>,
    array: &ArrayBase<S, D>,
    version: NpyVersion,
) -> Result<(), NpyError>
where
    T: NpyElement,
    S: Data<Elem = T>,
    D: Dimension,
{
    let bytes = to_npy_bytes(array, version)?;
    std::fs::write(path, &bytes)?;
    Ok(())
}
