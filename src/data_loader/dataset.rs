//! Shard abstractions and the sampling error type.
//!
//! A *shard* is one bounded source of rows: an in-memory array or a `.npy`
//! file. A set of shards forms one logical dataset when every shard has the
//! same trailing shape (all dimensions but the leading row axis).

use thiserror::Error;

use crate::data_formats::NpyError;

/// Error type for batching and sampling operations.
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("shard {index} has trailing shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("only one of percentage, count or byte budget may be given")]
    ConflictingSampleSpec,

    #[error("{requested} samples requested but only {available} available")]
    SampleSizeExceedsAvailable { requested: usize, available: usize },

    #[error("byte budget of {budget} bytes selects no samples")]
    EmptyByteBudget { budget: usize },

    #[error("only .npy files are supported: {0}")]
    UnsupportedFormat(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("axis {axis} is out of bounds for an array of dimension {ndim}")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("no data to draw from")]
    EmptyInput,

    #[error("sampling cancelled")]
    Cancelled,

    #[error(transparent)]
    Npy(#[from] NpyError),
}

impl From<std::io::Error> for SampleError {
    fn from(e: std::io::Error) -> Self {
        SampleError::Npy(NpyError::Io(e))
    }
}

/// Row counts and common trailing shape of a validated shard set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardLayout {
    pub rows: Vec<usize>,
    pub trailing: Vec<usize>,
    total: usize,
    row_len: usize,
}

impl ShardLayout {
    /// Validate that every shape has at least one axis, that all trailing
    /// shapes agree, and that the row total and row length fit in `usize`.
    pub fn from_shapes<'a, I>(shapes: I) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = &'a [usize]>,
    {
        let mut rows = Vec::new();
        let mut trailing: Option<Vec<usize>> = None;
        for (index, shape) in shapes.into_iter().enumerate() {
            let Some((&n, dims)) = shape.split_first() else {
                return Err(SampleError::ShapeMismatch {
                    index,
                    expected: trailing.unwrap_or_default(),
                    found: vec![],
                });
            };
            match &trailing {
                None => trailing = Some(dims.to_vec()),
                Some(expected) if expected.as_slice() != dims => {
                    return Err(SampleError::ShapeMismatch {
                        index,
                        expected: expected.clone(),
                        found: dims.to_vec(),
                    });
                }
                Some(_) => {}
            }
            rows.push(n);
        }
        let trailing = trailing.ok_or(SampleError::EmptyInput)?;
        let total = rows
            .iter()
            .try_fold(0usize, |acc, &n| acc.checked_add(n))
            .ok_or_else(|| SampleError::InvalidRequest("total row count overflows usize".into()))?;
        let row_len = trailing
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                SampleError::InvalidRequest(format!("row shape {trailing:?} overflows usize"))
            })?;
        Ok(Self {
            rows,
            trailing,
            total,
            row_len,
        })
    }

    /// Sum of rows across shards.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Elements per row.
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Element count of an `n`-row output whose elements are `elem_size`
    /// bytes. Fails when the buffer could not be allocated.
    pub fn output_len(&self, n: usize, elem_size: usize) -> Result<usize, SampleError> {
        n.checked_mul(self.row_len)
            .filter(|&len| len.checked_mul(elem_size).is_some_and(|b| b <= isize::MAX as usize))
            .ok_or_else(|| {
                SampleError::InvalidRequest(format!(
                    "{n} rows of shape {:?} do not fit in memory",
                    self.trailing
                ))
            })
    }

    /// Bytes per row for elements of `elem_size` bytes.
    pub fn row_bytes(&self, elem_size: usize) -> Result<usize, SampleError> {
        self.row_len.checked_mul(elem_size).ok_or_else(|| {
            SampleError::InvalidRequest(format!("row shape {:?} overflows usize", self.trailing))
        })
    }

    /// Output shape for `n` rows.
    pub fn output_shape(&self, n: usize) -> Vec<usize> {
        let mut shape = Vec::with_capacity(self.trailing.len() + 1);
        shape.push(n);
        shape.extend_from_slice(&self.trailing);
        shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_trailing_shape_is_accepted() {
        let shapes: [&[usize]; 3] = [&[4, 2, 3], &[1, 2, 3], &[0, 2, 3]];
        let layout = ShardLayout::from_shapes(shapes).unwrap();
        assert_eq!(layout.rows, vec![4, 1, 0]);
        assert_eq!(layout.total(), 5);
        assert_eq!(layout.row_len(), 6);
        assert_eq!(layout.output_shape(9), vec![9, 2, 3]);
    }

    #[test]
    fn mismatched_trailing_shape_is_rejected() {
        let shapes: [&[usize]; 2] = [&[4, 2], &[4, 3]];
        match ShardLayout::from_shapes(shapes) {
            Err(SampleError::ShapeMismatch { index, expected, found }) => {
                assert_eq!(index, 1);
                assert_eq!(expected, vec![2]);
                assert_eq!(found, vec![3]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_and_scalar_shards() {
        let none: [&[usize]; 0] = [];
        assert!(matches!(
            ShardLayout::from_shapes(none),
            Err(SampleError::EmptyInput)
        ));
        let scalar: [&[usize]; 1] = [&[]];
        assert!(matches!(
            ShardLayout::from_shapes(scalar),
            Err(SampleError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn oversized_shapes_are_rejected() {
        let huge = usize::MAX / 2 + 1;
        let rows: [&[usize]; 2] = [&[huge, 1], &[huge, 1]];
        assert!(matches!(
            ShardLayout::from_shapes(rows),
            Err(SampleError::InvalidRequest(_))
        ));
        let wide: [&[usize]; 1] = [&[1, huge, 4]];
        assert!(matches!(
            ShardLayout::from_shapes(wide),
            Err(SampleError::InvalidRequest(_))
        ));
    }

    #[test]
    fn output_len_guards_the_buffer_size() {
        let shapes: [&[usize]; 1] = [&[1 << 61, 8]];
        let layout = ShardLayout::from_shapes(shapes).unwrap();
        assert_eq!(layout.output_len(3, 8).unwrap(), 24);
        assert!(matches!(
            layout.output_len(layout.total(), 8),
            Err(SampleError::InvalidRequest(_))
        ));
        assert!(layout.output_len(1 << 59, 8).is_err());
        assert_eq!(layout.row_bytes(8).unwrap(), 64);
        assert!(layout.row_bytes(usize::MAX).is_err());
    }

    #[test]
    fn one_dimensional_shards_have_scalar_rows() {
        let shapes: [&[usize]; 2] = [&[3], &[5]];
        let layout = ShardLayout::from_shapes(shapes).unwrap();
        assert_eq!(layout.row_len(), 1);
        assert_eq!(layout.output_shape(2), vec![2]);
    }
}
