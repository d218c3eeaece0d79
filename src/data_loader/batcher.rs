//! Endless fixed-size batches over one array, wrapping around its end.
//!
//! Batch `k` starting at cursor `p` holds rows `(p + j) mod n` for
//! `j in 0..batch_size`, and the cursor moves to `(p + batch_size) mod n`.
//! Consecutive batches therefore walk the array in strict cyclic order,
//! including when `batch_size` exceeds `n` (the batch wraps as many times
//! as needed).

use ndarray::{ArrayBase, ArrayD, Axis, Data, Dimension};

use super::dataset::SampleError;

/// Cyclic batch iterator. Never returns `None`; recreate it to restart.
#[derive(Debug, Clone)]
pub struct CyclicBatcher<T> {
    source: ArrayD<T>,
    batch_size: usize,
    position: usize,
}

impl<T: Clone> CyclicBatcher<T> {
    /// Batch along `axis` of `array`. The batch axis becomes axis 0 of
    /// every yielded batch; the other axes keep their relative order.
    pub fn new<S, D>(array: ArrayBase<S, D>, batch_size: usize, axis: usize) -> Result<Self, SampleError>
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        let ndim = array.ndim();
        if axis >= ndim {
            return Err(SampleError::InvalidAxis { axis, ndim });
        }
        if batch_size == 0 {
            return Err(SampleError::InvalidRequest("batch size must be at least 1".into()));
        }
        let mut order: Vec<usize> = (0..ndim).filter(|&a| a != axis).collect();
        order.insert(0, axis);
        let source = array.into_owned().into_dyn().permuted_axes(order);
        if source.len_of(Axis(0)) == 0 {
            return Err(SampleError::EmptyInput);
        }
        Ok(Self {
            source,
            batch_size,
            position: 0,
        })
    }

    /// Batch along axis 0.
    pub fn along_rows<S, D>(array: ArrayBase<S, D>, batch_size: usize) -> Result<Self, SampleError>
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        Self::new(array, batch_size, 0)
    }

    /// Index of the first row of the next batch.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rows along the batch axis.
    pub fn len_rows(&self) -> usize {
        self.source.len_of(Axis(0))
    }

    fn next_batch(&mut self) -> ArrayD<T> {
        let n = self.len_rows();
        let rows: Vec<usize> = (0..self.batch_size)
            .map(|j| (self.position + j) % n)
            .collect();
        self.position = (self.position + self.batch_size) % n;
        self.source.select(Axis(0), &rows)
    }
}

impl<T: Clone> Iterator for CyclicBatcher<T> {
    type Item = ArrayD<T>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array2, Array3, Ix3};

    fn column(n: i64) -> Array2<i64> {
        Array::from_iter(0..n).into_shape((n as usize, 1)).unwrap()
    }

    #[test]
    fn batches_follow_cyclic_order() {
        let data = column(20);
        let (reps, bs) = (10, 3);
        let flat: Vec<i64> = CyclicBatcher::along_rows(data, bs)
            .unwrap()
            .take(reps)
            .flat_map(|b| b.iter().copied().collect::<Vec<_>>())
            .collect();
        let expected: Vec<i64> = (0..20).cycle().take(bs * reps).collect();
        assert_eq!(flat, expected);
    }

    #[test]
    fn seventh_batch_of_three_wraps_to_row_zero() {
        let mut it = CyclicBatcher::along_rows(column(20), 3).unwrap();
        assert_eq!((it.batch_size(), it.len_rows()), (3, 20));
        let first = it.next().unwrap();
        assert_eq!(first.shape(), &[3, 1]);
        assert_eq!(first.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        let seventh = it.nth(5).unwrap();
        assert_eq!(seventh.iter().copied().collect::<Vec<_>>(), vec![18, 19, 0]);
        assert_eq!(it.position(), 1);
    }

    #[test]
    fn exact_end_resets_cursor() {
        let mut it = CyclicBatcher::along_rows(column(6), 3).unwrap();
        it.next();
        let b = it.next().unwrap();
        assert_eq!(b.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(it.position(), 0);
    }

    #[test]
    fn oversized_batches_wrap_several_times() {
        let mut it = CyclicBatcher::along_rows(column(3), 7).unwrap();
        let b = it.next().unwrap();
        assert_eq!(b.shape(), &[7, 1]);
        assert_eq!(b.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(it.position(), 1);
        let b = it.next().unwrap();
        assert_eq!(b.iter().copied().collect::<Vec<_>>(), vec![1, 2, 0, 1, 2, 0, 1]);
    }

    #[test]
    fn batches_along_another_axis() {
        // shape (2, 4, 3): batching along axis 1 yields (bs, 2, 3)
        let a = Array3::from_shape_fn((2, 4, 3), |(i, j, k)| (i * 100 + j * 10 + k) as i32);
        let mut it = CyclicBatcher::new(a, 3, 1).unwrap();
        let b = it.next().unwrap().into_dimensionality::<Ix3>().unwrap();
        assert_eq!(b.shape(), &[3, 2, 3]);
        assert_eq!(b[[2, 1, 0]], 120);
        let b = it.next().unwrap().into_dimensionality::<Ix3>().unwrap();
        // rows 3, 0, 1 along the old axis 1
        assert_eq!(b[[0, 0, 2]], 32);
        assert_eq!(b[[1, 1, 1]], 101);
    }

    #[test]
    fn invalid_arguments() {
        assert!(matches!(
            CyclicBatcher::new(column(4), 2, 2),
            Err(SampleError::InvalidAxis { axis: 2, ndim: 2 })
        ));
        assert!(matches!(
            CyclicBatcher::along_rows(column(4), 0),
            Err(SampleError::InvalidRequest(_))
        ));
        assert!(matches!(
            CyclicBatcher::along_rows(Array2::<f32>::zeros((0, 3)), 2),
            Err(SampleError::EmptyInput)
        ));
    }
}
