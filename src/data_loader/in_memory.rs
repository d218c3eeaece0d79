// src/data_loader/in_memory.rs
//
// Random sample across in-memory arrays sharing a trailing shape.

use ndarray::{ArrayBase, ArrayD, Axis, Data, Dimension, RemoveAxis};
use rand::Rng;

use super::dataset::{SampleError, ShardLayout};
use super::options::SampleOptions;
use super::sampler::{allocate, draw_rows, seeded_rng};
use crate::progress::{StatusReporter, TracingReporter};

/// Draw a random sample of rows from `shards`.
///
/// Uses `opts.seed` for reproducibility and reports progress through
/// `tracing`. See [`sample_arrays_with`] for the full contract.
pub fn sample_arrays<T, S, D>(
    shards: &[ArrayBase<S, D>],
    opts: &SampleOptions,
) -> Result<ArrayD<T>, SampleError>
where
    T: Clone,
    S: Data<Elem = T>,
    D: Dimension + RemoveAxis,
{
    let mut rng = seeded_rng(opts.seed);
    sample_arrays_with(shards, opts, &mut rng, &mut TracingReporter)
}

/// Draw a random sample of rows from `shards` with an injected RNG and
/// status reporter.
///
/// Returns an array of shape `(n_samples, *dims)`. Each row picks its shard
/// uniformly over shard identity (not shard size); rows of one shard are
/// then drawn uniformly and written contiguously, shards in order. The
/// result is not shuffled.
///
/// With replacement, a request larger than the total row count is
/// allowed as long as at least one shard is non-empty.
pub fn sample_arrays_with<T, S, D, R, P>(
    shards: &[ArrayBase<S, D>],
    opts: &SampleOptions,
    rng: &mut R,
    status: &mut P,
) -> Result<ArrayD<T>, SampleError>
where
    T: Clone,
    S: Data<Elem = T>,
    D: Dimension + RemoveAxis,
    R: Rng + ?Sized,
    P: StatusReporter + ?Sized,
{
    let request = opts.request()?;
    let layout = ShardLayout::from_shapes(shards.iter().map(|a| a.shape()))?;
    let total = layout.total();

    let n_samples = request.resolve(total, layout.row_bytes(std::mem::size_of::<T>())?)?;
    if n_samples > total && !opts.replacement {
        return Err(SampleError::SampleSizeExceedsAvailable {
            requested: n_samples,
            available: total,
        });
    }
    let out_len = layout.output_len(n_samples, std::mem::size_of::<T>())?;
    if n_samples == total {
        status.report("Use all Samples");
    }
    status.report(&format!("Draw {} Samples", n_samples));

    let counts = allocate(rng, n_samples, &layout.rows, opts.replacement)?;
    let mut data: Vec<T> = Vec::with_capacity(out_len);
    for (i, (shard, &count)) in shards.iter().zip(&counts).enumerate() {
        opts.check_cancelled()?;
        status.report(&format!("Draw {} samples from {}/{}", count, i + 1, counts.len()));
        for r in draw_rows(rng, layout.rows[i], count, opts.replacement) {
            data.extend(shard.index_axis(Axis(0), r).iter().cloned());
        }
    }
    status.finish();

    ArrayD::from_shape_vec(layout.output_shape(n_samples), data)
        .map_err(|e| SampleError::InvalidRequest(format!("output shape: {e}")))
}
