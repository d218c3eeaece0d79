//! src/data_loader/sampler.rs
//! Random draws shared by the in-memory and file samplers.
//!
//!  * `allocate`     – split `n` rows across shards by uniform shard draws.
//!  * `draw_rows`    – pick row indices inside one shard.
//!  * `shuffle_rows` – permute the rows of a flat row-major buffer.
//!  * `seeded_rng`   – the default reproducible generator.
//!
//! Shard selection is uniform over shard *identity*, not proportional to
//! shard size, so small shards are over-represented relative to their
//! population.

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::dataset::SampleError;

/// Seed a `ChaCha20Rng` from `seed`, or from the thread RNG when unset.
pub fn seeded_rng(seed: Option<u64>) -> ChaCha20Rng {
    match seed {
        Some(s) => ChaCha20Rng::seed_from_u64(s),
        None => ChaCha20Rng::from_rng(&mut rand::rng()),
    }
}

/// How many rows shard `rows` can contribute.
fn capacity(rows: usize, replacement: bool) -> usize {
    match (rows, replacement) {
        (0, _) => 0,
        (_, true) => usize::MAX,
        (n, false) => n,
    }
}

/// Per-shard row counts for a sample of `n` rows.
///
/// Each of the `n` rows picks a shard uniformly at random. A shard can give
/// at most its own row count without replacement and nothing when empty;
/// rows over that limit are re-drawn one at a time, uniformly over the
/// shards that still have room.
pub fn allocate<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    shard_rows: &[usize],
    replacement: bool,
) -> Result<Vec<usize>, SampleError> {
    if shard_rows.is_empty() {
        return Err(SampleError::EmptyInput);
    }
    let m = shard_rows.len();
    let mut counts = vec![0usize; m];
    for _ in 0..n {
        counts[rng.random_range(0..m)] += 1;
    }

    let caps: Vec<usize> = shard_rows.iter().map(|&r| capacity(r, replacement)).collect();
    let mut excess = 0usize;
    for (count, &cap) in counts.iter_mut().zip(&caps) {
        if *count > cap {
            excess += *count - cap;
            *count = cap;
        }
    }
    if excess == 0 {
        return Ok(counts);
    }

    tracing::debug!("re-drawing {} rows that overflowed their shard", excess);
    let mut open: Vec<usize> = (0..m).filter(|&i| counts[i] < caps[i]).collect();
    while excess > 0 {
        if open.is_empty() {
            return Err(SampleError::SampleSizeExceedsAvailable {
                requested: n,
                available: shard_rows.iter().sum(),
            });
        }
        let slot = rng.random_range(0..open.len());
        let shard = open[slot];
        counts[shard] += 1;
        excess -= 1;
        if counts[shard] == caps[shard] {
            open.swap_remove(slot);
        }
    }
    Ok(counts)
}

/// `count` row indices drawn uniformly from `0..rows`.
///
/// Without replacement `count` must not exceed `rows`; `allocate`
/// guarantees this.
pub fn draw_rows<R: Rng + ?Sized>(
    rng: &mut R,
    rows: usize,
    count: usize,
    replacement: bool,
) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    if replacement {
        (0..count).map(|_| rng.random_range(0..rows)).collect()
    } else {
        index::sample(rng, rows, count).into_vec()
    }
}

/// In-place Fisher–Yates over whole rows of a row-major buffer.
pub fn shuffle_rows<T, R: Rng + ?Sized>(rng: &mut R, data: &mut [T], row_len: usize) {
    if row_len == 0 {
        return;
    }
    let n = data.len() / row_len;
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        if i != j {
            for k in 0..row_len {
                data.swap(i * row_len + k, j * row_len + k);
            }
        }
    }
}
