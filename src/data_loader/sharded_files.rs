// src/data_loader/sharded_files.rs
//
// Random sample across `.npy` files that share a trailing shape.
//
// Shard sizes come from the headers alone. When every row is requested the
// files are loaded front to back (no randomness); otherwise each shard is
// memory-mapped in turn, its assigned rows gathered, and the mapping
// dropped before the next shard is opened.

use memmap2::Mmap;
use ndarray::ArrayD;
use rand::Rng;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::dataset::{SampleError, ShardLayout};
use super::options::SampleOptions;
use super::sampler::{allocate, draw_rows, seeded_rng, shuffle_rows};
use crate::constants::NPY_EXTENSION_TAG;
use crate::data_formats::{read_header, NpyElement, NpyHeader, NpyRows};
use crate::progress::{StatusReporter, TracingReporter};

/// Read-only mapping of one shard file.
struct MappedShard {
    _file: File,
    mmap: Mmap,
}

impl MappedShard {
    fn open(path: &Path) -> Result<Self, SampleError> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and lives no longer than `_file`.
        // A concurrent external writer can change what we read but cannot
        // make the access itself unsound.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    fn as_slice(&self) -> &[u8] {
        &self.mmap
    }
}

/// Whether `path` ends with the `.npy` tag (last three bytes, case-sensitive).
pub fn has_npy_extension(path: &Path) -> bool {
    path.as_os_str().as_encoded_bytes().ends_with(NPY_EXTENSION_TAG)
}

/// Draw a random sample of rows from `.npy` files.
///
/// Uses `opts.seed` for reproducibility and reports progress through
/// `tracing`. See [`sample_files_with`] for the full contract.
pub fn sample_files<T, P>(files: &[P], opts: &SampleOptions) -> Result<ArrayD<T>, SampleError>
where
    T: NpyElement,
    P: AsRef<Path>,
{
    let mut rng = seeded_rng(opts.seed);
    sample_files_with(files, opts, &mut rng, &mut TracingReporter)
}

/// Draw a random sample of rows from `.npy` files with an injected RNG and
/// status reporter.
///
/// Returns an array of shape `(n_samples, *dims)` with elements converted
/// to `T`. Sizing follows `opts`:
///
/// * nothing set: every row;
/// * byte budget `b`: `b / size_of::<T>() / row_len` rows, clamped to the
///   total;
/// * percentage `p`: `floor(total * p / 100)` rows;
/// * count `n`: `n` rows.
///
/// When the resolved size equals the total, the files are concatenated in
/// order. Otherwise rows are split across shards by uniform shard draws,
/// gathered shard by shard, and the whole buffer is shuffled by row.
pub fn sample_files_with<T, P, R, S>(
    files: &[P],
    opts: &SampleOptions,
    rng: &mut R,
    status: &mut S,
) -> Result<ArrayD<T>, SampleError>
where
    T: NpyElement,
    P: AsRef<Path>,
    R: Rng + ?Sized,
    S: StatusReporter + ?Sized,
{
    let request = opts.request()?;
    if files.is_empty() {
        return Err(SampleError::EmptyInput);
    }
    if let Some(bad) = files.iter().map(|p| p.as_ref()).find(|p| !has_npy_extension(p)) {
        return Err(SampleError::UnsupportedFormat(bad.display().to_string()));
    }

    let paths: Vec<PathBuf> = files.iter().map(|p| p.as_ref().to_path_buf()).collect();
    let headers = paths
        .iter()
        .map(read_header)
        .collect::<Result<Vec<NpyHeader>, _>>()?;
    let layout = ShardLayout::from_shapes(headers.iter().map(|h| h.shape.as_slice()))?;
    let total = layout.total();
    let row_len = layout.row_len();

    let n_samples = request.resolve(total, layout.row_bytes(std::mem::size_of::<T>())?)?;
    if n_samples > total {
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
    tracing::info!(
        "sampling {} of {} rows from {} shard(s), row shape {:?}",
        n_samples,
        total,
        paths.len(),
        layout.trailing
    );

    let mut data: Vec<T> = Vec::with_capacity(out_len);
    if n_samples == total {
        load_all(&paths, &headers, opts, status, &mut data)?;
    } else {
        let counts = allocate(rng, n_samples, &layout.rows, opts.replacement)?;
        for (i, (path, header)) in paths.iter().zip(&headers).enumerate() {
            opts.check_cancelled()?;
            let count = counts[i];
            status.report(&format!("Draw {} samples from {}/{}", count, i + 1, counts.len()));
            if count == 0 {
                continue;
            }
            let shard = MappedShard::open(path)?;
            let rows = NpyRows::new(shard.as_slice(), header)?;
            for r in draw_rows(rng, rows.rows(), count, opts.replacement) {
                rows.push_row(r, &mut data);
            }
        }
        status.report("Shuffle");
        shuffle_rows(rng, &mut data, row_len);
    }
    status.finish();

    ArrayD::from_shape_vec(layout.output_shape(n_samples), data)
        .map_err(|e| SampleError::InvalidRequest(format!("output shape: {e}")))
}

/// Fast path: every file read whole, rows appended in shard order.
fn load_all<T, S>(
    paths: &[PathBuf],
    headers: &[NpyHeader],
    opts: &SampleOptions,
    status: &mut S,
    data: &mut Vec<T>,
) -> Result<(), SampleError>
where
    T: NpyElement,
    S: StatusReporter + ?Sized,
{
    for (i, (path, header)) in paths.iter().zip(headers).enumerate() {
        opts.check_cancelled()?;
        status.report(&format!("Load data {}/{}", i + 1, paths.len()));
        let bytes = std::fs::read(path)?;
        // The file may have been replaced since its header was probed.
        if NpyHeader::from_bytes(&bytes)? != *header {
            return Err(SampleError::InvalidRequest(format!(
                "{} changed while sampling",
                path.display()
            )));
        }
        let rows = NpyRows::new(&bytes, header)?;
        for r in 0..rows.rows() {
            rows.push_row(r, data);
        }
    }
    Ok(())
}
