// tests/common/mod.rs
//
// Shared fixtures: scratch directories and small .npy shards.

#![allow(dead_code)]

use ndarray::{Array2, ArrayD};
use npyshard::{write_npy, NpyVersion};
use std::path::PathBuf;
use tempfile::TempDir;

/// Shard `index` with `rows` rows of width `cols`; row `r` holds
/// `[v, v + 1, ..]` where `v = (index * 1000 + r) * cols`, so every row in a
/// test dataset is unique and rows never get split.
pub fn shard_array(index: usize, rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(r, c)| ((index * 1000 + r) * cols + c) as f64)
}

/// Write shards of the given row counts into a fresh temp dir.
pub fn write_shards(rows: &[usize], cols: usize) -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = rows
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let path = dir.path().join(format!("shard_{i}.npy"));
            write_npy(&path, &shard_array(i, n, cols), NpyVersion::V1).expect("write shard");
            path
        })
        .collect();
    (dir, paths)
}

/// Rows of a 2-D sample as owned vectors.
pub fn rows_of(sample: &ArrayD<f64>) -> Vec<Vec<f64>> {
    sample
        .outer_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Every row of the given shards, in shard order.
pub fn all_rows(rows: &[usize], cols: usize) -> Vec<Vec<f64>> {
    rows.iter()
        .enumerate()
        .flat_map(|(i, &n)| {
            let a = shard_array(i, n, cols).into_dyn();
            rows_of(&a)
        })
        .collect()
}

/// Print test header with formatting
pub fn print_test_header(test_name: &str) {
    println!("\n{}", "=".repeat(60));
    println!("TEST: {}", test_name);
    println!("{}", "=".repeat(60));
}

