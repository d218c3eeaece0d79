//
//! CLI supporting `header`, `shape`, `offset`, `sample`, and `batches`.
//!
//! Examples:
//! ```bash
//! npy-cli header   data/shard_0.npy
//! npy-cli shape    data/shard_0.npy
//! npy-cli offset   data/shard_0.npy
//! npy-cli sample   -o sample.npy --percentage 10 --seed 7 data/*.npy
//! npy-cli sample   -o sample.npy --bytes 1073741824 --dtype f32 data/*.npy
//! npy-cli batches  data/shard_0.npy --batch-size 32 --count 4
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use ndarray::{ArrayD, Axis};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use npyshard::constants::CLI_LOG_LEVELS;
use npyshard::data_loader::sampler::seeded_rng;
use npyshard::{
    read_data_offset, read_header, read_shape, sample_files, sample_files_with, write_npy,
    CyclicBatcher, NpyElement, NpyVersion, ProgressReporter, SampleOptions,
};

/// Macro to safely print with broken pipe handling
macro_rules! safe_println {
    ($($arg:tt)*) => {
        match writeln!(io::stdout(), $($arg)*) {
            Ok(_) => {},
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                // Gracefully exit on broken pipe (e.g., when piped to head/tail)
                std::process::exit(0);
            }
            Err(e) => return Err(e.into())
        }
    };
}

/// Output element type.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutDtype {
    F32,
    F64,
    I32,
    I64,
    U8,
}

// -- Commands

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the full header of an .npy file
    Header { path: PathBuf },

    /// Print the shape of an .npy file
    Shape { path: PathBuf },

    /// Print the byte offset of the data section
    Offset { path: PathBuf },

    /// Draw a random sample from one or more .npy shards and write it as .npy
    Sample {
        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Percentage of all rows to draw, in (0, 100]
        #[arg(long)]
        percentage: Option<f64>,

        /// Number of rows to draw
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Size the sample to this many bytes of output
        #[arg(long)]
        bytes: Option<usize>,

        /// Draw rows within a shard without replacement
        #[arg(long)]
        no_replace: bool,

        /// Seed for reproducible samples
        #[arg(long)]
        seed: Option<u64>,

        /// Element type of the output
        #[arg(long, value_enum, default_value_t = OutDtype::F64)]
        dtype: OutDtype,

        /// Force the .npy format version of the output (1 or 2)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        format_version: Option<u8>,

        /// Show a progress spinner instead of logging progress
        #[arg(long)]
        progress: bool,

        /// Input shards
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the first rows of consecutive cyclic batches from one file
    Batches {
        path: PathBuf,

        #[arg(short, long, default_value_t = 32)]
        batch_size: usize,

        /// How many batches to print
        #[arg(short, long, default_value_t = 4)]
        count: usize,

        /// Axis to batch along
        #[arg(long, default_value_t = 0)]
        axis: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbosity
    let filter = CLI_LOG_LEVELS[(cli.verbose as usize).min(CLI_LOG_LEVELS.len() - 1)];
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Initialize tracing-log bridge to capture log crate messages from dependencies
    tracing_log::LogTracer::init().ok();

    match cli.cmd {
        Command::Header { path } => {
            let h = read_header(&path).with_context(|| format!("reading {}", path.display()))?;
            safe_println!("file:          {}", path.display());
            safe_println!("version:       {}.{}", h.version.0, h.version.1);
            safe_println!("descr:         {}", h.descr);
            safe_println!("fortran_order: {}", h.fortran_order);
            safe_println!("shape:         {:?}", h.shape);
            safe_println!("data offset:   {}", h.byte_offset);
        }

        Command::Shape { path } => {
            let shape = read_shape(&path).with_context(|| format!("reading {}", path.display()))?;
            safe_println!("{:?}", shape);
        }

        Command::Offset { path } => {
            let offset =
                read_data_offset(&path).with_context(|| format!("reading {}", path.display()))?;
            safe_println!("{}", offset);
        }

        Command::Sample {
            out,
            percentage,
            count,
            bytes,
            no_replace,
            seed,
            dtype,
            format_version,
            progress,
            files,
        } => {
            let mut opts = SampleOptions::default().replacement(!no_replace);
            opts.percentage = percentage;
            opts.count = count;
            opts.byte_budget = bytes;
            opts.seed = seed;
            let version = match format_version {
                Some(1) => NpyVersion::V1,
                Some(_) => NpyVersion::V2,
                None => NpyVersion::Auto,
            };

            let shape = match dtype {
                OutDtype::F32 => sample_to::<f32>(&files, &opts, &out, version, progress)?,
                OutDtype::F64 => sample_to::<f64>(&files, &opts, &out, version, progress)?,
                OutDtype::I32 => sample_to::<i32>(&files, &opts, &out, version, progress)?,
                OutDtype::I64 => sample_to::<i64>(&files, &opts, &out, version, progress)?,
                OutDtype::U8 => sample_to::<u8>(&files, &opts, &out, version, progress)?,
            };
            safe_println!("wrote {:?} to {}", shape, out.display());
        }

        Command::Batches {
            path,
            batch_size,
            count,
            axis,
        } => {
            let array: ArrayD<f64> = sample_files(&[&path], &SampleOptions::default())
                .with_context(|| format!("loading {}", path.display()))?;
            let batcher = CyclicBatcher::new(array, batch_size, axis)?;
            for (i, batch) in batcher.take(count).enumerate() {
                let first = batch.index_axis(Axis(0), 0);
                safe_println!("batch {:>4}  shape {:?}  first row {}", i, batch.shape(), first);
            }
        }
    }

    Ok(())
}

/// Sample `files` as `T` and write the result to `out`; returns its shape.
fn sample_to<T: NpyElement>(
    files: &[PathBuf],
    opts: &SampleOptions,
    out: &Path,
    version: NpyVersion,
    progress: bool,
) -> Result<Vec<usize>> {
    let sample: ArrayD<T> = if progress {
        let mut reporter = ProgressReporter::new("sample");
        let mut rng = seeded_rng(opts.seed);
        sample_files_with(files, opts, &mut rng, &mut reporter)?
    } else {
        sample_files(files, opts)?
    };
    info!("writing {:?} to {}", sample.shape(), out.display());
    write_npy(out, &sample, version).with_context(|| format!("writing {}", out.display()))?;
    Ok(sample.shape().to_vec())
}
