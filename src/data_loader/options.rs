// src/data_loader/options.rs
//!
//! Sizing and randomness knobs shared by both samplers.
//!
//! Builder helpers are provided so callers can write a fluent style:
//!
//! let opts = SampleOptions::default()
//!     .with_percentage(25.0)
//!     .replacement(false)
//!     .with_seed(42);
//!
//! At most one of percentage / count / byte budget may be set; when none
//! is set every row is taken.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::dataset::SampleError;

/// How many rows to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleRequest {
    /// Every row of every shard.
    AllSamples,
    /// `floor(total * p / 100)` rows, `p` in (0, 100].
    Percentage(f64),
    /// Exactly this many rows.
    Count(usize),
    /// As many rows as fit in this many bytes of output.
    ByteBudget(usize),
}

#[derive(Debug, Clone)]
pub struct SampleOptions {
    pub percentage: Option<f64>,
    pub count: Option<usize>,
    pub byte_budget: Option<usize>,
    /// Draw rows within a shard with replacement.
    pub replacement: bool,
    /// Seed for the convenience entry points. `None` seeds from the thread RNG.
    pub seed: Option<u64>,
    /// Checked between shards; when set the call fails with `Cancelled`.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            percentage: None,
            count: None,
            byte_budget: None,
            replacement: true,
            seed: None,
            cancel: None,
        }
    }
}

impl SampleOptions {
    pub fn with_percentage(mut self, p: f64) -> Self {
        self.percentage = Some(p);
        self
    }

    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Size the sample from a memory budget in bytes.
    pub fn with_byte_budget(mut self, bytes: usize) -> Self {
        self.byte_budget = Some(bytes);
        self
    }

    pub fn replacement(mut self, yes: bool) -> Self {
        self.replacement = yes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Collapse the sizing knobs into a single request.
    pub fn request(&self) -> Result<SampleRequest, SampleError> {
        let set = [
            self.percentage.is_some(),
            self.count.is_some(),
            self.byte_budget.is_some(),
        ]
        .iter()
        .filter(|&&b| b)
        .count();
        if set > 1 {
            return Err(SampleError::ConflictingSampleSpec);
        }

        let request = match (self.percentage, self.count, self.byte_budget) {
            (Some(p), _, _) => SampleRequest::Percentage(p),
            (_, Some(n), _) => SampleRequest::Count(n),
            (_, _, Some(b)) => SampleRequest::ByteBudget(b),
            _ => SampleRequest::AllSamples,
        };
        request.validate()?;
        Ok(request)
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), SampleError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(SampleError::Cancelled),
            _ => Ok(()),
        }
    }
}

impl SampleRequest {
    fn validate(&self) -> Result<(), SampleError> {
        match *self {
            SampleRequest::Percentage(p) if !(p > 0.0 && p <= 100.0) => Err(
                SampleError::InvalidRequest(format!("percentage {p} is outside (0, 100]")),
            ),
            SampleRequest::Count(0) => {
                Err(SampleError::InvalidRequest("count must be at least 1".into()))
            }
            SampleRequest::ByteBudget(0) => Err(SampleError::InvalidRequest(
                "byte budget must be at least 1 byte".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Number of rows this request selects out of `total`, for rows of
    /// `row_bytes` bytes. A byte budget covering the whole dataset clamps
    /// to `total`. Callers decide whether exceeding `total` is an error.
    pub fn resolve(&self, total: usize, row_bytes: usize) -> Result<usize, SampleError> {
        match *self {
            SampleRequest::AllSamples => Ok(total),
            SampleRequest::Percentage(p) => Ok((total as f64 * p / 100.0).floor() as usize),
            SampleRequest::Count(n) => Ok(n),
            SampleRequest::ByteBudget(budget) => {
                if row_bytes == 0 {
                    return Err(SampleError::InvalidRequest(
                        "byte budget needs rows with a non-zero size".into(),
                    ));
                }
                let n = (budget / row_bytes).min(total);
                if n == 0 {
                    return Err(SampleError::EmptyByteBudget { budget });
                }
                Ok(n)
            }
        }
    }
}
