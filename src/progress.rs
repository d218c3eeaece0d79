// src/progress.rs
//
// Status reporting for long-running sampling calls. Reporters observe
// progress only; they never change what a sampler returns.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Receives human-readable progress messages.
pub trait StatusReporter {
    fn report(&mut self, message: &str);

    /// Called once after the last message of a successful call.
    fn finish(&mut self) {}
}

impl<F: FnMut(&str)> StatusReporter for F {
    fn report(&mut self, message: &str) {
        self(message)
    }
}

/// Forwards messages to `tracing` at debug level. Default for the
/// convenience entry points.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn report(&mut self, message: &str) {
        tracing::debug!("{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl StatusReporter for NullReporter {
    fn report(&mut self, _message: &str) {}
}

/// Terminal spinner that shows the latest message.
pub struct ProgressReporter {
    pub progress_bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(operation: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template(&format!("{}: {{spinner:.green}} [{{elapsed_precise}}] {{msg}}", operation))
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { progress_bar: pb }
    }
}

impl StatusReporter for ProgressReporter {
    fn report(&mut self, message: &str) {
        self.progress_bar.set_message(message.to_string());
    }

    fn finish(&mut self) {
        self.progress_bar.finish_with_message("Finished");
    }
}
