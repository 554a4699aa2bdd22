use indicatif::{ProgressBar, ProgressStyle};

use crate::scheduler::ProgressUpdate;

/// Displays a live progress line while scenarios run: completed/total plus
/// pass/warn/fail counts and how many simulations are currently in flight.
pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
            )
            .expect("Failed to set progress style")
            .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// A progress line that renders nothing, for CI logs.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn update(&self, update: ProgressUpdate) {
        self.bar.set_position(update.completed as u64);
        self.bar.set_message(format!(
            "pass {} / warn {} / fail {} / running {}",
            update.passed, update.warned, update.failed, update.in_flight
        ));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
