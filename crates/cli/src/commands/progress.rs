use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use asmdb_core::pipeline::ProgressReporter;

/// Terminal progress bar over the files of one build.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }

    /// Stop drawing after a failed run, leaving the last state on screen.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    }

    fn file_finished(&self, done: usize, _total: usize, path: &Path) {
        self.bar.set_position(done as u64);
        if let Some(name) = path.file_name() {
            self.bar.set_message(name.to_string_lossy().to_string());
        }
    }

    fn finished(&self) {
        self.bar.finish_and_clear();
    }
}
