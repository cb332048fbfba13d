//! Terminal progress display.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while a mailbox is listed.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");
    let bar = ProgressBar::new_spinner().with_style(style);
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Classification progress: `Classifying... [done/total]`.
pub struct ClassifyProgress {
    bar: ProgressBar,
}

impl ClassifyProgress {
    pub fn new(model: &str) -> Self {
        let style = ProgressStyle::with_template("{msg} {bar:30.cyan/blue} [{pos}/{len}] {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        let bar = ProgressBar::new(0).with_style(style);
        bar.set_message(format!("Classifying with {model}..."));
        Self { bar }
    }

    /// Callback for `fetch_and_classify`.
    pub fn callback(&self) -> impl FnMut(usize, usize) + use<> {
        let bar = self.bar.clone();
        move |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        }
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}
