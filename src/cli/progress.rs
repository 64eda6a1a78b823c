//! Terminal progress bars for parameter downloads
//!
//! Each active transfer gets its own indicatif bar inside a shared
//! `MultiProgress`, starting at the resume offset.

use std::fmt;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::app::client::{ProgressReporter, TransferProgress};

const BAR_TEMPLATE: &str =
    "{msg:40!} [{elapsed_precise}] {bar:30.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{msg:40!} {spinner:.blue} {bytes} ({bytes_per_sec})";

/// Progress reporter drawing one bar per download
#[derive(Clone)]
pub struct BarProgress {
    multi: MultiProgress,
    bar_style: ProgressStyle,
    spinner_style: ProgressStyle,
}

impl BarProgress {
    /// Create a reporter drawing to stderr
    pub fn new() -> Self {
        let bar_style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let spinner_style = ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        Self {
            multi: MultiProgress::new(),
            bar_style,
            spinner_style,
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BarProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarProgress").finish_non_exhaustive()
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, name: &str, offset: u64, total: Option<u64>) -> Box<dyn TransferProgress> {
        let bar = match total {
            Some(total) => ProgressBar::new(total).with_style(self.bar_style.clone()),
            None => ProgressBar::new_spinner().with_style(self.spinner_style.clone()),
        };
        let bar = self.multi.add(bar);
        bar.set_message(name.to_string());
        bar.set_position(offset);

        Box::new(BarTransfer { bar })
    }
}

struct BarTransfer {
    bar: ProgressBar,
}

impl TransferProgress for BarTransfer {
    fn advance(&mut self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}
