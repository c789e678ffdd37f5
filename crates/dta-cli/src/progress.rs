//! Progress display for hashing and file list generation.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{msg:>12.cyan.bold} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}%";

/// Percentage bar for one stage of a task
pub struct TaskProgress {
    bar: ProgressBar,
}

impl TaskProgress {
    /// Create a bar labelled `stage`, running from 0 to 100 percent
    pub fn new(stage: &str) -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        bar.set_message(stage.to_string());
        bar.enable_steady_tick(Duration::from_millis(200));
        Self { bar }
    }

    /// Bar that draws nothing
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Switch to a new stage and reset to 0%
    pub fn set_stage(&self, stage: &str) {
        self.bar.set_message(stage.to_string());
        self.bar.set_position(0);
    }

    /// Set the completed percentage
    pub fn update(&self, percent: u8) {
        self.bar.set_position(u64::from(percent.min(100)));
    }

    /// Current percentage
    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Complete the bar with a final message
    pub fn finish_with_message(&self, message: impl Into<String>) {
        self.bar.set_position(100);
        self.bar.finish_with_message(message.into());
    }

    /// Stop the bar where it is, leaving a message
    pub fn abandon_with_message(&self, message: impl Into<String>) {
        self.bar.abandon_with_message(message.into());
    }
}

/// Format a byte count as B, KB, MB or GB with two decimals
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}
