use indicatif::{ProgressBar, ProgressStyle};
use refscan_core::{DiagnosticSink, ProgressSink};
use tracing::error;

const STEPS: u64 = 1000;

/// Draws scan progress on stderr. Hidden in batch mode.
#[derive(Clone)]
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(hidden: bool) -> Self {
        if hidden {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(STEPS);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
        {
            bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for BarProgress {
    fn report(&mut self, label: &str, detail: &str, fraction: f32) {
        let position = (fraction.clamp(0.0, 1.0) * STEPS as f32).round() as u64;
        self.bar.set_position(position);
        self.bar.set_message(format!("{} {}", label, detail));
    }
}

/// Logs each record's message as it is found.
pub struct LogDiagnostics {
    bar: ProgressBar,
}

impl LogDiagnostics {
    pub fn new(progress: &BarProgress) -> Self {
        Self {
            bar: progress.bar.clone(),
        }
    }
}

impl DiagnosticSink for LogDiagnostics {
    fn emit(&mut self, message: &str) {
        self.bar.suspend(|| error!("{}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_bar_tracks_position() {
        let mut progress = BarProgress::new(true);
        progress.report("Searching missing references in", "Scene", 0.5);
        assert_eq!(progress.bar.position(), 500);

        progress.report("Searching missing references in", "Scene", 1.7);
        assert_eq!(progress.bar.position(), STEPS);
    }
}
