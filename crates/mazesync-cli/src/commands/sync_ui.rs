use episode_sync_core::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// Progress bar for push-all. Falls back to structured log lines when not on a terminal.
pub struct SyncProgress {
    bar: ProgressBar,
    interactive: bool,
}

impl SyncProgress {
    pub fn new(enabled: bool) -> Self {
        let interactive = enabled && is_interactive();

        let bar = if interactive {
            let bar = ProgressBar::new(100);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ");
            bar.set_style(style);
            bar.set_message("Pulling watched episodes from TVmaze...");
            bar
        } else {
            tracing::info!(
                operation = "ui_init",
                mode = "non_interactive",
                "Running in non-interactive mode - progress bar disabled, using structured logging"
            );
            ProgressBar::hidden()
        };

        Self { bar, interactive }
    }
}

impl ProgressSink for SyncProgress {
    fn update(&self, percent: u8, message: &str) {
        if self.interactive {
            self.bar.set_position(u64::from(percent));
            self.bar.set_message(message.to_string());
        } else {
            tracing::info!(operation = "progress", percent, detail = message, "Sync progress update");
        }
    }

    fn finish(&self) {
        if self.interactive {
            self.bar.finish_and_clear();
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
