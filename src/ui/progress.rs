use crate::pipeline::FixOutcome;
use crate::relay::RelayEvent;
use crate::ui::icons::{CHECK, CROSS, FILE_MOD, FILE_SKIP, RUNNING, SPARKLE, WARN};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner for a network-bound stage, drawn on stderr.
///
/// Hidden when stderr is not a terminal, so piped output stays clean.
pub struct StageSpinner {
    bar: ProgressBar,
}

impl StageSpinner {
    pub fn start(message: impl Into<String>) -> Self {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .expect("progress bar template is a valid static string");
        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn succeed(self, message: impl AsRef<str>) {
        self.bar
            .finish_with_message(format!("{}{}", CHECK, message.as_ref()));
    }

    pub fn fail(self, message: impl AsRef<str>) {
        self.bar
            .abandon_with_message(format!("{}{}", CROSS, style(message.as_ref()).red()));
    }

    /// Clear the spinner line without leaving a message.
    pub fn clear(self) {
        self.bar.finish_and_clear();
    }
}

/// Print the terminal outcome of a fix run.
///
/// The patch location and the raw completion go to stdout; warnings and
/// per-file notes go to stderr.
pub fn print_fix_outcome(outcome: &FixOutcome) {
    match outcome {
        FixOutcome::PatchWritten {
            path,
            fragments,
            report,
        } => {
            for fragment in report.patch.fragments() {
                eprintln!("  {}{}", FILE_MOD, fragment.path);
            }
            print_skips(&report.skipped_unknown, "unknown file, skipped");
            print_skips(&report.unchanged, "no effective change");
            println!(
                "{}Patch written to {} ({} file{})",
                SPARKLE,
                style(path.display()).bold(),
                fragments,
                if *fragments == 1 { "" } else { "s" }
            );
        }
        FixOutcome::NoChanges {
            raw_completion,
            report,
        } => {
            print_skips(&report.skipped_unknown, "unknown file, skipped");
            print_skips(&report.unchanged, "no effective change");
            eprintln!(
                "{}{}",
                WARN,
                style("No changes detected. Raw model output follows:").yellow()
            );
            println!("{}", raw_completion);
        }
    }
}

fn print_skips(paths: &[String], reason: &str) {
    for path in paths {
        eprintln!("  {}{} {}", FILE_SKIP, path, style(format!("({})", reason)).dim());
    }
}

/// One relayed event as a terminal line.
pub fn format_relay_event(event: &RelayEvent) -> String {
    match event {
        RelayEvent::Log {
            timestamp,
            level,
            message,
        } => {
            let level_styled = match level.as_str() {
                "error" => style(format!("{:>5}", level)).red(),
                "warn" | "warning" => style(format!("{:>5}", level)).yellow(),
                "debug" | "trace" => style(format!("{:>5}", level)).dim(),
                _ => style(format!("{:>5}", level)).cyan(),
            };
            format!(
                "{} {} {}",
                style(timestamp.as_deref().unwrap_or("-")).dim(),
                level_styled,
                message.as_deref().unwrap_or("")
            )
        }
        RelayEvent::Finished { status, message } => {
            let icon = if status == "SUCCESS" { CHECK } else { CROSS };
            format!("{}{} ({})", icon, message, style(status).bold())
        }
    }
}

/// Banner shown when log streaming begins.
pub fn print_relay_start(execution_id: &str) {
    eprintln!(
        "{}Streaming logs for execution {}",
        RUNNING,
        style(execution_id).bold()
    );
}
