//! Live console rendering of run events.

use console::Term;

use crate::runner::{EventSink, RunEvent};
use crate::steps::{StepRunRecord, StepStatus};

use super::{format_duration, OutputMode, PipewaveTheme};

/// Prints run progress to stdout as events arrive.
pub struct ConsoleSink {
    term: Term,
    theme: PipewaveTheme,
    mode: OutputMode,
}

impl ConsoleSink {
    /// Create a sink writing to stdout.
    pub fn new(mode: OutputMode, no_color: bool) -> Self {
        Self {
            term: Term::stdout(),
            theme: PipewaveTheme::for_terminal(no_color),
            mode,
        }
    }

    /// The line to print for an event, if this mode shows it.
    fn render(&self, event: &RunEvent) -> Option<String> {
        match event {
            RunEvent::RunStarted { steps, waves, .. } if self.mode.shows_status() => Some(
                self.theme
                    .format_header(&format!("Running {} steps in {} waves", steps, waves)),
            ),
            RunEvent::WaveStarted { index, steps } if self.mode.shows_step_events() => Some(
                format!(
                    "{}",
                    self.theme
                        .dim
                        .apply_to(format!("Wave {}: {}", index + 1, steps.join(", ")))
                ),
            ),
            RunEvent::StepStarted { step, attempt } if self.mode.shows_attempts() => Some(
                self.theme.format_status(
                    StepStatus::Running,
                    &format!("{} (attempt {})", step, attempt),
                ),
            ),
            RunEvent::StepRetrying {
                step,
                attempt,
                error,
            } if self.mode.shows_attempts() => Some(self.theme.format_warning(&format!(
                "{} attempt {} failed: {}, retrying",
                step, attempt, error
            ))),
            RunEvent::StepFinished { record } if self.mode.shows_step_events() => {
                Some(self.theme.format_status(record.status(), &outcome(record)))
            }
            _ => None,
        }
    }
}

/// One-line outcome of a finished step.
fn outcome(record: &StepRunRecord) -> String {
    match record.status() {
        StepStatus::Succeeded => match record.duration() {
            Some(d) => format!("{} ({})", record.step(), format_duration(d)),
            None => record.step().to_string(),
        },
        StepStatus::Skipped => match record.skip_reason() {
            Some(reason) => format!("{} skipped: {}", record.step(), reason),
            None => format!("{} skipped", record.step()),
        },
        status => {
            let error = record.error().map(ToString::to_string).unwrap_or_default();
            format!("{} {}: {}", record.step(), status, error)
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &RunEvent) {
        if let Some(line) = self.render(event) {
            self.term.write_line(&line).ok();
        }
    }
}
