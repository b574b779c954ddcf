//! Rendering of run reports and execution plans.

use std::time::Duration;

use crate::runner::{PreparedRun, RunReport, RunStatus};

use super::UserInterface;

/// Format a duration for display.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

/// Render the outcome of a finished run.
///
/// Failures and the abort reason go through [`UserInterface::error`] so they
/// are visible in every output mode.
pub fn render_report(ui: &mut dyn UserInterface, report: &RunReport) {
    for entry in &report.errors {
        let attempts = if entry.attempts == 1 {
            "1 attempt".to_string()
        } else {
            format!("{} attempts", entry.attempts)
        };
        ui.error(&format!("{} failed after {}: {}", entry.step, attempts, entry.error));
    }

    if let Some(reason) = &report.abort_reason {
        ui.error(&format!("Run aborted: {}", reason));
    }

    let summary = report.summary();
    let line = format!(
        "Run {}: {} succeeded, {} failed, {} timed out, {} skipped ({:.1}% success) in {}",
        report.status,
        summary.succeeded,
        summary.failed,
        summary.timed_out,
        summary.skipped,
        summary.success_rate,
        format_duration(report.duration()),
    );

    match report.status {
        RunStatus::Succeeded => ui.success(&line),
        RunStatus::PartialFailure => ui.warning(&line),
        RunStatus::Failed | RunStatus::Aborted => ui.error(&line),
    }
}

/// Render the waves of a prepared run without executing it.
pub fn render_plan(ui: &mut dyn UserInterface, prepared: &PreparedRun) {
    let plan = prepared.plan();
    ui.show_header(&format!(
        "{} steps in {} waves",
        plan.step_count(),
        plan.len()
    ));

    let definitions = prepared.definitions();
    let default_timeout = prepared.config().default_timeout;

    for wave in plan {
        ui.message(&format!("Wave {}:", wave.index + 1));
        for id in &wave.steps {
            let Some(def) = definitions.iter().find(|d| &d.id == id) else {
                continue;
            };

            let mut line = format!("  {}", id);
            if let Some(description) = &def.description {
                line.push_str(&format!(" - {}", description));
            }
            ui.message(&line);

            if !def.depends_on.is_empty() {
                let deps: Vec<&str> = def.depends_on.iter().map(String::as_str).collect();
                ui.message(&format!("      after: {}", deps.join(", ")));
            }
            ui.message(&format!(
                "      timeout: {}",
                format_duration(def.effective_timeout(default_timeout))
            ));
        }
    }
}
