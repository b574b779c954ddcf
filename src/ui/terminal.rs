//! Terminal UI.

use std::io::Write;

use console::Term;

use super::{OutputMode, PipewaveTheme, UserInterface};

/// Writes themed output to stdout, and errors to stderr.
pub struct TerminalUI {
    out: Term,
    err: Term,
    theme: PipewaveTheme,
    mode: OutputMode,
}

impl TerminalUI {
    /// Create a terminal UI.
    pub fn new(mode: OutputMode, no_color: bool) -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme: PipewaveTheme::for_terminal(no_color),
            mode,
        }
    }

    /// The theme in use.
    pub fn theme(&self) -> &PipewaveTheme {
        &self.theme
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", msg).ok();
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", self.theme.format_success(msg)).ok();
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", self.theme.format_warning(msg)).ok();
        }
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_error(msg)).ok();
    }

    fn skipped(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", self.theme.format_skipped(msg)).ok();
        }
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "\n{}\n", self.theme.format_header(title)).ok();
        }
    }
}
