//! Terminal output.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] writing to the terminal, [`MockUI`] capturing output in tests
//! - [`ConsoleSink`] rendering run events as they happen
//! - Report and plan rendering in [`report`]
//!
//! # Example
//!
//! ```
//! use pipewave::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.success("applications");
//! assert_eq!(ui.successes(), ["applications"]);
//! ```

pub mod mock;
pub mod output;
pub mod report;
pub mod sink;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use output::OutputMode;
pub use report::{format_duration, render_plan, render_report};
pub use sink::ConsoleSink;
pub use terminal::TerminalUI;
pub use theme::{should_use_colors, PipewaveTheme};

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a plain line.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message. Shown in every mode.
    fn error(&mut self, msg: &str);

    /// Display a skipped-step message.
    fn skipped(&mut self, msg: &str);

    /// Show a header banner.
    fn show_header(&mut self, title: &str);
}
