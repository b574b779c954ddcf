//! Mock UI for testing.
//!
//! `MockUI` captures every interaction for later assertion.

use super::{OutputMode, UserInterface};

/// Captures UI output in memory.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    skipped: Vec<String>,
    headers: Vec<String>,
}

impl MockUI {
    /// Create a MockUI with Normal output mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a MockUI with a specific output mode.
    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn skipped_messages(&self) -> &[String] {
        &self.skipped
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Every captured line, in category order.
    pub fn all_output(&self) -> String {
        [
            &self.headers,
            &self.messages,
            &self.successes,
            &self.warnings,
            &self.skipped,
            &self.errors,
        ]
        .iter()
        .flat_map(|lines| lines.iter())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn skipped(&mut self, msg: &str) {
        self.skipped.push(msg.to_string());
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_by_category() {
        let mut ui = MockUI::new();
        ui.message("plan");
        ui.success("ok");
        ui.warning("retry");
        ui.error("bad");
        ui.skipped("later");
        ui.show_header("catalog");

        assert_eq!(ui.messages(), ["plan"]);
        assert_eq!(ui.successes(), ["ok"]);
        assert_eq!(ui.warnings(), ["retry"]);
        assert_eq!(ui.errors(), ["bad"]);
        assert_eq!(ui.skipped_messages(), ["later"]);
        assert_eq!(ui.headers(), ["catalog"]);
        assert!(ui.all_output().contains("later"));
    }

    #[test]
    fn keeps_output_mode() {
        assert_eq!(
            MockUI::with_mode(OutputMode::Quiet).output_mode(),
            OutputMode::Quiet
        );
    }
}
