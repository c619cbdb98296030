use ratatui::style::Color;

/// Severity of a line in the output log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Ok,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the terminal color for this log level.
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Info => Color::Gray,
            LogLevel::Ok => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }
}

/// Where a running action sends its user-facing output.
pub trait Reporter {
    fn log(&self, level: LogLevel, message: String);
    /// A blocking step begins; the UI shows a spinner labelled `label`.
    fn step_started(&self, label: &str);
    /// The current step ended, successfully or not.
    fn step_finished(&self);
}
