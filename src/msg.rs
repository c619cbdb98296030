use crossterm::event::KeyEvent;
use std::sync::mpsc;

use crate::launcher::error::LauncherError;
use crate::launcher::preview::PreviewServer;
use crate::launcher::progress::{LogLevel, Reporter};
use crate::model::menu::Action;

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    /// The terminal changed size; the next draw picks up the new area.
    Resize,
    /// Reading the terminal failed; ends the process.
    InputFailed(String),

    // -- Action progress, sent from the worker
    Log(LogLevel, String),
    StepStarted(String),
    StepFinished,
    ActionFinished(Action, Result<Option<PreviewServer>, LauncherError>),

    // -- System
    Tick,
}

impl Reporter for mpsc::Sender<Msg> {
    fn log(&self, level: LogLevel, message: String) {
        let _ = self.send(Msg::Log(level, message));
    }

    fn step_started(&self, label: &str) {
        let _ = self.send(Msg::StepStarted(label.to_string()));
    }

    fn step_finished(&self) {
        let _ = self.send(Msg::StepFinished);
    }
}
