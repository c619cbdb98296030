use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single external command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program}: exit status {code}")]
    Exit { program: String, code: i32 },
    #[error("{program}: terminated by signal")]
    Signal { program: String },
    #[error("{program}: interrupted")]
    Interrupted { program: String },
}

impl CommandError {
    pub fn program(&self) -> &str {
        match self {
            CommandError::Spawn { program, .. }
            | CommandError::Exit { program, .. }
            | CommandError::Signal { program }
            | CommandError::Interrupted { program } => program,
        }
    }
}

/// Why an action stopped. The display text is what the user sees.
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("{app} is not installed. Please select 'Download & Install {app}' first.")]
    NotInstalled { app: String },

    #[error("{runtime} is not installed. Please install it and run DOA-Launcher again.")]
    MissingRuntime { runtime: String },

    #[error("Error {step}: {source}")]
    Command {
        step: String,
        #[source]
        source: CommandError,
    },

    #[error("Error {step}: {source}")]
    Filesystem {
        step: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error opening browser: unsupported platform ({0})")]
    UnsupportedPlatform(String),

    #[error("Error opening browser: {0}")]
    Browser(#[source] io::Error),

    #[error("Error starting preview server: no response on {url} after {}s", .timeout.as_secs())]
    PreviewNotReady { url: String, timeout: Duration },

    #[error("Error starting preview server: process exited before {url} became reachable")]
    PreviewExited { url: String },

    #[error("Error starting preview server: interrupted while waiting for {url}")]
    PreviewInterrupted { url: String },

    #[error("Error writing install manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },
}

impl LauncherError {
    pub fn command(step: impl Into<String>, source: CommandError) -> Self {
        LauncherError::Command {
            step: step.into(),
            source,
        }
    }

    pub fn filesystem(step: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        LauncherError::Filesystem {
            step: step.into(),
            path: path.into(),
            source,
        }
    }
}
