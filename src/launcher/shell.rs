use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::launcher::error::CommandError;

const WAIT_POLL: Duration = Duration::from_millis(50);

/// One external command together with the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Build from a configured argv. Config validation guarantees a program name.
    pub fn from_argv(argv: &[String], cwd: &Path) -> Self {
        match argv.split_first() {
            Some((program, args)) => Self {
                program: program.clone(),
                args: args.to_vec(),
                cwd: cwd.to_path_buf(),
            },
            None => Self::new("", cwd),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Raised by the UI thread to make a worker stop its external commands.
#[derive(Debug, Default, Clone)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A started process the launcher keeps a handle to.
pub trait Process: Send {
    fn id(&self) -> u32;
    fn has_exited(&mut self) -> io::Result<bool>;
    fn kill(&mut self) -> io::Result<()>;
}

/// Everything the workflow needs from the operating system's process table.
pub trait Shell: Send + Sync {
    /// Run to completion with stdio discarded. Killed early once `interrupt` is triggered.
    fn run(&self, invocation: &Invocation, interrupt: &Interrupt) -> Result<(), CommandError>;
    /// Start without waiting. Stdio is discarded.
    fn spawn(&self, invocation: &Invocation) -> Result<Box<dyn Process>, CommandError>;
    /// Resolve `program` on the executable search path.
    fn lookup(&self, program: &str) -> Option<PathBuf>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl SystemShell {
    fn command(invocation: &Invocation) -> Command {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl Shell for SystemShell {
    fn run(&self, invocation: &Invocation, interrupt: &Interrupt) -> Result<(), CommandError> {
        tracing::info!("running `{invocation}` in {}", invocation.cwd.display());

        let spawn_error = |source: io::Error| CommandError::Spawn {
            program: invocation.program.clone(),
            source,
        };
        let mut child = Self::command(invocation).spawn().map_err(spawn_error)?;

        loop {
            if let Some(status) = child.try_wait().map_err(spawn_error)? {
                return check_status(&invocation.program, status);
            }

            if interrupt.is_triggered() {
                tracing::warn!("interrupting `{invocation}` (pid {})", child.id());
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::Interrupted {
                    program: invocation.program.clone(),
                });
            }

            thread::sleep(WAIT_POLL);
        }
    }

    fn spawn(&self, invocation: &Invocation) -> Result<Box<dyn Process>, CommandError> {
        tracing::info!("spawning `{invocation}` in {}", invocation.cwd.display());

        let child = Self::command(invocation)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(Box::new(ChildProcess(child)))
    }

    fn lookup(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

fn check_status(program: &str, status: ExitStatus) -> Result<(), CommandError> {
    if status.success() {
        return Ok(());
    }

    match status.code() {
        Some(code) => Err(CommandError::Exit {
            program: program.to_string(),
            code,
        }),
        None => Err(CommandError::Signal {
            program: program.to_string(),
        }),
    }
}

struct ChildProcess(Child);

impl Process for ChildProcess {
    fn id(&self) -> u32 {
        self.0.id()
    }

    fn has_exited(&mut self) -> io::Result<bool> {
        Ok(self.0.try_wait()?.is_some())
    }

    fn kill(&mut self) -> io::Result<()> {
        if self.has_exited()? {
            return Ok(());
        }
        self.0.kill()?;
        // Reap so the child does not linger as a zombie.
        self.0.wait().map(|_| ())
    }
}
