//! In-memory stand-ins for the process table and the UI, shared by unit tests.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::launcher::browser::Browser;
use crate::launcher::error::CommandError;
use crate::launcher::progress::{LogLevel, Reporter};
use crate::launcher::shell::{Interrupt, Invocation, Process, Shell};

#[derive(Debug, Default)]
struct ProcessFlags {
    exited: AtomicBool,
    killed: AtomicBool,
}

pub struct FakeProcess {
    flags: Arc<ProcessFlags>,
}

/// Test-side view of a [`FakeProcess`].
#[derive(Clone)]
pub struct ProcessProbe {
    flags: Arc<ProcessFlags>,
}

impl FakeProcess {
    pub fn running() -> (Self, ProcessProbe) {
        let flags = Arc::new(ProcessFlags::default());
        (
            Self {
                flags: Arc::clone(&flags),
            },
            ProcessProbe { flags },
        )
    }
}

impl ProcessProbe {
    pub fn exit(&self) {
        self.flags.exited.store(true, Ordering::SeqCst);
    }

    pub fn was_killed(&self) -> bool {
        self.flags.killed.load(Ordering::SeqCst)
    }
}

impl Process for FakeProcess {
    fn id(&self) -> u32 {
        4242
    }

    fn has_exited(&mut self) -> io::Result<bool> {
        Ok(self.flags.exited.load(Ordering::SeqCst))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.flags.killed.store(true, Ordering::SeqCst);
        self.flags.exited.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every invocation instead of running it.
///
/// `git clone <url> <dir>` creates `<dir>` with a placeholder file so the install
/// marker behaves as it would after a real clone.
#[derive(Default)]
pub struct RecordingShell {
    runs: Mutex<Vec<Invocation>>,
    spawns: Mutex<Vec<Invocation>>,
    probes: Mutex<Vec<ProcessProbe>>,
    failing: Mutex<HashSet<String>>,
    on_path: Mutex<HashSet<String>>,
}

impl RecordingShell {
    pub fn with_programs(programs: &[&str]) -> Self {
        let shell = Self::default();
        shell
            .on_path
            .lock()
            .unwrap()
            .extend(programs.iter().map(|p| p.to_string()));
        shell
    }

    /// Make the invocation whose display form equals `command` exit with status 1.
    pub fn fail_on(&self, command: &str) {
        self.failing.lock().unwrap().insert(command.to_string());
    }

    pub fn runs(&self) -> Vec<Invocation> {
        self.runs.lock().unwrap().clone()
    }

    pub fn run_lines(&self) -> Vec<String> {
        self.runs().iter().map(ToString::to_string).collect()
    }

    pub fn spawns(&self) -> Vec<Invocation> {
        self.spawns.lock().unwrap().clone()
    }

    pub fn probes(&self) -> Vec<ProcessProbe> {
        self.probes.lock().unwrap().clone()
    }
}

impl Shell for RecordingShell {
    fn run(&self, invocation: &Invocation, interrupt: &Interrupt) -> Result<(), CommandError> {
        self.runs.lock().unwrap().push(invocation.clone());

        if interrupt.is_triggered() {
            return Err(CommandError::Interrupted {
                program: invocation.program.clone(),
            });
        }

        if self.failing.lock().unwrap().contains(&invocation.to_string()) {
            return Err(CommandError::Exit {
                program: invocation.program.clone(),
                code: 1,
            });
        }

        if invocation.program == "git" && invocation.args.first().is_some_and(|a| a == "clone") {
            if let Some(target) = invocation.args.last() {
                let target = invocation.cwd.join(PathBuf::from(target));
                fs::create_dir_all(&target).map_err(|source| CommandError::Spawn {
                    program: "git".to_string(),
                    source,
                })?;
                let _ = fs::write(target.join("package.json"), "{}");
            }
        }

        Ok(())
    }

    fn spawn(&self, invocation: &Invocation) -> Result<Box<dyn Process>, CommandError> {
        self.spawns.lock().unwrap().push(invocation.clone());

        if self.failing.lock().unwrap().contains(&invocation.to_string()) {
            return Err(CommandError::Spawn {
                program: invocation.program.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "not found"),
            });
        }

        let (process, probe) = FakeProcess::running();
        self.probes.lock().unwrap().push(probe);
        Ok(Box::new(process))
    }

    fn lookup(&self, program: &str) -> Option<PathBuf> {
        self.on_path
            .lock()
            .unwrap()
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}

/// Records opened URLs; optionally fails every open with one error kind.
#[derive(Default)]
pub struct RecordingBrowser {
    opened: Mutex<Vec<String>>,
    failure: Option<io::ErrorKind>,
}

impl RecordingBrowser {
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::default()
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Browser for RecordingBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        match self.failure {
            Some(kind) => Err(io::Error::new(kind, "browser unavailable")),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Log(LogLevel, String),
    Started(String),
    Finished,
}

#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Log(_, message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn started(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ReportEvent::Started(_)))
            .count()
    }

    pub fn finished(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ReportEvent::Finished))
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn log(&self, level: LogLevel, message: String) {
        self.events.lock().unwrap().push(ReportEvent::Log(level, message));
    }

    fn step_started(&self, label: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ReportEvent::Started(label.to_string()));
    }

    fn step_finished(&self) {
        self.events.lock().unwrap().push(ReportEvent::Finished);
    }
}
