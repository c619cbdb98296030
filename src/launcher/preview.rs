use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::launcher::error::LauncherError;
use crate::launcher::shell::{Interrupt, Process};

const PROBE_INTERVAL: Duration = Duration::from_millis(200);
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const EXIT_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewStatus {
    Running,
    Exited,
    Stopped,
}

/// Handle to the preview server started by a launch.
///
/// Owning the handle owns the process: dropping it stops the server.
pub struct PreviewServer {
    process: Option<Box<dyn Process>>,
    url: String,
    status: PreviewStatus,
}

impl fmt::Debug for PreviewServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewServer")
            .field("pid", &self.process.as_ref().map(|p| p.id()))
            .field("url", &self.url)
            .field("status", &self.status)
            .finish()
    }
}

impl PreviewServer {
    /// Wait until `host:port` accepts connections, the process exits, `timeout` passes or
    /// `interrupt` is triggered. On any failure the process is stopped before returning.
    pub fn await_ready(
        process: Box<dyn Process>,
        host: &str,
        port: u16,
        url: String,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<Self, LauncherError> {
        let mut server = Self {
            process: Some(process),
            url,
            status: PreviewStatus::Running,
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let ready_rx = spawn_probe(format!("{host}:{port}"), Arc::clone(&cancel));
        let deadline = Instant::now() + timeout;

        let outcome = loop {
            match ready_rx.recv_timeout(EXIT_POLL) {
                Ok(()) => break Ok(()),
                Err(RecvTimeoutError::Disconnected) => {
                    break Err(LauncherError::PreviewNotReady {
                        url: server.url.clone(),
                        timeout,
                    });
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if interrupt.is_triggered() {
                break Err(LauncherError::PreviewInterrupted {
                    url: server.url.clone(),
                });
            }

            if server.poll_exited() {
                break Err(LauncherError::PreviewExited {
                    url: server.url.clone(),
                });
            }

            if Instant::now() >= deadline {
                break Err(LauncherError::PreviewNotReady {
                    url: server.url.clone(),
                    timeout,
                });
            }
        };

        cancel.store(true, Ordering::Relaxed);

        match outcome {
            Ok(()) => {
                tracing::info!("preview server ready at {}", server.url);
                Ok(server)
            }
            Err(err) => {
                tracing::error!("{err}");
                server.stop();
                Err(err)
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Refresh the status from the process table. Returns true once the server has exited.
    pub fn poll_exited(&mut self) -> bool {
        if self.status != PreviewStatus::Running {
            return true;
        }

        let exited = match self.process.as_mut() {
            Some(process) => process.has_exited().unwrap_or(true),
            None => true,
        };

        if exited {
            tracing::warn!("preview server for {} exited", self.url);
            self.status = PreviewStatus::Exited;
            self.process = None;
        }

        exited
    }

    pub fn stop(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };

        match process.kill() {
            Ok(()) => tracing::info!("stopped preview server (pid {})", process.id()),
            Err(err) => tracing::warn!("failed to stop preview server: {err}"),
        }

        self.status = PreviewStatus::Stopped;
    }
}

impl Drop for PreviewServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_probe(addr: String, cancel: Arc<AtomicBool>) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        while !cancel.load(Ordering::Relaxed) {
            if is_reachable(&addr) {
                let _ = tx.send(());
                return;
            }
            thread::sleep(PROBE_INTERVAL);
        }
    });

    rx
}

fn is_reachable(addr: &str) -> bool {
    let Ok(addrs) = addr.to_socket_addrs() else {
        return false;
    };

    addrs
        .into_iter()
        .any(|socket| TcpStream::connect_timeout(&socket, CONNECT_TIMEOUT).is_ok())
}
