//! Managed process: one external OS child and its lifecycle
//!
//! A [`ManagedProcess`] owns the launch description for one child process.
//! It starts and stops the child, redirects its output to per-run log files,
//! and reports every lifecycle transition through a state-update
//! notification. `start` and `stop` never fail: anything that goes wrong at
//! the OS layer is absorbed into a warning plus the appropriate state
//! transition, and the notification stream is all a caller can observe.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::event::{ProcessUpdate, Subscribers};
use crate::logs::LogSinks;
use crate::state::ProcessState;
use async_channel::Receiver;
use async_process::{Child, Stdio};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Identifier of a managed process, unique within one [`IdGenerator`]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProcessId(u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues sequential [`ProcessId`]s
///
/// Clones share the same counter, so every process built through one
/// supervisor's generator gets a distinct id. The counter's lifetime is the
/// generator's; there is no process-wide state.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: Arc<AtomicU32>,
}

impl IdGenerator {
    /// Create a generator starting at id 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id
    pub fn next_id(&self) -> ProcessId {
        ProcessId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to one supervised external process
///
/// Cheap to clone; every clone observes and drives the same underlying
/// state. Equality is by process id.
#[derive(Clone)]
pub struct ManagedProcess {
    shared: Arc<ProcessShared>,
}

struct ProcessShared {
    id: ProcessId,
    name: String,
    command: Command,
    log_dir: PathBuf,
    run: Mutex<RunState>,
    updates: Subscribers<ProcessUpdate>,
}

struct RunState {
    state: ProcessState,
    pid: Option<u32>,
}

impl ManagedProcess {
    /// Create a process in the `Stopped` state
    ///
    /// The launch description is fixed here; per-run log files are written
    /// under `log_dir`.
    pub fn new(
        id: ProcessId,
        name: impl Into<String>,
        command: Command,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            shared: Arc::new(ProcessShared {
                id,
                name: name.into(),
                command,
                log_dir: log_dir.into(),
                run: Mutex::new(RunState {
                    state: ProcessState::Stopped,
                    pid: None,
                }),
                updates: Subscribers::new(),
            }),
        }
    }

    /// The process identifier
    pub fn id(&self) -> ProcessId {
        self.shared.id
    }

    /// The human-readable process name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProcessState {
        self.shared.run.lock().unwrap().state
    }

    /// OS pid of the current run, present while not `Stopped`
    pub fn pid(&self) -> Option<u32> {
        self.shared.run.lock().unwrap().pid
    }

    /// Subscribe to this process's state-update notifications
    pub fn subscribe(&self) -> Receiver<ProcessUpdate> {
        self.shared.updates.subscribe()
    }

    /// Launch the child process
    ///
    /// No-op unless the state is `Stopped`. Emits exactly one state-update
    /// whether or not the spawn succeeds; on failure the state is already
    /// back to `Stopped` by the time the update is observable.
    pub fn start(&self) {
        let mut run = self.shared.run.lock().unwrap();
        if run.state != ProcessState::Stopped {
            warn!(
                process = %self.shared.name,
                id = %self.shared.id,
                state = %run.state,
                "start requested while not stopped; ignoring"
            );
            return;
        }
        match self.launch() {
            Ok(child) => {
                let pid = child.id();
                info!(process = %self.shared.name, id = %self.shared.id, pid, "process started");
                run.state = ProcessState::Started;
                run.pid = Some(pid);
                self.watch(child);
            }
            Err(err) => {
                warn!(
                    process = %self.shared.name,
                    id = %self.shared.id,
                    error = %err,
                    "failed to start process"
                );
                run.state = ProcessState::Stopped;
                run.pid = None;
            }
        }
        // Emitted while the run lock is held so a fast exit cannot overtake
        // the start notification.
        self.shared.updates.send(ProcessUpdate::new(self.clone()));
    }

    /// Request termination of the child
    ///
    /// No-op unless the state is `Started`. The state moves to `Stopping`;
    /// `Stopped` is only reached once the child actually exits.
    pub fn stop(&self) {
        let mut run = self.shared.run.lock().unwrap();
        if run.state != ProcessState::Started {
            warn!(
                process = %self.shared.name,
                id = %self.shared.id,
                state = %run.state,
                "stop requested while not started; ignoring"
            );
            return;
        }
        if let Some(pid) = run.pid {
            debug!(process = %self.shared.name, id = %self.shared.id, pid, "requesting termination");
            if let Err(err) = request_termination(pid) {
                warn!(
                    process = %self.shared.name,
                    pid,
                    error = %err,
                    "failed to request termination"
                );
            }
        }
        run.state = ProcessState::Stopping;
        self.shared.updates.send(ProcessUpdate::new(self.clone()));
    }

    fn launch(&self) -> Result<Child> {
        let sinks = LogSinks::create(&self.shared.log_dir, &self.shared.name)?;
        let (stdout, stderr, paths) = sinks.into_parts();
        let mut command = self.shared.command.prepare();
        command.stdin(Stdio::null()).stdout(stdout).stderr(stderr);
        let child = command
            .spawn()
            .map_err(|source| Error::spawn(self.shared.command.program_lossy(), source))?;
        paths.promote(child.id());
        Ok(child)
    }

    /// Wait out the child's lifetime and drive the transition to `Stopped`
    fn watch(&self, mut child: Child) {
        let process = self.clone();
        smol::spawn(async move {
            match child.status().await {
                Ok(status) => {
                    #[cfg(unix)]
                    let signal = {
                        use std::os::unix::process::ExitStatusExt;
                        status.signal()
                    };
                    #[cfg(not(unix))]
                    let signal: Option<i32> = None;
                    info!(
                        process = %process.shared.name,
                        id = %process.shared.id,
                        code = ?status.code(),
                        signal = ?signal,
                        "process closed"
                    );
                }
                Err(err) => {
                    warn!(
                        process = %process.shared.name,
                        id = %process.shared.id,
                        error = %err,
                        "process reported a runtime error"
                    );
                }
            }
            process.closed();
        })
        .detach();
    }

    /// The run is over, whether it was requested or not
    fn closed(&self) {
        let mut run = self.shared.run.lock().unwrap();
        run.state = ProcessState::Stopped;
        run.pid = None;
        self.shared.updates.send(ProcessUpdate::new(self.clone()));
    }
}

impl PartialEq for ManagedProcess {
    fn eq(&self, other: &Self) -> bool {
        self.shared.id == other.shared.id
    }
}

impl Eq for ManagedProcess {}

impl fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
fn request_termination(pid: u32) -> Result<()> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(|source| Error::Signal {
        signal: 15,
        pid,
        source,
    })?;
    Ok(())
}

#[cfg(not(unix))]
fn request_termination(pid: u32) -> Result<()> {
    // No signal facility here; the monitor task still settles the state once
    // the child exits on its own.
    warn!(pid, "termination requests are not supported on this platform");
    Ok(())
}
