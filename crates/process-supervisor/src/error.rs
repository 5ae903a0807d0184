//! Error types for process supervision

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for supervisor operations
///
/// None of these escape `start`/`stop`: the supervisor absorbs them into log
/// lines and state transitions. The type is public so the internal seams
/// (launching, log-sink creation, signalling) stay reusable.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to spawn the child process
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// The program that could not be spawned
        program: String,
        /// The underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a log sink for a process run
    #[error("failed to create log sink {path}: {source}")]
    LogSink {
        /// The sink path that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to send a signal to the child process
    #[cfg(unix)]
    #[error("failed to send signal {signal} to pid {pid}: {source}")]
    Signal {
        /// The signal number that failed to send
        signal: i32,
        /// The process the signal was addressed to
        pid: u32,
        /// The underlying errno
        #[source]
        source: nix::Error,
    },
}

impl Error {
    /// Create a spawn error for the given program
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
