//! Lifecycle states shared by managed processes and process groups

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a managed process or a process group
///
/// `Stopped` covers both "never started" and "exited", whether or not the
/// exit was requested; there is no separate failed state. Callers that care
/// about the difference watch the notification stream instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Not running; also the state after a failed spawn or any exit
    Stopped,
    /// A spawn call succeeded and no stop has been requested
    ///
    /// This means "spawn succeeded", not "the child is ready to do work".
    Started,
    /// Termination has been requested but the child has not exited yet
    Stopping,
}

impl ProcessState {
    /// Returns true if this is `Stopped`
    pub fn is_stopped(&self) -> bool {
        matches!(self, ProcessState::Stopped)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Stopped => "stopped",
            ProcessState::Started => "started",
            ProcessState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_form() {
        assert_eq!(ProcessState::Stopping.to_string(), "stopping");
        let json = serde_json::to_string(&ProcessState::Stopping).unwrap();
        assert_eq!(json, "\"stopping\"");
    }

    #[test]
    fn only_stopped_is_stopped() {
        assert!(ProcessState::Stopped.is_stopped());
        assert!(!ProcessState::Started.is_stopped());
        assert!(!ProcessState::Stopping.is_stopped());
    }
}
