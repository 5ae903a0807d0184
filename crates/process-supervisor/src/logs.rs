//! Per-run log sinks for child process output
//!
//! Every start attempt gets a fresh stdout/stderr file pair named with a
//! millisecond timestamp. Once the OS pid is known the pair is renamed to
//! pid-qualified names; the rename is best-effort and never fails a start.

use crate::error::{Error, Result};
use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Freshly created sink files plus the paths needed for the later rename
pub(crate) struct LogSinks {
    stdout: File,
    stderr: File,
    paths: LogPaths,
}

/// The on-disk names of one run's sink pair
pub(crate) struct LogPaths {
    dir: PathBuf,
    name: String,
    stdout: PathBuf,
    stderr: PathBuf,
}

impl LogSinks {
    /// Create the timestamped sink pair for one start attempt
    pub(crate) fn create(dir: &Path, name: &str) -> Result<Self> {
        let stamp = Utc::now().timestamp_millis();
        let stdout_path = dir.join(format!("{name}-{stamp}-stdout.txt"));
        let stderr_path = dir.join(format!("{name}-{stamp}-stderr.txt"));
        let stdout = File::create(&stdout_path).map_err(|source| Error::LogSink {
            path: stdout_path.clone(),
            source,
        })?;
        let stderr = File::create(&stderr_path).map_err(|source| Error::LogSink {
            path: stderr_path.clone(),
            source,
        })?;
        Ok(Self {
            stdout,
            stderr,
            paths: LogPaths {
                dir: dir.to_path_buf(),
                name: name.to_string(),
                stdout: stdout_path,
                stderr: stderr_path,
            },
        })
    }

    /// Split into the two sink files and the rename bookkeeping
    pub(crate) fn into_parts(self) -> (File, File, LogPaths) {
        (self.stdout, self.stderr, self.paths)
    }
}

impl LogPaths {
    /// Rename the sink pair to pid-qualified names, fire-and-forget
    pub(crate) fn promote(self, pid: u32) {
        smol::spawn(async move { self.rename_to_pid(pid).await }).detach();
    }

    async fn rename_to_pid(self, pid: u32) {
        let renames = [
            (
                self.stdout,
                self.dir.join(format!("{}-{pid}-stdout.txt", self.name)),
            ),
            (
                self.stderr,
                self.dir.join(format!("{}-{pid}-stderr.txt", self.name)),
            ),
        ];
        for (from, to) in renames {
            if let Err(err) = async_fs::rename(&from, &to).await {
                debug!(
                    from = %from.display(),
                    to = %to.display(),
                    error = %err,
                    "log rename failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn creates_timestamped_sink_pair() {
        let dir = TempDir::new().unwrap();
        let sinks = LogSinks::create(dir.path(), "worker").unwrap();
        let (mut stdout, _stderr, paths) = sinks.into_parts();
        writeln!(stdout, "hello").unwrap();

        assert!(paths.stdout.exists());
        assert!(paths.stderr.exists());
        let file_name = paths.stdout.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("worker-"));
        assert!(file_name.ends_with("-stdout.txt"));
    }

    #[smol_potat::test]
    async fn rename_to_pid_replaces_timestamped_names() {
        let dir = TempDir::new().unwrap();
        let sinks = LogSinks::create(dir.path(), "worker").unwrap();
        let (_stdout, _stderr, paths) = sinks.into_parts();
        let old_stdout = paths.stdout.clone();

        paths.rename_to_pid(4242).await;

        assert!(!old_stdout.exists());
        assert!(dir.path().join("worker-4242-stdout.txt").exists());
        assert!(dir.path().join("worker-4242-stderr.txt").exists());
    }

    #[smol_potat::test]
    async fn rename_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let sinks = LogSinks::create(dir.path(), "worker").unwrap();
        let (_stdout, _stderr, paths) = sinks.into_parts();
        std::fs::remove_file(&paths.stdout).unwrap();
        std::fs::remove_file(&paths.stderr).unwrap();

        // Nothing to rename; must complete without panicking.
        paths.rename_to_pid(1).await;
    }
}
