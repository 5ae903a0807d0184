//! Command type for describing launchable child processes

use async_process::Command as AsyncCommand;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// A description of how to launch a child process
///
/// Unlike `async_process::Command`, this type is `Clone`, so one description
/// can launch the same child many times over the life of a supervisor.
/// Stdio wiring is deliberately absent here; the launching side owns that.
#[derive(Debug, Clone)]
pub struct Command {
    /// The program to execute
    program: OsString,
    /// The arguments to pass to the program
    args: Vec<OsString>,
    /// Environment variables to set
    env: HashMap<OsString, OsString>,
    /// Working directory for the child
    current_dir: Option<PathBuf>,
}

impl Command {
    /// Create a new command for the given program
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            env: HashMap::new(),
            current_dir: None,
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.arg(arg);
        }
        self
    }

    /// Set an environment variable
    pub fn env<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.env
            .insert(key.as_ref().to_owned(), val.as_ref().to_owned());
        self
    }

    /// Set the working directory for the child
    pub fn current_dir<P: AsRef<Path>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.as_ref().to_owned());
        self
    }

    /// Get the program name
    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    /// Get the arguments
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Get the environment variables
    pub fn get_envs(&self) -> &HashMap<OsString, OsString> {
        &self.env
    }

    /// Get the working directory
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// The program name as a lossy string, for log lines and error messages
    pub fn program_lossy(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Prepare this command for execution by converting to an `async_process::Command`
    pub fn prepare(&self) -> AsyncCommand {
        let mut cmd = AsyncCommand::new(&self.program);
        cmd.args(&self.args);
        for (key, val) in &self.env {
            cmd.env(key, val);
        }
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_creation() {
        let cmd = Command::new("echo");
        assert_eq!(cmd.get_program(), "echo");
        assert!(cmd.get_args().is_empty());
        assert!(cmd.get_current_dir().is_none());
    }

    #[test]
    fn command_with_args_env_and_dir() {
        let mut cmd = Command::new("ls");
        cmd.arg("-l").args(["-a", "/tmp"]);
        cmd.env("TEST_VAR", "test_value");
        cmd.current_dir("/tmp");

        assert_eq!(cmd.get_args().len(), 3);
        assert_eq!(cmd.get_args()[0], "-l");
        assert_eq!(cmd.get_args()[1], "-a");
        assert_eq!(cmd.get_args()[2], "/tmp");
        assert_eq!(
            cmd.get_envs().get(OsStr::new("TEST_VAR")),
            Some(&OsString::from("test_value"))
        );
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/tmp")));
    }

    #[test]
    fn command_is_reusable_after_prepare() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");

        let _first = cmd.prepare();
        let _second = cmd.prepare();
        assert_eq!(cmd.get_args().len(), 1);
        assert_eq!(cmd.get_args()[0], "hello");
    }

    #[test]
    fn program_lossy_round_trips_plain_names() {
        let cmd = Command::new("sleep");
        assert_eq!(cmd.program_lossy(), "sleep");
    }
}
