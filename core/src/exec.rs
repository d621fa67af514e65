//! External process execution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Helper to convert Path to &str with proper error handling
pub(crate) fn path_to_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::validation(format!("Invalid path encoding: {}", path.display())))
}

/// A command to run: program, arguments, optional working directory and
/// extra environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Shell-like rendering used in logs and error messages
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Output from a command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external commands synchronously
pub trait CommandRunner {
    /// Run a command and capture its output, whatever the exit status
    fn run(&self, cmd: &CommandLine) -> Result<CommandOutput>;

    /// Run a command, treating a non-zero exit status as an error
    fn run_checked(&self, cmd: &CommandLine) -> Result<CommandOutput> {
        log::debug!("running: {}", cmd.display());
        let output = self.run(cmd)?;
        if !output.success() {
            return Err(Error::CommandFailed {
                cmd: cmd.display(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// Runs commands on the local host via `std::process::Command`
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn parse_output(&self, output: Output) -> CommandOutput {
        CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandLine) -> Result<CommandOutput> {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &cmd.envs {
            command.env(key, value);
        }

        let output = command.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound(cmd.program.clone())
            } else {
                Error::Command {
                    cmd: cmd.display(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(self.parse_output(output))
    }
}
