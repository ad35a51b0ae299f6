// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command execution.
//!
//! Every external tool devboot drives (`brew`, `git`, `uv`, `curl`, and so
//! on) is reached through the [`Shell`] trait. The [`SystemShell`]
//! implementation spawns real processes. Tests swap in a scripted shell so
//! that no command ever reaches the host.

use std::process::{Command, Stdio};
use tracing::debug;

/// Captured output of a finished command.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Command exited with a zero status.
    pub success: bool,

    /// Standard output with trailing newline chomped.
    pub stdout: String,

    /// Standard error with trailing newline chomped.
    pub stderr: String,
}

impl CommandOutput {
    /// Construct successful output carrying target standard output.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Construct failed output carrying target standard error.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Non-empty lines of standard output, trimmed.
    pub fn lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Runner of external commands.
pub trait Shell: Send + Sync {
    /// Run command to completion capturing its output.
    ///
    /// A command that runs but exits with a non-zero status is not an error,
    /// check [`CommandOutput::success`].
    ///
    /// # Errors
    ///
    /// - Return [`ShellError::Spawn`] if the command could not be started.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run command to completion with inherited standard streams.
    ///
    /// Returns whether the command exited successfully.
    ///
    /// # Errors
    ///
    /// - Return [`ShellError::Spawn`] if the command could not be started.
    fn run_interactive(&self, program: &str, args: &[&str]) -> Result<bool>;

    /// Run command and check that it exited successfully.
    ///
    /// A command that could not be started counts as unsuccessful.
    fn succeeds(&self, program: &str, args: &[&str]) -> bool {
        self.run(program, args)
            .map(|output| output.success)
            .unwrap_or(false)
    }

    /// Run command and return its standard output.
    ///
    /// # Errors
    ///
    /// - Return [`ShellError::Spawn`] if the command could not be started.
    /// - Return [`ShellError::Failed`] if the command exits unsuccessfully.
    fn stdout(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = self.run(program, args)?;
        if !output.success {
            return Err(ShellError::Failed {
                command: render(program, args),
                message: output.stderr,
            });
        }

        Ok(output.stdout)
    }

    /// Run arbitrary shell script through `sh -c`.
    ///
    /// # Errors
    ///
    /// - Return [`ShellError::Spawn`] if `sh` could not be started.
    fn script(&self, script: &str) -> Result<CommandOutput> {
        self.run("sh", &["-c", script])
    }

    /// Locate command through `which`.
    fn which(&self, command: &str) -> Option<String> {
        self.run("which", &[command])
            .ok()
            .filter(|output| output.success && !output.stdout.is_empty())
            .map(|output| output.stdout)
    }
}

/// Shell that spawns real processes on the host.
#[derive(Default, Debug, Clone, Copy)]
pub struct SystemShell;

impl SystemShell {
    /// Construct new system shell.
    pub fn new() -> Self {
        Self
    }
}

impl Shell for SystemShell {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("run {}", render(program, args));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ShellError::Spawn {
                command: render(program, args),
                source,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: chomp(String::from_utf8_lossy(output.stdout.as_slice()).into_owned()),
            stderr: chomp(String::from_utf8_lossy(output.stderr.as_slice()).into_owned()),
        })
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> Result<bool> {
        debug!("run interactive {}", render(program, args));
        let status = Command::new(program)
            .args(args)
            .spawn()
            .and_then(|mut child| child.wait())
            .map_err(|source| ShellError::Spawn {
                command: render(program, args),
                source,
            })?;

        Ok(status.success())
    }
}

/// Render command line for logs and error messages.
pub fn render(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

// INVARIANT: Chomp trailing newlines.
fn chomp(message: String) -> String {
    message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message)
}

/// Command execution error types.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Command could not be spawned.
    #[error("failed to run {command:?}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Command ran but exited unsuccessfully.
    #[error("command {command:?} failed: {message}")]
    Failed { command: String, message: String },
}

/// Friendly result alias :3
pub type Result<T, E = ShellError> = std::result::Result<T, E>;


#[cfg(test)]
mod tests {
    use super::fake::FakeShell;
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test_case("blah\n", "blah"; "unix newline")]
    #[test_case("blah\r\n", "blah"; "windows newline")]
    #[test_case("blah", "blah"; "no newline")]
    #[test_case("blah\n\n", "blah\n"; "only one newline")]
    #[test]
    fn chomp_trailing_newline(input: &str, expect: &str) {
        pretty_assertions::assert_eq!(chomp(input.to_string()), expect);
    }

    #[test]
    fn stdout_reports_failure() {
        let shell = FakeShell::new()
            .respond("brew --prefix", CommandOutput::ok("/opt/homebrew"))
            .respond("brew tap", CommandOutput::failed("no network"));

        assert_eq!(shell.stdout("brew", &["--prefix"]).ok(), Some("/opt/homebrew".into()));
        assert!(matches!(
            shell.stdout("brew", &["tap"]),
            Err(ShellError::Failed { message, .. }) if message == "no network"
        ));
    }

    #[test]
    fn which_requires_success_and_output() {
        let shell = FakeShell::new()
            .respond("which git", CommandOutput::ok("/usr/bin/git"))
            .respond("which zsh", CommandOutput::ok(""));

        assert_eq!(shell.which("git"), Some("/usr/bin/git".into()));
        assert_eq!(shell.which("zsh"), None);
        assert_eq!(shell.which("brew"), None);
        assert_eq!(shell.calls(), vec!["which git", "which zsh", "which brew"]);
    }

    #[test]
    fn output_lines_skip_blanks() {
        let output = CommandOutput::ok("  git \n\n tree\n");
        assert_eq!(output.lines(), vec!["git", "tree"]);
    }
}
