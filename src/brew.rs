// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Homebrew command wrapper.
//!
//! Thin typed layer over the `brew` command line. Queries capture output,
//! while anything that installs or removes software inherits the terminal so
//! the user can watch Homebrew work.

use crate::shell::{Shell, ShellError};

use std::path::PathBuf;
use tracing::debug;

/// Command that installs Homebrew itself.
pub const HOMEBREW_INSTALLER: &str = concat!(
    "/bin/bash -c \"$(curl -fsSL ",
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)\"",
);

/// Handle to the `brew` command.
#[derive(Clone, Copy)]
pub struct Brew<'shell> {
    shell: &'shell dyn Shell,
}

impl<'shell> Brew<'shell> {
    /// Construct new Homebrew handle running through target shell.
    pub fn new(shell: &'shell dyn Shell) -> Self {
        Self { shell }
    }

    /// Check if Homebrew is installed.
    pub fn available(&self) -> bool {
        self.shell.succeeds("brew", &["--version"])
    }

    /// Install Homebrew through its official installer.
    pub fn bootstrap(&self) -> bool {
        self.shell
            .run_interactive("sh", &["-c", HOMEBREW_INSTALLER])
            .unwrap_or(false)
    }

    /// Installation prefix reported by Homebrew.
    pub fn prefix(&self) -> Option<PathBuf> {
        self.shell
            .stdout("brew", &["--prefix"])
            .ok()
            .filter(|prefix| !prefix.is_empty())
            .map(PathBuf::from)
    }

    /// Installed formulae.
    ///
    /// # Errors
    ///
    /// - Return [`BrewError`] if `brew list --formula` fails.
    pub fn formulae(&self) -> Result<Vec<String>> {
        self.list(&["list", "--formula"])
    }

    /// Installed casks.
    ///
    /// # Errors
    ///
    /// - Return [`BrewError`] if `brew list --cask` fails.
    pub fn casks(&self) -> Result<Vec<String>> {
        self.list(&["list", "--cask"])
    }

    /// Registered taps.
    ///
    /// # Errors
    ///
    /// - Return [`BrewError`] if `brew tap` fails.
    pub fn taps(&self) -> Result<Vec<String>> {
        self.list(&["tap"])
    }

    /// Check if tap is registered.
    pub fn has_tap(&self, tap: &str) -> bool {
        self.taps()
            .map(|taps| taps.iter().any(|registered| registered == tap))
            .unwrap_or(false)
    }

    /// Check if formula is installed.
    pub fn is_installed(&self, name: &str) -> bool {
        self.shell.succeeds("brew", &["list", name])
    }

    /// Check if cask is installed.
    pub fn is_cask_installed(&self, name: &str) -> bool {
        self.shell.succeeds("brew", &["list", "--cask", name])
    }

    /// Location of tap repository.
    ///
    /// # Errors
    ///
    /// - Return [`BrewError`] if `brew --repo` fails.
    pub fn repo_of(&self, tap: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(self.shell.stdout("brew", &["--repo", tap])?))
    }

    /// Run `brew` subcommand attached to the terminal.
    ///
    /// Returns whether the subcommand succeeded.
    pub fn run(&self, args: &[&str]) -> bool {
        debug!("brew {}", args.join(" "));
        match self.shell.run_interactive("brew", args) {
            Ok(success) => success,
            Err(error) => {
                debug!("{error}");
                false
            }
        }
    }

    /// Run `brew` subcommand capturing output.
    ///
    /// # Errors
    ///
    /// - Return [`BrewError`] if the subcommand fails.
    pub fn query(&self, args: &[&str]) -> Result<String> {
        Ok(self.shell.stdout("brew", args)?)
    }

    fn list(&self, args: &[&str]) -> Result<Vec<String>> {
        let output = self.shell.stdout("brew", args)?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }
}

/// Homebrew error types.
#[derive(Debug, thiserror::Error)]
pub enum BrewError {
    /// Homebrew command fails.
    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Friendly result alias :3
pub type Result<T, E = BrewError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{fake::FakeShell, CommandOutput};
    use pretty_assertions::assert_eq;

    #[test]
    fn list_queries_parse_lines() -> anyhow::Result<()> {
        let shell = FakeShell::new()
            .respond("brew list --formula", CommandOutput::ok("git\ntree\n\nzsh"))
            .respond("brew tap", CommandOutput::ok("hashicorp/tap\nlocal/custom"));
        let brew = Brew::new(&shell);

        assert_eq!(brew.formulae()?, vec!["git", "tree", "zsh"]);
        assert!(brew.has_tap("local/custom"));
        assert!(!brew.has_tap("local/other"));
        assert!(brew.casks().is_err());

        Ok(())
    }

    #[test]
    fn prefix_requires_output() {
        let shell = FakeShell::new().respond("brew --prefix", CommandOutput::ok("/usr/local"));
        assert_eq!(Brew::new(&shell).prefix(), Some(PathBuf::from("/usr/local")));
        assert_eq!(Brew::new(&FakeShell::new()).prefix(), None);
    }
}
