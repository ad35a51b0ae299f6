// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shared command context.
//!
//! Every command runs against the same handful of facts: where the user's
//! home directory is, where the dotfile repository is, which manifest to
//! enumerate, and how to run external commands. [`Context`] bundles them.

use crate::{
    config::{ConfigError, Manifest, ManifestPath},
    fsops::{self, Removal},
    path,
    prompt::{self, PromptError},
    report::Reporter,
    shell::Shell,
};

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, instrument};

/// Everything a command needs to know about the machine it runs on.
#[derive(Clone)]
pub struct Context {
    /// User's home directory.
    pub home: PathBuf,

    /// Dotfile repository root.
    pub repo: PathBuf,

    /// Static listing of managed content.
    pub manifest: Arc<Manifest>,

    /// Runner of external commands.
    pub shell: Arc<dyn Shell>,

    /// Skip confirmation prompts.
    pub auto_confirm: bool,

    /// Take backups before destructive operations.
    pub backup: bool,
}

impl Context {
    /// Construct new context with prompts and backups enabled.
    pub fn new(
        home: impl Into<PathBuf>,
        repo: impl Into<PathBuf>,
        manifest: Manifest,
        shell: Arc<dyn Shell>,
    ) -> Self {
        Self {
            home: home.into(),
            repo: repo.into(),
            manifest: Arc::new(manifest),
            shell,
            auto_confirm: false,
            backup: true,
        }
    }

    pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
        self.auto_confirm = auto_confirm;
        self
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    /// Resolve manifest path against home directory and repository.
    pub fn resolve(&self, path: &ManifestPath) -> PathBuf {
        path.resolve(&self.home, &self.repo)
    }

    /// Render path with home directory collapsed into a tilde.
    pub fn display(&self, path: impl AsRef<Path>) -> String {
        path::tildify(&self.home, path)
    }

    /// Get confirmation for a destructive operation.
    ///
    /// Prints the cancellation notice when declined.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError`] if the terminal cannot be prompted.
    pub fn confirm(&self, reporter: &mut Reporter, question: &str) -> Result<bool, PromptError> {
        if self.auto_confirm {
            reporter.line("Auto-confirmation enabled, proceeding...");
            return Ok(true);
        }

        let confirmed = prompt::confirm_destructive(question)?;
        if !confirmed {
            reporter.fail("Operation cancelled");
        }

        Ok(confirmed)
    }

    /// Remove path while reporting what happened.
    ///
    /// Returns false only if something existed at path and could not be
    /// removed.
    pub fn remove(&self, reporter: &mut Reporter, path: &Path, description: &str) -> bool {
        if !fsops::occupied(path) {
            reporter.success(format!("{description} not found (already clean)"));
            return true;
        }

        reporter.info(format!("Removing {description} at {}", self.display(path)));
        match fsops::remove_path(path) {
            Ok(Removal::Removed) => {
                reporter.success(format!("{description} removed"));
                true
            }
            Ok(Removal::Missing) => {
                reporter.success(format!("{description} not found (already clean)"));
                true
            }
            Err(error) => {
                reporter.warning(format!("Failed to remove {description}: {error}"));
                false
            }
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Context")
            .field("home", &self.home)
            .field("repo", &self.repo)
            .field("auto_confirm", &self.auto_confirm)
            .field("backup", &self.backup)
            .finish_non_exhaustive()
    }
}

/// Load manifest to operate with.
///
/// An explicit path must exist. Without one, the user manifest at
/// [`path::default_manifest_path`] is used when present, otherwise the
/// built-in manifest.
///
/// # Errors
///
/// - Return [`ContextError::Read`] if manifest file cannot be read.
/// - Return [`ContextError::Config`] if manifest cannot be parsed.
#[instrument(level = "debug")]
pub fn load_manifest(explicit: Option<&Path>) -> Result<Manifest> {
    let candidate = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => path::default_manifest_path()
            .ok()
            .filter(|path| path.exists()),
    };

    let Some(candidate) = candidate else {
        debug!("using built-in manifest");
        return Ok(Manifest::builtin()?);
    };

    debug!("using manifest at {}", candidate.display());
    let data = fs::read_to_string(&candidate).map_err(|source| ContextError::Read {
        path: candidate.clone(),
        source,
    })?;

    Ok(data.parse()?)
}

/// Context error types.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// Manifest file cannot be read.
    #[error("failed to read manifest {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest cannot be parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Friendly result alias :3
pub type Result<T, E = ContextError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::fake::FakeShell;
    use pretty_assertions::assert_eq;

    #[test]
    fn load_manifest_from_explicit_path() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let file = scratch.path().join("manifest.toml");
        let builtin = Manifest::builtin()?;
        fs::write(&file, builtin.to_string())?;

        assert_eq!(load_manifest(Some(file.as_path()))?, builtin);
        assert!(matches!(
            load_manifest(Some(scratch.path().join("missing.toml").as_path())),
            Err(ContextError::Read { .. })
        ));

        Ok(())
    }

    #[test]
    fn context_resolves_manifest_paths() -> anyhow::Result<()> {
        let context = Context::new(
            "/home/blah",
            "/src/dotfiles",
            Manifest::builtin()?,
            Arc::new(FakeShell::new()),
        );

        assert_eq!(
            context.resolve(&ManifestPath::new("~/.zshrc")),
            PathBuf::from("/home/blah/.zshrc")
        );
        assert_eq!(
            context.resolve(&ManifestPath::new("zsh/zshrc")),
            PathBuf::from("/src/dotfiles/zsh/zshrc")
        );
        assert_eq!(context.display("/home/blah/.zshrc"), "~/.zshrc");

        Ok(())
    }

    #[test]
    fn auto_confirm_skips_prompt() -> anyhow::Result<()> {
        let shell = Arc::new(FakeShell::new());
        let context =
            Context::new("/home/blah", "/src", Manifest::builtin()?, shell).with_auto_confirm(true);
        let mut reporter = Reporter::quiet();

        assert!(context.confirm(&mut reporter, "Remove everything?")?);
        assert_eq!(reporter.tally().fail, 0);

        Ok(())
    }
}
