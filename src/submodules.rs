// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Git submodule management.
//!
//! The repository carries shell and terminal plugin managers as git
//! submodules. Initialization and updates go through libgit2 so transfer
//! progress can be shown and credentials can be prompted for. Everything
//! else shells out to `git`.

use crate::{context::Context, fsops, prompt::PromptError, report::Reporter};

use auth_git2::{GitAuthenticator, Prompter};
use git2::{Config, FetchOptions, RemoteCallbacks, Repository, Submodule, SubmoduleUpdateOptions};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{
    fs,
    path::{Path, PathBuf},
    time,
};
use tracing::{info, instrument};

/// Set up every submodule of the repository.
///
/// Adds manifest submodules when the repository has no `.gitmodules` yet,
/// then initializes and updates all submodules recursively, pulls the latest
/// commit of each manifest submodule, and verifies the result.
///
/// Returns true if no failures were reported.
///
/// # Errors
///
/// - Return [`SubmoduleError::Git2`] if libgit2 cannot enumerate submodules.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn setup(ctx: &Context, reporter: &mut Reporter) -> Result<bool> {
    reporter.banner("GIT SUBMODULES SETUP");

    let repository = match Repository::open(&ctx.repo) {
        Ok(repository) => repository,
        Err(error) => {
            reporter.fail(format!(
                "{} is not a git repository: {}",
                ctx.display(&ctx.repo),
                error.message()
            ));
            return Ok(reporter.finish("Submodule setup"));
        }
    };
    reporter.success("Git repository found");

    let repo = ctx.repo.to_string_lossy().into_owned();
    if !ctx.repo.join(".gitmodules").exists() {
        reporter.info("No .gitmodules found, adding submodules...");
        for submodule in &ctx.manifest.submodules {
            let path = submodule.path.to_string();
            let url = submodule.url.as_str();
            let args = ["-C", repo.as_str(), "submodule", "add", url, path.as_str()];
            match ctx.shell.run_interactive("git", &args).unwrap_or(false) {
                true => reporter.success(format!("Added {} ({})", path, submodule.description)),
                false => reporter.fail(format!("Failed to add submodule {path}")),
            }
        }
    }

    reporter.info("Initializing and updating submodules...");
    let updated = update_all(&repository, reporter)?;
    if updated == 0 {
        reporter.info("No submodules to update");
    }

    reporter.info("Pulling latest changes...");
    for submodule in &ctx.manifest.submodules {
        let path = ctx.resolve(&submodule.path);
        if !path.exists() {
            continue;
        }

        let path = path.to_string_lossy().into_owned();
        let args = ["-C", path.as_str(), "pull", "origin", "master"];
        match ctx.shell.succeeds("git", &args) {
            true => reporter.success(format!("{} is up to date", submodule.path)),
            false => {
                reporter.warning(format!("Could not pull latest changes for {}", submodule.path))
            }
        }
    }

    let verified = verify(ctx, reporter);
    Ok(reporter.finish("Submodule setup") && verified)
}

fn update_all(repository: &Repository, reporter: &mut Reporter) -> Result<usize> {
    let mut updated = 0;
    for mut submodule in repository.submodules()? {
        let name = submodule.path().display().to_string();
        let bar = ProgressBar::new(0);
        let result = update_one(&mut submodule, &name, bar.clone());
        bar.finish_and_clear();

        match result {
            Ok(()) => {
                reporter.success(format!("Updated submodule {name}"));
                updated += 1;
                if let Ok(nested) = submodule.open() {
                    updated += update_all(&nested, reporter)?;
                }
            }
            Err(error) => reporter.fail(format!("Failed to update submodule {name}: {error}")),
        }
    }

    Ok(updated)
}

fn update_one(submodule: &mut Submodule<'_>, name: &str, bar: ProgressBar) -> Result<()> {
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);
    bar.set_message(name.to_string());
    bar.enable_steady_tick(time::Duration::from_millis(100));

    let prompter = IndicatifPrompter::new(bar);
    let authenticator = GitAuthenticator::default().set_prompter(prompter.clone());
    let config = Config::open_default()?;

    let mut throttle = time::Instant::now();
    let mut rc = RemoteCallbacks::new();
    rc.credentials(authenticator.credentials(&config));
    rc.transfer_progress(|progress| {
        let stats = progress.to_owned();
        let bar_size = stats.total_objects() as u64;
        let bar_pos = stats.received_objects() as u64;
        if throttle.elapsed() > time::Duration::from_millis(10) {
            throttle = time::Instant::now();
            prompter.bar.set_length(bar_size);
            prompter.bar.set_position(bar_pos);
        }
        true
    });

    let mut fo = FetchOptions::new();
    fo.remote_callbacks(rc);
    let mut options = SubmoduleUpdateOptions::new();
    options.fetch(fo);
    submodule.update(true, Some(&mut options))?;

    Ok(())
}

/// Print status line of every submodule.
///
/// Returns false if `git submodule status` failed.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn status(ctx: &Context, reporter: &mut Reporter) -> bool {
    reporter.banner("GIT SUBMODULES STATUS");

    let repo = ctx.repo.to_string_lossy().into_owned();
    match ctx.shell.run("git", &["-C", repo.as_str(), "submodule", "status"]) {
        Ok(output) if output.success => {
            let lines = output.lines();
            if lines.is_empty() {
                reporter.info("No submodules found");
            }
            for line in lines {
                reporter.line(format!("  {line}"));
            }
            true
        }
        Ok(output) => {
            reporter.fail(format!("Failed to get submodule status: {}", output.stderr));
            false
        }
        Err(error) => {
            reporter.fail(format!("Failed to get submodule status: {error}"));
            false
        }
    }
}

/// Check every manifest submodule is checked out.
///
/// Returns true if every submodule directory exists and holds a `.git`
/// entry.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn verify(ctx: &Context, reporter: &mut Reporter) -> bool {
    reporter.section("Submodule verification");

    let mut verified = true;
    for submodule in &ctx.manifest.submodules {
        let path = ctx.resolve(&submodule.path);
        if !path.is_dir() {
            reporter.fail(format!("{} missing", submodule.path));
            verified = false;
        } else if !fsops::occupied(path.join(".git")) {
            reporter.fail(format!("{} is not initialized", submodule.path));
            verified = false;
        } else {
            reporter.success(format!("{} ({})", submodule.path, submodule.description));
        }
    }

    verified
}

/// Deinitialize submodules and remove their checkouts.
///
/// `.gitmodules` is preserved so setup can restore everything.
///
/// Returns `Ok(false)` if the user declined, or if something could not be
/// removed.
///
/// # Errors
///
/// - Return [`SubmoduleError::Prompt`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn clean(ctx: &Context, reporter: &mut Reporter) -> Result<bool> {
    let targets = cleanup_targets(ctx);

    reporter.banner("GIT SUBMODULES CLEANUP");
    reporter.line("This will deinitialize all submodules and remove:");
    for (path, description) in &targets {
        reporter.line(format!("  • {} ({description})", ctx.display(path)));
    }
    reporter.line("\n.gitmodules will be preserved");

    if !ctx.confirm(reporter, "Remove git submodules?")? {
        return Ok(false);
    }

    let repo = ctx.repo.to_string_lossy().into_owned();
    let args = ["-C", repo.as_str(), "submodule", "deinit", "--all", "--force"];
    match ctx.shell.succeeds("git", &args) {
        true => reporter.success("Submodules deinitialized"),
        false => reporter.warning("Could not deinitialize submodules, removing directories anyway"),
    }

    let mut clean = true;
    for (path, description) in &targets {
        clean &= ctx.remove(reporter, path, description);
    }

    reporter.finish("Submodule cleanup");
    Ok(clean)
}

/// Known submodule directories, plus anything `.gitmodules` lists, plus the
/// cached module repositories.
fn cleanup_targets(ctx: &Context) -> Vec<(PathBuf, String)> {
    let mut targets: Vec<(PathBuf, String)> = ctx
        .manifest
        .submodules
        .iter()
        .map(|submodule| (ctx.resolve(&submodule.path), submodule.description.clone()))
        .collect();

    let listed = fs::read_to_string(ctx.repo.join(".gitmodules")).unwrap_or_default();
    for path in gitmodules_paths(&listed) {
        let path = ctx.repo.join(path);
        if !targets.iter().any(|(known, _)| *known == path) {
            targets.push((path, "submodule".into()));
        }
    }

    targets.push((ctx.repo.join(".git").join("modules"), "cached submodule repositories".into()));
    targets
}

/// Extract `path = ...` values out of `.gitmodules` content.
fn gitmodules_paths(content: &str) -> Vec<&Path> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("path"))
        .filter_map(|rest| rest.trim_start().strip_prefix('='))
        .map(|value| Path::new(value.trim()))
        .filter(|value| !value.as_os_str().is_empty())
        .collect()
}

/// Git2 authentication prompter for progress bar.
#[derive(Debug, Clone)]
pub struct IndicatifPrompter {
    pub(crate) bar: ProgressBar,
}

impl IndicatifPrompter {
    /// Construct new progress bar authenticator.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| -> Option<(String, String)> {
            let username = Text::new("username").prompt().ok()?;
            let password = Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()?;
            Some((username, password))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| -> Option<String> {
            Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| -> Option<String> {
            Password::new("passphrase")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }
}

/// Submodule error types.
#[derive(Debug, thiserror::Error)]
pub enum SubmoduleError {
    /// Confirmation prompt fails.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = SubmoduleError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Manifest,
        shell::{fake::FakeShell, CommandOutput},
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn gitmodules_paths_extracted() {
        let content = indoc! {r#"
            [submodule "zsh/zplug"]
                path = zsh/zplug
                url = https://github.com/zplug/zplug
            [submodule "extra"]
            	path=vendor/extra
        "#};

        assert_eq!(
            gitmodules_paths(content),
            vec![Path::new("zsh/zplug"), Path::new("vendor/extra")]
        );
    }

    #[test]
    fn verify_requires_git_entry() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        fs::create_dir_all(scratch.path().join("zsh/zplug"))?;
        fs::write(scratch.path().join("zsh/zplug/.git"), "gitdir: ../../.git/modules/zsh/zplug")?;
        fs::create_dir_all(scratch.path().join("tmux/plugins/tpm"))?;
        let shell = Arc::new(FakeShell::new());
        let ctx = Context::new(scratch.path(), scratch.path(), Manifest::builtin()?, shell);
        let mut reporter = Reporter::quiet();

        assert!(!verify(&ctx, &mut reporter));
        assert_eq!(reporter.tally().ok, 1);
        assert_eq!(reporter.tally().fail, 1);

        Ok(())
    }

    #[test]
    fn status_without_submodules() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let command = format!("git -C {} submodule status", scratch.path().display());
        let shell = FakeShell::new().respond(&command, CommandOutput::ok(""));
        let ctx =
            Context::new(scratch.path(), scratch.path(), Manifest::builtin()?, Arc::new(shell));
        let mut reporter = Reporter::quiet();

        assert!(status(&ctx, &mut reporter));
        assert_eq!(
            reporter.entries(),
            &[(crate::report::Level::Info, "No submodules found".to_string())]
        );

        Ok(())
    }

    #[test]
    fn clean_preserves_gitmodules() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let repo = scratch.path();
        fs::write(
            repo.join(".gitmodules"),
            "[submodule \"extra\"]\n\tpath = vendor/extra\n\turl = https://example.org/extra\n",
        )?;
        fs::create_dir_all(repo.join("zsh/zplug"))?;
        fs::create_dir_all(repo.join("vendor/extra"))?;
        fs::create_dir_all(repo.join(".git/modules/zsh/zplug"))?;
        let ctx = Context::new(repo, repo, Manifest::builtin()?, Arc::new(FakeShell::new()))
            .with_auto_confirm(true);

        assert!(clean(&ctx, &mut Reporter::quiet())?);
        assert!(!repo.join("zsh/zplug").exists());
        assert!(!repo.join("vendor/extra").exists());
        assert!(!repo.join(".git/modules").exists());
        assert!(repo.join(".gitmodules").exists());

        assert!(clean(&ctx, &mut Reporter::quiet())?);

        Ok(())
    }

    #[test]
    fn setup_outside_git_repository_fails() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let shell = Arc::new(FakeShell::new());
        let ctx = Context::new(scratch.path(), scratch.path(), Manifest::builtin()?, shell);

        assert!(!setup(&ctx, &mut Reporter::quiet())?);

        Ok(())
    }
}
