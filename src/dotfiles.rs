// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile symlinks.
//!
//! Link configuration files tracked in the repository into their
//! conventional locations under the user's home directory, check that the
//! links still point where they should, and take them down again. Files in
//! the repository itself are never modified.

use crate::{
    category::{self, DotfileCategory},
    context::Context,
    fsops::{self, LinkState},
    prompt::Result,
    report::Reporter,
};

use std::path::PathBuf;
use tracing::instrument;

/// Link every manifest dotfile into the home directory.
///
/// Missing repository sources are skipped with a warning. A link that
/// cannot be created is reported as a failure and installation moves on to
/// the next one.
///
/// Returns true if no failures were reported.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn install(ctx: &Context, reporter: &mut Reporter) -> bool {
    reporter.banner("DOTFILES INSTALLATION");

    for link in &ctx.manifest.links {
        let source = ctx.resolve(&link.source);
        let target = ctx.resolve(&link.target);

        if !fsops::occupied(&source) {
            reporter.warning(format!(
                "Skipping {}: {} not found in repository",
                link.description,
                ctx.display(&source)
            ));
            continue;
        }

        match fsops::create_symlink(&source, &target) {
            Ok(()) => reporter.success(format!(
                "Linked {} -> {}",
                ctx.display(&target),
                ctx.display(&source)
            )),
            Err(error) => reporter.fail(format!("Failed to link {}: {error}", link.description)),
        }
    }

    reporter.finish("Dotfiles installation")
}

/// Check every manifest dotfile is linked to its repository source.
///
/// Returns true if every link is correct.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn verify(ctx: &Context, reporter: &mut Reporter) -> bool {
    reporter.banner("DOTFILES VERIFICATION");

    for link in &ctx.manifest.links {
        let source = ctx.resolve(&link.source);
        let target = ctx.resolve(&link.target);
        let shown = ctx.display(&target);

        match fsops::link_state(&target, &source) {
            LinkState::Linked => reporter.success(format!("{shown} -> {}", link.source)),
            LinkState::Missing => reporter.fail(format!("{shown} is not linked")),
            LinkState::Elsewhere(other) => {
                reporter.fail(format!("{shown} points to {}", ctx.display(other)))
            }
            LinkState::File | LinkState::Directory => {
                reporter.fail(format!("{shown} exists but is not a symlink"))
            }
        }
    }

    reporter.finish("Dotfiles verification")
}

/// Remove dotfile symlinks belonging to target categories.
///
/// An empty category list selects every category.
///
/// Returns `Ok(false)` if the user declined, or if something could not be
/// removed.
///
/// # Errors
///
/// - Return [`crate::prompt::PromptError`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn clean(
    ctx: &Context,
    reporter: &mut Reporter,
    categories: &[DotfileCategory],
) -> Result<bool> {
    let selected = category::expand(categories);

    reporter.banner("DOTFILES CLEANUP");
    reporter.line("This will remove dotfiles symlinks:");
    for category in &selected {
        reporter.line(format!("\n{category}:"));
        for (path, description) in targets(ctx, *category) {
            reporter.line(format!("  • {} ({description})", ctx.display(path)));
        }
    }
    reporter.line("\nOriginal config files in the repository will be preserved");

    if !ctx.confirm(reporter, "Remove dotfiles symlinks?")? {
        return Ok(false);
    }

    reporter.info("Starting dotfiles cleanup...");
    let mut clean = true;
    for category in selected {
        reporter.section(format!("{category} Configuration Cleanup"));
        for (path, description) in targets(ctx, category) {
            clean &= ctx.remove(reporter, &path, &description);
        }
    }

    reporter.finish("Dotfiles cleanup");
    reporter.line("You can recreate them with: devboot dotfiles install");

    Ok(clean)
}

/// Home directory paths managed under target category.
///
/// The Neovim category owns the configuration directory link which the
/// neovim command creates.
fn targets(ctx: &Context, category: DotfileCategory) -> Vec<(PathBuf, String)> {
    let mut targets: Vec<(PathBuf, String)> = ctx
        .manifest
        .links
        .iter()
        .filter(|link| link.category == category)
        .map(|link| (ctx.resolve(&link.target), link.description.clone()))
        .collect();

    if category == DotfileCategory::Neovim {
        targets.push((
            ctx.resolve(&ctx.manifest.neovim.config_link),
            "neovim config directory symlink".into(),
        ));
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Manifest, shell::fake::FakeShell};
    use pretty_assertions::assert_eq;
    use std::{fs, sync::Arc};

    fn scratch_context(scratch: &std::path::Path) -> anyhow::Result<Context> {
        let home = scratch.join("home");
        let repo = scratch.join("repo");
        fs::create_dir_all(&home)?;
        fs::create_dir_all(repo.join("zsh/zplug"))?;
        fs::create_dir_all(repo.join("tmux"))?;
        fs::write(repo.join("zsh/zshrc"), "# zshrc")?;
        fs::write(repo.join("gitconfig"), "[user]")?;
        fs::write(repo.join("tmux/tmux.conf"), "# tmux")?;

        Ok(Context::new(home, repo, Manifest::builtin()?, Arc::new(FakeShell::new()))
            .with_auto_confirm(true))
    }

    #[cfg(unix)]
    #[test]
    fn install_links_present_sources_and_skips_missing() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ctx = scratch_context(scratch.path())?;
        let mut reporter = Reporter::quiet();

        assert!(install(&ctx, &mut reporter));
        assert_eq!(fs::read_link(ctx.home.join(".zshrc"))?, ctx.repo.join("zsh/zshrc"));
        assert_eq!(fs::read_link(ctx.home.join(".tmux.conf"))?, ctx.repo.join("tmux/tmux.conf"));
        assert_eq!(fs::read_link(ctx.home.join(".zplug"))?, ctx.repo.join("zsh/zplug"));

        // screenrc, sshrc and tools are absent from the scratch repository.
        assert_eq!(reporter.tally().warn, 3);
        assert!(!fsops::occupied(ctx.home.join(".screenrc")));

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn clean_restricted_to_category() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ctx = scratch_context(scratch.path())?;
        install(&ctx, &mut Reporter::quiet());

        let mut reporter = Reporter::quiet();
        assert!(clean(&ctx, &mut reporter, &[DotfileCategory::Git])?);
        assert!(!fsops::occupied(ctx.home.join(".gitconfig")));
        assert!(fsops::occupied(ctx.home.join(".zshrc")));
        assert!(ctx.repo.join("gitconfig").exists());

        Ok(())
    }

    #[test]
    fn neovim_category_owns_config_link() -> anyhow::Result<()> {
        let shell = Arc::new(FakeShell::new());
        let ctx = Context::new("/home/blah", "/src", Manifest::builtin()?, shell);
        let result = targets(&ctx, DotfileCategory::Neovim);
        assert_eq!(
            result,
            vec![(
                PathBuf::from("/home/blah/.config/nvim"),
                "neovim config directory symlink".to_string()
            )]
        );

        Ok(())
    }
}
