// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Neovim configuration.
//!
//! The Neovim configuration lives in the repository and gets linked into
//! `~/.config/nvim`. Installing also prepares a Python provider environment
//! through uv, fetches the plugin manager, and installs plugins headlessly.

use crate::{
    context::Context,
    fsops::{self, LinkState},
    prompt::Result,
    report::Reporter,
};

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, instrument};

/// Install and configure Neovim.
///
/// Returns true if no step failed. A failed plugin installation is only a
/// warning.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn install(ctx: &Context, reporter: &mut Reporter) -> bool {
    let layout = &ctx.manifest.neovim;
    let config_dir = ctx.resolve(&layout.config_dir);

    reporter.banner("NEOVIM INSTALLATION");

    for dir in [
        config_dir.clone(),
        config_dir.join("autoload"),
        config_dir.join("plugged"),
    ] {
        if let Err(error) = fsops::ensure_dir(&dir) {
            reporter.fail(format!("Cannot create {}: {error}", ctx.display(&dir)));
            return reporter.finish("Neovim installation");
        }
    }
    reporter.success("Neovim directories ready");

    link_config(ctx, reporter, &config_dir);
    create_python_environment(ctx, reporter, &config_dir);
    install_plug(ctx, reporter, &config_dir);
    check_nvim(ctx, reporter);
    install_plugins(ctx, reporter);

    let succeeded = reporter.finish("Neovim installation");
    if succeeded {
        reporter.line(format!("Configuration location: {}", ctx.display(&config_dir)));
        reporter.line(format!(
            "Want to customize it? Modify {}",
            ctx.display(config_dir.join("init.vim"))
        ));
    }

    succeeded
}

fn link_config(ctx: &Context, reporter: &mut Reporter, config_dir: &Path) {
    let link = ctx.resolve(&ctx.manifest.neovim.config_link);
    reporter.info(format!("Preparing {} ...", ctx.display(&link)));

    match fsops::link_state(&link, config_dir) {
        LinkState::Directory | LinkState::File => {
            let backup = backup_name(&link);
            if let Err(error) = fs::rename(&link, &backup) {
                reporter.fail(format!("Cannot back up existing config: {error}"));
                return;
            }
            reporter.info(format!("Backed up existing nvim config to {}", ctx.display(&backup)));
        }
        LinkState::Missing | LinkState::Linked | LinkState::Elsewhere(_) => {}
    }

    match fsops::create_symlink(config_dir, &link) {
        Ok(()) => reporter.success(format!(
            "Symlinked {} -> {}",
            ctx.display(&link),
            ctx.display(config_dir)
        )),
        Err(error) => reporter.fail(format!("Failed to link Neovim config: {error}")),
    }
}

/// Sibling path for existing configuration, suffixed with the unix time.
fn backup_name(link: &Path) -> PathBuf {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    link.with_file_name(format!("nvim.backup.{seconds}"))
}

fn create_python_environment(ctx: &Context, reporter: &mut Reporter, config_dir: &Path) {
    let env = config_dir.join("env");
    let env_arg = env.to_string_lossy().into_owned();

    reporter.info("Creating Python environment for Neovim using uv ...");
    if let Err(error) = fsops::remove_path(&env) {
        reporter.fail(format!("Cannot remove old Python environment: {error}"));
        return;
    }

    if !ctx.shell.succeeds("uv", &["venv", env_arg.as_str()]) {
        reporter.fail("Failed to create Python environment with uv venv");
        return;
    }
    reporter.success("Python virtual environment created");

    let python = env.join("bin").join("python");
    let python_arg = python.to_string_lossy().into_owned();
    let mut args = vec!["pip", "install", "--python", python_arg.as_str()];
    args.extend(ctx.manifest.neovim.python_packages.iter().map(String::as_str));
    match ctx.shell.succeeds("uv", &args) {
        true => reporter.success("Neovim Python dependencies installed"),
        false => reporter.fail("Failed to install Neovim Python dependencies"),
    }
}

fn install_plug(ctx: &Context, reporter: &mut Reporter, config_dir: &Path) {
    let plug = config_dir.join("autoload").join("plug.vim");
    let plug_arg = plug.to_string_lossy().into_owned();

    reporter.info("Downloading vim-plug ...");
    let args = [
        "-fsSLo",
        plug_arg.as_str(),
        "--create-dirs",
        ctx.manifest.neovim.plug_url.as_str(),
    ];
    match ctx.shell.succeeds("curl", &args) {
        true => reporter.success("vim-plug downloaded successfully"),
        false => reporter.fail("Failed to download vim-plug"),
    }
}

fn check_nvim(ctx: &Context, reporter: &mut Reporter) {
    match ctx.shell.run("nvim", &["--version"]) {
        Ok(output) if output.success => {
            let version = output.stdout.lines().next().unwrap_or_default().to_string();
            reporter.success(format!("Neovim available: {version}"));
        }
        Ok(_) => reporter.fail("Neovim is not properly installed"),
        Err(error) => {
            debug!("{error}");
            reporter.fail("Neovim is not installed, install it first with: brew install neovim")
        }
    }
}

fn install_plugins(ctx: &Context, reporter: &mut Reporter) {
    reporter.info("Running :PlugInstall within nvim ...");
    let args = [
        "--headless",
        "-c",
        ":PlugInstall",
        "-c",
        ":UpdateRemotePlugins",
        "-c",
        ":qall",
    ];
    match ctx.shell.run("nvim", &args) {
        Ok(output) if output.success => reporter.success("Neovim plugins installed successfully"),
        Ok(output) => {
            reporter.warning("Plugin installation may have encountered issues");
            if !output.stderr.is_empty() {
                reporter.line(format!("Error output: {}", output.stderr));
            }
        }
        Err(error) => reporter.warning(format!("Plugin installation failed: {error}")),
    }
}

/// Verify Neovim setup produced everything it should.
///
/// Returns true if every check passed.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn verify(ctx: &Context, reporter: &mut Reporter) -> bool {
    let layout = &ctx.manifest.neovim;
    let config_dir = ctx.resolve(&layout.config_dir);
    let link = ctx.resolve(&layout.config_link);

    reporter.banner("NEOVIM VERIFICATION");
    let checks = [
        (
            fsops::link_state(&link, &config_dir) == LinkState::Linked,
            "Config symlink created",
        ),
        (config_dir.join("env").exists(), "Python environment created"),
        (
            config_dir.join("autoload").join("plug.vim").exists(),
            "vim-plug installed",
        ),
        (config_dir.join("plugged").exists(), "Plugins directory created"),
    ];

    for (passed, description) in checks {
        match passed {
            true => reporter.success(description),
            false => reporter.fail(format!("Failed: {description}")),
        }
    }

    reporter.finish("Neovim verification")
}

/// Remove Neovim data, legacy vim content, configuration link, and
/// generated repository content.
///
/// Returns `Ok(false)` if the user declined, or if something could not be
/// removed.
///
/// # Errors
///
/// - Return [`crate::prompt::PromptError`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn clean(ctx: &Context, reporter: &mut Reporter) -> Result<bool> {
    let layout = &ctx.manifest.neovim;

    reporter.banner("NEOVIM CLEANUP");
    reporter.line("This will remove:");
    for entry in layout
        .system_dirs
        .iter()
        .chain(layout.legacy_dirs.iter())
        .chain(layout.dynamic.iter())
    {
        reporter.line(format!(
            "  • {} ({})",
            ctx.display(ctx.resolve(&entry.path)),
            entry.description
        ));
    }
    reporter.line(format!(
        "  • {} (config symlink)",
        ctx.display(ctx.resolve(&layout.config_link))
    ));

    if !ctx.confirm(reporter, "Remove Neovim data and generated content?")? {
        return Ok(false);
    }

    let mut clean = true;
    reporter.section("System Neovim Data");
    for entry in &layout.system_dirs {
        clean &= ctx.remove(reporter, &ctx.resolve(&entry.path), &entry.description);
    }

    reporter.section("Legacy Vim Content");
    for entry in &layout.legacy_dirs {
        clean &= ctx.remove(reporter, &ctx.resolve(&entry.path), &entry.description);
    }

    reporter.section("Neovim Config Symlink");
    let link = ctx.resolve(&layout.config_link);
    match link.symlink_metadata() {
        Ok(metadata) if !metadata.file_type().is_symlink() => reporter.warning(format!(
            "{} is a real directory, leaving it alone",
            ctx.display(&link)
        )),
        _ => clean &= ctx.remove(reporter, &link, "neovim config symlink"),
    }

    reporter.section("Generated Repository Content");
    for entry in &layout.dynamic {
        clean &= ctx.remove(reporter, &ctx.resolve(&entry.path), &entry.description);
    }

    reporter.section("Preserved Files");
    for entry in &layout.preserved {
        let path = ctx.resolve(&entry.path);
        if path.exists() {
            reporter.success(format!("{} preserved ({})", ctx.display(&path), entry.description));
        }
    }

    reporter.finish("Neovim cleanup");
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Manifest, shell::fake::FakeShell, shell::CommandOutput};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[cfg(unix)]
    #[test]
    fn install_backs_up_real_config_and_links() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let home = scratch.path().join("home");
        let repo = scratch.path().join("repo");
        fs::create_dir_all(home.join(".config/nvim"))?;
        fs::create_dir_all(repo.join("neovim"))?;

        let shell = FakeShell::new()
            .respond("nvim --version", CommandOutput::ok("NVIM v0.10.0\nBuild type: Release"));
        let ctx = Context::new(&home, &repo, Manifest::builtin()?, Arc::new(shell));
        let mut reporter = Reporter::quiet();

        // uv and curl are not scripted, so those steps fail.
        assert!(!install(&ctx, &mut reporter));
        assert_eq!(fs::read_link(home.join(".config/nvim"))?, repo.join("neovim"));

        let backups = fs::read_dir(home.join(".config"))?
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("nvim.backup."))
            .count();
        assert_eq!(backups, 1);
        assert!(repo.join("neovim/plugged").is_dir());

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn clean_removes_generated_content_only() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let home = scratch.path().join("home");
        let repo = scratch.path().join("repo");
        fs::create_dir_all(home.join(".local/share/nvim"))?;
        fs::create_dir_all(repo.join("neovim/plugged/blah"))?;
        fs::create_dir_all(repo.join("neovim/autoload"))?;
        fs::write(repo.join("neovim/autoload/plug.vim"), "")?;
        fs::write(repo.join("neovim/init.vim"), "set number")?;
        fsops::create_symlink(repo.join("neovim"), home.join(".config/nvim"))?;

        let ctx = Context::new(&home, &repo, Manifest::builtin()?, Arc::new(FakeShell::new()))
            .with_auto_confirm(true);

        assert!(clean(&ctx, &mut Reporter::quiet())?);
        assert!(!home.join(".local/share/nvim").exists());
        assert!(!fsops::occupied(home.join(".config/nvim")));
        assert!(!repo.join("neovim/plugged").exists());
        assert!(!repo.join("neovim/autoload/plug.vim").exists());
        assert!(repo.join("neovim/init.vim").exists());

        // Second run finds nothing left to do.
        assert!(clean(&ctx, &mut Reporter::quiet())?);

        Ok(())
    }
}
