// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use super::{CheckError, CheckReport, CheckType, Result, StatusCheck};
use crate::{
    brew::Brew,
    config::{DotfileLink, PathEntry},
    context::Context,
    fsops::{self, LinkState},
    packages, taps,
};

use std::fs;

/// Built-in read-only checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    HomebrewPackages,
    DependencyPackages,
    LanguageManagers,
    LanguageEnvironments,
    Neovim,
    Dotfiles,
    SystemCommands,
    LocalTaps,
    Submodules,
}

impl Check {
    /// Every check in declaration order.
    pub const ALL: [Check; 9] = [
        Check::HomebrewPackages,
        Check::DependencyPackages,
        Check::LanguageManagers,
        Check::LanguageEnvironments,
        Check::Neovim,
        Check::Dotfiles,
        Check::SystemCommands,
        Check::LocalTaps,
        Check::Submodules,
    ];

    /// Checks concerned with installed packages.
    pub const PACKAGES: [Check; 2] = [Check::HomebrewPackages, Check::SystemCommands];

    /// Checks concerned with leftovers of cleanup.
    pub const CLEANUP: [Check; 3] = [Check::LanguageManagers, Check::Neovim, Check::Dotfiles];

    pub fn title(&self) -> &'static str {
        match self {
            Self::HomebrewPackages => "Homebrew Packages",
            Self::DependencyPackages => "Dependency Packages",
            Self::LanguageManagers => "Language Managers",
            Self::LanguageEnvironments => "Language Environments",
            Self::Neovim => "Neovim Status",
            Self::Dotfiles => "Dotfiles Status",
            Self::SystemCommands => "System Commands",
            Self::LocalTaps => "Local Taps",
            Self::Submodules => "Git Submodules",
        }
    }
}

impl StatusCheck for Check {
    fn name(&self) -> &str {
        self.title()
    }

    fn run(&self, ctx: &Context, expect: CheckType) -> Result<CheckReport> {
        let mut report = CheckReport::new(self.title());
        match self {
            Self::HomebrewPackages => homebrew_packages(ctx, expect, &mut report),
            Self::DependencyPackages => dependency_packages(ctx, &mut report),
            Self::LanguageManagers => language_managers(ctx, expect, &mut report),
            Self::LanguageEnvironments => language_environments(ctx, &mut report)?,
            Self::Neovim => neovim(ctx, expect, &mut report),
            Self::Dotfiles => dotfiles(ctx, expect, &mut report),
            Self::SystemCommands => system_commands(ctx, &mut report),
            Self::LocalTaps => local_taps(ctx, expect, &mut report),
            Self::Submodules => submodules(ctx, expect, &mut report),
        }

        Ok(report)
    }
}

fn presence(report: &mut CheckReport, expect: CheckType, present: bool, subject: &str) {
    match (expect, present) {
        (CheckType::Cleaned, true) => {
            report.warning(format!("  • {subject} - EXISTS - Needs cleanup"))
        }
        (CheckType::Cleaned, false) => report.success(format!("  • {subject} - Clean")),
        (CheckType::Installed, true) => report.success(format!("  • {subject} - Available")),
        (CheckType::Installed, false) => {
            report.warning(format!("  • {subject} - Needs installation"))
        }
    }
}

fn preview(report: &mut CheckReport, items: &[String], limit: usize) {
    for item in items.iter().take(limit) {
        report.info(format!("    • {item}"));
    }
    if items.len() > limit {
        report.info(format!("    • ... and {} more", items.len() - limit));
    }
}

fn homebrew_packages(ctx: &Context, expect: CheckType, report: &mut CheckReport) {
    let brew = Brew::new(ctx.shell.as_ref());
    let mut total = 0;

    let groups = [
        ("Homebrew formulae:", "formulae", brew.formulae()),
        ("Homebrew casks:", "casks", brew.casks()),
        (
            "Homebrew taps:",
            "custom taps",
            brew.taps().map(|taps| {
                taps.into_iter()
                    .filter(|tap| !tap.starts_with("homebrew/"))
                    .collect()
            }),
        ),
    ];

    for (heading, what, listed) in groups {
        report.info(heading);
        let Ok(items) = listed else {
            report.info(format!("  • Cannot list {what}"));
            continue;
        };

        match (items.is_empty(), expect) {
            (false, CheckType::Cleaned) => {
                report.warning(format!("  • {} {what} installed - Needs cleanup", items.len()))
            }
            (false, CheckType::Installed) => {
                report.success(format!("  • {} {what} installed - Available", items.len()))
            }
            (true, CheckType::Cleaned) => {
                report.success(format!("  • No {what} installed - Clean"))
            }
            (true, CheckType::Installed) => {
                report.warning(format!("  • No {what} installed - Needs installation"))
            }
        }

        if what != "custom taps" {
            total += items.len();
        }
        preview(report, &items, 5);
    }

    match (total, expect) {
        (0, CheckType::Cleaned) => report.info("Summary: All clean (0 packages)"),
        (0, CheckType::Installed) => {
            report.info("Summary: No packages installed (needs installation)")
        }
        (total, CheckType::Cleaned) => {
            report.info(format!("Summary: {total} total packages installed (needs cleanup)"))
        }
        (total, CheckType::Installed) => {
            report.info(format!("Summary: {total} total packages installed"))
        }
    }
}

fn dependency_packages(ctx: &Context, report: &mut CheckReport) {
    let catalogue = &ctx.manifest.packages;
    let mut installed = 0;
    let mut total = 0;

    for category in &catalogue.install_order {
        let required: Vec<_> = catalogue
            .in_category(category)
            .filter(|package| package.required)
            .collect();
        if required.is_empty() {
            continue;
        }

        report.info(format!("{category} packages:"));
        for package in required {
            total += 1;
            match packages::is_installed(ctx, package) {
                true => {
                    installed += 1;
                    report.success(format!("  • {} - Available", package.name));
                }
                false => report.success(format!("  • {} - Clean", package.name)),
            }
        }
    }

    match installed {
        0 => report.info(format!("Summary: All clean (0/{total} available)")),
        _ => report.info(format!("Summary: {installed}/{total} installed")),
    }
}

fn language_managers(ctx: &Context, expect: CheckType, report: &mut CheckReport) {
    let mut found = 0;

    for manager in &ctx.manifest.languages.managers {
        let tracked: Vec<_> = manager.dirs.iter().filter(|dir| dir.tracked).collect();
        if tracked.is_empty() {
            continue;
        }

        report.info(format!("{} directories:", manager.name));
        for dir in tracked {
            let path = ctx.resolve(&dir.path);
            let subject = ctx.display(&path);
            let present = path.exists();
            found += usize::from(present);

            if !present && expect == CheckType::Installed {
                if let Some(note) = &dir.optional {
                    report.success(format!("  • {subject} - Clean ({note})"));
                    continue;
                }

                let fallback = dir.fallback.as_deref().and_then(<[String]>::split_first);
                let fallback_works = fallback.is_some_and(|(program, args)| {
                    let args: Vec<&str> = args.iter().map(String::as_str).collect();
                    ctx.shell.succeeds(program, &args)
                });
                if fallback_works {
                    report.success(format!(
                        "  • {subject} - Not needed (working via alternative path)"
                    ));
                    continue;
                }
            }

            presence(report, expect, present, &subject);
        }
    }

    match (found, expect) {
        (0, CheckType::Cleaned) => report.info("Summary: All clean (0 directories found)"),
        (0, CheckType::Installed) => {
            report.info("Summary: No language managers installed (needs installation)")
        }
        (found, CheckType::Cleaned) => {
            report.info(format!("Summary: {found} directories found (needs cleanup)"))
        }
        (found, CheckType::Installed) => report.info(format!("Summary: {found} directories found")),
    }
}

fn language_environments(ctx: &Context, report: &mut CheckReport) -> Result<()> {
    let shell = ctx.shell.as_ref();
    let mut installed = 0;

    report.info("Python (uv) manager and versions:");
    match shell.which("uv") {
        Some(path) => {
            report.success(format!("  • uv command - Available: {path}"));
            match shell.run("uv", &["python", "list"]) {
                Ok(output) if output.success => {
                    let versions: Vec<String> =
                        output.lines().into_iter().map(String::from).collect();
                    if versions.is_empty() {
                        report.success("  • Python versions - None installed");
                    } else {
                        installed += 1;
                        let count = versions.len();
                        report.success(format!("  • Python versions - {count} installed"));
                        preview(report, &versions, 3);
                    }
                }
                _ => report.success("  • Python versions - Cannot list versions"),
            }
        }
        None => {
            report.success("  • uv command - Clean");
            report.success("  • Python versions - Clean");
        }
    }

    report.info("Node.js (fnm) manager and versions:");
    match shell.which("fnm") {
        Some(path) => {
            report.success(format!("  • fnm command - Available: {path}"));
            match shell.run("fnm", &["list"]) {
                Ok(output)
                    if output.success
                        && !output.stdout.contains("No Node.js versions installed") =>
                {
                    let versions: Vec<String> =
                        output.lines().into_iter().map(String::from).collect();
                    installed += 1;
                    let count = versions.len();
                    report.success(format!("  • Node.js versions - {count} installed"));
                    preview(report, &versions, 3);
                }
                Ok(output) if output.success => {
                    report.success("  • Node.js versions - None installed")
                }
                _ => report.success("  • Node.js versions - Cannot list versions"),
            }
        }
        None => {
            report.success("  • fnm command - Clean");
            report.success("  • Node.js versions - Clean");
        }
    }

    report.info("Java (SDKMAN) manager and versions:");
    let sdkman = ctx.home.join(".sdkman");
    if sdkman.exists() {
        report.success(format!("  • SDKMAN directory - Available: {}", ctx.display(&sdkman)));
        let java = sdkman.join("candidates").join("java");
        if java.is_dir() {
            let entries = fs::read_dir(&java).map_err(|source| CheckError::Io {
                path: java.clone(),
                source,
            })?;
            let mut versions: Vec<String> = entries
                .flatten()
                .filter(|entry| entry.path().is_dir())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .filter(|name| name != "current")
                .collect();
            versions.sort();

            if versions.is_empty() {
                report.success("  • Java versions - None installed");
            } else {
                installed += 1;
                report.success(format!("  • Java versions - {} installed", versions.len()));
                preview(report, &versions, versions.len());
            }
        } else {
            report.success("  • Java versions - No candidates directory");
        }
    } else {
        report.success("  • SDKMAN directory - Clean");
        report.success("  • Java versions - Clean");
    }

    report.info("Rust toolchain:");
    let cargo = ctx.home.join(".cargo");
    match cargo.exists() {
        true => {
            let shown = ctx.display(&cargo);
            report.success(format!("  • Cargo directory - Available: {shown}"))
        }
        false => report.success("  • Cargo directory - Clean"),
    }
    match shell.stdout("rustc", &["--version"]) {
        Ok(version) => {
            installed += 1;
            report.success(format!("  • Rust compiler - {version}"));
        }
        Err(_) => report.success("  • Rust compiler - Clean"),
    }

    report.info("Go toolchain:");
    match shell.stdout("go", &["version"]) {
        Ok(version) => {
            installed += 1;
            report.success(format!("  • Go compiler - {version}"));
            if let Some(path) = shell.which("go") {
                report.info(format!("    • Binary location: {path}"));
            }
        }
        Err(_) => report.success("  • Go compiler - Clean"),
    }
    let workspace = ctx.home.join("go");
    match workspace.exists() {
        true => {
            report.success(format!("  • Go workspace - Available: {}", ctx.display(&workspace)))
        }
        false => report.success("  • Go workspace - Not created"),
    }

    match installed {
        0 => report.info("Summary: All clean (0 available)"),
        _ => report.info(format!("Summary: {installed} installed")),
    }

    Ok(())
}

fn neovim(ctx: &Context, expect: CheckType, report: &mut CheckReport) {
    let layout = &ctx.manifest.neovim;

    report.info("System Neovim directories (user data/cache):");
    let system: Vec<&PathEntry> = layout.system_dirs.iter().chain(&layout.legacy_dirs).collect();
    let mut remaining = 0;
    for entry in &system {
        let path = ctx.resolve(&entry.path);
        let subject = ctx.display(&path);
        match (path.exists(), expect) {
            (true, CheckType::Cleaned) => {
                report.warning(format!("  • {subject} - EXISTS (needs cleanup)"))
            }
            (true, CheckType::Installed) => {
                report.success(format!("  • {subject} - Available (user data)"))
            }
            (false, _) => report.success(format!("  • {subject} - Clean")),
        }
        remaining += usize::from(path.exists());
    }
    match remaining {
        0 => report.info("Summary: All clean (0 directories found)"),
        _ => report.info(format!(
            "Summary: {remaining}/{} directories found (user data/cache)",
            system.len()
        )),
    }

    report.info("Neovim config symlink:");
    let link = ctx.resolve(&layout.config_link);
    let source = ctx.resolve(&layout.config_dir);
    let subject = ctx.display(&link);
    match fsops::link_state(&link, &source) {
        LinkState::Linked => {
            report.success(format!("  • {subject} - Correctly linked to dotfiles"))
        }
        LinkState::Elsewhere(target) => {
            report.warning(format!("  • {subject} - Wrong link target: {}", target.display()))
        }
        LinkState::File | LinkState::Directory => {
            report.warning(format!("  • {subject} - Directory exists (not symlinked)"))
        }
        LinkState::Missing => match expect {
            CheckType::Cleaned => report.success(format!("  • {subject} - Clean")),
            CheckType::Installed => report.warning(format!("  • {subject} - Not linked")),
        },
    }

    report.info("Dotfiles dynamic content (auto-generated in repo):");
    let mut generated = 0;
    for entry in &layout.dynamic {
        let path = ctx.resolve(&entry.path);
        match fsops::occupied(&path) {
            true => {
                generated += 1;
                report.info(format!("  • {} - EXISTS (auto-generated)", entry.path));
            }
            false => report.success(format!("  • {} - Clean", entry.path)),
        }
    }
    match generated {
        0 => report.info("Summary: All clean (0 files found)"),
        _ => report.info(format!(
            "Summary: {generated}/{} files found (auto-generated)",
            layout.dynamic.len()
        )),
    }
}

fn dotfiles(ctx: &Context, expect: CheckType, report: &mut CheckReport) {
    let (directories, files): (Vec<&DotfileLink>, Vec<&DotfileLink>) =
        ctx.manifest.links.iter().partition(|link| link.directory);

    for (heading, kind, links) in [
        ("Managed dotfiles (symlink status):", "File", files),
        ("Managed directories (symlink status):", "Directory", directories),
    ] {
        if links.is_empty() {
            continue;
        }

        report.info(heading);
        let mut present = 0;
        for link in &links {
            let target = ctx.resolve(&link.target);
            let source = ctx.resolve(&link.source);
            let subject = ctx.display(&target);
            let state = fsops::link_state(&target, &source);
            present += usize::from(state != LinkState::Missing);

            match state {
                LinkState::Linked => {
                    let source = &link.source;
                    report.success(format!("  • {subject} → {source} - Correctly linked"))
                }
                LinkState::Elsewhere(actual) => {
                    let actual = actual.display();
                    report.warning(format!("  • {subject} → {actual} - Wrong target"))
                }
                LinkState::File | LinkState::Directory => {
                    report.warning(format!("  • {subject} - {kind} exists (not symlinked)"))
                }
                LinkState::Missing => match expect {
                    CheckType::Cleaned => {
                        report.success(format!("  • {subject} → {} - Clean", link.source))
                    }
                    CheckType::Installed => {
                        report.warning(format!("  • {subject} → {} - Not linked", link.source))
                    }
                },
            }
        }

        match present {
            0 => report.info(format!("Summary: All clean (0/{} available)", links.len())),
            _ => report.info(format!("Summary: {present}/{} installed", links.len())),
        }
    }
}

fn system_commands(ctx: &Context, report: &mut CheckReport) {
    let commands = &ctx.manifest.status.commands;
    let mut available = 0;

    report.info("Essential system commands:");
    for command in commands {
        match ctx.shell.which(&command.name) {
            Some(path) => {
                available += 1;
                report.success(format!("  • {} - Available: {path}", command.name));
            }
            None => {
                let (name, description) = (&command.name, &command.description);
                report.error(format!("  • {name} - NOT FOUND ({description})"))
            }
        }
    }

    match commands.len() - available {
        0 => report.info(format!("Summary: All available ({available}/{})", commands.len())),
        missing => report.info(format!("Summary: {missing} missing, {available} available")),
    }
}

fn local_taps(ctx: &Context, expect: CheckType, report: &mut CheckReport) {
    let taps = match taps::local_taps(ctx) {
        Ok(taps) => taps,
        Err(_) => {
            report.warning("Could not check taps status (brew tap failed)");
            return;
        }
    };

    report.info("Local tap directories:");
    if taps.is_empty() {
        report.success("  • No local taps found - Clean");
        report.info("Summary: All clean (0 found)");
        return;
    }

    for tap in &taps {
        match expect {
            CheckType::Cleaned => report.warning(format!("  • {} - INSTALLED", tap.name)),
            CheckType::Installed => report.success(format!("  • {} - Available", tap.name)),
        }

        if !tap.path.join("Formula").is_dir() {
            report.info("      No Formula directory");
            continue;
        }

        let formulas = tap.formulas();
        if formulas.is_empty() {
            report.info("      No formulas found");
            continue;
        }

        report.info(format!("      Formulas ({}):", formulas.len()));
        for info in formulas {
            report.info(format!("     • {}", info.name));
        }
    }

    report.info(format!("Summary: {} installed", taps.len()));
}

fn submodules(ctx: &Context, expect: CheckType, report: &mut CheckReport) {
    if ctx.manifest.submodules.is_empty() {
        report.success("  • No submodules configured");
        return;
    }

    report.info("Repository submodules:");
    let mut initialized = 0;
    for submodule in &ctx.manifest.submodules {
        let path = ctx.resolve(&submodule.path);
        let present = fsops::occupied(path.join(".git"));
        initialized += usize::from(present);
        let subject = format!("{} ({})", submodule.path, submodule.description);
        presence(report, expect, present, &subject);
    }

    report.info(format!(
        "Summary: {initialized}/{} initialized",
        ctx.manifest.submodules.len()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Manifest,
        shell::{fake::FakeShell, CommandOutput},
    };
    use pretty_assertions::assert_eq;
    use std::{path::Path, sync::Arc};

    fn context(root: &Path, shell: FakeShell) -> anyhow::Result<Context> {
        fs::create_dir_all(root.join("home"))?;
        fs::create_dir_all(root.join("repo"))?;
        Ok(Context::new(
            root.join("home"),
            root.join("repo"),
            Manifest::builtin()?,
            Arc::new(shell),
        ))
    }

    #[test]
    fn presence_follows_expectation() {
        let mut report = CheckReport::new("blah");
        presence(&mut report, CheckType::Cleaned, true, "~/.cargo");
        presence(&mut report, CheckType::Cleaned, false, "~/.cargo");
        presence(&mut report, CheckType::Installed, true, "~/.cargo");
        presence(&mut report, CheckType::Installed, false, "~/.cargo");

        assert_eq!(
            report.warnings,
            vec!["  • ~/.cargo - EXISTS - Needs cleanup", "  • ~/.cargo - Needs installation"]
        );
        assert!(report.success);
    }

    #[test]
    fn missing_command_is_error() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let shell = FakeShell::new()
            .respond("which git", CommandOutput::ok("/usr/bin/git"))
            .respond("which curl", CommandOutput::ok("/usr/bin/curl"))
            .respond("which zsh", CommandOutput::ok("/bin/zsh"));
        let ctx = context(scratch.path(), shell)?;

        let report = Check::SystemCommands.run(&ctx, CheckType::Installed)?;
        assert!(!report.success);
        assert_eq!(report.errors, vec!["  • brew - NOT FOUND (Homebrew package manager)"]);
        assert_eq!(report.info.last().map(String::as_str), Some("Summary: 1 missing, 3 available"));

        Ok(())
    }

    #[test]
    fn optional_and_fallback_dirs_pass_when_installed() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let shell = FakeShell::new().respond("fnm list", CommandOutput::ok("* v20.11.0 default"));
        let ctx = context(scratch.path(), shell)?;

        let report = Check::LanguageManagers.run(&ctx, CheckType::Installed)?;
        let successes: Vec<&String> = report
            .messages()
            .iter()
            .filter(|(level, _)| *level == crate::report::Level::Success)
            .map(|(_, message)| message)
            .collect();
        assert!(successes.iter().any(|line| line.ends_with("- Clean (optional directory)")));
        assert!(successes.iter().any(|line| line.contains("Not needed")));
        assert!(report.warnings.iter().all(|line| !line.contains(".fnm")));

        let cleaned = Check::LanguageManagers.run(&ctx, CheckType::Cleaned)?;
        assert!(cleaned.warnings.is_empty());

        Ok(())
    }

    #[test]
    fn dotfiles_link_states() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ctx = context(scratch.path(), FakeShell::new())?;
        fs::write(ctx.repo.join("gitconfig"), "")?;
        fsops::create_symlink(ctx.repo.join("gitconfig"), ctx.home.join(".gitconfig"))?;
        fs::write(ctx.home.join(".zshrc"), "")?;

        let report = Check::Dotfiles.run(&ctx, CheckType::Cleaned)?;
        assert!(report
            .messages()
            .iter()
            .any(|(_, line)| line.ends_with("gitconfig - Correctly linked")));
        assert_eq!(report.warnings, vec!["  • ~/.zshrc - File exists (not symlinked)"]);

        Ok(())
    }

    #[test]
    fn local_taps_without_brew_warns() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ctx = context(scratch.path(), FakeShell::new())?;

        let report = Check::LocalTaps.run(&ctx, CheckType::Installed)?;
        assert!(report.success);
        assert_eq!(report.warnings, vec!["Could not check taps status (brew tap failed)"]);

        Ok(())
    }
}
