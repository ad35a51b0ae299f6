// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Homebrew package catalogue.
//!
//! Install the manifest's package catalogue category by category, manage
//! single packages and custom formulas, and purge everything Homebrew
//! installed. Formulas dropped into the repository's formulas directory
//! join the catalogue under the `custom` category.

use crate::{
    brew::Brew,
    config::{ManifestPath, Package, PackageKind},
    context::Context,
    formula::{self, FormulaError, FormulaInfo},
    fsops,
    prompt::{self, Result},
    report::Reporter,
};

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Category of formulas discovered in the formulas directory.
pub const CUSTOM_CATEGORY: &str = "custom";

/// Which categories to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every category in install order.
    All,

    /// One named category.
    Category(String),
}

/// Options of a catalogue installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    pub selection: Selection,

    /// Also install optional categories.
    pub include_optional: bool,

    /// Offer removal of obsolete packages first.
    pub cleanup: bool,
}

/// Install the package catalogue.
///
/// Homebrew is installed first if missing. Packages that are already
/// installed are skipped.
///
/// Returns `Ok(false)` if the category is unknown or any package failed.
///
/// # Errors
///
/// - Return [`crate::prompt::PromptError`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn install(ctx: &Context, reporter: &mut Reporter, options: &InstallOptions) -> Result<bool> {
    reporter.banner("PACKAGE INSTALLATION");

    let categories = match &options.selection {
        Selection::All => {
            let catalogue = &ctx.manifest.packages;
            let mut categories = catalogue.install_order.clone();
            if options.include_optional {
                categories.extend(catalogue.optional_categories.iter().cloned());
            }
            categories.push(CUSTOM_CATEGORY.into());
            categories
        }
        Selection::Category(category) => {
            if !known_category(ctx, category) {
                reporter.fail(format!("Unknown category: {category}"));
                let available = available_categories(ctx).join(", ");
                reporter.line(format!("Available categories: {available}"));
                return Ok(false);
            }
            vec![category.clone()]
        }
    };

    if !ensure_homebrew(ctx, reporter) {
        return Ok(false);
    }

    let brew = Brew::new(ctx.shell.as_ref());
    reporter.info("Updating Homebrew...");
    match brew.run(&["update"]) {
        true => reporter.success("Homebrew updated"),
        false => reporter.warning("Homebrew update failed, continuing with current formulae"),
    }

    if options.cleanup {
        cleanup_obsolete(ctx, reporter)?;
    }

    for category in &categories {
        install_category(ctx, reporter, category, options.include_optional);
    }

    Ok(reporter.finish("Package installation"))
}

/// Install Homebrew if it is missing.
pub fn ensure_homebrew(ctx: &Context, reporter: &mut Reporter) -> bool {
    let brew = Brew::new(ctx.shell.as_ref());
    if brew.available() {
        reporter.success("Homebrew available");
        return true;
    }

    reporter.info("Homebrew not found, installing...");
    if brew.bootstrap() && brew.available() {
        reporter.success("Homebrew installed");
        return true;
    }

    reporter.fail("Homebrew installation failed");
    false
}

fn install_category(
    ctx: &Context,
    reporter: &mut Reporter,
    category: &str,
    include_optional: bool,
) -> bool {
    let (packages, skipped): (Vec<Package>, Vec<Package>) = packages_in(ctx, category)
        .into_iter()
        .partition(|package| package.required || include_optional);
    reporter.section(format!("Installing {category} packages"));
    for package in &skipped {
        reporter.info(format!("Skipping optional package {}", package.name));
    }
    if packages.is_empty() {
        reporter.info(format!("No packages in {category}"));
        return true;
    }

    let names: Vec<&str> = packages.iter().map(|package| package.name.as_str()).collect();
    reporter.line(format!("Packages: {}", names.join(", ")));

    let installed = packages
        .iter()
        .filter(|package| install_package(ctx, reporter, package))
        .count();
    let total = packages.len();
    match installed == total {
        true => reporter.success(format!("{installed}/{total} packages installed successfully")),
        false => reporter.warning(format!("{installed}/{total} packages installed successfully")),
    }

    installed == total
}

/// Check if package is installed.
///
/// A package with a custom check command is installed when that command
/// succeeds.
pub fn is_installed(ctx: &Context, package: &Package) -> bool {
    if let Some(check) = &package.check_cmd {
        return ctx
            .shell
            .script(check)
            .map(|output| output.success)
            .unwrap_or(false);
    }

    let brew = Brew::new(ctx.shell.as_ref());
    match package.kind {
        PackageKind::Cask => brew.is_cask_installed(&package.name),
        _ => brew.is_installed(&package.name),
    }
}

/// Install one package, skipping it if already installed.
///
/// Returns true if the package ends up installed.
pub fn install_package(ctx: &Context, reporter: &mut Reporter, package: &Package) -> bool {
    if is_installed(ctx, package) {
        reporter.success(format!("{} already installed", package.name));
        return true;
    }

    reporter.info(format!("Installing {} ({})...", package.name, package.description));
    let brew = Brew::new(ctx.shell.as_ref());

    if package.kind == PackageKind::Tap {
        let Some(tap) = &package.tap else {
            reporter.fail(format!("{} has no tap configured", package.name));
            return false;
        };
        if !ensure_tap(&brew, reporter, tap) {
            reporter.fail(format!("Failed to install {}", package.name));
            return false;
        }
    }

    let installed = match (&package.install_cmd, package.kind) {
        (Some(command), _) => ctx
            .shell
            .run_interactive("sh", &["-c", command.as_str()])
            .unwrap_or(false),
        (None, PackageKind::Brew) => brew.run(&["install", package.name.as_str()]),
        (None, PackageKind::Cask) => brew.run(&["install", "--cask", package.name.as_str()]),
        (None, PackageKind::Tap) => {
            let tap = package.tap.as_deref().unwrap_or_default();
            brew.run(&["install", format!("{tap}/{}", package.name).as_str()])
        }
        (None, PackageKind::Formula) => match formula_path(ctx, reporter, package) {
            Some(path) => brew.run(&["install", path.to_string_lossy().as_ref()]),
            None => false,
        },
        (None, PackageKind::LocalTap) => match formula_path(ctx, reporter, package) {
            Some(path) => {
                let tap = package
                    .local_tap
                    .as_deref()
                    .unwrap_or(ctx.manifest.taps.default_local_tap.as_str());
                install_into_local_tap(ctx, reporter, &path, tap)
            }
            None => false,
        },
    };

    match installed {
        true => reporter.success(format!("{} installed", package.name)),
        false => reporter.fail(format!("Failed to install {}", package.name)),
    }

    installed
}

fn formula_path(ctx: &Context, reporter: &mut Reporter, package: &Package) -> Option<PathBuf> {
    let Some(formula) = &package.formula else {
        reporter.fail(format!("{} has no formula file configured", package.name));
        return None;
    };

    let path = ctx.resolve(formula);
    if !path.is_file() {
        reporter.fail(format!("Formula file not found: {}", ctx.display(&path)));
        return None;
    }

    Some(path)
}

fn ensure_tap(brew: &Brew<'_>, reporter: &mut Reporter, tap: &str) -> bool {
    if brew.has_tap(tap) {
        return true;
    }

    reporter.info(format!("Adding tap {tap}..."));
    match brew.run(&["tap", tap]) {
        true => {
            reporter.success(format!("Tap {tap} added"));
            true
        }
        false => {
            reporter.fail(format!("Failed to add tap {tap}"));
            false
        }
    }
}

fn install_into_local_tap(
    ctx: &Context,
    reporter: &mut Reporter,
    formula: &Path,
    tap: &str,
) -> bool {
    let brew = Brew::new(ctx.shell.as_ref());
    if !brew.has_tap(tap) {
        reporter.info(format!("Creating local tap {tap}..."));
        if !brew.run(&["tap-new", tap]) {
            reporter.fail(format!("Failed to create local tap {tap}"));
            return false;
        }
    }

    let repo = match brew.repo_of(tap) {
        Ok(repo) => repo,
        Err(error) => {
            reporter.fail(format!("Cannot locate tap {tap}: {error}"));
            return false;
        }
    };

    let formula_dir = repo.join("Formula");
    let Some(file_name) = formula.file_name() else {
        reporter.fail(format!("Invalid formula path {}", ctx.display(formula)));
        return false;
    };
    let copied = fsops::ensure_dir(&formula_dir)
        .map_err(|error| error.to_string())
        .and_then(|()| {
            fs::copy(formula, formula_dir.join(file_name))
                .map(|_| ())
                .map_err(|error| error.to_string())
        });
    if let Err(error) = copied {
        reporter.fail(format!("Failed to copy formula into {tap}: {error}"));
        return false;
    }
    debug!("copied {} into {}", formula.display(), formula_dir.display());

    brew.run(&["install", format!("{tap}/{}", formula::formula_name(formula)).as_str()])
}

/// Packages of target category, custom formulas included.
pub fn packages_in(ctx: &Context, category: &str) -> Vec<Package> {
    match category {
        CUSTOM_CATEGORY => custom_packages(ctx),
        _ => ctx.manifest.packages.in_category(category).cloned().collect(),
    }
}

/// Formulas in the formulas directory not already claimed by the catalogue.
pub fn custom_packages(ctx: &Context) -> Vec<Package> {
    let claimed: Vec<PathBuf> = ctx
        .manifest
        .packages
        .packages
        .iter()
        .filter_map(|package| package.formula.as_ref())
        .map(|formula| ctx.resolve(formula))
        .collect();

    formula::discover(ctx.resolve(&ctx.manifest.packages.formulas_dir))
        .into_iter()
        .filter(|path| !claimed.contains(path))
        .map(|path| {
            let name = formula::formula_name(&path);
            let description = FormulaInfo::read(&path)
                .map(|info| info.summary())
                .unwrap_or_else(|_| format!("Custom formula: {name}"));
            Package {
                name,
                category: CUSTOM_CATEGORY.into(),
                description,
                kind: PackageKind::Formula,
                tap: None,
                formula: Some(ManifestPath::new(path)),
                local_tap: None,
                install_cmd: None,
                check_cmd: None,
                required: true,
            }
        })
        .collect()
}

fn known_category(ctx: &Context, category: &str) -> bool {
    category == CUSTOM_CATEGORY || ctx.manifest.packages.categories().contains(&category)
}

fn available_categories(ctx: &Context) -> Vec<String> {
    let mut categories: Vec<String> = ctx
        .manifest
        .packages
        .categories()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    categories.push(CUSTOM_CATEGORY.into());
    categories.sort();
    categories
}

/// Offer removal of installed obsolete packages.
///
/// Declining keeps them and is not a failure.
///
/// # Errors
///
/// - Return [`crate::prompt::PromptError`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn cleanup_obsolete(ctx: &Context, reporter: &mut Reporter) -> Result<bool> {
    let brew = Brew::new(ctx.shell.as_ref());
    reporter.section("Obsolete Packages");

    let mut installed = brew.formulae().unwrap_or_default();
    installed.extend(brew.casks().unwrap_or_default());

    let found: Vec<_> = ctx
        .manifest
        .packages
        .obsolete
        .iter()
        .filter(|obsolete| installed.contains(&obsolete.name))
        .collect();
    if found.is_empty() {
        reporter.success("No obsolete packages found");
        return Ok(true);
    }

    reporter.warning(format!("Found {} obsolete package(s):", found.len()));
    for obsolete in &found {
        reporter.line(format!("  • {} (replaced by {})", obsolete.name, obsolete.replacement));
    }

    let proceed = ctx.auto_confirm || prompt::confirm_optional("Remove obsolete packages?")?;
    if !proceed {
        reporter.info("Keeping obsolete packages");
        return Ok(true);
    }

    let mut clean = true;
    for obsolete in found {
        let removed = brew.run(&["uninstall", obsolete.name.as_str()])
            || brew.run(&["uninstall", "--ignore-dependencies", obsolete.name.as_str()]);
        match removed {
            true => reporter.success(format!("Removed {}", obsolete.name)),
            false => {
                reporter.warning(format!("Failed to remove {}", obsolete.name));
                clean = false;
            }
        }
    }

    Ok(clean)
}

/// Print the catalogue grouped by category.
///
/// Returns false if target category is unknown.
pub fn list(ctx: &Context, reporter: &mut Reporter, category: Option<&str>) -> bool {
    reporter.banner("PACKAGE CATALOGUE");

    let categories = match category {
        Some(category) if !known_category(ctx, category) => {
            reporter.fail(format!("Unknown category: {category}"));
            let available = available_categories(ctx).join(", ");
            reporter.line(format!("Available categories: {available}"));
            return false;
        }
        Some(category) => vec![category.to_string()],
        None => available_categories(ctx),
    };

    let mut total = 0;
    for category in categories {
        let packages = packages_in(ctx, &category);
        if packages.is_empty() {
            continue;
        }

        reporter.section(format!("{category} ({})", packages.len()));
        for package in &packages {
            let need = if package.required { "required" } else { "optional" };
            let kind = match package.kind {
                PackageKind::Brew => String::new(),
                kind => format!(" [{kind}]"),
            };
            reporter.line(format!(
                "  • {} - {} ({need}){kind}",
                package.name, package.description
            ));
        }
        total += packages.len();
    }

    reporter.line(format!("\nTotal: {total} packages"));
    true
}

/// Report which catalogue packages are installed.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn status(ctx: &Context, reporter: &mut Reporter) -> bool {
    reporter.banner("PACKAGE STATUS");
    if !Brew::new(ctx.shell.as_ref()).available() {
        reporter.fail("Homebrew is not installed");
        return false;
    }

    let mut installed = 0;
    let mut total = 0;
    for category in available_categories(ctx) {
        let packages = packages_in(ctx, &category);
        if packages.is_empty() {
            continue;
        }

        reporter.section(category);
        for package in &packages {
            total += 1;
            if is_installed(ctx, package) {
                installed += 1;
                reporter.success(format!("{} installed", package.name));
            } else if package.required {
                reporter.warning(format!("{} not installed", package.name));
            } else {
                reporter.info(format!("{} not installed (optional)", package.name));
            }
        }
    }

    reporter.line(format!("\n{installed}/{total} packages installed"));
    true
}

/// Describe every formula file in the formulas directory.
pub fn formulas(ctx: &Context, reporter: &mut Reporter) -> bool {
    let dir = ctx.resolve(&ctx.manifest.packages.formulas_dir);
    reporter.banner("CUSTOM FORMULAS");

    let found = formula::discover(&dir);
    if found.is_empty() {
        reporter.info(format!("No custom formulas found in {}", ctx.display(&dir)));
        return true;
    }

    let brew = Brew::new(ctx.shell.as_ref());
    for path in found {
        match FormulaInfo::read(&path) {
            Ok(info) => {
                let state = match brew.is_installed(&info.name) {
                    true => "installed",
                    false => "not installed",
                };
                reporter.line(format!("  • {} - {} [{state}]", info.name, info.summary()));
            }
            Err(error) => reporter.warning(format!("{}: {error}", ctx.display(&path))),
        }
    }

    true
}

/// Install every discovered custom formula.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn install_formulas(ctx: &Context, reporter: &mut Reporter) -> bool {
    reporter.banner("CUSTOM FORMULA INSTALLATION");
    if !ensure_homebrew(ctx, reporter) {
        return false;
    }

    install_category(ctx, reporter, CUSTOM_CATEGORY, true);
    reporter.finish("Custom formula installation")
}

/// Install a single package by name.
pub fn add(ctx: &Context, reporter: &mut Reporter, name: &str, cask: bool) -> bool {
    let package = Package {
        name: name.into(),
        category: "manual".into(),
        description: "manually requested".into(),
        kind: if cask { PackageKind::Cask } else { PackageKind::Brew },
        tap: None,
        formula: None,
        local_tap: None,
        install_cmd: None,
        check_cmd: None,
        required: true,
    };

    install_package(ctx, reporter, &package)
}

/// Install formula file directly by path.
pub fn add_formula(ctx: &Context, reporter: &mut Reporter, path: &Path) -> bool {
    let Some(path) = checked_formula(ctx, reporter, path) else {
        return false;
    };

    reporter.info(format!("Installing formula {}...", ctx.display(&path)));
    match Brew::new(ctx.shell.as_ref()).run(&["install", path.to_string_lossy().as_ref()]) {
        true => {
            reporter.success(format!("{} installed", formula::formula_name(&path)));
            true
        }
        false => {
            reporter.fail(format!("Failed to install {}", ctx.display(&path)));
            false
        }
    }
}

/// Register tap and install a package from it.
pub fn add_tap(ctx: &Context, reporter: &mut Reporter, tap: &str, name: &str) -> bool {
    let package = Package {
        name: name.into(),
        category: "manual".into(),
        description: format!("from {tap}"),
        kind: PackageKind::Tap,
        tap: Some(tap.into()),
        formula: None,
        local_tap: None,
        install_cmd: None,
        check_cmd: None,
        required: true,
    };

    install_package(ctx, reporter, &package)
}

/// Copy formula into a local tap and install it from there.
pub fn add_local_tap(
    ctx: &Context,
    reporter: &mut Reporter,
    path: &Path,
    tap: Option<&str>,
) -> bool {
    let Some(path) = checked_formula(ctx, reporter, path) else {
        return false;
    };

    let tap = tap.unwrap_or(ctx.manifest.taps.default_local_tap.as_str());
    reporter.info(format!("Installing {} through {tap}...", formula::formula_name(&path)));
    match install_into_local_tap(ctx, reporter, &path, tap) {
        true => {
            reporter.success(format!("{} installed from {tap}", formula::formula_name(&path)));
            true
        }
        false => {
            reporter.fail(format!("Failed to install {} from {tap}", ctx.display(&path)));
            false
        }
    }
}

fn checked_formula(ctx: &Context, reporter: &mut Reporter, path: &Path) -> Option<PathBuf> {
    let path = match path.is_absolute() {
        true => path.to_path_buf(),
        false => ctx.repo.join(path),
    };

    if !path.is_file() {
        reporter.fail(format!("Formula file not found: {}", ctx.display(&path)));
        return None;
    }

    if path.extension().and_then(|ext| ext.to_str()) != Some("rb") {
        reporter.fail(format!("Formula file must end in .rb: {}", ctx.display(&path)));
        return None;
    }

    Some(path)
}

/// Write starter formula into the formulas directory.
pub fn template(ctx: &Context, reporter: &mut Reporter, name: &str) -> bool {
    let dir = ctx.resolve(&ctx.manifest.packages.formulas_dir);
    match formula::write_template(&dir, name) {
        Ok(path) => {
            reporter.success(format!("Created formula template at {}", ctx.display(&path)));
            reporter.line("Next steps:");
            reporter.line("  1. Edit the formula with the real homepage, url, and sha256");
            let shown = ctx.display(&path);
            reporter.line(format!("  2. Validate it: devboot packages validate {shown}"));
            reporter.line(format!("  3. Install it: devboot packages add-formula {shown}"));
            true
        }
        Err(FormulaError::Exists(path)) => {
            reporter.fail(format!("Formula already exists: {}", ctx.display(path)));
            false
        }
        Err(error) => {
            reporter.fail(error);
            false
        }
    }
}

/// Dry run installation of formula file.
pub fn validate(ctx: &Context, reporter: &mut Reporter, path: &Path) -> bool {
    let Some(path) = checked_formula(ctx, reporter, path) else {
        return false;
    };

    reporter.info(format!("Validating {}...", ctx.display(&path)));
    let formula = path.to_string_lossy();
    match Brew::new(ctx.shell.as_ref()).run(&["install", "--dry-run", formula.as_ref()]) {
        true => {
            reporter.success("Formula syntax is valid");
            true
        }
        false => {
            reporter.fail("Formula validation failed");
            false
        }
    }
}

/// Uninstall a single package.
pub fn remove(ctx: &Context, reporter: &mut Reporter, name: &str) -> bool {
    reporter.info(format!("Removing {name}..."));
    match Brew::new(ctx.shell.as_ref()).run(&["uninstall", name]) {
        true => {
            reporter.success(format!("{name} removed"));
            true
        }
        false => {
            reporter.fail(format!("Failed to remove {name}"));
            false
        }
    }
}

/// Update Homebrew and upgrade every package.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn update(ctx: &Context, reporter: &mut Reporter) -> bool {
    let brew = Brew::new(ctx.shell.as_ref());

    reporter.info("Updating Homebrew...");
    if !brew.run(&["update"]) {
        reporter.fail("Homebrew update failed");
        return false;
    }
    reporter.success("Homebrew updated");

    reporter.info("Upgrading packages...");
    match brew.run(&["upgrade"]) {
        true => {
            reporter.success("Packages upgraded");
            true
        }
        false => {
            reporter.fail("Package upgrade failed");
            false
        }
    }
}

/// Uninstall everything Homebrew installed.
///
/// Package lists are backed up first unless backups are disabled.
///
/// Returns `Ok(false)` if the user declined, the backup failed, or anything
/// could not be removed.
///
/// # Errors
///
/// - Return [`crate::prompt::PromptError`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn purge(ctx: &Context, reporter: &mut Reporter) -> Result<bool> {
    let brew = Brew::new(ctx.shell.as_ref());
    reporter.banner("HOMEBREW PACKAGES CLEANUP");

    if !brew.available() {
        reporter.success("Homebrew not installed, nothing to clean");
        return Ok(true);
    }

    let formulae = brew.formulae().unwrap_or_default();
    let casks = brew.casks().unwrap_or_default();
    let taps = brew.taps().unwrap_or_default();
    let custom_taps: Vec<&String> = taps
        .iter()
        .filter(|tap| !tap.starts_with("homebrew/"))
        .collect();

    reporter.line(format!("Formulae: {}", formulae.len()));
    reporter.line(format!("Casks: {}", casks.len()));
    reporter.line(format!("Custom taps: {}", custom_taps.len()));
    reporter.warning("This will uninstall ALL Homebrew packages!");

    if !ctx.confirm(reporter, "Uninstall all Homebrew packages?")? {
        return Ok(false);
    }

    if ctx.backup {
        reporter.section("Backup");
        let lists = [("formulae", &formulae), ("casks", &casks), ("taps", &taps)];
        if let Err(error) = backup_lists(ctx, reporter, &lists) {
            reporter.fail(format!("Backup failed, aborting: {error}"));
            return Ok(false);
        }
    }

    let mut clean = true;

    reporter.section("Custom Taps");
    for tap in custom_taps {
        clean &= removal(reporter, brew.run(&["untap", "--force", tap.as_str()]), tap);
    }

    reporter.section("Casks");
    for cask in &casks {
        let removed = brew.run(&["uninstall", "--cask", "--force", cask.as_str()]);
        clean &= removal(reporter, removed, cask);
    }

    reporter.section("Formulae");
    for formula in &formulae {
        let removed =
            brew.run(&["uninstall", "--force", "--ignore-dependencies", formula.as_str()]);
        clean &= removal(reporter, removed, formula);
    }

    reporter.section("Homebrew Cleanup");
    if !brew.run(&["cleanup", "--prune=all"]) {
        reporter.warning("brew cleanup failed");
    }
    if !brew.run(&["autoremove"]) {
        reporter.warning("brew autoremove failed");
    }

    reporter.finish("Homebrew packages cleanup");
    Ok(clean)
}

fn removal(reporter: &mut Reporter, removed: bool, name: &str) -> bool {
    match removed {
        true => reporter.success(format!("{name} removed")),
        false => reporter.warning(format!("Failed to remove {name}")),
    }
    removed
}

/// Name of a package list backup file.
pub fn backup_name(what: &str, stamp: &chrono::NaiveDateTime) -> String {
    format!("brew-{what}-backup-{}.txt", stamp.format("%Y%m%d-%H%M%S"))
}

fn backup_lists(
    ctx: &Context,
    reporter: &mut Reporter,
    lists: &[(&str, &Vec<String>)],
) -> std::io::Result<()> {
    let dir = ctx.resolve(&ctx.manifest.packages.backups_dir);
    fsops::ensure_dir(&dir).map_err(|error| std::io::Error::other(error.to_string()))?;

    let stamp = chrono::Local::now().naive_local();
    for (what, items) in lists {
        let path = dir.join(backup_name(what, &stamp));
        let mut content = items.iter().map(String::as_str).collect::<Vec<_>>().join("\n");
        content.push('\n');
        fs::write(&path, content)?;
        reporter.success(format!("Backed up {} {what} to {}", items.len(), ctx.display(&path)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Manifest,
        shell::{fake::FakeShell, CommandOutput},
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn context(root: &Path, shell: FakeShell) -> anyhow::Result<(Context, Arc<FakeShell>)> {
        let shell = Arc::new(shell);
        let ctx = Context::new(root, root, Manifest::builtin()?, shell.clone());
        Ok((ctx, shell))
    }

    #[test]
    fn unknown_category_fails_before_homebrew() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let (ctx, shell) = context(scratch.path(), FakeShell::new())?;
        let mut reporter = Reporter::quiet();

        let options = InstallOptions {
            selection: Selection::Category("blah".into()),
            include_optional: false,
            cleanup: false,
        };
        assert!(!install(&ctx, &mut reporter, &options)?);
        assert!(shell.calls().is_empty());

        Ok(())
    }

    #[test]
    fn category_install_only_touches_that_category() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let shell = FakeShell::new()
            .respond("brew --version", CommandOutput::ok("Homebrew 4.4.0"))
            .respond("brew list zsh", CommandOutput::ok("zsh"));
        let (ctx, shell) = context(scratch.path(), shell)?;
        let mut reporter = Reporter::quiet();

        let options = InstallOptions {
            selection: Selection::Category("core".into()),
            include_optional: false,
            cleanup: false,
        };
        assert!(install(&ctx, &mut reporter, &options)?);

        let installs: Vec<String> = shell
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("brew install"))
            .collect();
        let expect: Vec<String> = ctx
            .manifest
            .packages
            .in_category("core")
            .filter(|package| package.name != "zsh")
            .map(|package| format!("brew install {}", package.name))
            .collect();
        assert_eq!(installs, expect);

        Ok(())
    }

    #[test]
    fn tap_package_registers_tap_first() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let (ctx, shell) = context(scratch.path(), FakeShell::new())?;
        let mut reporter = Reporter::quiet();

        assert!(add_tap(&ctx, &mut reporter, "hashicorp/tap", "terraform"));
        let calls = shell.calls();
        let tap = calls.iter().position(|call| call == "brew tap hashicorp/tap");
        let install = calls.iter().position(|call| call == "brew install hashicorp/tap/terraform");
        assert!(tap.is_some() && install.is_some() && tap < install);

        Ok(())
    }

    #[test]
    fn optional_packages_need_opt_in() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let shell = FakeShell::new().respond("brew --version", CommandOutput::ok("Homebrew 4.4.0"));
        let (ctx, shell) = context(scratch.path(), shell)?;
        let optional: Vec<String> = ctx
            .manifest
            .packages
            .in_category("optional")
            .filter(|package| !package.required)
            .map(|package| format!("brew install {}", package.name))
            .collect();
        assert!(!optional.is_empty());

        let mut options = InstallOptions {
            selection: Selection::Category("optional".into()),
            include_optional: false,
            cleanup: false,
        };
        assert!(install(&ctx, &mut Reporter::quiet(), &options)?);
        assert!(shell.calls().iter().all(|call| !optional.contains(call)));

        options.include_optional = true;
        install(&ctx, &mut Reporter::quiet(), &options)?;
        let calls = shell.calls();
        assert!(optional.iter().all(|install| calls.contains(install)));

        Ok(())
    }

    #[test]
    fn custom_formulas_skip_catalogue_entries() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let formulas = scratch.path().join("formulas");
        fs::create_dir_all(&formulas)?;
        fs::write(formulas.join("teleport.rb"), "desc \"Teleport\"\n")?;
        fs::write(formulas.join("my-tool.rb"), "  desc \"My tool\"\n")?;
        let (ctx, _) = context(scratch.path(), FakeShell::new())?;

        let custom = custom_packages(&ctx);
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].name, "my-tool");
        assert_eq!(custom[0].description, "My tool");
        assert_eq!(custom[0].kind, PackageKind::Formula);

        Ok(())
    }

    #[test]
    fn local_tap_copies_formula() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let tap_repo = scratch.path().join("tap");
        fs::create_dir_all(scratch.path().join("formulas"))?;
        fs::write(scratch.path().join("formulas/teleport.rb"), "desc \"Teleport\"\n")?;
        let shell = FakeShell::new().respond(
            "brew --repo local/custom",
            CommandOutput::ok(tap_repo.to_string_lossy()),
        );
        let (ctx, shell) = context(scratch.path(), shell)?;
        let mut reporter = Reporter::quiet();

        let teleport = packages_in(&ctx, "network")
            .into_iter()
            .find(|package| package.name == "teleport")
            .ok_or_else(|| anyhow::anyhow!("teleport missing from catalogue"))?;
        assert!(install_package(&ctx, &mut reporter, &teleport));
        assert!(tap_repo.join("Formula/teleport.rb").is_file());
        assert!(shell.calls().contains(&"brew tap-new local/custom".to_string()));
        assert!(shell.calls().contains(&"brew install local/custom/teleport".to_string()));

        Ok(())
    }

    #[test]
    fn add_formula_requires_ruby_file() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        fs::write(scratch.path().join("tool.txt"), "")?;
        let (ctx, shell) = context(scratch.path(), FakeShell::new())?;
        let mut reporter = Reporter::quiet();

        assert!(!add_formula(&ctx, &mut reporter, Path::new("tool.txt")));
        assert!(!add_formula(&ctx, &mut reporter, Path::new("missing.rb")));
        assert!(shell.calls().is_empty());

        Ok(())
    }

    #[test]
    fn purge_writes_backups() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let shell = FakeShell::new()
            .respond("brew --version", CommandOutput::ok("Homebrew 4.4.0"))
            .respond("brew list --formula", CommandOutput::ok("git\ntree"))
            .respond("brew list --cask", CommandOutput::ok("wezterm"))
            .respond("brew tap", CommandOutput::ok("homebrew/core\nhashicorp/tap"));
        let (ctx, shell) = context(scratch.path(), shell)?;
        let ctx = ctx.with_auto_confirm(true);
        let mut reporter = Reporter::quiet();

        assert!(purge(&ctx, &mut reporter)?);
        let backups: Vec<_> = fs::read_dir(scratch.path().join("backups"))?.flatten().collect();
        assert_eq!(backups.len(), 3);
        assert!(shell.calls().contains(&"brew untap --force hashicorp/tap".to_string()));
        assert!(!shell.calls().contains(&"brew untap --force homebrew/core".to_string()));

        Ok(())
    }

    #[test]
    fn backup_name_format() -> anyhow::Result<()> {
        let stamp = chrono::NaiveDate::from_ymd_opt(2025, 3, 9)
            .and_then(|date| date.and_hms_opt(7, 5, 1))
            .ok_or_else(|| anyhow::anyhow!("invalid date"))?;
        assert_eq!(backup_name("casks", &stamp), "brew-casks-backup-20250309-070501.txt");

        Ok(())
    }
}
