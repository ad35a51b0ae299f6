// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local Homebrew taps.
//!
//! A local tap is a tap created with `brew tap-new` whose name starts with
//! the manifest's local prefix (`local/` by default). Formulas copied into
//! it live only on this machine, so they can be backed up, restored, and
//! exported here.

use crate::{
    brew::{Brew, BrewError},
    context::Context,
    formula::{self, FormulaInfo},
    fsops,
    prompt,
    report::Reporter,
};

use git2::Repository;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

const BACKUP_PREFIX: &str = "local-tap-";

/// Joins tap user and repository in backup names. Tap users may contain `-`.
const BACKUP_SEPARATOR: &str = "__";

/// Tap registered under the local prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTap {
    /// Tap name in `user/repo` form.
    pub name: String,

    /// Location of tap repository.
    pub path: PathBuf,
}

impl LocalTap {
    /// Construct local tap located under target Homebrew prefix.
    ///
    /// Returns `None` if name is not in `user/repo` form.
    pub fn new(prefix: impl AsRef<Path>, name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let path = tap_path(prefix, &name)?;
        Some(Self { name, path })
    }

    /// Name of backup directory holding a copy of this tap.
    pub fn backup_name(&self) -> String {
        let name = self.name.replacen('/', BACKUP_SEPARATOR, 1);
        format!("{BACKUP_PREFIX}{name}")
    }

    /// Formula files inside tap.
    pub fn formulas(&self) -> Vec<FormulaInfo> {
        formula::discover(self.path.join("Formula"))
            .into_iter()
            .filter_map(|path| FormulaInfo::read(path).ok())
            .collect()
    }

    /// Git details of tap repository, if it is one.
    pub fn git_info(&self) -> Option<GitInfo> {
        let repo = Repository::open(&self.path).ok()?;
        let remote = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(ToString::to_string));

        let head = repo.head().ok();
        let branch = head
            .as_ref()
            .and_then(|head| head.shorthand())
            .map(ToString::to_string);
        let last_commit = head
            .and_then(|head| head.peel_to_commit().ok())
            .and_then(|commit| {
                let id = commit.as_object().short_id().ok()?;
                Some(format!("{} - {}", id.as_str()?, commit.summary()?))
            });

        Some(GitInfo {
            remote,
            branch,
            last_commit,
        })
    }

    fn export(&self) -> TapExport {
        TapExport {
            name: self.name.clone(),
            path: self.path.clone(),
            exists: self.path.is_dir(),
            formulas: self.formulas(),
            git_info: self.git_info(),
        }
    }
}

/// Location of tap repository under target Homebrew prefix.
///
/// Tap `user/repo` lives at `<prefix>/Library/Taps/user/homebrew-repo`.
pub fn tap_path(prefix: impl AsRef<Path>, name: &str) -> Option<PathBuf> {
    let (user, repo) = name.split_once('/')?;
    if user.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }

    Some(
        prefix
            .as_ref()
            .join("Library")
            .join("Taps")
            .join(user)
            .join(format!("homebrew-{repo}")),
    )
}

/// Tap name recorded in a backup directory name.
pub fn tap_from_backup(dir_name: &str) -> Option<String> {
    let (user, repo) = dir_name
        .strip_prefix(BACKUP_PREFIX)?
        .split_once(BACKUP_SEPARATOR)?;
    (!user.is_empty() && !repo.is_empty()).then(|| format!("{user}/{repo}"))
}

/// Git details of a tap repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitInfo {
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub last_commit: Option<String>,
}

#[derive(Debug, Serialize)]
struct TapExport {
    name: String,
    path: PathBuf,
    exists: bool,
    formulas: Vec<FormulaInfo>,
    git_info: Option<GitInfo>,
}

/// Homebrew prefix, falling back to the manifest default.
pub fn homebrew_prefix(ctx: &Context) -> PathBuf {
    Brew::new(ctx.shell.as_ref())
        .prefix()
        .unwrap_or_else(|| ctx.resolve(&ctx.manifest.taps.fallback_prefix))
}

/// Every registered local tap.
///
/// # Errors
///
/// - Return [`TapError::Brew`] if `brew tap` fails.
pub fn local_taps(ctx: &Context) -> Result<Vec<LocalTap>> {
    let prefix = homebrew_prefix(ctx);
    let taps = Brew::new(ctx.shell.as_ref()).taps()?;
    debug!("registered taps {taps:?}");

    Ok(taps
        .into_iter()
        .filter(|tap| tap.starts_with(&ctx.manifest.taps.local_prefix))
        .filter_map(|tap| LocalTap::new(&prefix, tap))
        .collect())
}

fn listed_taps(ctx: &Context, reporter: &mut Reporter) -> Option<Vec<LocalTap>> {
    match local_taps(ctx) {
        Ok(taps) => Some(taps),
        Err(error) => {
            reporter.fail(format!("Could not list taps: {error}"));
            None
        }
    }
}

/// Print every local tap.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn list(ctx: &Context, reporter: &mut Reporter, detailed: bool) -> bool {
    reporter.banner("LOCAL TAPS");
    let Some(taps) = listed_taps(ctx, reporter) else {
        return false;
    };

    if taps.is_empty() {
        reporter.info("No local taps found");
        return true;
    }

    for tap in &taps {
        match detailed {
            true => describe(ctx, reporter, tap),
            false => {
                let count = tap.formulas().len();
                reporter.line(format!("  • {} ({count} formulas)", tap.name))
            }
        }
    }

    true
}

/// Print details of one local tap.
pub fn show(ctx: &Context, reporter: &mut Reporter, name: &str) -> bool {
    let Some(taps) = listed_taps(ctx, reporter) else {
        return false;
    };

    match taps.iter().find(|tap| tap.name == name) {
        Some(tap) => {
            describe(ctx, reporter, tap);
            true
        }
        None => {
            reporter.fail(format!("Local tap {name} not found"));
            false
        }
    }
}

fn describe(ctx: &Context, reporter: &mut Reporter, tap: &LocalTap) {
    reporter.section(&tap.name);
    reporter.line(format!("  Path: {}", ctx.display(&tap.path)));
    if !tap.path.is_dir() {
        reporter.warning(format!("{} directory is missing", tap.name));
        return;
    }

    let formulas = tap.formulas();
    reporter.line(format!("  Formulas: {}", formulas.len()));
    for info in &formulas {
        reporter.line(format!(
            "    - {} ({}) v{}: {}",
            info.name,
            info.size,
            info.version.as_deref().unwrap_or("Unknown"),
            info.description.as_deref().unwrap_or("No description"),
        ));
        reporter.line(format!("      {}", info.url.as_deref().unwrap_or("No URL")));
    }

    if let Some(git) = tap.git_info() {
        reporter.line(format!("  Remote: {}", git.remote.as_deref().unwrap_or("none")));
        reporter.line(format!("  Branch: {}", git.branch.as_deref().unwrap_or("unknown")));
        reporter.line(format!("  Last commit: {}", git.last_commit.as_deref().unwrap_or("none")));
    }
}

/// Write every local tap as JSON into target file.
///
/// # Errors
///
/// - Return [`TapError::Brew`] if `brew tap` fails.
/// - Return [`TapError::Json`] if serialization fails.
/// - Return [`TapError::Write`] if target file cannot be written.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn export(ctx: &Context, reporter: &mut Reporter, file: &Path) -> Result<()> {
    let exported: BTreeMap<String, TapExport> = local_taps(ctx)?
        .iter()
        .map(|tap| (tap.name.clone(), tap.export()))
        .collect();

    let json = serde_json::to_string_pretty(&exported)?;
    fs::write(file, json).map_err(|source| TapError::Write {
        path: file.into(),
        source,
    })?;

    reporter.success(format!("Exported {} local tap(s) to {}", exported.len(), ctx.display(file)));
    Ok(())
}

/// Audit every formula in every local tap.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn validate(ctx: &Context, reporter: &mut Reporter) -> bool {
    reporter.banner("LOCAL TAP VALIDATION");
    let Some(taps) = listed_taps(ctx, reporter) else {
        return false;
    };

    let brew = Brew::new(ctx.shell.as_ref());
    for tap in &taps {
        reporter.section(&tap.name);
        for info in tap.formulas() {
            let qualified = format!("{}/{}", tap.name, info.name);
            match brew.run(&["audit", "--formula", qualified.as_str()]) {
                true => reporter.success(format!("{qualified} passed audit")),
                false => reporter.fail(format!("{qualified} failed audit")),
            }
        }
    }

    reporter.finish("Local tap validation")
}

/// Copy every local tap into target directory.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn backup(ctx: &Context, reporter: &mut Reporter, dir: &Path) -> bool {
    let Some(taps) = listed_taps(ctx, reporter) else {
        return false;
    };

    backup_taps(ctx, reporter, &taps, dir)
}

fn backup_taps(ctx: &Context, reporter: &mut Reporter, taps: &[LocalTap], dir: &Path) -> bool {
    let mut backed_up = true;
    for tap in taps {
        if !tap.path.is_dir() {
            reporter.warning(format!("{} directory is missing, nothing to back up", tap.name));
            continue;
        }

        let target = dir.join(tap.backup_name());
        let copied = fsops::remove_path(&target).and_then(|_| fsops::copy_dir(&tap.path, &target));
        match copied {
            Ok(()) => {
                reporter.success(format!("Backed up {} to {}", tap.name, ctx.display(&target)))
            }
            Err(error) => {
                reporter.fail(format!("Failed to back up {}: {error}", tap.name));
                backed_up = false;
            }
        }
    }

    backed_up
}

/// Restore local taps from backups in target directory.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn restore(ctx: &Context, reporter: &mut Reporter, dir: &Path) -> bool {
    let prefix = homebrew_prefix(ctx);
    let brew = Brew::new(ctx.shell.as_ref());

    let Ok(entries) = fs::read_dir(dir) else {
        reporter.fail(format!("Backup directory {} not found", ctx.display(dir)));
        return false;
    };

    let mut backups: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = tap_from_backup(entry.file_name().to_str()?)?;
            Some((name, entry.path()))
        })
        .collect();
    backups.sort();

    if backups.is_empty() {
        reporter.info(format!("No tap backups found in {}", ctx.display(dir)));
        return true;
    }

    for (name, source) in backups {
        let Some(tap) = LocalTap::new(&prefix, name.as_str()) else {
            continue;
        };

        if tap.path.exists() {
            reporter.warning(format!("{name} already present, skipping"));
            continue;
        }

        if let Err(error) = fsops::copy_dir(&source, &tap.path) {
            reporter.fail(format!("Failed to restore {name}: {error}"));
            continue;
        }

        match brew.run(&["tap", name.as_str()]) {
            true => reporter.success(format!("Restored {name}")),
            false => reporter.warning(format!("Restored {name} files but brew tap failed")),
        }
    }

    reporter.finish("Local tap restore")
}

/// Untap local taps and delete their directories.
///
/// Without a name every local tap is removed.
///
/// # Errors
///
/// - Return [`prompt::PromptError`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn remove(ctx: &Context, reporter: &mut Reporter, name: Option<&str>) -> prompt::Result<bool> {
    let Some(mut taps) = listed_taps(ctx, reporter) else {
        return Ok(false);
    };

    if let Some(name) = name {
        taps.retain(|tap| tap.name == name);
        if taps.is_empty() {
            reporter.fail(format!("Local tap {name} not found"));
            return Ok(false);
        }
    }

    if taps.is_empty() {
        reporter.success("No local taps found");
        return Ok(true);
    }

    for tap in &taps {
        reporter.line(format!("  • {} at {}", tap.name, ctx.display(&tap.path)));
    }
    if !ctx.confirm(reporter, "Remove these local taps?")? {
        return Ok(false);
    }

    Ok(remove_taps(ctx, reporter, &taps))
}

fn remove_taps(ctx: &Context, reporter: &mut Reporter, taps: &[LocalTap]) -> bool {
    let brew = Brew::new(ctx.shell.as_ref());
    let mut clean = true;
    for tap in taps {
        if !brew.run(&["untap", "--force", tap.name.as_str()]) {
            reporter.warning(format!("brew untap {} failed", tap.name));
        }
        clean &= ctx.remove(reporter, &tap.path, &format!("{} tap directory", tap.name));
    }

    clean
}

/// Back up and remove every local tap.
///
/// # Errors
///
/// - Return [`prompt::PromptError`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn clean(ctx: &Context, reporter: &mut Reporter) -> prompt::Result<bool> {
    reporter.banner("LOCAL TAPS CLEANUP");
    let Some(taps) = listed_taps(ctx, reporter) else {
        return Ok(false);
    };

    if taps.is_empty() {
        reporter.success("No local taps found");
        return Ok(true);
    }

    for tap in &taps {
        reporter.line(format!("  • {} ({} formulas)", tap.name, tap.formulas().len()));
    }
    reporter.warning("This will remove ALL local taps!");
    if !ctx.confirm(reporter, "Remove all local taps?")? {
        return Ok(false);
    }

    if ctx.backup {
        let dir = ctx.resolve(&ctx.manifest.packages.backups_dir);
        reporter.section("Backup");
        if !backup_taps(ctx, reporter, &taps, &dir) {
            reporter.fail("Backup failed, aborting");
            return Ok(false);
        }
    }

    reporter.section("Removal");
    let clean = remove_taps(ctx, reporter, &taps);
    reporter.finish("Local taps cleanup");

    Ok(clean)
}

/// Local tap error types.
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    /// Homebrew cannot list taps.
    #[error(transparent)]
    Brew(#[from] BrewError),

    /// Tap export cannot be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Tap export cannot be written.
    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Friendly result alias :3
pub type Result<T, E = TapError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Manifest,
        shell::{fake::FakeShell, CommandOutput},
    };
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::sync::Arc;

    #[test_case("local/custom", Some("Library/Taps/local/homebrew-custom"); "local tap")]
    #[test_case("hashicorp/tap", Some("Library/Taps/hashicorp/homebrew-tap"); "remote tap")]
    #[test_case("custom", None; "missing user")]
    #[test_case("a/b/c", None; "too many parts")]
    #[test]
    fn tap_path_derivation(name: &str, expect: Option<&str>) {
        let expect = expect.map(|relative| Path::new("/opt/homebrew").join(relative));
        pretty_assertions::assert_eq!(tap_path("/opt/homebrew", name), expect);
    }

    #[test_case("local/my-tools", "local-tap-local__my-tools"; "hyphenated repo")]
    #[test_case("my-user/tools", "local-tap-my-user__tools"; "hyphenated user")]
    #[test_case("my-org/dev-tools", "local-tap-my-org__dev-tools"; "hyphenated both")]
    #[test]
    fn backup_name_round_trip(tap: &str, expect: &str) {
        let name = LocalTap::new("/opt/homebrew", tap).map(|tap| tap.backup_name());
        pretty_assertions::assert_eq!(name.as_deref(), Some(expect));
        pretty_assertions::assert_eq!(name.and_then(|name| tap_from_backup(&name)), Some(tap.into()));
    }

    #[test_case("something-else"; "foreign directory")]
    #[test_case("local-tap-local-custom"; "missing separator")]
    #[test_case("local-tap-__tools"; "empty user")]
    #[test]
    fn backup_name_rejects(dir_name: &str) {
        pretty_assertions::assert_eq!(tap_from_backup(dir_name), None);
    }

    fn fixture(prefix: &Path) -> anyhow::Result<(Context, Arc<FakeShell>)> {
        let shell = Arc::new(
            FakeShell::new()
                .respond("brew --prefix", CommandOutput::ok(prefix.to_string_lossy()))
                .respond("brew tap", CommandOutput::ok("homebrew/core\nlocal/custom")),
        );
        let ctx = Context::new(prefix, prefix, Manifest::builtin()?, shell.clone());
        Ok((ctx.with_auto_confirm(true), shell))
    }

    #[test]
    fn backup_then_clean_then_restore() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let formula_dir = scratch.path().join("Library/Taps/local/homebrew-custom/Formula");
        fs::create_dir_all(&formula_dir)?;
        fs::write(formula_dir.join("teleport.rb"), "  desc \"Teleport\"\n  version \"14.0.0\"\n")?;
        let (ctx, shell) = fixture(scratch.path())?;

        let taps = local_taps(&ctx)?;
        assert_eq!(taps.len(), 1);
        assert_eq!(taps[0].formulas()[0].version.as_deref(), Some("14.0.0"));

        assert!(clean(&ctx, &mut Reporter::quiet())?);
        assert!(!formula_dir.exists());
        let backup = scratch.path().join("backups/local-tap-local__custom");
        assert!(backup.join("Formula/teleport.rb").is_file());
        assert!(shell.calls().contains(&"brew untap --force local/custom".to_string()));

        assert!(restore(&ctx, &mut Reporter::quiet(), &scratch.path().join("backups")));
        assert!(formula_dir.join("teleport.rb").is_file());

        Ok(())
    }

    #[test]
    fn export_writes_json() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        fs::create_dir_all(scratch.path().join("Library/Taps/local/homebrew-custom/Formula"))?;
        let (ctx, _) = fixture(scratch.path())?;
        let file = scratch.path().join("taps.json");

        export(&ctx, &mut Reporter::quiet(), &file)?;
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
        assert_eq!(json["local/custom"]["exists"], serde_json::Value::Bool(true));
        assert_eq!(json["local/custom"]["formulas"], serde_json::json!([]));

        Ok(())
    }
}
