// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Development cache cleanup.

use crate::{
    brew::Brew,
    category::{self, CacheCategory},
    config::{PathEntry, PatternEntry},
    context::Context,
    fsops,
    prompt::Result,
    report::Reporter,
};

use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Remove cache directories of the requested categories.
///
/// Returns `Ok(false)` if the user declined, or if something could not be
/// removed.
///
/// # Errors
///
/// - Return [`crate::prompt::PromptError`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn clean(ctx: &Context, reporter: &mut Reporter, categories: &[CacheCategory]) -> Result<bool> {
    let categories = category::expand(categories);

    reporter.banner("CACHES CLEANUP");
    reporter.line("This will remove various development caches:");
    for category in &categories {
        reporter.line(format!("\n{}:", category.title()));
        for entry in entries(ctx, *category) {
            reporter.line(format!("  • {}", ctx.display(ctx.resolve(&entry.path))));
        }
        if *category == CacheCategory::Homebrew {
            reporter.line("  • brew cleanup --prune=all");
        }
        if *category == CacheCategory::Temp {
            for pattern in &ctx.manifest.caches.temp_patterns {
                reporter.line(format!("  • {} (pattern)", pattern.pattern));
            }
        }
    }

    if !ctx.confirm(reporter, "Remove these caches?")? {
        return Ok(false);
    }

    let mut clean = true;
    for category in categories {
        reporter.section(format!("{} Cleanup", category.title()));
        for entry in entries(ctx, category) {
            clean &= remove_sized(ctx, reporter, &ctx.resolve(&entry.path), &entry.description);
        }

        match category {
            CacheCategory::Homebrew => clean &= brew_cleanup(ctx, reporter),
            CacheCategory::Temp => {
                for pattern in &ctx.manifest.caches.temp_patterns {
                    clean &= remove_matches(ctx, reporter, pattern);
                }
            }
            _ => {}
        }
    }

    reporter.finish("Caches cleanup");
    Ok(clean)
}

fn entries(ctx: &Context, category: CacheCategory) -> &[PathEntry] {
    let caches = &ctx.manifest.caches;
    match category {
        CacheCategory::Homebrew => caches.homebrew.as_slice(),
        CacheCategory::Languages => caches.languages.as_slice(),
        CacheCategory::System => caches.system.as_slice(),
        CacheCategory::Temp => caches.temp.as_slice(),
        CacheCategory::All => &[],
    }
}

fn remove_sized(ctx: &Context, reporter: &mut Reporter, path: &Path, description: &str) -> bool {
    if fsops::occupied(path) {
        reporter.info(format!(
            "{description} holds {}",
            fsops::human_size(fsops::dir_size(path))
        ));
    }

    ctx.remove(reporter, path, description)
}

fn brew_cleanup(ctx: &Context, reporter: &mut Reporter) -> bool {
    let brew = Brew::new(ctx.shell.as_ref());
    if !brew.available() {
        reporter.info("Homebrew not installed, skipping brew cleanup");
        return true;
    }

    reporter.info("Running brew cleanup --prune=all...");
    match brew.run(&["cleanup", "--prune=all"]) {
        true => reporter.success("Brew cleanup completed"),
        false => reporter.warning("Brew cleanup may have failed"),
    }

    // brew cleanup can recreate its own cache.
    let Some(cache) = ctx.manifest.caches.homebrew.first() else {
        return true;
    };
    let cache_path = ctx.resolve(&cache.path);
    if !fsops::occupied(&cache_path) {
        return true;
    }

    reporter.info("Removing Homebrew cache again (post-cleanup)");
    ctx.remove(reporter, &cache_path, &format!("{} (final cleanup)", cache.description))
}

fn remove_matches(ctx: &Context, reporter: &mut Reporter, pattern: &PatternEntry) -> bool {
    let expanded = expand_pattern(&ctx.home, &pattern.pattern);
    let matches = match glob::glob(expanded.to_string_lossy().as_ref()) {
        Ok(paths) => paths.flatten().collect::<Vec<_>>(),
        Err(error) => {
            reporter.warning(format!("Invalid pattern {}: {error}", pattern.pattern));
            return false;
        }
    };
    debug!("{} matched {} path(s)", pattern.pattern, matches.len());

    if matches.is_empty() {
        reporter.success(format!("{} not found (already clean)", pattern.description));
        return true;
    }

    let mut clean = true;
    for path in matches {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        clean &= remove_sized(ctx, reporter, &path, &format!("{} {name}", pattern.description));
    }

    clean
}

fn expand_pattern(home: &Path, pattern: &str) -> PathBuf {
    match pattern.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Manifest,
        shell::{fake::FakeShell, CommandOutput},
    };
    use pretty_assertions::assert_eq;
    use std::{fs, sync::Arc};

    fn fixture(home: &Path, shell: FakeShell) -> anyhow::Result<(Context, Arc<FakeShell>)> {
        let mut manifest = Manifest::builtin()?;
        manifest.caches.temp_patterns = vec![PatternEntry {
            pattern: "~/scratch/homebrew-*".into(),
            description: "Homebrew temp".into(),
        }];
        let shell = Arc::new(shell);
        let ctx = Context::new(home, home, manifest, shell.clone()).with_auto_confirm(true);
        Ok((ctx, shell))
    }

    #[test]
    fn category_filter_limits_removal() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let home = scratch.path();
        fs::create_dir_all(home.join(".npm/_cacache"))?;
        fs::create_dir_all(home.join(".cache/git"))?;
        let (ctx, shell) = fixture(home, FakeShell::new())?;

        assert!(clean(&ctx, &mut Reporter::quiet(), &[CacheCategory::Languages])?);
        assert!(!home.join(".npm").exists());
        assert!(home.join(".cache/git").exists());
        assert!(shell.calls().is_empty());

        Ok(())
    }

    #[test]
    fn homebrew_cache_removed_after_brew_cleanup() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let home = scratch.path();
        fs::create_dir_all(home.join("Library/Caches/Homebrew/downloads"))?;
        fs::write(home.join("Library/Caches/Homebrew/downloads/git.tar.gz"), "blah")?;
        let shell = FakeShell::new().respond("brew --version", CommandOutput::ok("Homebrew 4.4.0"));
        let (ctx, shell) = fixture(home, shell)?;

        assert!(clean(&ctx, &mut Reporter::quiet(), &[CacheCategory::Homebrew])?);
        assert!(!home.join("Library/Caches/Homebrew").exists());
        assert!(shell.calls().contains(&"brew cleanup --prune=all".to_string()));

        Ok(())
    }

    #[test]
    fn temp_patterns_expand_globs() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let home = scratch.path();
        fs::create_dir_all(home.join("scratch/homebrew-abc"))?;
        fs::create_dir_all(home.join("scratch/homebrew-def"))?;
        fs::create_dir_all(home.join("scratch/keep-me"))?;
        let (ctx, _) = fixture(home, FakeShell::new())?;

        let mut reporter = Reporter::quiet();
        assert!(clean(&ctx, &mut reporter, &[CacheCategory::Temp])?);
        assert!(!home.join("scratch/homebrew-abc").exists());
        assert!(!home.join("scratch/homebrew-def").exists());
        assert!(home.join("scratch/keep-me").exists());

        let mut second = Reporter::quiet();
        assert!(clean(&ctx, &mut second, &[CacheCategory::Temp])?);
        assert_eq!(second.tally().warn + second.tally().fail, 0);

        Ok(())
    }

    #[test]
    fn all_covers_every_group() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let (ctx, _) = fixture(scratch.path(), FakeShell::new())?;
        let mut reporter = Reporter::quiet();

        assert!(clean(&ctx, &mut reporter, &[CacheCategory::All])?);
        let caches = &ctx.manifest.caches;
        let expect = caches.homebrew.len()
            + caches.languages.len()
            + caches.system.len()
            + caches.temp.len()
            + 1;
        assert_eq!(reporter.tally().ok, expect + 1);

        Ok(())
    }
}
