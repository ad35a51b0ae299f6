// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! System status aggregation.
//!
//! Run a set of independent, read-only checks against the machine and fold
//! their reports into one pass/warn/fail verdict. Checks either run one
//! after another, or concurrently on tokio's blocking pool with a bounded
//! number in flight. A check that errors or panics never takes the run down
//! with it, it becomes a failed report instead.
//!
//! Each report is printed as one block while holding the standard output
//! lock, so lines of different checks never interleave.

mod checks;
mod report;

#[doc(inline)]
pub use checks::*;
pub use report::*;

use crate::context::Context;

use clap::ValueEnum;
use colored::Colorize;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    any::Any,
    io::Write,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::Arc,
    time::Instant,
};
use tracing::{debug, instrument};

/// What the machine is expected to look like.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckType {
    /// Everything has been removed.
    Cleaned,

    /// Everything has been set up.
    #[default]
    Installed,
}

/// Read-only inspection of one aspect of the machine.
pub trait StatusCheck: Send + Sync {
    /// Name used as section header of the report.
    fn name(&self) -> &str;

    /// Inspect the machine.
    ///
    /// # Errors
    ///
    /// - Return [`CheckError`] if inspection could not be completed.
    fn run(&self, ctx: &Context, expect: CheckType) -> Result<CheckReport>;
}

/// Which checks to run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Every check.
    #[default]
    Full,

    /// Package and command checks only, run sequentially.
    PackagesOnly,

    /// Cleanup leftover checks only, run sequentially.
    CleanupOnly,
}

/// Options of a status run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOptions {
    pub expect: CheckType,
    pub selection: Selection,

    /// Run full selection one check at a time.
    pub sequential: bool,

    /// Maximum number of checks in flight.
    pub workers: usize,

    /// Print reports and summary.
    pub echo: bool,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            expect: CheckType::default(),
            selection: Selection::default(),
            sequential: false,
            workers: 4,
            echo: true,
        }
    }
}

/// Reports of a status run and their aggregate.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub reports: Vec<CheckReport>,
    pub summary: Summary,
}

/// Run status checks and print their verdict.
///
/// # Errors
///
/// - Return [`StatusError::Runtime`] if the async runtime cannot start.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context, options: &StatusOptions) -> Result<Outcome, StatusError> {
    let builtin: &[Check] = match options.selection {
        Selection::Full => &Check::ALL,
        Selection::PackagesOnly => &Check::PACKAGES,
        Selection::CleanupOnly => &Check::CLEANUP,
    };
    let selected: Vec<Arc<dyn StatusCheck>> = builtin
        .iter()
        .map(|check| Arc::new(*check) as Arc<dyn StatusCheck>)
        .collect();
    let parallel = options.selection == Selection::Full && !options.sequential;

    if options.echo {
        println!("{}", "SYSTEM STATUS CHECKER".bold());
        println!("{}", "=".repeat(50).bold());
        let mode = match parallel {
            true => format!("Running checks with {} parallel workers...", options.workers.max(1)),
            false => "Running checks sequentially...".to_string(),
        };
        println!("{}", mode.blue());
    }

    let start = Instant::now();
    let reports = match parallel {
        true => run_parallel(ctx, options.expect, &selected, options.workers, options.echo)?,
        false => run_sequential(ctx, options.expect, &selected, options.echo),
    };
    let summary = Summary::new(&reports);

    if options.echo {
        let elapsed = format!(
            "All checks completed in {:.2} seconds",
            start.elapsed().as_secs_f64()
        );
        println!("\n{}", elapsed.blue());
        print!("{}", summary.render(options.expect));
    }

    Ok(Outcome { reports, summary })
}

/// Run checks one at a time in declaration order.
pub fn run_sequential(
    ctx: &Context,
    expect: CheckType,
    checks: &[Arc<dyn StatusCheck>],
    echo: bool,
) -> Vec<CheckReport> {
    checks
        .iter()
        .map(|check| {
            let report = match panic::catch_unwind(AssertUnwindSafe(|| check.run(ctx, expect))) {
                Ok(Ok(report)) => report,
                Ok(Err(error)) => CheckReport::crashed(check.name(), error),
                Err(payload) => CheckReport::crashed(check.name(), panic_message(payload)),
            };
            if echo {
                print_report(&report);
            }
            report
        })
        .collect()
}

/// Run checks concurrently with at most `workers` in flight.
///
/// Reports come back in completion order.
///
/// # Errors
///
/// - Return [`StatusError::Runtime`] if the async runtime cannot start.
pub fn run_parallel(
    ctx: &Context,
    expect: CheckType,
    checks: &[Arc<dyn StatusCheck>],
    workers: usize,
    echo: bool,
) -> Result<Vec<CheckReport>, StatusError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StatusError::Runtime)?;

    let bar = match echo {
        true => ProgressBar::new(checks.len() as u64),
        false => ProgressBar::hidden(),
    };
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);
    bar.set_message("Running checks");

    let reports = runtime.block_on(async {
        let mut pending = stream::iter(checks.iter().cloned().map(|check| {
            let ctx = ctx.clone();
            async move {
                let name = check.name().to_string();
                debug!("start check {name}");
                match tokio::task::spawn_blocking(move || check.run(&ctx, expect)).await {
                    Ok(Ok(report)) => report,
                    Ok(Err(error)) => CheckReport::crashed(name, error),
                    Err(error) => match error.try_into_panic() {
                        Ok(payload) => CheckReport::crashed(name, panic_message(payload)),
                        Err(error) => CheckReport::crashed(name, error),
                    },
                }
            }
        }))
        .buffer_unordered(workers.max(1));

        let mut reports = Vec::with_capacity(checks.len());
        while let Some(report) = pending.next().await {
            debug!("finished check {}", report.name);
            if echo {
                bar.suspend(|| print_report(&report));
            }
            bar.inc(1);
            reports.push(report);
        }
        reports
    });
    bar.finish_and_clear();

    Ok(reports)
}

fn print_report(report: &CheckReport) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(report.render().as_bytes());
    let _ = stdout.flush();
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "check panicked".into())
}

/// Error of a single check.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Path could not be inspected.
    #[error("failed to inspect {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Shell(#[from] crate::shell::ShellError),
}

/// Status run error types.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// Async runtime cannot be built.
    #[error("failed to start async runtime")]
    Runtime(#[source] std::io::Error),

    /// Progress bar template is invalid.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = CheckError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Manifest,
        shell::{fake::FakeShell, CommandOutput},
    };
    use pretty_assertions::assert_eq;
    use std::fs;

    struct Exploding;

    impl StatusCheck for Exploding {
        fn name(&self) -> &str {
            "Exploding"
        }

        fn run(&self, _: &Context, _: CheckType) -> Result<CheckReport> {
            panic!("kaboom");
        }
    }

    struct Erroring;

    impl StatusCheck for Erroring {
        fn name(&self) -> &str {
            "Erroring"
        }

        fn run(&self, _: &Context, _: CheckType) -> Result<CheckReport> {
            Err(CheckError::Io {
                path: PathBuf::from("/nowhere"),
                source: std::io::Error::other("unreadable"),
            })
        }
    }

    fn context(root: &std::path::Path) -> anyhow::Result<Context> {
        let home = root.join("home");
        let repo = root.join("repo");
        fs::create_dir_all(home.join(".cargo"))?;
        fs::create_dir_all(repo.join("neovim/plugged"))?;
        fs::write(repo.join("gitconfig"), "")?;
        crate::fsops::create_symlink(repo.join("gitconfig"), home.join(".gitconfig"))?;

        let shell = FakeShell::new()
            .respond("brew --version", CommandOutput::ok("Homebrew 4.4.0"))
            .respond("brew list --formula", CommandOutput::ok("git\nzsh"))
            .respond("brew list --cask", CommandOutput::ok(""))
            .respond("brew tap", CommandOutput::ok("homebrew/core\nlocal/custom"))
            .respond("brew list git", CommandOutput::ok("git"))
            .respond("which git", CommandOutput::ok("/usr/bin/git"))
            .respond("rustc --version", CommandOutput::ok("rustc 1.82.0"));
        Ok(Context::new(home, repo, Manifest::builtin()?, Arc::new(shell)))
    }

    fn builtin() -> Vec<Arc<dyn StatusCheck>> {
        Check::ALL
            .iter()
            .map(|check| Arc::new(*check) as Arc<dyn StatusCheck>)
            .collect()
    }

    #[test]
    fn parallel_matches_sequential() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ctx = context(scratch.path())?;

        for expect in [CheckType::Cleaned, CheckType::Installed] {
            let sequential = Summary::new(&run_sequential(&ctx, expect, &builtin(), false));
            let parallel = Summary::new(&run_parallel(&ctx, expect, &builtin(), 3, false)?);
            assert_eq!(parallel, sequential);
        }

        Ok(())
    }

    #[test]
    fn sequential_keeps_declaration_order() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ctx = context(scratch.path())?;

        let reports = run_sequential(&ctx, CheckType::Installed, &builtin(), false);
        let names: Vec<&str> = reports.iter().map(|report| report.name.as_str()).collect();
        let expect: Vec<&str> = Check::ALL.iter().map(Check::title).collect();
        assert_eq!(names, expect);

        Ok(())
    }

    #[test]
    fn crashing_checks_become_failures() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ctx = context(scratch.path())?;
        let checks: Vec<Arc<dyn StatusCheck>> = vec![
            Arc::new(Exploding),
            Arc::new(Check::SystemCommands),
            Arc::new(Erroring),
        ];

        for reports in [
            run_sequential(&ctx, CheckType::Installed, &checks, false),
            run_parallel(&ctx, CheckType::Installed, &checks, 1, false)?,
        ] {
            assert_eq!(reports.len(), 3);
            let exploding = reports.iter().find(|report| report.name == "Exploding");
            assert_eq!(
                exploding.map(|report| report.errors.clone()),
                Some(vec!["Check failed with exception: kaboom".to_string()])
            );
            let erroring = reports.iter().find(|report| report.name == "Erroring");
            assert!(erroring.is_some_and(|report| !report.success));
            assert_eq!(Summary::new(&reports).failed_checks, 3);
        }

        Ok(())
    }

    #[test]
    fn selections_pick_their_checks() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ctx = context(scratch.path())?;

        let options = StatusOptions {
            selection: Selection::CleanupOnly,
            echo: false,
            ..StatusOptions::default()
        };
        let outcome = run(&ctx, &options)?;
        let names: Vec<&str> = outcome.reports.iter().map(|report| report.name.as_str()).collect();
        assert_eq!(names, vec!["Language Managers", "Neovim Status", "Dotfiles Status"]);
        assert!(outcome.summary.passed());

        let options = StatusOptions {
            selection: Selection::PackagesOnly,
            echo: false,
            ..StatusOptions::default()
        };
        let outcome = run(&ctx, &options)?;
        assert_eq!(outcome.reports.len(), 2);
        assert!(!outcome.summary.passed());

        Ok(())
    }
}
