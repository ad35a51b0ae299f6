// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use devboot::{
    caches,
    category::{CacheCategory, DotfileCategory},
    context::{load_manifest, Context},
    dotfiles, languages, neovim,
    packages::{self, InstallOptions},
    path::home_dir,
    report::Reporter,
    shell::SystemShell,
    status::{self, CheckType, StatusOptions},
    submodules, taps,
};

use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::{env, path::PathBuf, process::exit, sync::Arc};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "devboot [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to dotfile repository.
    #[arg(long, global = true, value_name = "path")]
    pub repo: Option<PathBuf>,

    /// Path to manifest replacing the built-in one.
    #[arg(long, global = true, value_name = "path")]
    pub manifest: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<bool> {
        let repo = match self.repo {
            Some(repo) => repo,
            None => env::current_dir()?,
        };
        let manifest = load_manifest(self.manifest.as_deref())?;
        let ctx = Context::new(home_dir()?, repo, manifest, Arc::new(SystemShell::new()));
        debug!("running with {ctx:?}");

        let mut reporter = Reporter::new();
        match self.command {
            Command::Packages(command) => run_packages(ctx, &mut reporter, command),
            Command::Dotfiles(command) => run_dotfiles(ctx, &mut reporter, command),
            Command::Neovim(command) => run_neovim(ctx, &mut reporter, command),
            Command::Languages(command) => run_languages(ctx, &mut reporter, command),
            Command::Submodules(command) => run_submodules(ctx, &mut reporter, command),
            Command::Taps(command) => run_taps(ctx, &mut reporter, command),
            Command::Caches(command) => run_caches(ctx, &mut reporter, command),
            Command::Status(opts) => run_status(ctx, opts),
            Command::Manifest => {
                print!("{}", ctx.manifest);
                Ok(true)
            }
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Manage Homebrew package catalogue.
    #[command(subcommand)]
    Packages(PackagesCommand),

    /// Link dotfiles into home directory.
    #[command(subcommand)]
    Dotfiles(DotfilesCommand),

    /// Set up Neovim configuration.
    #[command(subcommand)]
    Neovim(NeovimCommand),

    /// Drive language version managers.
    #[command(subcommand)]
    Languages(LanguagesCommand),

    /// Manage git submodules of repository.
    #[command(subcommand)]
    Submodules(SubmodulesCommand),

    /// Manage local Homebrew taps.
    #[command(subcommand)]
    Taps(TapsCommand),

    /// Remove development caches.
    #[command(subcommand)]
    Caches(CachesCommand),

    /// Verify whether machine is installed or cleaned.
    #[command(override_usage = "devboot status [options]")]
    Status(StatusArgs),

    /// Print effective manifest.
    Manifest,
}

/// Options shared by destructive commands.
#[derive(Args, Clone, Debug)]
struct ConfirmArgs {
    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Options shared by destructive commands that take backups.
#[derive(Args, Clone, Debug)]
struct BackupArgs {
    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Do not take backups before removing anything.
    #[arg(long)]
    pub no_backup: bool,
}

#[derive(Debug, Clone, Subcommand)]
enum PackagesCommand {
    /// Install package catalogue.
    #[command(group(ArgGroup::new("target").required(true).args(["all", "category"])))]
    Install {
        /// Install every category.
        #[arg(short, long)]
        all: bool,

        /// Install only target category.
        #[arg(short, long, value_name = "category")]
        category: Option<String>,

        /// Also install optional packages and categories.
        #[arg(long)]
        include_optional: bool,

        /// Do not offer removal of obsolete packages first.
        #[arg(long)]
        no_cleanup: bool,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },

    /// List package catalogue.
    List {
        /// List only target category.
        #[arg(short, long, value_name = "category")]
        category: Option<String>,
    },

    /// Show which catalogue packages are installed.
    Status,

    /// Remove obsolete packages.
    Cleanup(ConfirmArgs),

    /// List custom formulas.
    Formulas,

    /// Install every custom formula.
    InstallFormulas,

    /// Install single package.
    Add {
        #[arg(value_name = "name")]
        name: String,

        /// Install as cask.
        #[arg(long)]
        cask: bool,
    },

    /// Install formula file directly.
    AddFormula {
        #[arg(value_name = "path")]
        path: PathBuf,
    },

    /// Install package from third party tap.
    AddTap {
        #[arg(value_name = "tap")]
        tap: String,

        #[arg(value_name = "name")]
        name: String,
    },

    /// Install formula file through local tap.
    AddLocalTap {
        #[arg(value_name = "path")]
        path: PathBuf,

        /// Local tap to copy formula into.
        #[arg(short, long, value_name = "tap")]
        tap: Option<String>,
    },

    /// Write starter formula into formulas directory.
    Template {
        #[arg(value_name = "name")]
        name: String,
    },

    /// Dry run installation of formula file.
    Validate {
        #[arg(value_name = "path")]
        path: PathBuf,
    },

    /// Uninstall single package.
    Remove {
        #[arg(value_name = "name")]
        name: String,
    },

    /// Update Homebrew and upgrade packages.
    Update,

    /// Uninstall everything Homebrew installed.
    Purge(BackupArgs),
}

#[derive(Debug, Clone, Subcommand)]
enum DotfilesCommand {
    /// Link every dotfile.
    Install,

    /// Check every dotfile link.
    Verify,

    /// Remove dotfile links.
    Clean {
        /// Categories of links to remove.
        #[arg(short, long, value_enum, value_delimiter = ',', default_value = "all")]
        categories: Vec<DotfileCategory>,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum NeovimCommand {
    /// Link configuration and install plugins.
    Install,

    /// Check configuration link and plugins.
    Verify,

    /// Remove configuration link and Neovim data.
    Clean(ConfirmArgs),
}

#[derive(Debug, Clone, Subcommand)]
enum LanguagesCommand {
    /// Install language runtimes.
    Install,

    /// Remove every language manager and its data.
    Clean(ConfirmArgs),
}

#[derive(Debug, Clone, Subcommand)]
enum SubmodulesCommand {
    /// Initialize and update submodules.
    Setup,

    /// Show submodule status.
    Status,

    /// Check that every submodule is checked out.
    Verify,

    /// Deinitialize submodules and remove their data.
    Clean(ConfirmArgs),
}

#[derive(Debug, Clone, Subcommand)]
enum TapsCommand {
    /// List local taps.
    List {
        /// Also list formulas and git details.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Show details of one local tap.
    Show {
        #[arg(value_name = "name")]
        name: String,
    },

    /// Write local taps as JSON.
    Export {
        #[arg(value_name = "file")]
        file: PathBuf,
    },

    /// Audit formulas of every local tap.
    Validate,

    /// Copy local taps into backup directory.
    Backup {
        #[arg(value_name = "dir")]
        dir: PathBuf,
    },

    /// Restore local taps from backup directory.
    Restore {
        #[arg(value_name = "dir")]
        dir: PathBuf,
    },

    /// Remove one local tap, or every local tap.
    Remove {
        #[arg(value_name = "name")]
        name: Option<String>,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },

    /// Back up and remove every local tap.
    Clean(BackupArgs),
}

#[derive(Debug, Clone, Subcommand)]
enum CachesCommand {
    /// Remove cache directories.
    Clean {
        /// Categories of caches to remove.
        #[arg(short, long, value_enum, value_delimiter = ',', default_value = "all")]
        categories: Vec<CacheCategory>,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },
}

#[derive(Args, Clone, Debug)]
struct StatusArgs {
    /// Expected state of machine.
    #[arg(long, value_enum, default_value = "installed")]
    pub check_type: CheckType,

    /// Run checks one at a time.
    #[arg(long)]
    pub sequential: bool,

    /// Maximum number of checks running at once.
    #[arg(short, long, default_value_t = 4, value_name = "count")]
    pub workers: usize,

    /// Only check packages and essential commands.
    #[arg(long, group = "selection")]
    pub packages_only: bool,

    /// Only check cleanup leftovers.
    #[arg(long, group = "selection")]
    pub cleanup_only: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        true => "debug",
        false => "warn",
    };
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    match cli.run() {
        Ok(true) => exit(0),
        Ok(false) => exit(1),
        Err(error) => {
            error!("{error:?}");
            exit(1);
        }
    }
}

fn run_packages(ctx: Context, reporter: &mut Reporter, command: PackagesCommand) -> Result<bool> {
    let done = match command {
        PackagesCommand::Install {
            category,
            include_optional,
            no_cleanup,
            confirm,
            ..
        } => {
            let options = InstallOptions {
                selection: match category {
                    Some(category) => packages::Selection::Category(category),
                    None => packages::Selection::All,
                },
                include_optional,
                cleanup: !no_cleanup,
            };
            packages::install(&ctx.with_auto_confirm(confirm.yes), reporter, &options)?
        }
        PackagesCommand::List { category } => packages::list(&ctx, reporter, category.as_deref()),
        PackagesCommand::Status => packages::status(&ctx, reporter),
        PackagesCommand::Cleanup(confirm) => {
            packages::cleanup_obsolete(&ctx.with_auto_confirm(confirm.yes), reporter)?
        }
        PackagesCommand::Formulas => packages::formulas(&ctx, reporter),
        PackagesCommand::InstallFormulas => packages::install_formulas(&ctx, reporter),
        PackagesCommand::Add { name, cask } => packages::add(&ctx, reporter, &name, cask),
        PackagesCommand::AddFormula { path } => packages::add_formula(&ctx, reporter, &path),
        PackagesCommand::AddTap { tap, name } => packages::add_tap(&ctx, reporter, &tap, &name),
        PackagesCommand::AddLocalTap { path, tap } => {
            packages::add_local_tap(&ctx, reporter, &path, tap.as_deref())
        }
        PackagesCommand::Template { name } => packages::template(&ctx, reporter, &name),
        PackagesCommand::Validate { path } => packages::validate(&ctx, reporter, &path),
        PackagesCommand::Remove { name } => packages::remove(&ctx, reporter, &name),
        PackagesCommand::Update => packages::update(&ctx, reporter),
        PackagesCommand::Purge(opts) => {
            let ctx = ctx.with_auto_confirm(opts.yes).with_backup(!opts.no_backup);
            packages::purge(&ctx, reporter)?
        }
    };

    Ok(done)
}

fn run_dotfiles(ctx: Context, reporter: &mut Reporter, command: DotfilesCommand) -> Result<bool> {
    let done = match command {
        DotfilesCommand::Install => dotfiles::install(&ctx, reporter),
        DotfilesCommand::Verify => dotfiles::verify(&ctx, reporter),
        DotfilesCommand::Clean { categories, confirm } => {
            dotfiles::clean(&ctx.with_auto_confirm(confirm.yes), reporter, &categories)?
        }
    };

    Ok(done)
}

fn run_neovim(ctx: Context, reporter: &mut Reporter, command: NeovimCommand) -> Result<bool> {
    let done = match command {
        NeovimCommand::Install => neovim::install(&ctx, reporter),
        NeovimCommand::Verify => neovim::verify(&ctx, reporter),
        NeovimCommand::Clean(confirm) => {
            neovim::clean(&ctx.with_auto_confirm(confirm.yes), reporter)?
        }
    };

    Ok(done)
}

fn run_languages(ctx: Context, reporter: &mut Reporter, command: LanguagesCommand) -> Result<bool> {
    let done = match command {
        LanguagesCommand::Install => languages::install(&ctx, reporter),
        LanguagesCommand::Clean(confirm) => {
            languages::clean(&ctx.with_auto_confirm(confirm.yes), reporter)?
        }
    };

    Ok(done)
}

fn run_submodules(
    ctx: Context,
    reporter: &mut Reporter,
    command: SubmodulesCommand,
) -> Result<bool> {
    let done = match command {
        SubmodulesCommand::Setup => submodules::setup(&ctx, reporter)?,
        SubmodulesCommand::Status => submodules::status(&ctx, reporter),
        SubmodulesCommand::Verify => submodules::verify(&ctx, reporter),
        SubmodulesCommand::Clean(confirm) => {
            submodules::clean(&ctx.with_auto_confirm(confirm.yes), reporter)?
        }
    };

    Ok(done)
}

fn run_taps(ctx: Context, reporter: &mut Reporter, command: TapsCommand) -> Result<bool> {
    let done = match command {
        TapsCommand::List { detailed } => taps::list(&ctx, reporter, detailed),
        TapsCommand::Show { name } => taps::show(&ctx, reporter, &name),
        TapsCommand::Export { file } => {
            taps::export(&ctx, reporter, &file)?;
            true
        }
        TapsCommand::Validate => taps::validate(&ctx, reporter),
        TapsCommand::Backup { dir } => taps::backup(&ctx, reporter, &dir),
        TapsCommand::Restore { dir } => taps::restore(&ctx, reporter, &dir),
        TapsCommand::Remove { name, confirm } => {
            taps::remove(&ctx.with_auto_confirm(confirm.yes), reporter, name.as_deref())?
        }
        TapsCommand::Clean(opts) => {
            let ctx = ctx.with_auto_confirm(opts.yes).with_backup(!opts.no_backup);
            taps::clean(&ctx, reporter)?
        }
    };

    Ok(done)
}

fn run_caches(ctx: Context, reporter: &mut Reporter, command: CachesCommand) -> Result<bool> {
    let done = match command {
        CachesCommand::Clean { categories, confirm } => {
            caches::clean(&ctx.with_auto_confirm(confirm.yes), reporter, &categories)?
        }
    };

    Ok(done)
}

fn run_status(ctx: Context, opts: StatusArgs) -> Result<bool> {
    let selection = if opts.packages_only {
        status::Selection::PackagesOnly
    } else if opts.cleanup_only {
        status::Selection::CleanupOnly
    } else {
        status::Selection::Full
    };
    let options = StatusOptions {
        expect: opts.check_type,
        selection,
        sequential: opts.sequential,
        workers: opts.workers,
        echo: true,
    };

    let outcome = status::run(&ctx, &options)?;
    Ok(outcome.summary.passed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn install_flags(args: &str) -> Option<(bool, Option<String>, bool)> {
        let argv = std::iter::once("devboot").chain(args.split_whitespace());
        let cli = Cli::try_parse_from(argv).ok()?;
        match cli.command {
            Command::Packages(PackagesCommand::Install {
                all,
                category,
                no_cleanup,
                ..
            }) => Some((all, category, no_cleanup)),
            _ => None,
        }
    }

    #[test_case("packages install --all", Some((true, None, false)); "all offers cleanup")]
    #[test_case(
        "packages install -c core",
        Some((false, Some("core".into()), false));
        "category offers cleanup"
    )]
    #[test_case("packages install --all --no-cleanup", Some((true, None, true)); "cleanup opt out")]
    #[test_case("packages install", None; "target required")]
    #[test_case("packages install --all -c core", None; "targets exclusive")]
    #[test]
    fn parse_package_install(args: &str, expect: Option<(bool, Option<String>, bool)>) {
        pretty_assertions::assert_eq!(install_flags(args), expect);
    }
}
