// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Language version managers.
//!
//! Drive SDKMAN, rustup, uv, and fnm to install language runtimes, and remove
//! every directory those managers leave behind.

use crate::{context::Context, prompt::Result, report::Reporter};

use tracing::{instrument, warn};

const SDKMAN_INSTALLER: &str = "curl -s \"https://get.sdkman.io\" | bash";

/// Install language runtimes through their version managers.
///
/// Managers that are not installed yet only produce informational lines.
/// Steps that fail produce warnings. Missing SDKMAN prerequisites are a
/// failure.
///
/// Returns true if no failures were reported.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn install(ctx: &Context, reporter: &mut Reporter) -> bool {
    reporter.banner("LANGUAGE MANAGERS SETUP");

    setup_sdkman(ctx, reporter);
    setup_rust(ctx, reporter);
    setup_python(ctx, reporter);
    setup_node(ctx, reporter);

    let succeeded = reporter.finish("Language managers setup");
    reporter.line("Restart your shell or source your shell configuration to use the new runtimes");
    succeeded
}

fn setup_sdkman(ctx: &Context, reporter: &mut Reporter) {
    let layout = &ctx.manifest.languages;
    let sdkman = ctx.home.join(".sdkman");

    reporter.section("Java (SDKMAN)");
    reporter.info("Checking system prerequisites for SDKMAN...");
    let missing: Vec<&str> = layout
        .sdkman_prerequisites
        .iter()
        .map(String::as_str)
        .filter(|tool| ctx.shell.which(tool).is_none())
        .collect();
    if !missing.is_empty() {
        reporter.fail(format!(
            "{} required but not installed, run: devboot packages install --category java-prereq",
            missing.join(", ")
        ));
        return;
    }
    reporter.success("System prerequisites verified");

    if sdkman.exists() {
        reporter.success("SDKMAN core manager already installed");
    } else {
        reporter.info("Installing SDKMAN core manager...");
        if let Err(error) = ctx.shell.run_interactive("bash", &["-c", SDKMAN_INSTALLER]) {
            warn!("SDKMAN installer did not run: {error}");
            reporter.warning(format!("Could not run SDKMAN installer: {error}"));
        }
        if !sdkman.exists() {
            reporter.fail("SDKMAN installation failed");
            return;
        }
        reporter.success(format!("SDKMAN core manager installed at {}", ctx.display(&sdkman)));
    }

    let init = sdkman.join("bin").join("sdkman-init.sh");
    if !init.exists() {
        reporter.fail("SDKMAN initialization script not found");
        return;
    }
    let init = init.to_string_lossy().into_owned();

    let mut installs: Vec<(String, String, String)> = Vec::new();
    for java in &layout.java {
        let default = if java.default { " --default" } else { "" };
        let label = match java.default {
            true => format!("Java {} (default)", java.version),
            false => format!("Java {}", java.version),
        };
        installs.push((label, format!("java {}{default}", java.version), "java".into()));
    }
    for tool in &layout.sdk_tools {
        installs.push((tool.clone(), tool.clone(), tool.clone()));
    }

    for (label, install, candidate) in installs {
        reporter.info(format!("Installing {label}..."));
        let script = format!("source {init} && sdk install {install}");
        if ctx.shell.run_interactive("bash", &["-c", &script]).unwrap_or(false) {
            reporter.success(format!("{label} installed"));
            continue;
        }

        let check = format!("source {init} && sdk current {candidate}");
        match ctx.shell.succeeds("bash", &["-c", &check]) {
            true => reporter.success(format!("{label} already installed")),
            false => reporter.warning(format!("Failed to install {label}, continuing")),
        }
    }
}

fn setup_rust(ctx: &Context, reporter: &mut Reporter) {
    reporter.section("Rust (rustup)");
    if ctx.shell.which("rustup-init").is_none() {
        reporter.info("rustup-init not found, Rust will be available after package installation");
        return;
    }

    if ctx.home.join(".cargo").exists() {
        reporter.success("Rust toolchain already initialized");
        return;
    }

    reporter.info("Installing Rust toolchain...");
    match ctx
        .shell
        .run_interactive("rustup-init", &["-y", "--no-modify-path"])
        .unwrap_or(false)
    {
        true => reporter.success("Rust toolchain initialized"),
        false => reporter.warning("Rust installation may have failed"),
    }
}

fn setup_python(ctx: &Context, reporter: &mut Reporter) {
    let version = ctx.manifest.languages.python_version.as_str();

    reporter.section("Python (uv)");
    if ctx.shell.which("uv").is_none() {
        reporter.info("uv not found, will be available after package installation");
        return;
    }

    reporter.info(format!("Installing Python {version} via uv..."));
    match ctx
        .shell
        .run_interactive("uv", &["python", "install", version])
        .unwrap_or(false)
    {
        true => reporter.success(format!("Python {version} installed via uv")),
        false => reporter.warning(format!("Python {version} may already be installed")),
    }

    match ctx
        .shell
        .run_interactive("uv", &["python", "pin", version])
        .unwrap_or(false)
    {
        true => reporter.success(format!("Python {version} set as default")),
        false => reporter.warning(format!("Failed to set Python {version} as default")),
    }
}

fn setup_node(ctx: &Context, reporter: &mut Reporter) {
    reporter.section("Node.js (fnm)");
    if ctx.shell.which("fnm").is_none() {
        reporter.info("fnm not found, will be available after package installation");
        return;
    }

    reporter.info("Installing Node.js LTS via fnm...");
    match ctx
        .shell
        .run_interactive("fnm", &["install", "--lts"])
        .unwrap_or(false)
    {
        true => reporter.success("Node.js LTS installed via fnm"),
        false => reporter.warning("Node.js LTS may already be installed"),
    }

    match ctx
        .shell
        .run_interactive("fnm", &["default", "lts-latest"])
        .unwrap_or(false)
    {
        true => reporter.success("Node.js LTS set as default"),
        false => reporter.warning("Failed to set Node.js LTS as default"),
    }
}

/// Remove every directory owned by every language manager.
///
/// Returns `Ok(false)` if the user declined, or if something could not be
/// removed.
///
/// # Errors
///
/// - Return [`crate::prompt::PromptError`] if confirmation cannot be asked.
#[instrument(skip(ctx, reporter), level = "debug")]
pub fn clean(ctx: &Context, reporter: &mut Reporter) -> Result<bool> {
    let managers = &ctx.manifest.languages.managers;

    reporter.banner("LANGUAGE MANAGERS CLEANUP");
    reporter.line("This will remove ALL language managers and their data:");
    for manager in managers {
        reporter.line(format!("\n{}:", manager.name));
        for dir in &manager.dirs {
            reporter.line(format!(
                "  • {} ({})",
                ctx.display(ctx.resolve(&dir.path)),
                dir.description
            ));
        }
    }
    reporter.warning("This will remove ALL language installations and packages!");

    if !ctx.confirm(reporter, "Remove all language managers?")? {
        return Ok(false);
    }

    let mut clean = true;
    for manager in managers {
        reporter.section(format!("{} Cleanup", manager.name));
        for dir in &manager.dirs {
            clean &= ctx.remove(reporter, &ctx.resolve(&dir.path), &dir.description);
        }
    }

    reporter.finish("Language managers cleanup");
    reporter.line("You can reinstall with: devboot languages install");

    Ok(clean)
}
