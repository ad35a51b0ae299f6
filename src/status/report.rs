// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use super::CheckType;
use crate::report::Level;

use colored::Colorize;
use std::{collections::BTreeMap, fmt::Write};

const FIX_ISSUES: &str = "Run cleanup commands to fix issues";
const FINISH_CLEANUP: &str =
    "Run cleanup commands (devboot <component> clean) to remove what remains";
const FINISH_INSTALL: &str = "Run installation commands to fix missing components";
const START_INSTALL: &str = "Run installation commands to set up the development environment";
const READY: &str = "System is ready for development";

/// Outcome of one status check.
///
/// Built up inside a single check invocation and handed to the printer once
/// complete. Recording an error marks the whole check as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub name: String,
    pub success: bool,
    messages: Vec<(Level, String)>,
    pub info: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl CheckReport {
    /// Construct new successful report with no messages.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            messages: Vec::new(),
            info: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Construct report of a check that did not run to completion.
    pub fn crashed(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        let mut report = Self::new(name);
        report.error(format!("Check failed with exception: {reason}"));
        report
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.messages.push((Level::Success, message.into()));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.messages.push((Level::Info, message.clone()));
        self.info.push(message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.messages.push((Level::Warning, message.clone()));
        self.warnings.push(message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.messages.push((Level::Failure, message.clone()));
        self.errors.push(message);
        self.success = false;
    }

    /// Every message in the order it was recorded.
    pub fn messages(&self) -> &[(Level, String)] {
        self.messages.as_slice()
    }

    /// Render report as a section of terminal output.
    pub fn render(&self) -> String {
        let mut output = format!("\n{}\n", self.name.cyan().bold());
        for (level, message) in &self.messages {
            let _ = writeln!(output, "  {} {message}", level.marker());
        }
        output
    }
}

/// Aggregate of a set of check reports.
///
/// Does not depend on the order of the reports it was built from.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub checks: usize,
    pub ok: usize,
    pub failed_checks: usize,
    pub errors: Vec<String>,
    pub warnings: BTreeMap<String, Vec<String>>,
}

impl Summary {
    pub fn new(reports: &[CheckReport]) -> Self {
        let mut summary = Self {
            checks: reports.len(),
            ..Self::default()
        };

        for report in reports {
            summary.ok += report
                .messages
                .iter()
                .filter(|(level, _)| *level == Level::Success)
                .count();
            if !report.success {
                summary.failed_checks += 1;
            }
            summary.errors.extend(report.errors.iter().cloned());
            if !report.warnings.is_empty() {
                summary
                    .warnings
                    .entry(report.name.clone())
                    .or_default()
                    .extend(report.warnings.iter().cloned());
            }
        }
        summary.errors.sort();

        summary
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Run passed when no check recorded an error.
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Render verdict and next step hint.
    pub fn render(&self, expect: CheckType) -> String {
        let mut output = format!("\n{}\n{}\n", "SUMMARY".bold(), "=".repeat(50).bold());

        if !self.errors.is_empty() {
            let _ = writeln!(
                output,
                "\n{} {} issue(s) found",
                Level::Failure.marker(),
                self.error_count()
            );
            for error in &self.errors {
                let _ = writeln!(output, "  • {}", error.trim_start_matches([' ', '•']));
            }
        } else if !self.warnings.is_empty() {
            let _ = writeln!(
                output,
                "\n{} {} warning(s) found:",
                Level::Warning.marker(),
                self.warning_count()
            );
            for (check, warnings) in &self.warnings {
                let _ = writeln!(output, "{check}");
                for warning in warnings {
                    let _ = writeln!(output, "{warning}");
                }
            }
        } else {
            let verdict = match expect {
                CheckType::Cleaned => "System is clean",
                CheckType::Installed => "Development environment is properly installed",
            };
            let _ = writeln!(output, "\n{} {verdict}", Level::Success.marker());
        }

        let _ = writeln!(output, "\n{}", self.next_step(expect));
        output
    }

    fn next_step(&self, expect: CheckType) -> &'static str {
        match (self.errors.is_empty(), self.warnings.is_empty(), expect) {
            (false, _, _) => FIX_ISSUES,
            (true, false, CheckType::Cleaned) => FINISH_CLEANUP,
            (true, false, CheckType::Installed) => FINISH_INSTALL,
            (true, true, CheckType::Cleaned) => START_INSTALL,
            (true, true, CheckType::Installed) => READY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test]
    fn error_clears_success() {
        let mut report = CheckReport::new("System Commands");
        report.success("  • git - Available: /usr/bin/git");
        report.warning("  • zsh - Needs installation");
        assert!(report.success);

        report.error("  • brew - NOT FOUND (Homebrew package manager)");
        assert!(!report.success);
        assert_eq!(report.messages().len(), 3);
        assert_eq!(report.errors, vec!["  • brew - NOT FOUND (Homebrew package manager)"]);
    }

    #[test]
    fn crashed_report_is_failed() {
        let report = CheckReport::crashed("Local Taps", "boom");
        assert!(!report.success);
        assert_eq!(report.errors, vec!["Check failed with exception: boom"]);
    }

    #[test]
    fn summary_independent_of_order() {
        let mut first = CheckReport::new("Dotfiles Status");
        first.success("  • ~/.zshrc - Correctly linked");
        first.warning("  • ~/.gitconfig - Wrong target");
        let mut second = CheckReport::new("System Commands");
        second.error("  • brew - NOT FOUND");
        let mut third = CheckReport::new("Local Taps");
        third.error("  • local/custom - broken");
        third.warning("  • local/other - INSTALLED");

        let forward = Summary::new(&[first.clone(), second.clone(), third.clone()]);
        let backward = Summary::new(&[third, second, first]);
        assert_eq!(forward, backward);
        assert_eq!(forward.checks, 3);
        assert_eq!(forward.ok, 1);
        assert_eq!(forward.failed_checks, 2);
        assert_eq!(forward.warning_count(), 2);
        assert_eq!(forward.error_count(), 2);
        assert!(!forward.passed());
    }

    #[test]
    fn clean_summary_passes() {
        let mut report = CheckReport::new("Neovim Status");
        report.success("  • ~/.config/nvim - Clean");
        let summary = Summary::new(&[report]);

        assert!(summary.passed());
        assert!(summary.render(CheckType::Cleaned).contains("System is clean"));
        assert!(summary
            .render(CheckType::Installed)
            .contains("System is ready for development"));
    }

    #[test_case(Some("  • brew - NOT FOUND"), None, CheckType::Cleaned, FIX_ISSUES; "errors")]
    #[test_case(None, Some("  • zshrc"), CheckType::Cleaned, FINISH_CLEANUP; "leftovers")]
    #[test_case(None, Some("  • zshrc"), CheckType::Installed, FINISH_INSTALL; "gaps")]
    #[test_case(None, None, CheckType::Cleaned, START_INSTALL; "clean")]
    #[test_case(None, None, CheckType::Installed, READY; "installed")]
    #[test]
    fn next_step_follows_verdict(
        error: Option<&str>,
        warning: Option<&str>,
        expect: CheckType,
        step: &str,
    ) {
        let mut report = CheckReport::new("Dotfiles Status");
        if let Some(error) = error {
            report.error(error);
        }
        if let Some(warning) = warning {
            report.warning(warning);
        }

        let rendered = Summary::new(&[report]).render(expect);
        pretty_assertions::assert_eq!(rendered.lines().last(), Some(step));
    }
}
