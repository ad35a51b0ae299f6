// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! User facing status lines.
//!
//! Every command reports progress through a [`Reporter`]. Each line carries
//! a colored marker stating whether it is informational, a success, a
//! warning, or a failure. The reporter keeps a running [`Tally`] of what it
//! printed so commands can finish with a summary and an exit status.

use colored::Colorize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Severity of a reported line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Failure,
}

impl Level {
    /// Colored marker printed in front of a line.
    pub fn marker(&self) -> String {
        match self {
            Self::Info => format!("[ {} ]", "..".blue()),
            Self::Success => format!("[ {} ]", "OK".green()),
            Self::Warning => format!("[{}]", "WARN".yellow()),
            Self::Failure => format!("[{}]", "FAIL".red()),
        }
    }
}

/// Counts of reported lines by severity.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub info: usize,
    pub ok: usize,
    pub warn: usize,
    pub fail: usize,
}

impl Display for Tally {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{} ok, {} warning(s), {} failure(s)",
            self.ok, self.warn, self.fail
        )
    }
}

/// Printer of status lines.
#[derive(Debug)]
pub struct Reporter {
    echo: bool,
    tally: Tally,
    entries: Vec<(Level, String)>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    /// Construct reporter printing to standard output.
    pub fn new() -> Self {
        Self {
            echo: true,
            tally: Tally::default(),
            entries: Vec::new(),
        }
    }

    /// Construct reporter that records without printing.
    pub fn quiet() -> Self {
        Self {
            echo: false,
            ..Self::new()
        }
    }

    pub fn info(&mut self, message: impl Display) {
        self.tally.info += 1;
        self.emit(Level::Info, message.to_string());
    }

    pub fn success(&mut self, message: impl Display) {
        self.tally.ok += 1;
        self.emit(Level::Success, message.to_string());
    }

    pub fn warning(&mut self, message: impl Display) {
        self.tally.warn += 1;
        self.emit(Level::Warning, message.to_string());
    }

    pub fn fail(&mut self, message: impl Display) {
        self.tally.fail += 1;
        self.emit(Level::Failure, message.to_string());
    }

    /// Print unmarked line.
    pub fn line(&mut self, message: impl Display) {
        if self.echo {
            println!("{message}");
        }
    }

    /// Print command banner.
    pub fn banner(&mut self, title: impl Display) {
        if self.echo {
            println!("\n{}", title.to_string().cyan().bold());
            println!("{}", "=".repeat(50));
        }
    }

    /// Print heading of a group of lines.
    pub fn section(&mut self, title: impl Display) {
        if self.echo {
            println!("\n{}", title.to_string().cyan().bold());
        }
    }

    /// Counts of lines reported so far.
    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Every marked line reported so far.
    pub fn entries(&self) -> &[(Level, String)] {
        self.entries.as_slice()
    }

    /// Check if any failure has been reported.
    pub fn failed(&self) -> bool {
        self.tally.fail > 0
    }

    /// Print closing summary of the command.
    ///
    /// Returns true if no failures were reported.
    pub fn finish(&mut self, what: impl Display) -> bool {
        let tally = self.tally;
        if self.echo {
            println!();
        }

        match tally.fail {
            0 => self.success(format!("{what} complete ({tally})")),
            _ => self.fail(format!("{what} finished with failures ({tally})")),
        }

        tally.fail == 0
    }

    fn emit(&mut self, level: Level, message: String) {
        if self.echo {
            println!("{} {message}", level.marker());
        }
        self.entries.push((level, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reporter_tallies_lines() {
        let mut reporter = Reporter::quiet();
        reporter.info("removing blah");
        reporter.success("blah removed");
        reporter.warning("blah not found");
        reporter.success("foo removed");

        let expect = Tally {
            info: 1,
            ok: 2,
            warn: 1,
            fail: 0,
        };
        assert_eq!(reporter.tally(), expect);
        assert!(reporter.finish("Cleanup"));
        assert_eq!(
            reporter.entries().last(),
            Some(&(
                Level::Success,
                "Cleanup complete (2 ok, 1 warning(s), 0 failure(s))".to_string()
            ))
        );
    }

    #[test]
    fn reporter_finish_fails_on_failure() {
        let mut reporter = Reporter::quiet();
        reporter.fail("blah exploded");
        assert!(reporter.failed());
        assert!(!reporter.finish("Install"));
    }
}
