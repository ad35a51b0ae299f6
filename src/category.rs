// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Category filters.
//!
//! Commands that can be restricted to a subset of their work accept a list of
//! categories on the command line. Each category listing includes a special
//! `all` member that stands in for every other member.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Category listing with an `all` wildcard.
pub trait Category: ValueEnum + Copy + Eq {
    /// Check if category is the `all` wildcard.
    fn is_all(&self) -> bool;
}

/// Expand requested categories into concrete categories.
///
/// An empty request, or any request containing the `all` wildcard, selects
/// every concrete category. Result follows declaration order and contains no
/// duplicates.
pub fn expand<C: Category>(requested: &[C]) -> Vec<C> {
    let everything = requested.is_empty() || requested.iter().any(Category::is_all);
    C::value_variants()
        .iter()
        .copied()
        .filter(|category| !category.is_all())
        .filter(|category| everything || requested.contains(category))
        .collect()
}

/// Groups of dotfile links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DotfileCategory {
    Zsh,
    Git,
    Tmux,
    Terminal,
    Ssh,
    Tools,
    Neovim,
    #[serde(skip)]
    All,
}

impl DotfileCategory {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Zsh => "Zsh",
            Self::Git => "Git",
            Self::Tmux => "Tmux",
            Self::Terminal => "Terminal",
            Self::Ssh => "SSH",
            Self::Tools => "Tools",
            Self::Neovim => "Neovim",
            Self::All => "All",
        }
    }
}

impl Category for DotfileCategory {
    fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Display for DotfileCategory {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.title())
    }
}

/// Groups of cache directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum CacheCategory {
    Homebrew,
    Languages,
    System,
    Temp,
    All,
}

impl CacheCategory {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Homebrew => "Homebrew",
            Self::Languages => "Language Caches",
            Self::System => "System Caches",
            Self::Temp => "Temporary Files",
            Self::All => "All",
        }
    }
}

impl Category for CacheCategory {
    fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Display for CacheCategory {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.title())
    }
}
