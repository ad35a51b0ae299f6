// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Development environment bootstrap kit.
//!
//! Devboot sets up a development machine from a dotfile repository, and
//! takes it apart again. It installs a Homebrew package catalogue, links
//! dotfiles into the user's home directory, prepares Neovim, drives language
//! version managers, and keeps git submodules in sync. Every installer has a
//! cleanup counterpart, and a status aggregator verifies whether the machine
//! is fully installed or fully cleaned.
//!
//! # Manifest
//!
//! Everything devboot touches is enumerated by a static [`config::Manifest`].
//! A built-in manifest ships with the crate, and users can override it with
//! their own TOML file. Commands never discover what to manage on their own.
//!
//! # Idempotency
//!
//! Running any install or cleanup command twice in a row is safe. Missing
//! things are reported as already clean, existing links are replaced, and
//! already installed packages are skipped.

pub mod brew;
pub mod caches;
pub mod category;
pub mod config;
pub mod context;
pub mod dotfiles;
pub mod formula;
pub mod fsops;
pub mod languages;
pub mod neovim;
pub mod packages;
pub mod path;
pub mod prompt;
pub mod report;
pub mod shell;
pub mod status;
pub mod submodules;
pub mod taps;
