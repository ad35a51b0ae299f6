// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::{Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to user manifest file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/devboot/manifest.toml` as
/// the default location of a user supplied manifest. Does not check if the
/// path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_manifest_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("devboot").join("manifest.toml"))
        .ok_or(NoWayHome)
}

/// Render path with user's home directory collapsed into a tilde.
///
/// Purely cosmetic. Paths outside of the home directory are returned as is.
pub fn tildify(home: impl AsRef<Path>, path: impl AsRef<Path>) -> String {
    match path.as_ref().strip_prefix(home.as_ref()) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".into(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => path.as_ref().display().to_string(),
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test_case("/home/blah", "/home/blah/.zshrc", "~/.zshrc"; "file in home")]
    #[test_case("/home/blah", "/home/blah", "~"; "home itself")]
    #[test_case("/home/blah", "/tmp/homebrew-1", "/tmp/homebrew-1"; "outside home")]
    #[test]
    fn tildify_collapses_home(home: &str, path: &str, expect: &str) {
        pretty_assertions::assert_eq!(tildify(home, path), expect);
    }
}
