// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Homebrew formula files.
//!
//! Custom formulas are Ruby files. Devboot never evaluates them, it only
//! reads a few quoted fields to describe them and writes starter templates.

use crate::fsops;

use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Descriptive fields of a formula file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaInfo {
    /// Formula name, the file stem.
    pub name: String,

    /// Location of formula file.
    pub file: PathBuf,

    /// Human readable file size.
    pub size: String,

    pub description: Option<String>,
    pub version: Option<String>,
    pub url: Option<String>,
}

impl FormulaInfo {
    /// Read formula file and extract its descriptive fields.
    ///
    /// # Errors
    ///
    /// - Return [`FormulaError::Read`] if formula file cannot be read.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| FormulaError::Read {
            path: path.into(),
            source,
        })?;

        Ok(Self {
            name: formula_name(path),
            file: path.into(),
            size: fsops::human_size(content.len() as u64),
            description: quoted_field(&content, "desc"),
            version: quoted_field(&content, "version"),
            url: quoted_field(&content, "url"),
        })
    }

    /// Description, falling back to a generic one.
    pub fn summary(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Custom formula: {}", self.name))
    }
}

/// Formula name derived from file path.
pub fn formula_name(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extract quoted value of the first `<key> "<value>"` line.
///
/// The value spans from the first to the last double quote on the line.
pub fn quoted_field(content: &str, key: &str) -> Option<String> {
    content.lines().map(str::trim).find_map(|line| {
        let rest = line.strip_prefix(key)?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }

        let start = rest.find('"')?;
        let end = rest.rfind('"')?;
        (end > start).then(|| rest[start + 1..end].to_string())
    })
}

/// Find every `*.rb` file directly inside target directory, sorted by path.
///
/// A missing directory yields nothing.
pub fn discover(dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let pattern = dir.as_ref().join("*.rb");
    let Ok(paths) = glob::glob(pattern.to_string_lossy().as_ref()) else {
        return Vec::new();
    };

    let mut formulas: Vec<PathBuf> = paths.flatten().filter(|path| path.is_file()).collect();
    formulas.sort();
    formulas
}

/// Ruby class name of a formula: dash separated words, capitalized.
pub fn class_name(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Starter formula for a new package.
pub fn template(name: &str) -> String {
    let class = class_name(name);
    format!(
        r##"class {class} < Formula
  desc "Description of {name}"
  homepage "https://github.com/example/{name}"
  url "https://github.com/example/{name}/archive/v1.0.0.tar.gz"
  sha256 "your_sha256_hash_here"
  license "MIT"

  depends_on "go" => :build

  def install
    system "make", "install", "PREFIX=#{{prefix}}"
  end

  test do
    system "#{{bin}}/{name}", "--version"
  end
end
"##
    )
}

/// Write starter formula into target directory.
///
/// # Errors
///
/// - Return [`FormulaError::Exists`] if the formula already exists.
/// - Return [`FormulaError::Write`] if the file cannot be written.
pub fn write_template(dir: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
    let path = dir.as_ref().join(format!("{name}.rb"));
    if fsops::occupied(&path) {
        return Err(FormulaError::Exists(path));
    }

    let written = fsops::ensure_dir(dir.as_ref())
        .map_err(|error| std::io::Error::other(error.to_string()))
        .and_then(|_| fs::write(&path, template(name)));
    written.map_err(|source| FormulaError::Write {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

/// Formula error types.
#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    /// Formula file cannot be read.
    #[error("failed to read formula {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Formula file cannot be written.
    #[error("failed to write formula {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Formula file already exists.
    #[error("formula {0:?} already exists")]
    Exists(PathBuf),
}

/// Friendly result alias :3
pub type Result<T, E = FormulaError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    const TELEPORT: &str = indoc! {r#"
        class Teleport < Formula
          desc "Modern SSH server for teams"
          homepage "https://goteleport.com"
          url "https://github.com/gravitational/teleport/archive/v14.0.0.tar.gz"
          version "14.0.0"
          description_extra "ignored"

          def install
            system "make", "full"
          end
        end
    "#};

    #[test]
    fn quoted_fields_extracted() {
        assert_eq!(quoted_field(TELEPORT, "desc"), Some("Modern SSH server for teams".into()));
        assert_eq!(quoted_field(TELEPORT, "version"), Some("14.0.0".into()));
        assert_eq!(
            quoted_field(TELEPORT, "url"),
            Some("https://github.com/gravitational/teleport/archive/v14.0.0.tar.gz".into())
        );
        assert_eq!(quoted_field(TELEPORT, "sha256"), None);
    }

    #[test_case("my-tool", "MyTool"; "dashed")]
    #[test_case("teleport", "Teleport"; "single word")]
    #[test_case("ABC-def", "AbcDef"; "mixed case")]
    #[test]
    fn class_name_capitalizes_words(name: &str, expect: &str) {
        pretty_assertions::assert_eq!(class_name(name), expect);
    }

    #[test]
    fn template_refuses_overwrite() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let dir = scratch.path().join("formulas");

        let path = write_template(&dir, "my-tool")?;
        let info = FormulaInfo::read(&path)?;
        assert_eq!(info.name, "my-tool");
        assert_eq!(info.description, Some("Description of my-tool".into()));
        assert!(fs::read_to_string(&path)?.starts_with("class MyTool < Formula"));
        assert!(fs::read_to_string(&path)?.contains("PREFIX=#{prefix}"));

        assert!(matches!(write_template(&dir, "my-tool"), Err(FormulaError::Exists(_))));

        Ok(())
    }

    #[test]
    fn discover_only_ruby_files() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        fs::write(scratch.path().join("b.rb"), "")?;
        fs::write(scratch.path().join("a.rb"), "")?;
        fs::write(scratch.path().join("notes.txt"), "")?;

        assert_eq!(
            discover(scratch.path()),
            vec![scratch.path().join("a.rb"), scratch.path().join("b.rb")]
        );
        assert!(discover(scratch.path().join("missing")).is_empty());

        Ok(())
    }
}
