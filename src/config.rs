// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manifest layout.
//!
//! Specify the layout of the manifest that every devboot command enumerates to
//! figure out what to install, verify, or clean up. File I/O is left to the
//! caller to figure out.

use crate::category::DotfileCategory;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

const BUILTIN_MANIFEST: &str = include_str!("manifest.toml");

/// Manifest layout.
///
/// The manifest is a static listing of everything devboot manages: symlinks
/// from the repository into the user's home directory, the package catalogue,
/// language manager directories, cache directories, git submodules, and the
/// expectations the status checker verifies. It is never modified by devboot.
///
/// # General Layout
///
/// Each command owns one section. Dotfile links and submodules are arrays of
/// tables at the top level through `[[link]]` and `[[submodule]]`. Everything
/// else lives under a table named after the command that uses it.
///
/// # Paths
///
/// Every path field undergoes environment variable expansion on load. A path
/// starting with `~` is relative to the user's home directory, a relative path
/// is relative to the repository, and an absolute path is left alone. See
/// [`ManifestPath::resolve`].
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Package catalogue.
    pub packages: PackageCatalogue,

    /// Neovim layout.
    pub neovim: NeovimLayout,

    /// Language manager layout.
    pub languages: LanguageLayout,

    /// Cache directory groups.
    pub caches: CacheLayout,

    /// Local tap settings.
    pub taps: TapLayout,

    /// Status checker expectations.
    pub status: StatusLayout,

    /// Dotfile links.
    #[serde(rename = "link", default)]
    pub links: Vec<DotfileLink>,

    /// Git submodules carried by the repository.
    #[serde(rename = "submodule", default)]
    pub submodules: Vec<SubmoduleEntry>,
}

impl Manifest {
    /// Load manifest that ships with devboot.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Deserialize`] if built-in manifest is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if a path references an unset
    ///   environment variable.
    pub fn builtin() -> Result<Self> {
        BUILTIN_MANIFEST.parse()
    }
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        // INVARIANT: Shell expansion happens while deserializing each ManifestPath.
        toml::de::from_str(data).map_err(ConfigError::Deserialize)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Path listed in the manifest.
///
/// Environment variables are expanded on deserialization. Tilde expansion is
/// deferred to [`ManifestPath::resolve`] so the home directory can be chosen
/// by the caller.
#[derive(Default, Debug, PartialEq, Eq, Clone, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ManifestPath(PathBuf);

impl ManifestPath {
    /// Construct new manifest path as is.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Resolve into absolute path.
    ///
    /// Leading `~` becomes `home`, relative paths are joined onto `base`, and
    /// absolute paths are returned unchanged.
    pub fn resolve(&self, home: &Path, base: &Path) -> PathBuf {
        match self.0.strip_prefix("~") {
            Ok(rest) if rest.as_os_str().is_empty() => home.to_path_buf(),
            Ok(rest) => home.join(rest),
            Err(_) if self.0.is_absolute() => self.0.clone(),
            Err(_) => base.join(&self.0),
        }
    }

    /// Treat manifest path as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl TryFrom<String> for ManifestPath {
    type Error = ConfigError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        let expanded = shellexpand::env(path.as_str()).map_err(ConfigError::ShellExpansion)?;
        Ok(Self::new(expanded.into_owned()))
    }
}

impl From<ManifestPath> for String {
    fn from(path: ManifestPath) -> Self {
        path.to_string()
    }
}

impl Display for ManifestPath {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Path paired with a human readable description.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PathEntry {
    pub path: ManifestPath,
    pub description: String,
}

/// Symlink from repository into user's home directory.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DotfileLink {
    /// Category used by cleanup filters.
    pub category: DotfileCategory,

    /// Repository relative file or directory to link to.
    pub source: ManifestPath,

    /// Location of the symlink itself.
    pub target: ManifestPath,

    /// Brief description of what the link provides.
    pub description: String,

    /// Link points at a directory rather than a file.
    #[serde(default)]
    pub directory: bool,
}

/// Git submodule carried by the repository.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SubmoduleEntry {
    pub url: String,
    pub path: ManifestPath,
    pub description: String,
}

/// Package catalogue.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PackageCatalogue {
    /// Order in which categories are installed.
    pub install_order: Vec<String>,

    /// Categories skipped unless optional packages are requested.
    #[serde(default)]
    pub optional_categories: Vec<String>,

    /// Repository relative directory holding custom formulas.
    pub formulas_dir: ManifestPath,

    /// Repository relative directory receiving backups.
    pub backups_dir: ManifestPath,

    /// Packages to offer for removal before installing.
    #[serde(rename = "obsolete", default)]
    pub obsolete: Vec<ObsoletePackage>,

    /// Every package devboot knows how to install.
    #[serde(rename = "package", default)]
    pub packages: Vec<Package>,
}

impl PackageCatalogue {
    /// List packages belonging to target category in catalogue order.
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Package> + 'a {
        self.packages.iter().filter(move |package| package.category == category)
    }

    /// List every category in catalogue order without duplicates.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for package in &self.packages {
            if !categories.contains(&package.category.as_str()) {
                categories.push(package.category.as_str());
            }
        }
        categories
    }
}

/// Package that should be removed in favour of a replacement.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ObsoletePackage {
    pub name: String,
    pub replacement: String,
}

/// Installable package.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Package {
    pub name: String,
    pub category: String,
    pub description: String,

    /// How the package gets installed.
    #[serde(default)]
    pub kind: PackageKind,

    /// Tap to register before installing, for [`PackageKind::Tap`].
    pub tap: Option<String>,

    /// Repository relative formula file, for formula based kinds.
    pub formula: Option<ManifestPath>,

    /// Local tap to place formula into, for [`PackageKind::LocalTap`].
    pub local_tap: Option<String>,

    /// Shell command to run instead of the package manager.
    pub install_cmd: Option<String>,

    /// Shell command whose success means the package is installed.
    pub check_cmd: Option<String>,

    /// Package is required for a working environment.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// Package installation method.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageKind {
    /// Regular formula from default taps.
    #[default]
    Brew,

    /// Cask application.
    Cask,

    /// Formula from third-party tap.
    Tap,

    /// Formula file installed directly by path.
    Formula,

    /// Formula file copied into a local tap first.
    LocalTap,
}

impl Display for PackageKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Brew => "brew",
            Self::Cask => "cask",
            Self::Tap => "tap",
            Self::Formula => "formula",
            Self::LocalTap => "local-tap",
        };
        fmt.write_str(label)
    }
}

/// Neovim layout.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct NeovimLayout {
    /// Repository relative configuration directory.
    pub config_dir: ManifestPath,

    /// Location where configuration directory gets linked to.
    pub config_link: ManifestPath,

    /// Download location of plugin manager.
    pub plug_url: String,

    /// Python packages installed into provider environment.
    pub python_packages: Vec<String>,

    /// User data and cache directories.
    pub system_dirs: Vec<PathEntry>,

    /// Legacy vim directories.
    pub legacy_dirs: Vec<PathEntry>,

    /// Generated content inside the repository.
    pub dynamic: Vec<PathEntry>,

    /// Repository content that cleanup never touches.
    pub preserved: Vec<PathEntry>,
}

/// Language manager layout.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LanguageLayout {
    /// Python version installed and pinned through uv.
    pub python_version: String,

    /// Commands SDKMAN needs before it can be installed.
    pub sdkman_prerequisites: Vec<String>,

    /// Extra SDKMAN candidates installed alongside Java.
    pub sdk_tools: Vec<String>,

    /// Java versions installed through SDKMAN.
    #[serde(rename = "java", default)]
    pub java: Vec<JavaVersion>,

    /// Directory groups owned by each manager.
    #[serde(rename = "manager", default)]
    pub managers: Vec<ManagerGroup>,
}

/// Java version installed through SDKMAN.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct JavaVersion {
    pub version: String,

    #[serde(default)]
    pub default: bool,
}

/// Directories owned by a single language manager.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ManagerGroup {
    /// Heading used in reports.
    pub name: String,

    #[serde(rename = "dir", default)]
    pub dirs: Vec<ManagedDir>,
}

/// Directory owned by a language manager.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ManagedDir {
    pub path: ManifestPath,
    pub description: String,

    /// Directory is inspected by the status checker.
    #[serde(default = "default_tracked")]
    pub tracked: bool,

    /// Reason the directory may be absent without being a problem.
    pub optional: Option<String>,

    /// Command whose success makes the directory unnecessary.
    pub fallback: Option<Vec<String>>,
}

fn default_tracked() -> bool {
    true
}

/// Cache directory groups.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct CacheLayout {
    pub homebrew: Vec<PathEntry>,
    pub languages: Vec<PathEntry>,
    pub system: Vec<PathEntry>,
    pub temp: Vec<PathEntry>,

    /// Glob patterns of temporary files.
    #[serde(default)]
    pub temp_patterns: Vec<PatternEntry>,
}

/// Glob pattern paired with a human readable description.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PatternEntry {
    pub pattern: String,
    pub description: String,
}

/// Local tap settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct TapLayout {
    /// Package manager prefix used when `brew --prefix` cannot answer.
    pub fallback_prefix: ManifestPath,

    /// Tap name prefix marking a tap as local.
    pub local_prefix: String,

    /// Local tap used when none is named.
    pub default_local_tap: String,
}

/// Status checker expectations.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct StatusLayout {
    /// Commands that must be available.
    #[serde(rename = "command", default)]
    pub commands: Vec<EssentialCommand>,
}

/// Command that must be reachable through `PATH`.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct EssentialCommand {
    pub name: String,
    pub description: String,
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    const MINIMAL: &str = indoc! {r#"
        [packages]
        install_order = ["core"]
        formulas_dir = "formulas"
        backups_dir = "backups"

        [[packages.package]]
        name = "git"
        category = "core"
        description = "Version control"

        [neovim]
        config_dir = "neovim"
        config_link = "~/.config/nvim"
        plug_url = "https://example.org/plug.vim"
        python_packages = []
        system_dirs = []
        legacy_dirs = []
        dynamic = []
        preserved = []

        [languages]
        python_version = "3.12"
        sdkman_prerequisites = []
        sdk_tools = []

        [caches]
        homebrew = []
        languages = []
        system = []
        temp = []

        [taps]
        fallback_prefix = "/opt/homebrew"
        local_prefix = "local/"
        default_local_tap = "local/custom"

        [status]

        [[link]]
        category = "git"
        source = "gitconfig"
        target = "$BLAH/.gitconfig"
        description = "Git configuration"
    "#};

    #[sealed_test(env = [("BLAH", "/home/blah/blah")])]
    fn deserialize_manifest_expands_environment() -> anyhow::Result<()> {
        let result: Manifest = MINIMAL.parse()?;

        let expect = vec![DotfileLink {
            category: DotfileCategory::Git,
            source: ManifestPath::new("gitconfig"),
            target: ManifestPath::new("/home/blah/blah/.gitconfig"),
            description: "Git configuration".into(),
            directory: false,
        }];
        assert_eq!(result.links, expect);

        let package = &result.packages.packages[0];
        assert_eq!(package.kind, PackageKind::Brew);
        assert!(package.required);

        Ok(())
    }

    #[sealed_test]
    fn deserialize_manifest_rejects_unset_variable() {
        let result = MINIMAL.parse::<Manifest>();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn manifest_path_resolution() {
        let home = Path::new("/home/blah");
        let repo = Path::new("/src/dotfiles");

        assert_eq!(
            ManifestPath::new("~/.zshrc").resolve(home, repo),
            PathBuf::from("/home/blah/.zshrc")
        );
        assert_eq!(ManifestPath::new("~").resolve(home, repo), PathBuf::from("/home/blah"));
        assert_eq!(
            ManifestPath::new("zsh/zshrc").resolve(home, repo),
            PathBuf::from("/src/dotfiles/zsh/zshrc")
        );
        assert_eq!(
            ManifestPath::new("/tmp/blah").resolve(home, repo),
            PathBuf::from("/tmp/blah")
        );
    }

    #[test]
    fn builtin_manifest_is_well_formed() -> anyhow::Result<()> {
        let manifest = Manifest::builtin()?;

        for category in &manifest.packages.install_order {
            assert!(
                manifest.packages.in_category(category).next().is_some(),
                "install order names empty category {category}"
            );
        }
        assert_eq!(manifest.links.len(), 8);
        assert_eq!(manifest.submodules.len(), 2);
        assert!(manifest.packages.in_category("optional").all(|p| !p.required));

        // Printing must produce something that parses back into the same thing.
        let reparsed: Manifest = manifest.to_string().parse()?;
        assert_eq!(reparsed, manifest);

        Ok(())
    }
}
