use crate::domain::DEFAULT_TAG_PATTERN;
use crate::error::{Result, VersionResolutionError};
use crate::vcs::VcsSelection;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the table read from `pyproject.toml` (`[tool.get-version]`)
pub const PYPROJECT_TABLE: &str = "get-version";
/// Standalone configuration file looked for in the project root
pub const PROJECT_CONFIG_FILE: &str = "getversion.toml";
/// Configuration file looked for in the user configuration directory
pub const USER_CONFIG_FILE: &str = "get-version.toml";

/// Options controlling version resolution.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Regex selecting version tags; must capture `base`
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Version control systems to consider
    #[serde(default)]
    pub vcs: VcsSelection,

    /// Distribution name, when it differs from the module name
    #[serde(default)]
    pub dist_name: Option<String>,

    /// Mark uncommitted changes with a `dirty` local segment
    #[serde(default = "default_true")]
    pub dirty: bool,

    /// Accept an sdist-style `<name>-<version>` directory name
    #[serde(default = "default_true")]
    pub dirname: bool,

    /// Ignore a repository unless its root is the project root itself
    #[serde(default)]
    pub strict_root: bool,

    /// Extra directories searched for installed metadata, before the defaults
    #[serde(default)]
    pub site_packages: Vec<PathBuf>,
}

fn default_pattern() -> String {
    DEFAULT_TAG_PATTERN.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            pattern: default_pattern(),
            vcs: VcsSelection::default(),
            dist_name: None,
            dirty: true,
            dirname: true,
            strict_root: false,
            site_packages: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Whether the dirty marker should be emitted.
    ///
    /// Read the Docs builds modify the checkout, so `READTHEDOCS=True`
    /// suppresses it.
    pub fn effective_dirty(&self) -> bool {
        self.dirty && !on_read_the_docs()
    }
}

pub fn on_read_the_docs() -> bool {
    env::var("READTHEDOCS").is_ok_and(|v| v == "True")
}

#[derive(Debug, Deserialize)]
struct PyProject {
    #[serde(default)]
    tool: Option<PyProjectTools>,
}

#[derive(Debug, Deserialize)]
struct PyProjectTools {
    #[serde(rename = "get-version")]
    get_version: Option<ResolverConfig>,
}

fn parse_standalone(text: &str, origin: &Path) -> Result<ResolverConfig> {
    toml::from_str(text).map_err(|e| {
        VersionResolutionError::config(format!("Cannot parse {}: {}", origin.display(), e))
    })
}

fn parse_pyproject(text: &str, origin: &Path) -> Result<Option<ResolverConfig>> {
    let pyproject: PyProject = toml::from_str(text).map_err(|e| {
        VersionResolutionError::config(format!("Cannot parse {}: {}", origin.display(), e))
    })?;
    Ok(pyproject.tool.and_then(|tool| tool.get_version))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        VersionResolutionError::config(format!("Cannot read {}: {}", path.display(), e))
    })
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter (a `pyproject.toml` is read for its
///    `[tool.get-version]` table, any other file as a bare table)
/// 2. `[tool.get-version]` in `<project_root>/pyproject.toml`
/// 3. `<project_root>/getversion.toml`
/// 4. `get-version.toml` in the user config directory
/// 5. Default configuration if no file found
///
/// # Returns
/// * `Ok(ResolverConfig)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read or parsed
pub fn load_config(
    config_path: Option<&Path>,
    project_root: Option<&Path>,
) -> Result<ResolverConfig> {
    if let Some(path) = config_path {
        let text = read(path)?;
        if path.file_name().is_some_and(|n| n == "pyproject.toml") {
            return Ok(parse_pyproject(&text, path)?.unwrap_or_default());
        }
        return parse_standalone(&text, path);
    }

    if let Some(root) = project_root {
        let pyproject = root.join("pyproject.toml");
        if pyproject.is_file() {
            if let Some(config) = parse_pyproject(&read(&pyproject)?, &pyproject)? {
                debug!("Using [tool.{}] from {}", PYPROJECT_TABLE, pyproject.display());
                return Ok(config);
            }
        }

        let standalone = root.join(PROJECT_CONFIG_FILE);
        if standalone.is_file() {
            debug!("Using {}", standalone.display());
            return parse_standalone(&read(&standalone)?, &standalone);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join(USER_CONFIG_FILE);
        if user_config.is_file() {
            debug!("Using {}", user_config.display());
            return parse_standalone(&read(&user_config)?, &user_config);
        }
    }

    Ok(ResolverConfig::default())
}
