//! The version lookup with fallbacks
//!
//! [Resolver::resolve] tries, in order:
//!
//! 1. the closest matching tag of the repository containing the module
//! 2. the `PKG-INFO` (or directory name) of an extracted source distribution
//! 3. the metadata of the installed distribution
//!
//! and returns the first version found. Stage 2 only runs when no
//! repository was found, stage 3 only when stage 2 found nothing either.

use crate::config::ResolverConfig;
use crate::domain::{Pep440Version, TagPattern, Target};
use crate::error::{Result, Source, StageOutcome, VersionResolutionError};
use crate::metadata::{MetadataIndex, SitePackages};
use crate::sdist;
use crate::vcs::find_vcs_root;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of one stage: a version, or why there was none
type Attempt = std::result::Result<String, StageOutcome>;

/// Resolves package versions with a fixed configuration.
///
/// Holds no state between calls; resolving the same path against an
/// unchanged filesystem gives the same answer.
pub struct Resolver {
    config: ResolverConfig,
    pattern: TagPattern,
    index: Option<Box<dyn MetadataIndex>>,
}

impl Resolver {
    /// Create a resolver, compiling the configured tag pattern
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let pattern = TagPattern::new(&config.pattern)?;
        Ok(Resolver {
            config,
            pattern,
            index: None,
        })
    }

    /// Use `index` for installed metadata instead of scanning site-packages
    pub fn with_index(mut self, index: impl MetadataIndex + 'static) -> Self {
        self.index = Some(Box::new(index));
        self
    }

    /// Version of the package owning `package`.
    ///
    /// `package` is a module path (`…/mod.py`, `…/pkg/__init__.py`) or a bare
    /// distribution name. The path does not need to exist.
    ///
    /// # Errors
    /// * `InvalidTarget` - `package` is neither a `.py` path nor a name
    /// * `VcsLookupFailure` - a repository was found but couldn't be read
    /// * `NoVersionSourceFound` - every stage came up empty
    /// * `Io` - installed metadata couldn't be scanned
    pub fn resolve(&self, package: impl AsRef<Path>) -> Result<String> {
        let path = package.as_ref();
        let target = Target::from_path(path, self.config.dist_name.as_deref())?;
        if let Target::Module { module, .. } = &target {
            debug!("Module '{}' belongs to distribution '{}'", module, target.dist_name());
        }

        let Some(parent) = target.parent() else {
            return match self.from_metadata(target.dist_name(), None)? {
                Ok(version) => Ok(version),
                Err(outcome) => Err(VersionResolutionError::NoVersionSourceFound {
                    path: path.to_path_buf(),
                    outcomes: vec![outcome],
                }),
            };
        };
        let parent = absolute(parent)?;

        let mut outcomes = Vec::with_capacity(3);
        for source in [Source::Vcs, Source::Sdist, Source::Metadata] {
            let attempt = match source {
                Source::Vcs => self.from_vcs(&parent)?,
                Source::Sdist => self.from_sdist(&parent),
                Source::Metadata => self.from_metadata(target.dist_name(), Some(&parent))?,
            };

            match attempt {
                Ok(version) => {
                    debug!("Resolved {} via {}: {}", path.display(), source, version);
                    return Ok(version);
                }
                Err(outcome) => {
                    debug!("No version via {}: {}", source, outcome.message);
                    outcomes.push(outcome);
                }
            }
        }

        Err(VersionResolutionError::NoVersionSourceFound {
            path: path.to_path_buf(),
            outcomes,
        })
    }

    fn from_vcs(&self, parent: &Path) -> Result<Attempt> {
        let Some(found) = find_vcs_root(parent, self.config.vcs) else {
            return Ok(Err(StageOutcome::new(
                Source::Vcs,
                format!("could not find VCS from directory “{}”.", parent.display()),
            )));
        };

        if self.config.strict_root && found.root != parent {
            return Ok(Err(StageOutcome::new(
                Source::Vcs,
                format!(
                    "directory “{}” does not match VCS root “{}”.",
                    parent.display(),
                    found.root.display()
                ),
            )));
        }

        debug!("Found {} repository at {}", found.kind, found.root.display());
        let raw = found
            .kind
            .latest_tag(&found.root, &self.pattern)
            .map_err(|e| match e {
                VersionResolutionError::VcsLookupFailure { .. } => e,
                other => VersionResolutionError::vcs(&found.root, other.to_string()),
            })?;

        Ok(raw.serialize(self.config.effective_dirty()).map_err(|e| {
            StageOutcome::new(
                Source::Vcs,
                format!(
                    "starting in directory “{}”, found unserializable version: {}",
                    parent.display(),
                    e
                ),
            )
        }))
    }

    fn from_sdist(&self, parent: &Path) -> Attempt {
        if let Some(version) = sdist::version_from_pkg_info(parent) {
            return Ok(version);
        }

        if !self.config.dirname {
            return Err(StageOutcome::new(
                Source::Sdist,
                format!("no usable {} in “{}”.", sdist::PKG_INFO, parent.display()),
            ));
        }

        sdist::version_from_dirname(parent).ok_or_else(|| {
            StageOutcome::new(
                Source::Sdist,
                format!(
                    "no usable {} in “{}” and its name does not contain a valid version.",
                    sdist::PKG_INFO,
                    parent.display()
                ),
            )
        })
    }

    fn from_metadata(&self, dist_name: &str, anchor: Option<&Path>) -> Result<Attempt> {
        let site_packages;
        let index: &dyn MetadataIndex = match &self.index {
            Some(index) => index.as_ref(),
            None => {
                site_packages = SitePackages::from_env(anchor, &self.config.site_packages);
                &site_packages
            }
        };

        Ok(match index.version_of(dist_name)? {
            Some(version) if Pep440Version::is_valid(&version) => Ok(version),
            Some(version) => Err(StageOutcome::new(
                Source::Metadata,
                format!(
                    "distribution “{}” records invalid version “{}”.",
                    dist_name, version
                ),
            )),
            None => Err(StageOutcome::new(
                Source::Metadata,
                format!(
                    "could not find distribution “{}” in {}.",
                    dist_name,
                    index.describe()
                ),
            )),
        })
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver {
            config: ResolverConfig::default(),
            pattern: TagPattern::default(),
            index: None,
        }
    }
}

/// Resolve `package` with the default configuration.
///
/// ```no_run
/// let version = get_version::get_version("src/my_pkg/__init__.py")?;
/// println!("{}", version);
/// # Ok::<(), get_version::VersionResolutionError>(())
/// ```
pub fn get_version(package: impl AsRef<Path>) -> Result<String> {
    Resolver::default().resolve(package)
}

/// Absolute form of `path`, without requiring it to exist
fn absolute(path: &Path) -> Result<PathBuf> {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    match path.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(_) if path.is_absolute() => Ok(path.to_path_buf()),
        Err(_) => Ok(env::current_dir()?.join(path)),
    }
}
