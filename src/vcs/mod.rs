//! Version control lookup
//!
//! Each supported system is a variant of the closed [VcsKind] enum backed by
//! an implementation of the [VcsBackend] trait:
//!
//! - [git::GitBackend]: reads the repository through the `git2` crate
//! - [mercurial::MercurialBackend]: asks the `hg` command line client
//!
//! Supporting another system means adding a variant and a backend.
//!
//! ```rust
//! # use get_version::domain::TagPattern;
//! # use get_version::vcs::{find_vcs_root, VcsSelection};
//! # fn example() -> get_version::Result<()> {
//! if let Some(found) = find_vcs_root(std::path::Path::new("."), VcsSelection::Any) {
//!     let raw = found.kind.latest_tag(&found.root, &TagPattern::default())?;
//!     println!("{}", raw.serialize(true)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod git;
pub mod mercurial;

pub use git::{GitBackend, GitRepo};
pub use mercurial::MercurialBackend;

use crate::domain::{Pep440Version, PreRelease, TagPattern};
use crate::error::{Result, VersionResolutionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Base version used when a repository has no matching tag
pub const DEFAULT_BASE: &str = "0.0.0";

/// What a VCS knows about the checked-out revision
///
/// `stage`, `revision`, `commit`, `dirty` and `tagged_metadata` stay `None`
/// when the backend has nothing to report for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVcsVersion {
    /// Version part of the latest matching tag, prefix stripped
    pub base: String,
    /// Pre/post/dev label from the tag (e.g. `rc`)
    pub stage: Option<String>,
    /// Number following the stage label
    pub revision: Option<u64>,
    /// Commits between the tag and the checked-out revision
    pub distance: u64,
    /// Abbreviated id of the checked-out revision
    pub commit: Option<String>,
    /// Whether tracked files have uncommitted changes
    pub dirty: Option<bool>,
    /// `+local` metadata carried by the tag itself
    pub tagged_metadata: Option<String>,
}

impl RawVcsVersion {
    /// A version with only a base, as read from a clean tagged revision
    pub fn new(base: impl Into<String>) -> Self {
        RawVcsVersion {
            base: base.into(),
            stage: None,
            revision: None,
            distance: 0,
            commit: None,
            dirty: None,
            tagged_metadata: None,
        }
    }

    /// Render as a PEP 440 version.
    ///
    /// A clean checkout of the tag gives the tag's own version. Commits past
    /// the tag become a `.postN.dev0` suffix (added to the post or dev number
    /// when the tag already has one) and the commit id goes into the local
    /// label. When `with_dirty` is set, uncommitted changes add a `dirty`
    /// local segment.
    pub fn serialize(&self, with_dirty: bool) -> Result<String> {
        let stage = self.stage.as_deref().map(str::to_ascii_lowercase);
        let revision = self.revision.unwrap_or(0);

        let mut pre = None;
        let mut post = None;
        let mut dev = None;
        match stage.as_deref() {
            None => {}
            Some("post" | "rev" | "r") => post = Some(revision),
            Some("dev") => dev = Some(revision),
            Some(label) => {
                let phase = PreRelease::from_label(label).ok_or_else(|| {
                    VersionResolutionError::version(format!("Unknown version stage '{}'", label))
                })?;
                pre = Some((phase, revision));
            }
        }

        if self.distance > 0 {
            match (post, dev) {
                (Some(n), _) => {
                    post = Some(n + self.distance);
                    dev = Some(0);
                }
                (None, Some(n)) => dev = Some(n + self.distance),
                (None, None) => {
                    post = Some(self.distance);
                    dev = Some(0);
                }
            }
        }

        let mut public = Pep440Version::parse(&self.base)?;
        if !public.local.is_empty() || public.pre.is_some() || public.post.is_some() || public.dev.is_some() {
            return Err(VersionResolutionError::version(format!(
                "Tag base '{}' must be a plain release number",
                self.base
            )));
        }
        public.pre = pre;
        public.post = post;
        public.dev = dev;

        let mut local: Vec<&str> = Vec::new();
        if let Some(metadata) = self.tagged_metadata.as_deref() {
            local.push(metadata);
        }
        if self.distance > 0 {
            if let Some(commit) = self.commit.as_deref() {
                local.push(commit);
            }
        }
        if with_dirty && self.dirty == Some(true) {
            local.push("dirty");
        }

        let serialized = if local.is_empty() {
            public.to_string()
        } else {
            format!("{}+{}", public, local.join("."))
        };

        if !Pep440Version::is_valid(&serialized) {
            return Err(VersionResolutionError::version(format!(
                "'{}' is not a valid PEP 440 version",
                serialized
            )));
        }
        Ok(serialized)
    }
}

/// Capability interface every VCS backend provides
pub trait VcsBackend: Send + Sync {
    /// Whether `dir` itself is the root of a working copy of this kind
    fn detect(&self, dir: &Path) -> bool;

    /// Latest tag matching `pattern`, distance from it and dirtiness.
    ///
    /// A repository without a matching tag is not an error: the base falls
    /// back to [DEFAULT_BASE]. Errors mean the repository couldn't be read.
    fn latest_tag(&self, root: &Path, pattern: &TagPattern) -> Result<RawVcsVersion>;
}

/// Supported version control systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsKind {
    Git,
    Mercurial,
}

impl VcsKind {
    pub fn backend(self) -> &'static dyn VcsBackend {
        match self {
            VcsKind::Git => &GitBackend,
            VcsKind::Mercurial => &MercurialBackend,
        }
    }

    pub fn detect(self, dir: &Path) -> bool {
        self.backend().detect(dir)
    }

    pub fn latest_tag(self, root: &Path, pattern: &TagPattern) -> Result<RawVcsVersion> {
        self.backend().latest_tag(root, pattern)
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsKind::Git => write!(f, "Git"),
            VcsKind::Mercurial => write!(f, "Mercurial"),
        }
    }
}

/// Which systems detection may consider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsSelection {
    #[default]
    Any,
    Git,
    #[serde(alias = "hg")]
    Mercurial,
}

impl VcsSelection {
    pub fn kinds(self) -> &'static [VcsKind] {
        match self {
            VcsSelection::Any => &[VcsKind::Git, VcsKind::Mercurial],
            VcsSelection::Git => &[VcsKind::Git],
            VcsSelection::Mercurial => &[VcsKind::Mercurial],
        }
    }
}

impl FromStr for VcsSelection {
    type Err = VersionResolutionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(VcsSelection::Any),
            "git" => Ok(VcsSelection::Git),
            "mercurial" | "hg" => Ok(VcsSelection::Mercurial),
            other => Err(VersionResolutionError::config(format!(
                "Unknown VCS '{}' - expected any, git or mercurial",
                other
            ))),
        }
    }
}

/// A detected working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsRoot {
    pub kind: VcsKind,
    pub root: PathBuf,
}

/// Directory names that hold installed packages
const INSTALL_DIRS: [&str; 2] = ["site-packages", "dist-packages"];

/// Walk up from `start` and return the first working copy root found.
///
/// Within one directory the kinds are tried in the order `selection` lists
/// them. The walk ends at a `site-packages` or `dist-packages` directory:
/// an installed package never takes its version from a repository the
/// environment happens to live in. Finding nothing is a normal outcome.
pub fn find_vcs_root(start: &Path, selection: VcsSelection) -> Option<VcsRoot> {
    for dir in start.ancestors() {
        if let Some(&kind) = selection.kinds().iter().find(|kind| kind.detect(dir)) {
            return Some(VcsRoot {
                kind,
                root: dir.to_path_buf(),
            });
        }
        if dir
            .file_name()
            .is_some_and(|name| INSTALL_DIRS.iter().any(|d| name == *d))
        {
            debug!("Not looking for a repository above {}", dir.display());
            return None;
        }
    }
    None
}
