use crate::domain::{Pep440Version, TagMatch, TagPattern};
use crate::error::Result;
use crate::vcs::{RawVcsVersion, VcsBackend, DEFAULT_BASE};
use git2::{ErrorCode, ObjectType, Oid, Repository, Status, StatusOptions};
use std::path::Path;
use tracing::debug;

/// Length of the abbreviated commit id put into local version labels
const SHORT_ID_LEN: usize = 7;

/// Git support through the `git2` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct GitBackend;

impl VcsBackend for GitBackend {
    fn detect(&self, dir: &Path) -> bool {
        // `.git` is a file in worktrees and submodules
        dir.join(".git").exists()
    }

    fn latest_tag(&self, root: &Path, pattern: &TagPattern) -> Result<RawVcsVersion> {
        GitRepo::open(root)?.describe(pattern)
    }
}

/// A tag that matched the pattern, with the commit it points at
#[derive(Debug, Clone)]
struct VersionTag {
    name: String,
    parts: TagMatch,
    target: Oid,
}

impl VersionTag {
    fn rank(&self) -> Option<Pep440Version> {
        let stage = self.parts.stage.as_deref().unwrap_or("");
        let revision = self.parts.revision.map(|n| n.to_string()).unwrap_or_default();
        Pep440Version::parse(&format!("{}{}{}", self.parts.base, stage, revision)).ok()
    }
}

/// Wrapper around git2::Repository for version lookups
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open the repository whose working copy is rooted at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path)?;
        Ok(GitRepo { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Repository) -> Self {
        GitRepo { repo }
    }

    /// The commit HEAD points at, or `None` before the first commit
    pub fn head_oid(&self) -> Result<Option<Oid>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All tags matching `pattern` that resolve to a commit
    fn version_tags(&self, pattern: &TagPattern) -> Result<Vec<VersionTag>> {
        let names = self.repo.tag_names(None)?;
        let mut tags = Vec::new();

        for name in names.iter().flatten() {
            let Some(parts) = pattern.captures(name) else {
                continue;
            };

            let reference = self.repo.find_reference(&format!("refs/tags/{}", name))?;
            // Tags on trees or blobs can't be an ancestor of HEAD
            match reference.peel(ObjectType::Commit) {
                Ok(object) => tags.push(VersionTag {
                    name: name.to_string(),
                    parts,
                    target: object.id(),
                }),
                Err(e) => debug!("Skipping tag '{}': {}", name, e),
            }
        }

        Ok(tags)
    }

    /// Number of commits reachable from `head` but not from `base`
    fn distance(&self, base: Option<Oid>, head: Oid) -> Result<u64> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(head)?;
        if let Some(base) = base {
            revwalk.hide(base)?;
        }

        let mut count = 0;
        for oid in revwalk {
            oid?;
            count += 1;
        }
        Ok(count)
    }

    /// Whether tracked files differ from HEAD in the index or working tree.
    ///
    /// Untracked files don't count.
    pub fn is_dirty(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses.iter().any(|entry| {
            let status = entry.status();
            status != Status::CURRENT && !status.intersects(Status::IGNORED | Status::WT_NEW)
        }))
    }

    /// Describe HEAD relative to the closest matching tag.
    ///
    /// Among the matching tags on HEAD's history the one with the fewest
    /// commits since wins; ties go to the highest version.
    pub fn describe(&self, pattern: &TagPattern) -> Result<RawVcsVersion> {
        let dirty = Some(self.is_dirty()?);

        let Some(head) = self.head_oid()? else {
            debug!("Repository has no commits yet");
            return Ok(RawVcsVersion {
                dirty,
                ..RawVcsVersion::new(DEFAULT_BASE)
            });
        };
        let commit = Some(head.to_string()[..SHORT_ID_LEN].to_string());

        let mut best: Option<(u64, VersionTag)> = None;
        for tag in self.version_tags(pattern)? {
            if tag.target != head && !self.repo.graph_descendant_of(head, tag.target)? {
                continue;
            }

            let distance = self.distance(Some(tag.target), head)?;
            let better = match &best {
                None => true,
                Some((best_distance, best_tag)) => {
                    distance < *best_distance
                        || (distance == *best_distance && tag.rank() > best_tag.rank())
                }
            };
            if better {
                best = Some((distance, tag));
            }
        }

        match best {
            Some((distance, tag)) => {
                debug!("Latest tag '{}' is {} commit(s) behind HEAD", tag.name, distance);
                Ok(RawVcsVersion {
                    base: tag.parts.base,
                    stage: tag.parts.stage,
                    revision: tag.parts.revision,
                    distance,
                    commit,
                    dirty,
                    tagged_metadata: tag.parts.tagged_metadata,
                })
            }
            None => {
                debug!("No tag matches '{}', using {}", pattern.as_str(), DEFAULT_BASE);
                Ok(RawVcsVersion {
                    distance: self.distance(None, head)?,
                    commit,
                    dirty,
                    ..RawVcsVersion::new(DEFAULT_BASE)
                })
            }
        }
    }
}
