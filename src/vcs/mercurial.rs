use crate::domain::TagPattern;
use crate::error::{Result, VersionResolutionError};
use crate::vcs::{RawVcsVersion, VcsBackend, DEFAULT_BASE};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Length of the abbreviated changeset id put into local version labels
const SHORT_ID_LEN: usize = 7;

/// Mercurial support through the `hg` command line client
#[derive(Debug, Default, Clone, Copy)]
pub struct MercurialBackend;

impl VcsBackend for MercurialBackend {
    fn detect(&self, dir: &Path) -> bool {
        dir.join(".hg").is_dir()
    }

    fn latest_tag(&self, root: &Path, pattern: &TagPattern) -> Result<RawVcsVersion> {
        let (commit, dirty) = parse_identify(&hg(root, &["identify", "--id"])?);
        let dirty = Some(dirty);

        let Some(commit) = commit else {
            return Ok(RawVcsVersion {
                dirty,
                ..RawVcsVersion::new(DEFAULT_BASE)
            });
        };

        let tagged = hg(
            root,
            &["log", "-r", "reverse(ancestors(.) and tag())", "--template", "{rev}\t{tags}\n"],
        )?;

        for (rev, tags) in parse_tagged_ancestors(&tagged) {
            // Ties within one changeset go to the first matching tag hg lists
            let Some((name, parts)) = tags
                .iter()
                .find_map(|name| pattern.captures(name).map(|parts| (name, parts)))
            else {
                continue;
            };

            let distance = count_revisions(root, &format!("only(., {})", rev))?;
            debug!("Latest tag '{}' is {} changeset(s) behind", name, distance);
            return Ok(RawVcsVersion {
                base: parts.base,
                stage: parts.stage,
                revision: parts.revision,
                distance,
                commit: Some(commit),
                dirty,
                tagged_metadata: parts.tagged_metadata,
            });
        }

        debug!("No tag matches '{}', using {}", pattern.as_str(), DEFAULT_BASE);
        Ok(RawVcsVersion {
            distance: count_revisions(root, "::.")?,
            commit: Some(commit),
            dirty,
            ..RawVcsVersion::new(DEFAULT_BASE)
        })
    }
}

/// Run `hg` in `root` and return its stdout
fn hg(root: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("hg")
        .args(args)
        .current_dir(root)
        .env("HGPLAIN", "1")
        .output()
        .map_err(|e| VersionResolutionError::vcs(root, format!("could not run hg: {}", e)))?;

    if !output.status.success() {
        return Err(VersionResolutionError::vcs(
            root,
            format!(
                "hg {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn count_revisions(root: &Path, revset: &str) -> Result<u64> {
    let out = hg(root, &["log", "-r", revset, "--template", "x"])?;
    Ok(out.trim().len() as u64)
}

/// Parse `hg identify --id` output: a changeset id with a trailing `+`
/// when the working directory has uncommitted changes.
///
/// The null revision (all zeros) means there are no commits yet.
fn parse_identify(output: &str) -> (Option<String>, bool) {
    let id = output.trim();
    let dirty = id.ends_with('+');
    let id = id.trim_end_matches('+');

    if id.is_empty() || id.bytes().all(|b| b == b'0') {
        return (None, dirty);
    }
    let short: String = id.chars().take(SHORT_ID_LEN).collect();
    (Some(short), dirty)
}

/// Parse `{rev}\t{tags}` lines, dropping hg's synthetic `tip` tag
fn parse_tagged_ancestors(output: &str) -> Vec<(u64, Vec<String>)> {
    output
        .lines()
        .filter_map(|line| {
            let (rev, tags) = line.split_once('\t')?;
            let rev = rev.trim().parse().ok()?;
            let tags: Vec<String> = tags
                .split_whitespace()
                .filter(|tag| *tag != "tip")
                .map(str::to_string)
                .collect();
            (!tags.is_empty()).then_some((rev, tags))
        })
        .collect()
}
