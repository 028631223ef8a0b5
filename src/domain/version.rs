//! PEP 440 version parsing, normalization and ordering
//!
//! Only the pieces needed to validate resolved versions and to rank tags are
//! implemented: parsing of the canonical and permissive spellings, the
//! normalized string form, and the total order from PEP 440's
//! "Version scheme" section.

use crate::error::{Result, VersionResolutionError};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Permissive PEP 440 version grammar, to be embedded with the `x` flag set.
///
/// Case-insensitivity is left to the embedding pattern.
pub const VERSION_PATTERN: &str = r"
    (?:(?P<epoch>[0-9]+)!)?
    (?P<release>[0-9]+(?:\.[0-9]+)*)
    (?:
        [-_.]?
        (?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)
        [-_.]?
        (?P<pre_n>[0-9]+)?
    )?
    (?:
        (?:-(?P<post_n1>[0-9]+))
        |
        (?:
            [-_.]?
            (?P<post_l>post|rev|r)
            [-_.]?
            (?P<post_n2>[0-9]+)?
        )
    )?
    (?:
        [-_.]?
        (?P<dev_l>dev)
        [-_.]?
        (?P<dev_n>[0-9]+)?
    )?
    (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
";

/// Parser grammar: also takes surrounding whitespace and a leading `v`
fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?ix)^\s*v?{}\s*$", VERSION_PATTERN))
            .expect("PEP 440 grammar is a valid regex")
    })
}

fn strict_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?ix)^{}$", VERSION_PATTERN))
            .expect("PEP 440 grammar is a valid regex")
    })
}

/// Pre-release phase, ordered a < b < rc
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PreRelease {
    /// Map any accepted spelling onto its normalized phase
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "a" | "alpha" => Some(PreRelease::Alpha),
            "b" | "beta" => Some(PreRelease::Beta),
            "c" | "rc" | "pre" | "preview" => Some(PreRelease::ReleaseCandidate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreRelease::Alpha => "a",
            PreRelease::Beta => "b",
            PreRelease::ReleaseCandidate => "rc",
        }
    }
}

/// One dot-separated piece of a local version label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalSegment {
    Text(String),
    Number(u64),
}

impl Ord for LocalSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (LocalSegment::Number(a), LocalSegment::Number(b)) => a.cmp(b),
            (LocalSegment::Text(a), LocalSegment::Text(b)) => a.cmp(b),
            (LocalSegment::Number(_), LocalSegment::Text(_)) => Ordering::Greater,
            (LocalSegment::Text(_), LocalSegment::Number(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for LocalSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSegment::Text(s) => write!(f, "{}", s),
            LocalSegment::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A parsed PEP 440 version
///
/// Equality and ordering follow PEP 440, so `1.0` and `1.0.0` compare equal.
#[derive(Debug, Clone)]
pub struct Pep440Version {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<(PreRelease, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Vec<LocalSegment>,
}

impl Pep440Version {
    /// Parse any spelling PEP 440 accepts, including a leading `v`
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    /// True when `s` can be handed out as a version as is: a PEP 440
    /// spelling with no `v` prefix and no surrounding whitespace
    pub fn is_valid(s: &str) -> bool {
        strict_version_regex().is_match(s)
    }

    fn release_key(&self) -> &[u64] {
        let end = self
            .release
            .iter()
            .rposition(|&n| n != 0)
            .map_or(0, |i| i + 1);
        &self.release[..end]
    }
}

fn parse_number(field: &str, digits: &str) -> Result<u64> {
    digits
        .parse::<u64>()
        .map_err(|_| VersionResolutionError::version(format!("{} out of range: {}", field, digits)))
}

impl FromStr for Pep440Version {
    type Err = VersionResolutionError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = version_regex()
            .captures(s)
            .ok_or_else(|| VersionResolutionError::version(format!("Invalid PEP 440 version: '{}'", s)))?;

        let epoch = match caps.name("epoch") {
            Some(m) => parse_number("epoch", m.as_str())?,
            None => 0,
        };

        let release = caps["release"]
            .split('.')
            .map(|part| parse_number("release segment", part))
            .collect::<Result<Vec<_>>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let phase = PreRelease::from_label(label.as_str()).ok_or_else(|| {
                    VersionResolutionError::version(format!("Unknown pre-release label: {}", label.as_str()))
                })?;
                let n = match caps.name("pre_n") {
                    Some(m) => parse_number("pre-release number", m.as_str())?,
                    None => 0,
                };
                Some((phase, n))
            }
            None => None,
        };

        let post = if let Some(m) = caps.name("post_n1") {
            Some(parse_number("post-release number", m.as_str())?)
        } else if caps.name("post_l").is_some() {
            match caps.name("post_n2") {
                Some(m) => Some(parse_number("post-release number", m.as_str())?),
                None => Some(0),
            }
        } else {
            None
        };

        let dev = if caps.name("dev_l").is_some() {
            match caps.name("dev_n") {
                Some(m) => Some(parse_number("dev-release number", m.as_str())?),
                None => Some(0),
            }
        } else {
            None
        };

        let local = match caps.name("local") {
            Some(m) => m
                .as_str()
                .split(['-', '_', '.'])
                .map(|part| {
                    if part.bytes().all(|b| b.is_ascii_digit()) {
                        parse_number("local segment", part).map(LocalSegment::Number)
                    } else {
                        Ok(LocalSegment::Text(part.to_ascii_lowercase()))
                    }
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Pep440Version {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl fmt::Display for Pep440Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((phase, n)) = self.pre {
            write!(f, "{}{}", phase.as_str(), n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        if !self.local.is_empty() {
            let local: Vec<String> = self.local.iter().map(|s| s.to_string()).collect();
            write!(f, "+{}", local.join("."))?;
        }
        Ok(())
    }
}

/// Sort key for the pre-release slot: a dev release of a final version
/// sorts before every pre-release, a final release after all of them.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreRelease, u64),
    Final,
}

impl Pep440Version {
    fn pre_key(&self) -> PreKey {
        match self.pre {
            Some((phase, n)) => PreKey::Pre(phase, n),
            None if self.post.is_none() && self.dev.is_some() => PreKey::DevOnly,
            None => PreKey::Final,
        }
    }
}

fn cmp_dev(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for Pep440Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.release_key().cmp(other.release_key()))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| cmp_dev(self.dev, other.dev))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Pep440Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pep440Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pep440Version {}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Pep440Version {
        Pep440Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_release() {
        let version = v("1.2.3");
        assert_eq!(version.epoch, 0);
        assert_eq!(version.release, vec![1, 2, 3]);
        assert_eq!(version.pre, None);
        assert_eq!(version.post, None);
        assert_eq!(version.dev, None);
        assert!(version.local.is_empty());
    }

    #[test]
    fn test_parse_strips_v_prefix() {
        assert_eq!(v("v1.2.3").to_string(), "1.2.3");
        assert_eq!(v("V1.2.3").to_string(), "1.2.3");
    }

    #[test]
    fn test_normalizes_spellings() {
        assert_eq!(v("1.0-alpha.2").to_string(), "1.0a2");
        assert_eq!(v("1.0.preview1").to_string(), "1.0rc1");
        assert_eq!(v("1.0c3").to_string(), "1.0rc3");
        assert_eq!(v("1.0-1").to_string(), "1.0.post1");
        assert_eq!(v("1.0.rev").to_string(), "1.0.post0");
        assert_eq!(v("1.0-dev").to_string(), "1.0.dev0");
        assert_eq!(v("2!1.0+Ubuntu-1").to_string(), "2!1.0+ubuntu.1");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Pep440Version::parse("").is_err());
        assert!(Pep440Version::parse("one.two").is_err());
        assert!(Pep440Version::parse("1.0+").is_err());
        assert!(Pep440Version::parse("1.0 beta").is_err());
        assert!(!Pep440Version::is_valid("release-1.0"));
    }

    #[test]
    fn test_trailing_zeros_compare_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1"), v("1.0.0.0"));
        assert!(v("1.0.1") > v("1.0"));
    }

    #[test]
    fn test_ordering_chain() {
        let chain = [
            "1.0.dev0",
            "1.0a1.dev0",
            "1.0a1",
            "1.0b1",
            "1.0rc1",
            "1.0",
            "1.0+local",
            "1.0+local.1",
            "1.0.post1.dev0",
            "1.0.post1",
            "1.0.post1+abc",
            "1.1.dev0",
            "1!0.1",
        ];
        for pair in chain.windows(2) {
            assert!(
                v(pair[0]) < v(pair[1]),
                "expected {} < {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_local_numbers_sort_after_text() {
        assert!(v("1.0+1") > v("1.0+abc"));
        assert!(v("1.0+abc.dirty") > v("1.0+abc"));
    }

    #[test]
    fn test_is_valid_rejects_prefix_and_padding() {
        assert!(Pep440Version::is_valid("1.0"));
        assert!(Pep440Version::is_valid("1.2.post29.dev0+41ced3e.dirty"));
        assert!(!Pep440Version::is_valid("v1.0"));
        assert!(!Pep440Version::is_valid(" 1.0"));
        assert!(Pep440Version::parse(" v1.0 ").is_ok());
    }
}
