use crate::error::{Result, VersionResolutionError};
use regex::Regex;

/// Default tag pattern: an optional `v`, a dotted numeric base, an optional
/// pre/post/dev stage and optional `+local` metadata.
pub const DEFAULT_TAG_PATTERN: &str = r"(?x)
    ^v?
    (?P<base>[0-9]+(?:\.[0-9]+)*)
    (?:
        [-_.]?
        (?P<stage>alpha|a|beta|b|preview|pre|c|rc|post|rev|r|dev)
        [-_.]?
        (?P<revision>[0-9]+)?
    )?
    (?:\+(?P<tagged_metadata>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
    $";

/// The parts of a tag name picked out by a [TagPattern]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub base: String,
    pub stage: Option<String>,
    pub revision: Option<u64>,
    pub tagged_metadata: Option<String>,
}

/// Regex that selects version tags and splits them into their parts.
///
/// The regex must define a named group `base`; the groups `stage`,
/// `revision` and `tagged_metadata` are optional.
#[derive(Debug, Clone)]
pub struct TagPattern {
    regex: Regex,
}

impl TagPattern {
    /// Compile a tag pattern, checking that it captures `base`
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| VersionResolutionError::pattern(format!("'{}': {}", pattern, e)))?;

        if !regex.capture_names().flatten().any(|name| name == "base") {
            return Err(VersionResolutionError::pattern(format!(
                "'{}' must define a named group 'base'",
                pattern
            )));
        }

        Ok(TagPattern { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Split a tag name into its version parts, or `None` if it doesn't match
    pub fn captures(&self, tag: &str) -> Option<TagMatch> {
        let caps = self.regex.captures(tag)?;
        let base = caps.name("base")?.as_str().to_string();
        let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

        Some(TagMatch {
            base,
            stage: text("stage"),
            // an overflowing revision disqualifies the tag
            revision: match caps.name("revision") {
                Some(m) => Some(m.as_str().parse().ok()?),
                None => None,
            },
            tagged_metadata: text("tagged_metadata"),
        })
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.captures(tag).is_some()
    }
}

impl Default for TagPattern {
    fn default() -> Self {
        TagPattern::new(DEFAULT_TAG_PATTERN).expect("default tag pattern is valid")
    }
}
