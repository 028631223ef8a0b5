//! Versions recorded by source distributions
//!
//! An extracted sdist carries a `PKG-INFO` file at its root, and the root
//! directory itself is usually named `<name>-<version>`. Both were fixed
//! when the sdist was built, so whatever they say is returned unchanged.
//! Nothing here fails: unreadable or malformed data just means "no version".

use crate::domain::version::VERSION_PATTERN;
use crate::domain::Pep440Version;
use crate::metadata::CoreMetadata;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// File name of the metadata an sdist carries at its root
pub const PKG_INFO: &str = "PKG-INFO";

fn dirname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?ix)^[a-z]+(?:[_-][a-z]+)*-(?P<version>{})$",
            VERSION_PATTERN
        ))
        .expect("sdist directory pattern is a valid regex")
    })
}

/// Version from `<parent>/PKG-INFO`, if present and well-formed
pub fn version_from_pkg_info(parent: &Path) -> Option<String> {
    let path = parent.join(PKG_INFO);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            debug!("No readable {}: {}", path.display(), e);
            return None;
        }
    };

    let Some(metadata) = CoreMetadata::parse(&text) else {
        warn!("Ignoring {}: no Version header", path.display());
        return None;
    };
    if !Pep440Version::is_valid(&metadata.version) {
        warn!(
            "Ignoring {}: '{}' is not a valid version",
            path.display(),
            metadata.version
        );
        return None;
    }

    debug!(
        "{} records {} {}",
        path.display(),
        metadata.name.as_deref().unwrap_or("an unnamed distribution"),
        metadata.version
    );
    Some(metadata.version)
}

/// Version from a directory named like an extracted sdist (`name-1.2.3`)
pub fn version_from_dirname(parent: &Path) -> Option<String> {
    let name = parent.file_name()?.to_str()?;
    let version = dirname_regex().captures(name)?.name("version")?.as_str().to_string();
    debug!("Directory name '{}' records version {}", name, version);
    Some(version)
}
