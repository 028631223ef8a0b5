//! Python core metadata and the installed-package index
//!
//! `PKG-INFO` and `METADATA` files share one format: an RFC 822 style block
//! of `Key: value` headers, optionally followed by a blank line and a body.
//! [CoreMetadata] reads the headers this crate cares about.
//!
//! The [MetadataIndex] trait abstracts "which version of distribution X is
//! installed". [SitePackages] answers it by scanning `site-packages`
//! style directories; [MockIndex] serves canned answers in tests.

pub mod mock;
pub mod site_packages;

pub use mock::MockIndex;
pub use site_packages::SitePackages;

use crate::error::Result;

/// The identifying fields of a core metadata file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreMetadata {
    pub name: Option<String>,
    pub version: String,
}

impl CoreMetadata {
    /// Read `Name` and `Version` from the header block.
    ///
    /// Returns `None` when there is no non-empty `Version` header. Header
    /// names are case-insensitive; continuation lines are skipped.
    pub fn parse(text: &str) -> Option<Self> {
        let mut name = None;
        let mut version = None;

        for line in text.lines() {
            if line.trim().is_empty() {
                break;
            }
            if line.starts_with([' ', '\t']) {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if key.eq_ignore_ascii_case("name") && name.is_none() {
                name = Some(value.to_string());
            } else if key.eq_ignore_ascii_case("version") && version.is_none() {
                version = Some(value.to_string());
            }
        }

        let version = version.filter(|v| !v.is_empty())?;
        Some(CoreMetadata { name, version })
    }
}

/// Index of installed distributions
///
/// Implementors must be `Send + Sync` so a resolver can be shared.
pub trait MetadataIndex: Send + Sync {
    /// Version recorded for the distribution `dist_name` (PEP 503
    /// normalized), or `None` if it is not installed.
    ///
    /// Errors are reserved for environment problems such as unreadable
    /// directories.
    fn version_of(&self, dist_name: &str) -> Result<Option<String>>;

    /// Human readable description of where the index looks, for diagnostics
    fn describe(&self) -> String {
        String::from("installed packages")
    }
}
