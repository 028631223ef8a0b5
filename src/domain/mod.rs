//! Domain logic - pure rules independent of any VCS or filesystem access

pub mod tag;
pub mod target;
pub mod version;

pub use tag::{TagMatch, TagPattern, DEFAULT_TAG_PATTERN};
pub use target::{normalize_dist_name, Target};
pub use version::{Pep440Version, PreRelease};
