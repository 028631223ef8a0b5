//! Determine a Python package's version.
//!
//! Looks at the latest tag of the package's repository, then at the metadata
//! of an extracted source distribution, then at installed package metadata.
//! See [Resolver] for the details.

pub mod config;
pub mod domain;
pub mod error;
pub mod metadata;
pub mod resolver;
pub mod sdist;
pub mod vcs;

pub use config::ResolverConfig;
pub use error::{Result, Source, StageOutcome, VersionResolutionError};
pub use resolver::{get_version, Resolver};
