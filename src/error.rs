use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where a version was looked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Vcs,
    Sdist,
    Metadata,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Vcs => write!(f, "VCS"),
            Source::Sdist => write!(f, "Source distribution"),
            Source::Metadata => write!(f, "Package metadata"),
        }
    }
}

/// Why a single stage produced no version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub source: Source,
    pub message: String,
}

impl StageOutcome {
    pub fn new(source: Source, message: impl Into<String>) -> Self {
        StageOutcome {
            source,
            message: message.into(),
        }
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.contains('\n') {
            write!(f, "{}:", self.source)?;
            for line in self.message.lines() {
                write!(f, "\n  {}", line)?;
            }
            Ok(())
        } else {
            write!(f, "{}: {}", self.source, self.message)
        }
    }
}

/// Unified error type for version resolution
#[derive(Error, Debug)]
pub enum VersionResolutionError {
    #[error("VCS lookup failed in “{}”: {message}", .root.display())]
    VcsLookupFailure { root: PathBuf, message: String },

    #[error("No version found:{}", format_outcomes(.outcomes))]
    NoVersionSourceFound {
        path: PathBuf,
        outcomes: Vec<StageOutcome>,
    },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Invalid tag pattern: {0}")]
    Pattern(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_outcomes(outcomes: &[StageOutcome]) -> String {
    outcomes
        .iter()
        .map(|outcome| format!("\n- {}", outcome))
        .collect()
}

/// Convenience type alias for Results in get-version
pub type Result<T> = std::result::Result<T, VersionResolutionError>;

impl VersionResolutionError {
    /// Create a VCS lookup failure rooted at `root`
    pub fn vcs(root: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        VersionResolutionError::VcsLookupFailure {
            root: root.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid target error with context
    pub fn target(msg: impl Into<String>) -> Self {
        VersionResolutionError::InvalidTarget(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        VersionResolutionError::Version(msg.into())
    }

    /// Create a tag pattern error with context
    pub fn pattern(msg: impl Into<String>) -> Self {
        VersionResolutionError::Pattern(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        VersionResolutionError::Config(msg.into())
    }
}
