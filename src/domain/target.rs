use crate::error::{Result, VersionResolutionError};
use std::path::{Path, PathBuf};

/// What a version is being resolved for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A module file inside a project or an installed package
    Module {
        /// Importable module name (e.g. `my_mod`)
        module: String,
        /// Project root: the directory holding the module, minus a `src` layer
        parent: PathBuf,
        /// Normalized distribution name
        dist_name: String,
    },
    /// A bare distribution name, only resolvable from installed metadata
    Distribution { dist_name: String },
}

impl Target {
    /// Interpret `package` as a module path or a distribution name.
    ///
    /// * `…/pkg/__init__.py` is the package `pkg`, rooted next to `pkg/`
    /// * `…/mod.py` is the module `mod`, rooted next to the file
    /// * a single component without a suffix is a distribution name
    ///
    /// `dist_name` overrides the distribution name derived from the module.
    pub fn from_path(package: impl AsRef<Path>, dist_name: Option<&str>) -> Result<Self> {
        let path = package.as_ref();

        if dist_name.is_none() && path.extension().is_none() && path.components().count() == 1 {
            let name = path.to_string_lossy();
            return Ok(Target::Distribution {
                dist_name: normalize_dist_name(&name),
            });
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => {}
            suffix => {
                let mut msg = format!(
                    "“{}” is neither the name of an installed module nor the path to a .py file.",
                    path.display()
                );
                if let Some(suffix) = suffix {
                    msg.push_str(&format!(" Unknown file suffix .{}", suffix));
                }
                return Err(VersionResolutionError::target(msg));
            }
        }

        let file_parent = path.parent().unwrap_or_else(|| Path::new(""));
        let (module, mut parent) = if path.file_name().is_some_and(|n| n == "__init__.py") {
            let module = file_name_string(file_parent).ok_or_else(|| {
                VersionResolutionError::target(format!(
                    "“{}” is a package initializer outside of a package directory",
                    path.display()
                ))
            })?;
            (module, file_parent.parent().unwrap_or_else(|| Path::new("")).to_path_buf())
        } else {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            (stem, file_parent.to_path_buf())
        };

        if parent.file_name().is_some_and(|n| n == "src") {
            parent = parent.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        }

        let dist_name = normalize_dist_name(dist_name.unwrap_or(&module));

        Ok(Target::Module {
            module,
            parent,
            dist_name,
        })
    }

    pub fn dist_name(&self) -> &str {
        match self {
            Target::Module { dist_name, .. } => dist_name,
            Target::Distribution { dist_name } => dist_name,
        }
    }

    /// Project root, if the target names a module on disk
    pub fn parent(&self) -> Option<&Path> {
        match self {
            Target::Module { parent, .. } => Some(parent),
            Target::Distribution { .. } => None,
        }
    }
}

fn file_name_string(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Normalize a distribution name: lowercase, with every run of `-`, `_`
/// and `.` collapsed into a single `-`.
pub fn normalize_dist_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('-');
        }
        pending_sep = false;
        out.extend(c.to_lowercase());
    }
    out
}
