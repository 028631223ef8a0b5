use crate::domain::normalize_dist_name;
use crate::error::Result;
use crate::metadata::{CoreMetadata, MetadataIndex};
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Installed-package index backed by `site-packages` style directories.
///
/// A distribution is installed in a directory when it holds a
/// `<name>-<version>.dist-info` directory (read `METADATA`) or a
/// `<name>-<version>.egg-info` directory or file (read `PKG-INFO`, or the
/// file itself). Development installs leave a bare `<name>.egg-info` next
/// to the sources; its version comes from the metadata file alone.
/// Directories are searched in order; the first hit wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitePackages {
    dirs: Vec<PathBuf>,
}

impl SitePackages {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        SitePackages { dirs }
    }

    /// Build the search path for a module rooted at `anchor`.
    ///
    /// Order: `extra`, then `anchor` (the directory an installed module sits
    /// in), then every `PYTHONPATH` entry, then the `site-packages` of the
    /// active `VIRTUAL_ENV` and `CONDA_PREFIX`, then the user site under the
    /// home directory, then the system installation.
    pub fn from_env(anchor: Option<&Path>, extra: &[PathBuf]) -> Self {
        let mut candidates: Vec<PathBuf> = extra.to_vec();
        candidates.extend(anchor.map(Path::to_path_buf));

        if let Some(python_path) = env::var_os("PYTHONPATH") {
            candidates.extend(env::split_paths(&python_path).filter(|p| !p.as_os_str().is_empty()));
        }
        for var in ["VIRTUAL_ENV", "CONDA_PREFIX"] {
            if let Some(prefix) = env::var_os(var) {
                candidates.extend(prefix_site_dirs(Path::new(&prefix)));
            }
        }
        if let Some(home) = dirs::home_dir() {
            candidates.extend(user_site_dirs(&home));
        }
        candidates.extend(system_site_dirs());

        let mut unique = Vec::with_capacity(candidates.len());
        for dir in candidates {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        SitePackages { dirs: unique }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn find_in(&self, dir: &Path, dist_name: &str) -> Result<Option<String>> {
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            entries.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
        entries.sort();

        for (file_name, path) in entries {
            let Some((stem, metadata_name)) = split_metadata_suffix(&file_name) else {
                continue;
            };
            let (name, name_version) = match stem.split_once('-') {
                Some((name, version)) => (name, Some(version)),
                None => (stem, None),
            };
            if normalize_dist_name(name) != dist_name {
                continue;
            }

            let metadata_file = if path.is_dir() {
                path.join(metadata_name)
            } else {
                path.clone()
            };
            let from_file = match fs::read_to_string(&metadata_file) {
                Ok(text) => CoreMetadata::parse(&text).map(|m| m.version),
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::InvalidData) => {
                    debug!("Unusable metadata {}: {}", metadata_file.display(), e);
                    None
                }
                Err(e) => return Err(e.into()),
            };

            // egg-info names may carry a trailing `-py3.X`
            let from_name = name_version
                .and_then(|v| v.split('-').next())
                .filter(|v| !v.is_empty());
            if let Some(version) = from_file.or_else(|| from_name.map(str::to_string)) {
                debug!("Found {} {} in {}", dist_name, version, dir.display());
                return Ok(Some(version));
            }
        }

        Ok(None)
    }
}

impl MetadataIndex for SitePackages {
    fn version_of(&self, dist_name: &str) -> Result<Option<String>> {
        let dist_name = normalize_dist_name(dist_name);
        for dir in &self.dirs {
            if let Some(version) = self.find_in(dir, &dist_name)? {
                return Ok(Some(version));
            }
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        let dirs: Vec<String> = self.dirs.iter().map(|d| format!("“{}”", d.display())).collect();
        if dirs.is_empty() {
            String::from("no site-packages directories")
        } else {
            format!("site-packages directories {}", dirs.join(", "))
        }
    }
}

/// Split `name-1.0.dist-info` into its stem and the metadata file it holds
fn split_metadata_suffix(file_name: &str) -> Option<(&str, &'static str)> {
    if let Some(stem) = file_name.strip_suffix(".dist-info") {
        Some((stem, "METADATA"))
    } else {
        file_name.strip_suffix(".egg-info").map(|stem| (stem, "PKG-INFO"))
    }
}

/// Library directories of the usual system-wide Python installations
const SYSTEM_LIB_DIRS: [&str; 3] = ["/usr/local/lib", "/usr/lib", "/usr/lib64"];

/// `python*/site-packages` and `python*/dist-packages` under `lib`
fn lib_site_dirs(lib: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(lib) else {
        return Vec::new();
    };
    let mut pythons: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("python"))
        .map(|entry| entry.path())
        .collect();
    pythons.sort();

    pythons
        .iter()
        .flat_map(|python| [python.join("site-packages"), python.join("dist-packages")])
        .collect()
}

/// `site-packages` directories of an installation prefix
fn prefix_site_dirs(prefix: &Path) -> Vec<PathBuf> {
    let mut dirs = lib_site_dirs(&prefix.join("lib"));
    dirs.push(prefix.join("Lib").join("site-packages"));
    dirs
}

/// Per-user `site-packages` (`pip install --user`)
fn user_site_dirs(home: &Path) -> Vec<PathBuf> {
    let mut site_dirs = lib_site_dirs(&home.join(".local").join("lib"));
    if cfg!(target_os = "macos") {
        if let Ok(entries) = fs::read_dir(home.join("Library").join("Python")) {
            let mut versions: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
            versions.sort();
            site_dirs.extend(
                versions
                    .into_iter()
                    .map(|v| v.join("lib").join("python").join("site-packages")),
            );
        }
    }
    if cfg!(windows) {
        if let Some(data) = dirs::data_dir() {
            if let Ok(entries) = fs::read_dir(data.join("Python")) {
                let mut versions: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
                versions.sort();
                site_dirs.extend(versions.into_iter().map(|v| v.join("site-packages")));
            }
        }
    }
    site_dirs
}

/// Site directories of the system Python installations
fn system_site_dirs() -> Vec<PathBuf> {
    if !cfg!(unix) {
        return Vec::new();
    }
    SYSTEM_LIB_DIRS
        .iter()
        .flat_map(|lib| lib_site_dirs(Path::new(lib)))
        .collect()
}
