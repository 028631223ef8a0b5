// tests/resolver_test.rs
use get_version::domain::Pep440Version;
use get_version::metadata::MockIndex;
use get_version::{Resolver, ResolverConfig, Source, VersionResolutionError};
use git2::{Oid, Repository, Signature};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn pep(s: &str) -> Pep440Version {
    Pep440Version::parse(s).expect("valid PEP 440 version")
}

fn resolver() -> Resolver {
    Resolver::new(ResolverConfig::default()).expect("default config is valid")
}

/// Resolver that ignores repositories above the project root and never
/// scans real site-packages directories
fn isolated_resolver(index: MockIndex) -> Resolver {
    Resolver::new(ResolverConfig {
        strict_root: true,
        ..ResolverConfig::default()
    })
    .expect("config is valid")
    .with_index(index)
}

struct TestRepo {
    dir: TempDir,
    repo: Repository,
    src_path: PathBuf,
}

impl TestRepo {
    /// A repository holding `git_mod.py`, optionally under `src/`
    fn new(src_layout: bool) -> Self {
        let dir = TempDir::new().expect("Could not create temp dir");
        let repo = Repository::init(dir.path()).expect("Could not init git repo");
        {
            let mut config = repo.config().expect("Could not get config");
            config.set_str("user.name", "A U Thor").unwrap();
            config.set_str("user.email", "author@example.com").unwrap();
        }
        let src_path = if src_layout {
            PathBuf::from("src").join("git_mod.py")
        } else {
            PathBuf::from("git_mod.py")
        };
        TestRepo {
            dir,
            repo,
            src_path,
        }
    }

    fn module(&self) -> PathBuf {
        self.dir.path().join(&self.src_path)
    }

    fn write(&self, content: &str) {
        let path = self.module();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn commit(&self, content: &str, message: &str) -> Oid {
        self.write(content);
        let mut index = self.repo.index().expect("Could not get index");
        index.add_path(&self.src_path).expect("Could not add file");
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("A U Thor", "author@example.com").unwrap();
        let parent = self.repo.head().ok().map(|h| h.peel_to_commit().unwrap());
        let parents: Vec<_> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Could not create commit")
    }

    fn tag(&self, name: &str, oid: Oid) {
        let object = self.repo.find_object(oid, None).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap();
    }

    fn short_head(&self) -> String {
        let oid = self.repo.head().unwrap().target().unwrap();
        oid.to_string()[..7].to_string()
    }
}

#[test]
fn test_tagged_clean_checkout_is_bare_version() {
    for src_layout in [false, true] {
        let repo = TestRepo::new(src_layout);
        let oid = repo.commit("print('hello')\n", "initial");
        repo.tag("v1.2.3", oid);

        assert_eq!(resolver().resolve(repo.module()).unwrap(), "1.2.3");
    }
}

#[test]
fn test_tag_without_prefix() {
    let repo = TestRepo::new(false);
    let oid = repo.commit("print('hello')\n", "initial");
    repo.tag("0.1.2", oid);

    assert_eq!(resolver().resolve(repo.module()).unwrap(), "0.1.2");
}

#[test]
fn test_commits_past_tag_sort_after_it() {
    let repo = TestRepo::new(false);
    let oid = repo.commit("print('hello')\n", "initial");
    repo.tag("v1.2.3", oid);
    repo.commit("print('one')\n", "one");
    repo.commit("print('two')\n", "two");

    let version = resolver().resolve(repo.module()).unwrap();
    assert_ne!(version, "1.2.3");
    assert!(Pep440Version::is_valid(&version));
    assert!(pep(&version) > pep("1.2.3"));
    assert_eq!(version, format!("1.2.3.post2.dev0+{}", repo.short_head()));
}

#[test]
fn test_dirty_tree_differs_from_clean() {
    let repo = TestRepo::new(false);
    let oid = repo.commit("print('hello')\n", "initial");
    repo.tag("v1.2.3", oid);
    repo.commit("print('one')\n", "one");
    repo.commit("print('two')\n", "two");

    let clean = resolver().resolve(repo.module()).unwrap();
    repo.write("print('dirty')\n");
    let dirty = resolver().resolve(repo.module()).unwrap();

    assert_ne!(clean, dirty);
    assert!(pep(&dirty) > pep("1.2.3"));
    assert_eq!(dirty, format!("1.2.3.post2.dev0+{}.dirty", repo.short_head()));
}

#[test]
fn test_prerelease_tag_with_dirty_tree() {
    let repo = TestRepo::new(true);
    let oid = repo.commit("print('hello')\n", "initial");
    repo.tag("v1a2", oid);
    repo.commit("print('modified')\n", "modified");
    repo.write("print('dirty')\n");

    let version = resolver().resolve(repo.module()).unwrap();
    assert_eq!(version, format!("1a2.post1.dev0+{}.dirty", repo.short_head()));
}

#[test]
fn test_untagged_repository_uses_default_base() {
    let repo = TestRepo::new(false);
    repo.commit("print('hello')\n", "initial");

    let version = resolver().resolve(repo.module()).unwrap();
    assert_eq!(version, format!("0.0.0.post1.dev0+{}", repo.short_head()));
}

#[test]
fn test_vcs_wins_over_other_sources() {
    let repo = TestRepo::new(false);
    let oid = repo.commit("print('hello')\n", "initial");
    repo.tag("v1.2.3", oid);
    fs::write(repo.dir.path().join("PKG-INFO"), "Version: 9.9.9\n").unwrap();

    let mut index = MockIndex::new();
    index.add_distribution("git_mod", "8.8.8");
    let resolver = resolver().with_index(index);

    assert_eq!(resolver.resolve(repo.module()).unwrap(), "1.2.3");
}

#[test]
fn test_corrupt_repository_is_fatal() {
    let repo = TestRepo::new(false);
    repo.commit("print('hello')\n", "initial");
    fs::remove_dir_all(repo.dir.path().join(".git").join("objects")).unwrap();

    let err = resolver().resolve(repo.module()).unwrap_err();
    assert!(
        matches!(err, VersionResolutionError::VcsLookupFailure { .. }),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_unreadable_mercurial_repository_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join(".hg")).unwrap();
    fs::write(
        temp_dir.path().join(".hg").join("requires"),
        "get-version-unknown-feature\n",
    )
    .unwrap();
    fs::write(temp_dir.path().join("hg_mod.py"), "").unwrap();

    let err = resolver()
        .resolve(temp_dir.path().join("hg_mod.py"))
        .unwrap_err();
    assert!(
        matches!(err, VersionResolutionError::VcsLookupFailure { .. }),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_resolution_is_idempotent() {
    let repo = TestRepo::new(false);
    let oid = repo.commit("print('hello')\n", "initial");
    repo.tag("v1.2.3", oid);
    repo.commit("print('one')\n", "one");
    repo.write("print('dirty')\n");

    let resolver = resolver();
    let first = resolver.resolve(repo.module()).unwrap();
    let second = resolver.resolve(repo.module()).unwrap();
    assert_eq!(first, second);
}

fn sdist_tree(pkg_info: Option<&str>) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("dir_mod_release");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src").join("dir_mod.py"), "print('hi!')\n").unwrap();
    if let Some(pkg_info) = pkg_info {
        fs::write(root.join("PKG-INFO"), pkg_info).unwrap();
    }
    (temp_dir, root)
}

#[test]
fn test_sdist_metadata_skips_installed_lookup() {
    let (_temp_dir, root) = sdist_tree(Some("Metadata-Version: 2.1\nName: dir-mod\nVersion: 2.0.0\n"));
    let mut index = MockIndex::new();
    index.add_distribution("dir-mod", "3.1.0");
    let resolver = isolated_resolver(index);

    assert_eq!(resolver.resolve(root.join("src").join("dir_mod.py")).unwrap(), "2.0.0");
}

#[test]
fn test_sdist_lookup_never_queries_index() {
    let (_temp_dir, root) = sdist_tree(Some("Version: 2.0.0\n"));
    let index = std::sync::Arc::new(MockIndex::new());
    let resolver = Resolver::new(ResolverConfig {
        strict_root: true,
        ..ResolverConfig::default()
    })
    .unwrap()
    .with_index(SharedIndex(index.clone()));

    assert_eq!(resolver.resolve(root.join("src").join("dir_mod.py")).unwrap(), "2.0.0");
    assert!(index.lookups().is_empty());
}

#[test]
fn test_malformed_sdist_metadata_falls_through() {
    let (_temp_dir, root) = sdist_tree(Some("this is not metadata\n"));
    let index = std::sync::Arc::new({
        let mut index = MockIndex::new();
        index.add_distribution("dir_mod", "3.1.0");
        index
    });
    let resolver = isolated_resolver(MockIndex::new()).with_index(SharedIndex(index.clone()));

    assert_eq!(resolver.resolve(root.join("src").join("dir_mod.py")).unwrap(), "3.1.0");
    assert_eq!(index.lookups(), vec!["dir-mod".to_string()]);
}

#[test]
fn test_installed_site_packages() {
    let temp_dir = TempDir::new().unwrap();
    let site = temp_dir.path().join("site-packages");
    fs::create_dir_all(site.join("inst_mod")).unwrap();
    fs::write(site.join("inst_mod").join("__init__.py"), "").unwrap();
    fs::create_dir_all(site.join("inst_mod-3.1.0.dist-info")).unwrap();
    fs::write(
        site.join("inst_mod-3.1.0.dist-info").join("METADATA"),
        "Metadata-Version: 2.1\nName: inst-mod\nVersion: 3.1.0\n",
    )
    .unwrap();

    let resolver = Resolver::new(ResolverConfig {
        strict_root: true,
        ..ResolverConfig::default()
    })
    .unwrap();

    let module = site.join("inst_mod").join("__init__.py");
    assert_eq!(resolver.resolve(module).unwrap(), "3.1.0");
}

#[test]
fn test_development_install_egg_info() {
    let temp_dir = TempDir::new().unwrap();
    let project = temp_dir.path().join("proj");
    fs::create_dir_all(project.join("my_pkg")).unwrap();
    fs::write(project.join("my_pkg").join("__init__.py"), "").unwrap();
    fs::create_dir_all(project.join("my_pkg.egg-info")).unwrap();
    fs::write(
        project.join("my_pkg.egg-info").join("PKG-INFO"),
        "Metadata-Version: 2.1\nName: my-pkg\nVersion: 1.4.0\n",
    )
    .unwrap();

    let resolver = Resolver::new(ResolverConfig {
        strict_root: true,
        ..ResolverConfig::default()
    })
    .unwrap();

    let module = project.join("my_pkg").join("__init__.py");
    assert_eq!(resolver.resolve(module).unwrap(), "1.4.0");
}

#[test]
fn test_package_installed_inside_repository_uses_its_metadata() {
    let repo = TestRepo::new(false);
    let oid = repo.commit("print('hello')\n", "initial");
    repo.tag("v9.9.9", oid);

    let site = repo
        .dir
        .path()
        .join(".venv")
        .join("lib")
        .join("python3.12")
        .join("site-packages");
    fs::create_dir_all(site.join("pytest")).unwrap();
    fs::write(site.join("pytest").join("__init__.py"), "").unwrap();
    fs::create_dir_all(site.join("pytest-8.0.0.dist-info")).unwrap();
    fs::write(
        site.join("pytest-8.0.0.dist-info").join("METADATA"),
        "Metadata-Version: 2.1\nName: pytest\nVersion: 8.0.0\n",
    )
    .unwrap();

    let module = site.join("pytest").join("__init__.py");
    assert_eq!(get_version::get_version(&module).unwrap(), "8.0.0");
    assert_eq!(resolver().resolve(repo.module()).unwrap(), "9.9.9");
}

#[test]
fn test_nothing_found() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("mod_dev_dir");
    fs::create_dir_all(&dir).unwrap();

    let err = isolated_resolver(MockIndex::new())
        .resolve(dir.join("mod.py"))
        .unwrap_err();

    match err {
        VersionResolutionError::NoVersionSourceFound { path, outcomes } => {
            assert_eq!(path, dir.join("mod.py"));
            let sources: Vec<Source> = outcomes.iter().map(|o| o.source).collect();
            assert_eq!(sources, vec![Source::Vcs, Source::Sdist, Source::Metadata]);
        }
        other => panic!("expected NoVersionSourceFound, got {}", other),
    }
}

#[test]
fn test_missing_path_still_resolves_from_metadata() {
    let mut index = MockIndex::new();
    index.add_distribution("ghost", "0.4.0");
    let resolver = isolated_resolver(index);

    let module = Path::new("/definitely/not/here/ghost.py");
    assert_eq!(resolver.resolve(module).unwrap(), "0.4.0");
}

/// Lets a test keep a handle on an index it hands to the resolver
struct SharedIndex(std::sync::Arc<MockIndex>);

impl get_version::metadata::MetadataIndex for SharedIndex {
    fn version_of(&self, dist_name: &str) -> get_version::Result<Option<String>> {
        self.0.version_of(dist_name)
    }
}
