//! In-memory description of a participating repository
//!
//! A `Repository` is built by the discovery phase from VCS driver output and
//! is immutable afterwards. It records everything the resolver and the
//! synthesizer need to know about one participant: where its local clone
//! lives, which branches it has, which branch its remote designates as HEAD,
//! and where its working tree will be mounted inside the monorepo.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A submodule entry as recorded by a repository: the path it is mounted at,
/// the URL it points to, and the commit it is pinned to.
///
/// For first-layer submodules the pin may be stale and is never trusted; for
/// nested (second-layer) submodules it is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmoduleDef {
    pub path: String,
    pub url: String,
    pub sha: String,
}

/// A second-layer submodule, kept as a submodule inside the monorepo at
/// `owner.target_subpath / path` with the same `url` and `sha`.
pub type NestedSubmodule = SubmoduleDef;

/// One participating repository: the meta-repo or a first-layer submodule.
#[derive(Debug, Clone, Serialize)]
pub struct Repository {
    /// Unique name within a run. The meta-repo is named after its URL; a
    /// submodule is named after its target subpath.
    pub name: String,

    /// Local mirror clone under `<workspace>/sources/`.
    #[serde(skip)]
    pub local_path: PathBuf,

    /// The branch the remote designates as HEAD. Always a member of
    /// `branches`.
    pub default_branch: String,

    /// Every branch head known to the remote.
    pub branches: BTreeSet<String>,

    /// Second-layer submodules recorded at the default branch.
    pub nested_submodules: Vec<NestedSubmodule>,

    /// Path under the monorepo root where this repo's tree will live.
    /// `"."` for the meta-repo.
    pub target_subpath: String,
}

impl Repository {
    /// Whether this repository is the meta-repo (mounted at the root).
    pub fn is_root(&self) -> bool {
        self.target_subpath == "."
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.branches.contains(branch)
    }
}

/// Equality by `name`; names are unique within a run.
impl PartialEq for Repository {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Repository {}

/// Extract a repository name from its URL or filesystem path: the last path
/// segment with any `.git` suffix stripped. Returns `None` when nothing
/// usable remains (e.g. `"/"`).
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let name = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Derive a run-unique repository name from a submodule's target subpath.
pub fn submodule_name(target_subpath: &str) -> String {
    target_subpath.replace('/', "-")
}

/// Resolve a possibly-relative submodule URL against the meta-repo source.
///
/// Git allows `./` and `../` submodule URLs relative to the superproject's
/// own URL; mirrors cloned from such entries must resolve them before
/// cloning. Absolute URLs pass through untouched.
pub fn resolve_submodule_url(meta_source: &str, url: &str) -> String {
    if !url.starts_with("./") && !url.starts_with("../") {
        return url.to_string();
    }

    let mut base: Vec<&str> = meta_source.trim_end_matches('/').split('/').collect();
    for component in url.split('/') {
        match component {
            "." | "" => {}
            ".." => {
                base.pop();
            }
            other => base.push(other),
        }
    }
    base.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            local_path: PathBuf::from("/tmp/sources").join(name),
            default_branch: "main".to_string(),
            branches: ["main"].into_iter().map(String::from).collect(),
            nested_submodules: vec![],
            target_subpath: name.to_string(),
        }
    }

    #[test]
    fn test_equality_is_by_name() {
        let a = repo("a");
        let mut a2 = repo("a");
        a2.default_branch = "dev".to_string();
        a2.branches = ["dev"].into_iter().map(String::from).collect();
        assert_eq!(a, a2);
        assert_ne!(a, repo("b"));
    }

    #[test]
    fn test_repo_name_from_url() {
        assert_eq!(
            repo_name_from_url("https://example.com/org/meta.git"),
            Some("meta".to_string())
        );
        assert_eq!(
            repo_name_from_url("git@example.com:org/meta.git"),
            Some("meta".to_string())
        );
        assert_eq!(
            repo_name_from_url("/srv/git/meta/"),
            Some("meta".to_string())
        );
        assert_eq!(repo_name_from_url("/"), None);
        assert_eq!(repo_name_from_url(""), None);
    }

    #[test]
    fn test_submodule_name_is_filesystem_safe() {
        assert_eq!(submodule_name("libs/widgets"), "libs-widgets");
        assert_eq!(submodule_name("a"), "a");
    }

    #[test]
    fn test_resolve_submodule_url_absolute_passthrough() {
        assert_eq!(
            resolve_submodule_url("https://example.com/org/meta.git", "https://example.com/org/a.git"),
            "https://example.com/org/a.git"
        );
    }

    #[test]
    fn test_resolve_submodule_url_relative() {
        assert_eq!(
            resolve_submodule_url("https://example.com/org/meta.git", "../a.git"),
            "https://example.com/org/a.git"
        );
        assert_eq!(
            resolve_submodule_url("/srv/git/meta", "./sub/a"),
            "/srv/git/meta/sub/a"
        );
        assert_eq!(
            resolve_submodule_url("/srv/git/meta", "../../other/a"),
            "/srv/other/a"
        );
    }
}
