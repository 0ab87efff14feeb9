//! Shared test utilities for the end-to-end tests.
//!
//! The e2e tests operate on real git repositories: each test builds a small
//! world of source repos (a meta-repo plus submodules) inside a temp
//! directory, runs the `monomaker` binary against it, and inspects the
//! produced monorepo and report with plain git commands.

// Each test binary compiles its own copy of this module and uses a subset
// of the helpers.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_fs::TempDir;

/// Run git in `dir`, panicking on failure. Returns trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "fixture")
        .env("GIT_AUTHOR_EMAIL", "fixture@localhost")
        .env("GIT_COMMITTER_NAME", "fixture")
        .env("GIT_COMMITTER_EMAIL", "fixture@localhost")
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}:\n{}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

/// Run git in `dir`, returning whether it succeeded.
pub fn git_ok(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub fn write_file(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(path, content).expect("write file");
}

pub fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-m", message]);
}

/// A temp directory holding the source repositories for one test.
pub struct World {
    root: TempDir,
}

impl World {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn repo_path(&self, name: &str) -> PathBuf {
        self.root.path().join("repos").join(name)
    }

    /// Directory for a monomaker workspace, not created yet.
    pub fn workspace(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Create a source repository with the given default branch and one
    /// initial commit containing `<name>.txt`.
    pub fn init_repo(&self, name: &str, default_branch: &str) -> PathBuf {
        let path = self.repo_path(name);
        std::fs::create_dir_all(&path).expect("create repo dir");
        git(&path, &["init", "--initial-branch", default_branch]);
        write_file(&path, &format!("{name}.txt"), &format!("{name} initial\n"));
        commit_all(&path, &format!("initial {name}"));
        path
    }

    /// Create a feature branch off the current branch, apply `files`, commit,
    /// and return to the branch that was checked out before.
    pub fn add_branch(&self, repo: &Path, branch: &str, files: &[(&str, &str)]) {
        let previous = git(repo, &["rev-parse", "--abbrev-ref", "HEAD"]);
        git(repo, &["checkout", "-b", branch]);
        for (rel, content) in files {
            write_file(repo, rel, content);
        }
        commit_all(repo, &format!("work on {branch}"));
        git(repo, &["checkout", &previous]);
    }

    /// Register `submodule_repo` as a submodule of `owner` at `mount`.
    pub fn add_submodule(&self, owner: &Path, submodule_repo: &Path, mount: &str) {
        let url = submodule_repo.to_string_lossy().to_string();
        git(
            owner,
            &[
                "-c",
                "protocol.file.allow=always",
                "submodule",
                "add",
                &url,
                mount,
            ],
        );
        commit_all(owner, &format!("track submodule at {mount}"));
    }
}

/// The standard meta-repo world: `meta` (default `main`) tracking submodule
/// `a` (default `main`) at `a/` and submodule `b` (default `dev`) at `b/`.
/// Returns the world and the meta-repo path.
pub fn standard_world() -> (World, PathBuf) {
    let world = World::new();
    let a = world.init_repo("a", "main");
    let b = world.init_repo("b", "dev");
    let meta = world.init_repo("meta", "main");
    write_file(&meta, "README.md", "meta readme\n");
    commit_all(&meta, "add readme");
    world.add_submodule(&meta, &a, "a");
    world.add_submodule(&meta, &b, "b");
    (world, meta)
}

/// Run the monomaker binary against `metarepo` with the given workspace and
/// extra arguments; returns the assert handle.
pub fn run_monomaker(metarepo: &Path, workspace: &Path, extra: &[&str]) -> assert_cmd::assert::Assert {
    assert_cmd::Command::cargo_bin("monomaker")
        .expect("monomaker binary")
        .arg(metarepo)
        .arg("--workspace")
        .arg(workspace)
        .args(extra)
        .assert()
}

/// Local branch names of a repository.
pub fn branches(repo: &Path) -> Vec<String> {
    git(repo, &["for-each-ref", "--format=%(refname:short)", "refs/heads"])
        .lines()
        .map(String::from)
        .collect()
}

/// All `(path, kind, sha)` entries of a tree, recursively, excluding
/// `.gitmodules` files (the conversion rewrites submodule registrations).
pub fn tree_entries(repo: &Path, reference: &str) -> BTreeMap<String, (String, String)> {
    let out = git(repo, &["ls-tree", "-r", "-z", reference]);
    let mut entries = BTreeMap::new();
    for record in out.split('\0').filter(|r| !r.is_empty()) {
        let (meta, path) = record.split_once('\t').expect("ls-tree record");
        let fields: Vec<&str> = meta.split_whitespace().collect();
        let (kind, sha) = (fields[1].to_string(), fields[2].to_string());
        if path == ".gitmodules" || path.ends_with("/.gitmodules") {
            continue;
        }
        entries.insert(path.to_string(), (kind, sha));
    }
    entries
}

/// Tree entries under `prefix/` with the prefix stripped.
pub fn subtree_entries(
    repo: &Path,
    reference: &str,
    prefix: &str,
) -> BTreeMap<String, (String, String)> {
    tree_entries(repo, reference)
        .into_iter()
        .filter_map(|(path, value)| {
            path.strip_prefix(&format!("{prefix}/"))
                .map(|stripped| (stripped.to_string(), value))
        })
        .collect()
}

/// Content of one blob at `reference:path`.
pub fn file_at(repo: &Path, reference: &str, path: &str) -> String {
    git(repo, &["show", &format!("{reference}:{path}")])
}

/// Whether `reference:path` exists at all.
pub fn path_exists(repo: &Path, reference: &str, path: &str) -> bool {
    git_ok(repo, &["cat-file", "-e", &format!("{reference}:{path}")])
}

/// The gitlink SHA recorded at `reference:path`, if any.
pub fn gitlink_at(repo: &Path, reference: &str, path: &str) -> Option<String> {
    let out = git(repo, &["ls-tree", "-z", reference, "--", path]);
    out.split('\0')
        .filter(|r| !r.is_empty())
        .filter_map(|record| {
            let (meta, _) = record.split_once('\t')?;
            let fields: Vec<&str> = meta.split_whitespace().collect();
            (fields[1] == "commit").then(|| fields[2].to_string())
        })
        .next()
}

/// Parse the migration report of a workspace.
pub fn read_report(workspace: &Path) -> serde_json::Value {
    let content =
        std::fs::read_to_string(workspace.join("report.json")).expect("report.json exists");
    serde_json::from_str(&content).expect("report parses")
}

/// All records of the given type within a report array.
pub fn records_of<'a>(array: &'a serde_json::Value, record_type: &str) -> Vec<&'a serde_json::Value> {
    array
        .as_array()
        .expect("report field is an array")
        .iter()
        .filter(|r| r["type"] == record_type)
        .collect()
}
