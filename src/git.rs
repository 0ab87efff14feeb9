//! VCS driver: the only component that invokes the git executable
//!
//! Every operation shells out to `git`, parses format-stable (porcelain
//! style) output only, and surfaces failures as typed errors. The driver
//! never retries; policy lives in the callers.
//!
//! Commit identity is pinned so that synthesized history does not depend on
//! the operator's git configuration, and when `SOURCE_DATE_EPOCH` is set the
//! author/committer dates are pinned too, making monorepo commit SHAs
//! reproducible across runs.
//!
//! Source repositories are handled as *mirror* clones: every remote branch
//! is a local head by construction and no working tree exists. The
//! synthesizer reads them exclusively by fetching refs out of them into the
//! monorepo.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::repository::SubmoduleDef;

/// One merge commit of a source repository, oldest-first in range listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCommit {
    pub sha: String,
    pub parents: Vec<String>,
}

/// One entry of a recursive `ls-tree` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: String,
    pub kind: String,
    pub sha: String,
    pub path: String,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }

    pub fn is_gitlink(&self) -> bool {
        self.kind == "commit"
    }
}

/// Result of grafting the meta-repo onto the monorepo root.
#[derive(Debug, Clone)]
pub struct RootGraft {
    /// The merge commit created on the current monorepo branch.
    pub commit_sha: String,
    /// The source commit that was imported.
    pub imported_sha: String,
    /// Blob paths of the imported tree that collided with an excluded
    /// subpath and were kept out in favor of the mounted content.
    pub overridden: Vec<String>,
}

/// Adapter over the external git executable.
#[derive(Debug, Clone)]
pub struct GitDriver {
    program: String,
}

impl Default for GitDriver {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(&self, repo: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(repo) = repo {
            cmd.arg("-C").arg(repo);
        }
        cmd.env("GIT_AUTHOR_NAME", "monomaker")
            .env("GIT_AUTHOR_EMAIL", "monomaker@localhost")
            .env("GIT_COMMITTER_NAME", "monomaker")
            .env("GIT_COMMITTER_EMAIL", "monomaker@localhost")
            .env("GIT_TERMINAL_PROMPT", "0");
        if let Ok(epoch) = std::env::var("SOURCE_DATE_EPOCH") {
            let date = format!("@{} +0000", epoch.trim());
            cmd.env("GIT_AUTHOR_DATE", date.clone())
                .env("GIT_COMMITTER_DATE", date);
        }
        cmd
    }

    /// Run git and return trimmed stdout, classifying failure.
    fn run(&self, repo: Option<&Path>, args: &[&str]) -> Result<String> {
        let output = self
            .command(repo)
            .args(args)
            .output()
            .map_err(Error::Io)?;
        self.finish(repo, args, output)
    }

    /// Run git feeding NUL-separated input on stdin.
    fn run_with_stdin(&self, repo: Option<&Path>, args: &[&str], input: &[u8]) -> Result<String> {
        let mut child = self
            .command(repo)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(Error::Io)?;
        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(input)
            .map_err(Error::Io)?;
        let output = child.wait_with_output().map_err(Error::Io)?;
        self.finish(repo, args, output)
    }

    /// Run git where failure is tolerated; returns success flag and stdout.
    fn run_allow_failure(&self, repo: Option<&Path>, args: &[&str]) -> (bool, String) {
        match self.command(repo).args(args).output() {
            Ok(output) => {
                let ok = output.status.success();
                if !ok {
                    debug!(
                        "git {} failed (tolerated): {}",
                        args.join(" "),
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                }
                (ok, String::from_utf8_lossy(&output.stdout).to_string())
            }
            Err(e) => {
                debug!("git {} could not be spawned: {}", args.join(" "), e);
                (false, String::new())
            }
        }
    }

    fn finish(&self, repo: Option<&Path>, args: &[&str], output: Output) -> Result<String> {
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let repo_path = repo.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

        if stderr.contains("not a git repository") {
            return Err(Error::NotARepo { path: repo_path });
        }
        if stdout.contains("CONFLICT") || stderr.contains("Automatic merge failed") {
            return Err(Error::MergeConflict {
                repo: repo_path.display().to_string(),
                detail: stderr,
            });
        }
        Err(Error::ExecError {
            command: format!("git {}", args.join(" ")),
            exit_code: output.status.code().unwrap_or(-1),
            stderr,
        })
    }

    // ---- repository inspection -------------------------------------------

    /// Whether `path` is (inside) a git repository.
    pub fn is_repository(&self, path: &Path) -> bool {
        self.run_allow_failure(Some(path), &["rev-parse", "--git-dir"]).0
    }

    /// Mirror-clone `url` into `dest`; every remote branch becomes a local
    /// head, so no separate all-branches fetch is needed after cloning.
    pub fn clone_mirror(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        self.run(None, &["clone", "--mirror", url, &dest_str])
            .map_err(|e| Error::CloneFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Refresh every branch head of a mirror from its origin.
    pub fn fetch_all_branches(&self, repo: &Path) -> Result<()> {
        self.run(Some(repo), &["fetch", "--prune", "origin"])?;
        Ok(())
    }

    /// Every local branch head, sorted.
    pub fn list_branches(&self, repo: &Path) -> Result<std::collections::BTreeSet<String>> {
        let out = self.run(
            Some(repo),
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        )?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// The branch HEAD points at, or `None` when detached or unborn.
    ///
    /// On a mirror clone HEAD mirrors the remote's HEAD, which designates
    /// the default branch.
    pub fn default_branch(&self, repo: &Path) -> Option<String> {
        let (ok, out) = self.run_allow_failure(Some(repo), &["symbolic-ref", "--short", "HEAD"]);
        if !ok {
            return None;
        }
        let name = out.trim().to_string();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// Submodules recorded by `reference`: `.gitmodules` entries joined with
    /// the gitlink pins of the tree. Entries without a pin are skipped with
    /// a warning, matching the tolerance for half-removed submodules.
    pub fn list_submodules(&self, repo: &Path, reference: &str) -> Result<Vec<SubmoduleDef>> {
        let blob = format!("{reference}:.gitmodules");
        let (exists, _) = self.run_allow_failure(Some(repo), &["cat-file", "-e", &blob]);
        if !exists {
            return Ok(vec![]);
        }

        let config = self.run(Some(repo), &["config", "--blob", &blob, "--list"])?;
        let tree = self.run(Some(repo), &["ls-tree", "-r", "-z", reference])?;
        let entries = parse_ls_tree(&tree)?;

        let mut submodules = Vec::new();
        for (name, path, url) in parse_gitmodules_config(&config) {
            let (Some(path), Some(url)) = (path, url) else {
                warn!("submodule entry `{name}` in {reference}:.gitmodules is incomplete, skipping");
                continue;
            };
            match entries
                .iter()
                .find(|e| e.is_gitlink() && e.path == path)
                .map(|e| e.sha.clone())
            {
                Some(sha) => submodules.push(SubmoduleDef { path, url, sha }),
                None => {
                    warn!("no gitlink pin for submodule at `{path}` in {reference}, skipping");
                }
            }
        }
        Ok(submodules)
    }

    pub fn current_sha(&self, repo: &Path) -> Result<String> {
        self.run(Some(repo), &["rev-parse", "HEAD"])
    }

    /// Merge commits reachable from `tip` but not from `base`, oldest first,
    /// each with its full parent list.
    pub fn merge_commits_in_range(
        &self,
        repo: &Path,
        base: &str,
        tip: &str,
    ) -> Result<Vec<MergeCommit>> {
        let range = format!("{base}..{tip}");
        let out = self.run(
            Some(repo),
            &[
                "rev-list",
                "--merges",
                "--topo-order",
                "--reverse",
                "--parents",
                &range,
            ],
        )?;
        Ok(parse_rev_list_parents(&out))
    }

    // ---- monorepo mutation -----------------------------------------------

    /// Initialize an empty repository with the given initial branch.
    pub fn init(&self, path: &Path, initial_branch: &str) -> Result<()> {
        let path_str = path.to_string_lossy();
        self.run(
            None,
            &["init", "--initial-branch", initial_branch, &path_str],
        )?;
        Ok(())
    }

    pub fn checkout(&self, repo: &Path, reference: &str) -> Result<()> {
        self.run(Some(repo), &["checkout", "--quiet", reference])?;
        Ok(())
    }

    pub fn checkout_detached(&self, repo: &Path, reference: &str) -> Result<()> {
        self.run(Some(repo), &["checkout", "--quiet", "--detach", reference])?;
        Ok(())
    }

    /// Create (or reset) a branch at `start_point` and switch to it.
    pub fn create_branch(&self, repo: &Path, name: &str, start_point: &str) -> Result<()> {
        self.run(Some(repo), &["checkout", "--quiet", "-B", name, start_point])?;
        Ok(())
    }

    pub fn delete_branch(&self, repo: &Path, name: &str) -> Result<()> {
        self.run(Some(repo), &["branch", "-D", name])?;
        Ok(())
    }

    pub fn update_ref(&self, repo: &Path, refname: &str, sha: &str) -> Result<()> {
        self.run(Some(repo), &["update-ref", refname, sha])?;
        Ok(())
    }

    /// Fetch one ref from a local source clone and resolve the commit it
    /// landed on. The SHA is captured immediately because `FETCH_HEAD` is
    /// overwritten by the next fetch.
    pub fn fetch_ref(&self, repo: &Path, source: &Path, reference: &str) -> Result<String> {
        let source_str = source.to_string_lossy();
        self.run(Some(repo), &["fetch", "--quiet", &source_str, reference])
            .map_err(|e| match e {
                Error::ExecError { stderr, .. } if stderr.contains("couldn't find remote ref") => {
                    Error::RefNotFound {
                        repo: source.display().to_string(),
                        reference: reference.to_string(),
                    }
                }
                other => other,
            })?;
        self.run(Some(repo), &["rev-parse", "FETCH_HEAD"])
    }

    /// Import the full history of `reference` from `source`, rooted under
    /// `target_subpath`, as one merge commit on the current branch.
    ///
    /// The recipe is the classic subtree merge: an `ours` merge carrying the
    /// imported history as a second parent, then `read-tree --prefix` to
    /// place the imported tree, then the commit. `target_subpath` must not
    /// be the root; root grafting is [`GitDriver::graft_root`].
    pub fn subtree_add(
        &self,
        repo: &Path,
        source: &Path,
        reference: &str,
        target_subpath: &str,
        message: &str,
    ) -> Result<String> {
        if target_subpath == "." {
            return Err(Error::Invariant {
                message: "subtree_add cannot target the repository root".to_string(),
            });
        }
        let sha = self.fetch_ref(repo, source, reference)?;
        self.run(
            Some(repo),
            &[
                "merge",
                "-s",
                "ours",
                "--no-commit",
                "--allow-unrelated-histories",
                &sha,
            ],
        )?;
        let prefix = format!("--prefix={}/", target_subpath.trim_end_matches('/'));
        self.run(Some(repo), &["read-tree", &prefix, "-u", &sha])
            .map_err(|e| match e {
                Error::ExecError { stderr, .. } => Error::MergeConflict {
                    repo: repo.display().to_string(),
                    detail: format!("read-tree into {target_subpath} failed: {stderr}"),
                },
                other => other,
            })?;
        self.commit(repo, message)?;
        self.current_sha(repo)
    }

    /// Overlay `reference` from `source` onto the monorepo root: one merge
    /// commit whose second parent is the imported history, whose tree keeps
    /// the content already mounted at each `excluded` subpath and takes
    /// every other blob from the imported tree. `.gitmodules` is never taken
    /// over; the caller re-registers submodules explicitly.
    pub fn graft_root(
        &self,
        repo: &Path,
        source: &Path,
        reference: &str,
        excluded: &[String],
        message: &str,
    ) -> Result<RootGraft> {
        let sha = self.fetch_ref(repo, source, reference)?;
        self.run(
            Some(repo),
            &[
                "merge",
                "-s",
                "ours",
                "--no-commit",
                "--allow-unrelated-histories",
                &sha,
            ],
        )?;

        let tree = self.run(Some(repo), &["ls-tree", "-r", "-z", &sha])?;
        let entries = parse_ls_tree(&tree)?;
        let partition = partition_root_entries(&entries, excluded);

        if !partition.keep.is_empty() {
            let mut pathspecs = Vec::new();
            for path in &partition.keep {
                pathspecs.extend_from_slice(format!(":(literal){path}").as_bytes());
                pathspecs.push(0);
            }
            self.run_with_stdin(
                Some(repo),
                &[
                    "checkout",
                    &sha,
                    "--pathspec-from-file=-",
                    "--pathspec-file-nul",
                ],
                &pathspecs,
            )?;
        }

        self.commit(repo, message)?;
        Ok(RootGraft {
            commit_sha: self.current_sha(repo)?,
            imported_sha: sha,
            overridden: partition.overridden,
        })
    }

    /// Merge commit whose tree equals HEAD's and whose parents are
    /// (HEAD, `others`…). Records topology without changing content.
    pub fn merge_ours(&self, repo: &Path, others: &[String], message: &str) -> Result<String> {
        let mut args = vec![
            "merge",
            "-s",
            "ours",
            "--no-ff",
            "--allow-unrelated-histories",
            "-m",
            message,
        ];
        args.extend(others.iter().map(String::as_str));
        self.run(Some(repo), &args)?;
        self.current_sha(repo)
    }

    pub fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        self.run(Some(repo), &["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    pub fn commit_empty(&self, repo: &Path, message: &str) -> Result<()> {
        self.run(Some(repo), &["commit", "--quiet", "--allow-empty", "-m", message])?;
        Ok(())
    }

    pub fn tag(&self, repo: &Path, name: &str) -> Result<()> {
        self.run(Some(repo), &["tag", name])?;
        Ok(())
    }

    /// Remove a path from index and working tree; absent paths are fine.
    pub fn remove_path(&self, repo: &Path, path: &str) -> Result<()> {
        self.run(
            Some(repo),
            &["rm", "-r", "-f", "--quiet", "--ignore-unmatch", "--", path],
        )?;
        Ok(())
    }

    /// Register a submodule pin without touching the network: a
    /// `.gitmodules` entry plus a gitlink staged via `update-index`. The
    /// mount directory is created empty, the working-tree shape of an
    /// uninitialized submodule.
    pub fn add_gitlink(&self, repo: &Path, path: &str, url: &str, sha: &str) -> Result<()> {
        std::fs::create_dir_all(repo.join(path))?;
        let path_key = format!("submodule.{path}.path");
        let url_key = format!("submodule.{path}.url");
        self.run(Some(repo), &["config", "-f", ".gitmodules", &path_key, path])?;
        self.run(Some(repo), &["config", "-f", ".gitmodules", &url_key, url])?;
        self.run(Some(repo), &["add", ".gitmodules"])?;
        let cacheinfo = format!("160000,{sha},{path}");
        self.run(Some(repo), &["update-index", "--add", "--cacheinfo", &cacheinfo])?;
        Ok(())
    }

    /// Re-read a committed gitlink and fail when the pin does not match.
    pub fn verify_gitlink(&self, repo: &Path, path: &str, expected_sha: &str) -> Result<()> {
        let out = self.run(Some(repo), &["ls-tree", "-z", "HEAD", "--", path])?;
        let entries = parse_ls_tree(&out)?;
        let actual = entries
            .iter()
            .find(|e| e.is_gitlink())
            .map(|e| e.sha.clone())
            .unwrap_or_default();
        if actual != expected_sha {
            return Err(Error::GitlinkMismatch {
                path: path.to_string(),
                expected: expected_sha.to_string(),
                actual,
            });
        }
        Ok(())
    }

    // ---- branch-failure recovery -----------------------------------------

    /// Best-effort restoration of a clean working tree after a failed
    /// synthesis step. Failures are tolerated: the branch is being parked,
    /// not repaired.
    pub fn restore_clean_state(&self, repo: &Path) {
        self.run_allow_failure(Some(repo), &["merge", "--abort"]);
        self.run_allow_failure(Some(repo), &["reset", "--hard", "--quiet"]);
        self.run_allow_failure(Some(repo), &["clean", "-fd", "--quiet"]);
    }
}

// ---- pure output parsers -------------------------------------------------

/// Parse `git config --blob <ref>:.gitmodules --list` output into
/// `(name, path, url)` triples, preserving first-appearance order.
fn parse_gitmodules_config(output: &str) -> Vec<(String, Option<String>, Option<String>)> {
    let mut order: Vec<String> = Vec::new();
    let mut entries: std::collections::HashMap<String, (Option<String>, Option<String>)> =
        std::collections::HashMap::new();

    for line in output.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let Some(rest) = key.strip_prefix("submodule.") else {
            continue;
        };
        // Section names may themselves contain dots; the field name is the
        // last component.
        let Some((name, field)) = rest.rsplit_once('.') else {
            continue;
        };
        if !entries.contains_key(name) {
            order.push(name.to_string());
            entries.insert(name.to_string(), (None, None));
        }
        let entry = entries.get_mut(name).expect("entry just inserted");
        match field {
            "path" => entry.0 = Some(value.to_string()),
            "url" => entry.1 = Some(value.to_string()),
            _ => {}
        }
    }

    order
        .into_iter()
        .map(|name| {
            let (path, url) = entries.remove(&name).expect("entry recorded in order");
            (name, path, url)
        })
        .collect()
}

/// Parse NUL-separated `ls-tree -z` output: `<mode> <type> <sha>\t<path>`.
fn parse_ls_tree(output: &str) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    for record in output.split('\0') {
        if record.is_empty() {
            continue;
        }
        let (meta, path) = record.split_once('\t').ok_or_else(|| Error::Invariant {
            message: format!("unparseable ls-tree record: {record:?}"),
        })?;
        let mut fields = meta.split_whitespace();
        let (Some(mode), Some(kind), Some(sha)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::Invariant {
                message: format!("unparseable ls-tree record: {record:?}"),
            });
        };
        entries.push(TreeEntry {
            mode: mode.to_string(),
            kind: kind.to_string(),
            sha: sha.to_string(),
            path: path.to_string(),
        });
    }
    Ok(entries)
}

/// Parse `rev-list --parents` output: one `<sha> <parent>...` line per commit.
fn parse_rev_list_parents(output: &str) -> Vec<MergeCommit> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace().map(String::from);
            let sha = fields.next()?;
            let parents: Vec<String> = fields.collect();
            Some(MergeCommit { sha, parents })
        })
        .filter(|c| !c.parents.is_empty())
        .collect()
}

/// Split of an imported root tree into blobs to take over and blobs kept
/// out because mounted submodule content takes precedence there.
#[derive(Debug, Default, PartialEq, Eq)]
struct RootPartition {
    keep: Vec<String>,
    overridden: Vec<String>,
}

fn path_is_at_or_under(path: &str, prefix: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// Decide, per blob of the imported meta tree, whether it lands in the
/// monorepo root or is shadowed by a submodule mount. Gitlink entries (the
/// stale first-layer pins) and `.gitmodules` are never taken over.
fn partition_root_entries(entries: &[TreeEntry], excluded: &[String]) -> RootPartition {
    let mut partition = RootPartition::default();
    for entry in entries {
        if !entry.is_blob() || entry.path == ".gitmodules" {
            continue;
        }
        if excluded
            .iter()
            .any(|subpath| path_is_at_or_under(&entry.path, subpath))
        {
            partition.overridden.push(entry.path.clone());
        } else {
            partition.keep.push(entry.path.clone());
        }
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(path: &str) -> TreeEntry {
        TreeEntry {
            mode: "100644".to_string(),
            kind: "blob".to_string(),
            sha: "a".repeat(40),
            path: path.to_string(),
        }
    }

    fn gitlink(path: &str, sha: &str) -> TreeEntry {
        TreeEntry {
            mode: "160000".to_string(),
            kind: "commit".to_string(),
            sha: sha.to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn test_parse_gitmodules_config() {
        let output = "\
submodule.a.path=a
submodule.a.url=https://example.com/a.git
submodule.libs/b.path=libs/b
submodule.libs/b.url=../b.git
submodule.libs/b.branch=dev
core.bare=true
";
        let parsed = parse_gitmodules_config(output);
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed[0],
            (
                "a".to_string(),
                Some("a".to_string()),
                Some("https://example.com/a.git".to_string())
            )
        );
        assert_eq!(
            parsed[1],
            (
                "libs/b".to_string(),
                Some("libs/b".to_string()),
                Some("../b.git".to_string())
            )
        );
    }

    #[test]
    fn test_parse_gitmodules_config_incomplete_entry() {
        let output = "submodule.ghost.url=https://example.com/ghost.git\n";
        let parsed = parse_gitmodules_config(output);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].1, None);
    }

    #[test]
    fn test_parse_ls_tree() {
        let sha = "d".repeat(40);
        let output = format!(
            "100644 blob {sha}\tREADME.md\0160000 commit {sha}\tvendor/lib\0040000 tree {sha}\tsrc\0"
        );
        let entries = parse_ls_tree(&output).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_blob());
        assert_eq!(entries[0].path, "README.md");
        assert!(entries[1].is_gitlink());
        assert_eq!(entries[1].path, "vendor/lib");
        assert!(!entries[2].is_blob());
    }

    #[test]
    fn test_parse_ls_tree_rejects_garbage() {
        assert!(parse_ls_tree("no tab here\0").is_err());
    }

    #[test]
    fn test_parse_ls_tree_path_with_spaces() {
        let sha = "e".repeat(40);
        let output = format!("100644 blob {sha}\tdocs/read me.txt\0");
        let entries = parse_ls_tree(&output).unwrap();
        assert_eq!(entries[0].path, "docs/read me.txt");
    }

    #[test]
    fn test_parse_rev_list_parents() {
        let output = "\
c3 c2 b1
c2 c1
";
        let commits = parse_rev_list_parents(output);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha, "c3");
        assert_eq!(commits[0].parents, vec!["c2", "b1"]);
    }

    #[test]
    fn test_partition_root_entries_keeps_root_files() {
        let entries = vec![
            blob("README.md"),
            blob("docs/guide.md"),
            gitlink("a", &"1".repeat(40)),
        ];
        let excluded = vec!["a".to_string()];
        let partition = partition_root_entries(&entries, &excluded);
        assert_eq!(partition.keep, vec!["README.md", "docs/guide.md"]);
        assert!(partition.overridden.is_empty());
    }

    #[test]
    fn test_partition_root_entries_overrides_blobs_at_mounts() {
        let entries = vec![blob("a"), blob("libs/b/leftover.txt"), blob("main.rs")];
        let excluded = vec!["a".to_string(), "libs/b".to_string()];
        let partition = partition_root_entries(&entries, &excluded);
        assert_eq!(partition.keep, vec!["main.rs"]);
        assert_eq!(partition.overridden, vec!["a", "libs/b/leftover.txt"]);
    }

    #[test]
    fn test_partition_root_entries_never_takes_gitmodules() {
        let entries = vec![blob(".gitmodules"), blob("README.md")];
        let partition = partition_root_entries(&entries, &[]);
        assert_eq!(partition.keep, vec!["README.md"]);
        assert!(partition.overridden.is_empty());
    }

    #[test]
    fn test_path_prefix_matching_is_component_wise() {
        assert!(path_is_at_or_under("a/file.txt", "a"));
        assert!(path_is_at_or_under("a", "a"));
        assert!(!path_is_at_or_under("ab/file.txt", "a"));
    }
}
