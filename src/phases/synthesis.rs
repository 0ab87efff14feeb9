//! Phase 3: history synthesis — one branch plan becomes one monorepo branch
//!
//! Every synthesized branch is rooted at the same empty initial commit and
//! grows by grafting each participating repository's chosen branch under its
//! target subpath: first-layer submodules in declaration order, the
//! meta-repo last so its top-level files overlay the root. Conflicts at
//! shared root paths resolve in favor of the meta-repo; blobs that would
//! land inside a submodule mount are kept out and reported as overrides.
//!
//! Two modes exist per plan. Linear mode imports each repo as a single
//! subtree graft. Merge-preserving mode additionally replays the meta-repo's
//! merge topology for the branch: every merge commit in `default..branch` is
//! mirrored by an `ours` merge whose extra parents are translated to
//! already-synthesized monorepo heads where possible and left as the fetched
//! meta-repo commits otherwise, followed by a single terminal root graft of
//! the branch tip. Submodule merge structure is never reproduced.
//!
//! Submodules the migration strategy excluded are not grafted at all: on
//! every branch they are re-registered as submodule entries pinned at the
//! SHA the meta-repo recorded, the same treatment nested submodules get.
//!
//! A failure while building a branch parks the partial state on
//! `refs/monomaker/failed/<branch>`, restores a clean working tree, and
//! leaves the remaining branches unaffected.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::git::GitDriver;
use crate::repository::{Repository, SubmoduleDef};
use crate::resolver::{BranchPlan, PlanEntry};
use crate::workspace::Workspace;

/// Prefix of every commit message the synthesizer writes.
pub const COMMIT_PREFIX: &str = "[monomaker]";

/// How a branch's history was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    Linear,
    MergePreserving,
}

/// The result of synthesizing one branch.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    /// Head commit of the new monorepo branch.
    pub commit_sha: String,
    /// The meta-repo commit the branch content was imported from.
    pub meta_tip: String,
    /// Meta-repo blob paths shadowed by submodule mounts.
    pub overridden: Vec<String>,
    pub mode: SynthesisMode,
}

/// Synthesizes branch plans into the monorepo, one at a time.
pub struct Synthesizer<'a> {
    driver: &'a GitDriver,
    monorepo: PathBuf,
    repos: &'a [Repository],
    retained: &'a [SubmoduleDef],
    root_commit: String,
    flatten_merges: bool,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        driver: &'a GitDriver,
        workspace: &Workspace,
        repos: &'a [Repository],
        retained: &'a [SubmoduleDef],
        flatten_merges: bool,
    ) -> Self {
        Self {
            driver,
            monorepo: workspace.monorepo_dir(),
            repos,
            retained,
            root_commit: workspace.root_commit().to_string(),
            flatten_merges,
        }
    }

    fn meta(&self) -> &Repository {
        &self.repos[0]
    }

    fn entry<'p>(&self, plan: &'p BranchPlan, repo: &Repository) -> Result<&'p PlanEntry> {
        plan.entry_for(&repo.name).ok_or_else(|| Error::Invariant {
            message: format!("plan for {} has no entry for repo {}", plan.branch, repo.name),
        })
    }

    /// Materialize one plan as a monorepo branch and return its head.
    ///
    /// `branch_tips` maps meta-repo branch tips to the monorepo heads
    /// already synthesized from them; merge-preserving mode uses it to
    /// translate merge parents.
    pub fn synthesize(
        &self,
        plan: &BranchPlan,
        branch_tips: &HashMap<String, String>,
    ) -> Result<SynthesisOutcome> {
        let meta = self.meta();
        let meta_entry = self.entry(plan, meta)?;
        let mode = self.select_mode(meta_entry)?;
        info!(
            "synthesizing branch {} ({} mode)",
            plan.branch,
            match mode {
                SynthesisMode::Linear => "linear",
                SynthesisMode::MergePreserving => "merge-preserving",
            }
        );

        self.driver
            .create_branch(&self.monorepo, &plan.branch, &self.root_commit)?;

        // First-layer submodules, declaration order; the meta-repo comes last.
        for repo in self.repos.iter().filter(|r| !r.is_root()) {
            let entry = self.entry(plan, repo)?;
            let message = format!(
                "{COMMIT_PREFIX} graft `{}` branch `{}` under `{}`",
                repo.name, entry.branch_used, repo.target_subpath
            );
            self.driver.subtree_add(
                &self.monorepo,
                &repo.local_path,
                &entry.branch_used,
                &repo.target_subpath,
                &message,
            )?;
        }

        if mode == SynthesisMode::MergePreserving {
            self.replay_meta_merges(meta_entry, branch_tips)?;
        }

        let mut excluded: Vec<String> = self
            .repos
            .iter()
            .filter(|r| !r.is_root())
            .map(|r| r.target_subpath.clone())
            .collect();
        excluded.extend(self.retained.iter().map(|d| d.path.clone()));
        let message = format!(
            "{COMMIT_PREFIX} graft `{}` branch `{}` at repository root",
            meta.name, meta_entry.branch_used
        );
        let graft = self.driver.graft_root(
            &self.monorepo,
            &meta.local_path,
            &meta_entry.branch_used,
            &excluded,
            &message,
        )?;

        let mut occupied: HashSet<String> = HashSet::new();
        self.register_nested_submodules(plan, &mut occupied)?;
        self.register_retained_submodules(&mut occupied)?;

        Ok(SynthesisOutcome {
            commit_sha: self.driver.current_sha(&self.monorepo)?,
            meta_tip: graft.imported_sha,
            overridden: graft.overridden,
            mode,
        })
    }

    /// Linear unless the meta-repo branch diverges from its default with
    /// merge commits in between and flattening was not requested.
    fn select_mode(&self, meta_entry: &PlanEntry) -> Result<SynthesisMode> {
        let meta = self.meta();
        if self.flatten_merges || meta_entry.branch_used == meta.default_branch {
            return Ok(SynthesisMode::Linear);
        }
        let merges = self.driver.merge_commits_in_range(
            &meta.local_path,
            &meta.default_branch,
            &meta_entry.branch_used,
        )?;
        if merges.is_empty() {
            Ok(SynthesisMode::Linear)
        } else {
            Ok(SynthesisMode::MergePreserving)
        }
    }

    /// Mirror the meta-repo's merge DAG for this branch with `ours` merges,
    /// oldest first. Content arrives only with the terminal root graft.
    fn replay_meta_merges(
        &self,
        meta_entry: &PlanEntry,
        branch_tips: &HashMap<String, String>,
    ) -> Result<()> {
        let meta = self.meta();
        // Fetching the branch tip brings every ancestor into the monorepo's
        // object store, so raw parent SHAs are mergeable afterwards.
        self.driver
            .fetch_ref(&self.monorepo, &meta.local_path, &meta_entry.branch_used)?;

        let merges = self.driver.merge_commits_in_range(
            &meta.local_path,
            &meta.default_branch,
            &meta_entry.branch_used,
        )?;
        for merge in &merges {
            let others: Vec<String> = merge.parents[1..]
                .iter()
                .map(|parent| {
                    branch_tips
                        .get(parent)
                        .cloned()
                        .unwrap_or_else(|| parent.clone())
                })
                .collect();
            let short = &merge.sha[..merge.sha.len().min(12)];
            debug!("replaying meta merge {short} with {} parent(s)", others.len());
            self.driver.merge_ours(
                &self.monorepo,
                &others,
                &format!("{COMMIT_PREFIX} replay meta-repo merge {short}"),
            )?;
        }
        Ok(())
    }

    /// Pin every recorded nested submodule at
    /// `owner.target_subpath / nested.path`, replacing the owners' imported
    /// `.gitmodules` files with entries in the monorepo root `.gitmodules`.
    fn register_nested_submodules(
        &self,
        plan: &BranchPlan,
        occupied: &mut HashSet<String>,
    ) -> Result<()> {
        for repo in self.repos.iter().filter(|r| !r.nested_submodules.is_empty()) {
            let owner = &repo.target_subpath;
            self.driver
                .remove_path(&self.monorepo, &format!("{owner}/.gitmodules"))?;

            let mut mounts: Vec<(String, &str)> = Vec::new();
            for nested in &repo.nested_submodules {
                let mount = format!("{owner}/{}", nested.path);
                if !occupied.insert(mount.clone()) {
                    return Err(Error::PathCollision {
                        path: mount,
                        message: "two nested submodules resolve to the same monorepo path"
                            .to_string(),
                    });
                }
                self.driver
                    .add_gitlink(&self.monorepo, &mount, &nested.url, &nested.sha)?;
                mounts.push((mount, &nested.sha));
            }

            self.driver.commit(
                &self.monorepo,
                &format!(
                    "{COMMIT_PREFIX} register nested submodules of `{}` on `{}`",
                    repo.name, plan.branch
                ),
            )?;
            for (mount, sha) in mounts {
                self.driver.verify_gitlink(&self.monorepo, &mount, sha)?;
            }
        }
        Ok(())
    }

    /// Re-register the submodules the migration strategy kept out of the
    /// import, pinned at the SHA the meta-repo recorded.
    fn register_retained_submodules(&self, occupied: &mut HashSet<String>) -> Result<()> {
        if self.retained.is_empty() {
            return Ok(());
        }
        for def in self.retained {
            if !occupied.insert(def.path.clone()) {
                return Err(Error::PathCollision {
                    path: def.path.clone(),
                    message: "a retained submodule and another mount share this path".to_string(),
                });
            }
            self.driver
                .add_gitlink(&self.monorepo, &def.path, &def.url, &def.sha)?;
        }
        let listed = self
            .retained
            .iter()
            .map(|d| d.path.as_str())
            .collect::<Vec<_>>()
            .join("`, `");
        self.driver.commit(
            &self.monorepo,
            &format!("{COMMIT_PREFIX} keep `{listed}` pinned as submodules"),
        )?;
        for def in self.retained {
            self.driver.verify_gitlink(&self.monorepo, &def.path, &def.sha)?;
        }
        Ok(())
    }

    /// Park a failed branch: keep whatever was built on a scratch ref,
    /// restore a clean working tree, and remove the branch itself so the
    /// monorepo's branch set only ever contains fully synthesized branches.
    pub fn park_failed(&self, branch: &str) {
        self.driver.restore_clean_state(&self.monorepo);
        if let Ok(sha) = self.driver.current_sha(&self.monorepo) {
            if sha != self.root_commit {
                let scratch = format!("refs/monomaker/failed/{branch}");
                if self.driver.update_ref(&self.monorepo, &scratch, &sha).is_ok() {
                    info!("parked failed branch {branch} on {scratch}");
                }
            }
        }
        let _ = self.driver.checkout_detached(&self.monorepo, &self.root_commit);
        let _ = self.driver.delete_branch(&self.monorepo, branch);
    }
}
