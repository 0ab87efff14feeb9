//! Orchestrator for the complete conversion run
//!
//! Validates inputs, prepares the workspace, then drives
//! discover → resolve → synthesize-per-branch, appending to the migration
//! report at every step and writing it out on every exit path — success,
//! partial success, fatal error, and cancellation all leave a readable
//! `report.json` behind.
//!
//! Branch synthesis is sequential: the monorepo working tree has exactly
//! one writer. Cancellation is cooperative; the flag is polled between
//! driver calls, so an in-flight git subprocess always completes.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::git::GitDriver;
use crate::report::{MigrationReport, Record};
use crate::repository::{Repository, SubmoduleDef};
use crate::resolver::{self, Resolution};
use crate::strategy::MigrationStrategy;
use crate::workspace::{Workspace, INIT_BRANCH};

use super::discovery::{self, Discovery};
use super::synthesis::Synthesizer;

/// Everything a run needs to know, assembled by the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Path or URL of the meta-repository.
    pub metarepo: String,
    /// Workspace directory (sources, monorepo, report).
    pub workspace: PathBuf,
    /// Optional whitelist file (JSON array of branch names).
    pub whitelist_path: Option<PathBuf>,
    /// Optional migration strategy file (per-submodule participation).
    pub strategy_path: Option<PathBuf>,
    /// Report destination; defaults to `<workspace>/report.json`.
    pub report_path: Option<PathBuf>,
    /// Discovery worker pool size.
    pub workers: usize,
    /// Keep the source mirrors on disk when the run fails.
    pub keep_on_failure: bool,
    /// Always use linear synthesis, even for meta branches with merges.
    pub flatten_merges: bool,
}

/// How a completed run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every effective branch was synthesized.
    Success,
    /// Some branches failed; the workspace is retained for inspection.
    Partial { failed_branches: Vec<String> },
    /// The user interrupted the run; the workspace is left as-is.
    Cancelled,
}

/// Cooperative cancellation flag, shared with the signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run the complete pipeline.
pub fn run(options: &RunOptions, cancel: &CancelFlag) -> Result<RunStatus> {
    let driver = GitDriver::new();

    // Input validation happens before any workspace write.
    validate_metarepo_source(&driver, &options.metarepo)?;
    let whitelist = options
        .whitelist_path
        .as_deref()
        .map(resolver::load_whitelist)
        .transpose()?;
    let strategy = options
        .strategy_path
        .as_deref()
        .map(MigrationStrategy::load)
        .transpose()?;

    let workspace = Workspace::prepare(&options.workspace, &driver)?;
    let report_path = options
        .report_path
        .clone()
        .unwrap_or_else(|| workspace.report_path());

    let sources = workspace.source_guard();
    let mut report = MigrationReport::new();
    let result = run_pipeline(
        &driver,
        &workspace,
        options,
        whitelist,
        strategy,
        cancel,
        &mut report,
    );

    match &result {
        Ok(RunStatus::Cancelled) => sources.keep(),
        Ok(RunStatus::Partial { .. }) | Err(_) if options.keep_on_failure => sources.keep(),
        _ => {}
    }

    if let Err(e) = report.write(&report_path) {
        warn!("could not write report to {}: {e}", report_path.display());
    } else {
        info!("report written to {}", report_path.display());
    }

    result
}

fn validate_metarepo_source(driver: &GitDriver, source: &str) -> Result<()> {
    // URLs are validated by the clone itself; local paths fail fast.
    if source.contains("://") || (source.contains('@') && source.contains(':')) {
        return Ok(());
    }
    let path = Path::new(source);
    if !path.exists() {
        return Err(Error::BadPath {
            path: path.to_path_buf(),
            message: "meta-repository path does not exist".to_string(),
        });
    }
    if !driver.is_repository(path) {
        return Err(Error::NotARepo {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn run_pipeline(
    driver: &GitDriver,
    workspace: &Workspace,
    options: &RunOptions,
    whitelist: Option<BTreeSet<String>>,
    strategy: Option<MigrationStrategy>,
    cancel: &CancelFlag,
    report: &mut MigrationReport,
) -> Result<RunStatus> {
    let discovered = match discovery::execute(
        driver,
        workspace,
        &options.metarepo,
        options.workers,
        strategy.as_ref(),
    ) {
        Ok(discovered) => discovered,
        Err(e) => {
            report.append(Record::Failure {
                step: "discovery".to_string(),
                detail: e.to_string(),
            });
            return Err(e);
        }
    };
    let Discovery {
        repos,
        retained_submodules,
    } = discovered;
    for repo in &repos {
        report.append(Record::repo_discovered(repo));
    }

    if cancel.is_cancelled() {
        return Ok(RunStatus::Cancelled);
    }

    let resolution = resolver::resolve(&repos, whitelist.as_ref());
    if let Some(requested) = &whitelist {
        report.append(Record::WhitelistApplied {
            requested: requested.iter().cloned().collect(),
            effective: resolution.effective.clone(),
        });
    }
    for skipped in &resolution.skipped {
        report.append(Record::Skip {
            branch: skipped.branch.clone(),
            reason: skipped.reason.clone(),
        });
    }
    validate_resolution(&resolution, &repos)?;

    synthesize_all(
        driver,
        workspace,
        options,
        &repos,
        &retained_submodules,
        &resolution,
        cancel,
        report,
    )
}

/// A malformed plan here is a resolver bug, not an input problem.
fn validate_resolution(resolution: &Resolution, repos: &[Repository]) -> Result<()> {
    if repos.is_empty() || !repos[0].is_root() {
        return Err(Error::Invariant {
            message: "discovery did not place the meta-repo first".to_string(),
        });
    }
    for repo in repos {
        if !repo.branches.contains(&repo.default_branch) {
            return Err(Error::Invariant {
                message: format!(
                    "repo {} default branch {} is not in its branch set",
                    repo.name, repo.default_branch
                ),
            });
        }
    }
    for plan in &resolution.plans {
        if plan.entries.len() != repos.len() {
            return Err(Error::Invariant {
                message: format!(
                    "plan for {} covers {} repos, expected {}",
                    plan.branch,
                    plan.entries.len(),
                    repos.len()
                ),
            });
        }
        for (entry, repo) in plan.entries.iter().zip(repos) {
            if entry.repo != repo.name {
                return Err(Error::Invariant {
                    message: format!(
                        "plan for {} lists {} where {} was expected",
                        plan.branch, entry.repo, repo.name
                    ),
                });
            }
            if !repo.branches.contains(&entry.branch_used) {
                return Err(Error::Invariant {
                    message: format!(
                        "plan for {} uses unknown branch {} of {}",
                        plan.branch, entry.branch_used, entry.repo
                    ),
                });
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn synthesize_all(
    driver: &GitDriver,
    workspace: &Workspace,
    options: &RunOptions,
    repos: &[Repository],
    retained_submodules: &[SubmoduleDef],
    resolution: &Resolution,
    cancel: &CancelFlag,
    report: &mut MigrationReport,
) -> Result<RunStatus> {
    let synthesizer = Synthesizer::new(
        driver,
        workspace,
        repos,
        retained_submodules,
        options.flatten_merges,
    );
    let mut branch_tips: HashMap<String, String> = HashMap::new();
    let mut failed_branches = Vec::new();
    let mut first_synthesized: Option<String> = None;

    for plan in &resolution.plans {
        if cancel.is_cancelled() {
            info!("cancellation requested, stopping before branch {}", plan.branch);
            return Ok(RunStatus::Cancelled);
        }

        report.append(Record::BranchResolved {
            branch: plan.branch.clone(),
            plan: plan.clone(),
        });

        match synthesizer.synthesize(plan, &branch_tips) {
            Ok(outcome) => {
                for path in &outcome.overridden {
                    report.append(Record::PathOverride {
                        branch: plan.branch.clone(),
                        path: path.clone(),
                    });
                }
                report.append(Record::BranchSynthesized {
                    branch: plan.branch.clone(),
                    commit_sha: outcome.commit_sha.clone(),
                });
                branch_tips.insert(outcome.meta_tip, outcome.commit_sha);
                first_synthesized.get_or_insert(plan.branch.clone());
            }
            Err(e) if e.is_branch_scoped() => {
                synthesizer.park_failed(&plan.branch);
                report.append(Record::Failure {
                    step: format!("synthesize:{}", plan.branch),
                    detail: e.to_string(),
                });
                failed_branches.push(plan.branch.clone());
            }
            Err(e) => {
                report.append(Record::Failure {
                    step: format!("synthesize:{}", plan.branch),
                    detail: e.to_string(),
                });
                return Err(e);
            }
        }
    }

    finalize_monorepo(driver, workspace, resolution, first_synthesized.as_deref());

    if failed_branches.is_empty() {
        Ok(RunStatus::Success)
    } else {
        Ok(RunStatus::Partial { failed_branches })
    }
}

/// Leave the monorepo on its first synthesized branch (a default branch,
/// per the resolver's ordering) and drop the init branch so the branch set
/// contains exactly the synthesized branches.
fn finalize_monorepo(
    driver: &GitDriver,
    workspace: &Workspace,
    resolution: &Resolution,
    first_synthesized: Option<&str>,
) {
    let monorepo = workspace.monorepo_dir();
    match first_synthesized {
        Some(branch) => {
            if let Err(e) = driver.checkout(&monorepo, branch) {
                warn!("could not check out {branch}: {e}");
            }
        }
        None => {
            let _ = driver.checkout_detached(&monorepo, workspace.root_commit());
        }
    }
    if !resolution.effective.iter().any(|b| b == INIT_BRANCH) {
        let _ = driver.delete_branch(&monorepo, INIT_BRANCH);
    }
}
