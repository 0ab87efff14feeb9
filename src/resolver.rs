//! Branch resolution: which branch of which repo feeds each monorepo branch
//!
//! The resolver is a pure function of the discovered repository models and
//! the optional whitelist. For every branch in the effective set it produces
//! a [`BranchPlan`] naming, per participating repo, the branch to import:
//! the branch itself when the repo has it, the repo's default branch (with
//! `fell_back` marked) when it does not.
//!
//! Guarantees:
//! - the whitelist never excludes any repo's default branch;
//! - a whitelist entry absent from every repo is reported as skipped, not
//!   silently dropped;
//! - the output order is deterministic and is the synthesis order: default
//!   branches first (stable by repo declaration order), then the remaining
//!   branches lexicographically, so the monorepo's default branches are the
//!   first established.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::repository::Repository;

/// The choice made for one repo within one branch plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub repo: String,
    pub branch_used: String,
    pub fell_back: bool,
}

/// The per-repo branch choices for one monorepo branch.
///
/// Every participating repo appears exactly once, in declaration order
/// (meta-repo first, then first-layer submodules).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPlan {
    pub branch: String,
    pub entries: Vec<PlanEntry>,
}

impl BranchPlan {
    pub fn entry_for(&self, repo_name: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.repo == repo_name)
    }
}

/// A whitelist entry that matched no repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBranch {
    pub branch: String,
    pub reason: String,
}

/// The resolver's complete output.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Branches to synthesize, already in synthesis order.
    pub effective: Vec<String>,
    /// One plan per effective branch, same order.
    pub plans: Vec<BranchPlan>,
    /// Whitelist entries absent from every repo.
    pub skipped: Vec<SkippedBranch>,
}

/// Compute the effective branch set and one plan per branch.
pub fn resolve(repos: &[Repository], whitelist: Option<&BTreeSet<String>>) -> Resolution {
    let all_branches: BTreeSet<&str> = repos
        .iter()
        .flat_map(|r| r.branches.iter().map(String::as_str))
        .collect();

    // Defaults in repo declaration order, first occurrence wins.
    let mut defaults: Vec<&str> = Vec::new();
    for repo in repos {
        if !defaults.contains(&repo.default_branch.as_str()) {
            defaults.push(&repo.default_branch);
        }
    }

    let mut skipped = Vec::new();
    let selected: BTreeSet<&str> = match whitelist {
        Some(requested) => {
            for entry in requested {
                if !all_branches.contains(entry.as_str()) {
                    skipped.push(SkippedBranch {
                        branch: entry.clone(),
                        reason: "unknown-branch".to_string(),
                    });
                }
            }
            requested
                .iter()
                .map(String::as_str)
                .filter(|b| all_branches.contains(b))
                .chain(defaults.iter().copied())
                .collect()
        }
        None => all_branches.clone(),
    };

    // Synthesis order: defaults first, then the rest lexicographically.
    let mut effective: Vec<String> = defaults
        .iter()
        .filter(|d| selected.contains(**d))
        .map(|d| d.to_string())
        .collect();
    effective.extend(
        selected
            .iter()
            .filter(|b| !defaults.contains(*b))
            .map(|b| b.to_string()),
    );

    let plans = effective
        .iter()
        .map(|branch| plan_for(repos, branch))
        .collect();

    Resolution {
        effective,
        plans,
        skipped,
    }
}

fn plan_for(repos: &[Repository], branch: &str) -> BranchPlan {
    let entries = repos
        .iter()
        .map(|repo| {
            if repo.has_branch(branch) {
                PlanEntry {
                    repo: repo.name.clone(),
                    branch_used: branch.to_string(),
                    fell_back: false,
                }
            } else {
                PlanEntry {
                    repo: repo.name.clone(),
                    branch_used: repo.default_branch.clone(),
                    fell_back: true,
                }
            }
        })
        .collect();
    BranchPlan {
        branch: branch.to_string(),
        entries,
    }
}

/// Load a branches whitelist: a JSON array of branch names. Duplicates are
/// allowed and ignored; any non-string element is a usage error.
pub fn load_whitelist(path: &Path) -> Result<BTreeSet<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::BadWhitelist {
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| Error::BadWhitelist {
            message: format!("invalid JSON in {}: {e}", path.display()),
        })?;
    let serde_json::Value::Array(items) = value else {
        return Err(Error::BadWhitelist {
            message: "whitelist must be a JSON array of branch names".to_string(),
        });
    };
    let mut branches = BTreeSet::new();
    for item in items {
        match item {
            serde_json::Value::String(name) => {
                branches.insert(name);
            }
            other => {
                return Err(Error::BadWhitelist {
                    message: format!("branch names must be strings, got: {other}"),
                });
            }
        }
    }
    Ok(branches)
}
