//! Migration report: an append-only record of everything the run decided
//!
//! The report is owned by the orchestrator; components return their outcomes
//! and the orchestrator appends, so record order is creation order without
//! any interior mutability. Every append is mirrored onto the log stream so
//! that no failure exists only inside the report file.
//!
//! Serialization is a fixed-field-order JSON document
//! `{ version, started_at, finished_at, repos, resolutions, outcomes }`
//! where each array holds internally tagged records in creation order. A
//! partial document written after a fatal error still round-trips.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::repository::{NestedSubmodule, Repository};
use crate::resolver::BranchPlan;

/// Current report document version.
pub const REPORT_VERSION: u32 = 1;

/// One typed record of the append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    RepoDiscovered {
        name: String,
        default_branch: String,
        branches: Vec<String>,
        nested_submodules: Vec<NestedSubmodule>,
        target_subpath: String,
    },
    WhitelistApplied {
        requested: Vec<String>,
        effective: Vec<String>,
    },
    BranchResolved {
        branch: String,
        plan: BranchPlan,
    },
    BranchSynthesized {
        branch: String,
        commit_sha: String,
    },
    Skip {
        branch: String,
        reason: String,
    },
    Failure {
        step: String,
        detail: String,
    },
    PathOverride {
        branch: String,
        path: String,
    },
}

impl Record {
    /// Build a `RepoDiscovered` record from a repository model.
    pub fn repo_discovered(repo: &Repository) -> Self {
        Record::RepoDiscovered {
            name: repo.name.clone(),
            default_branch: repo.default_branch.clone(),
            branches: repo.branches.iter().cloned().collect(),
            nested_submodules: repo.nested_submodules.clone(),
            target_subpath: repo.target_subpath.clone(),
        }
    }
}

/// The serialized report document. Field order is part of the contract.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportDocument {
    pub version: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub repos: Vec<Record>,
    pub resolutions: Vec<Record>,
    pub outcomes: Vec<Record>,
}

/// Append-only migration report.
#[derive(Debug)]
pub struct MigrationReport {
    started_at: DateTime<Utc>,
    records: Vec<Record>,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self {
            started_at: now(),
            records: Vec::new(),
        }
    }

    /// Append a record and mirror it onto the log stream.
    pub fn append(&mut self, record: Record) {
        match &record {
            Record::RepoDiscovered {
                name,
                default_branch,
                branches,
                ..
            } => info!(
                "discovered {name}: default {default_branch}, {} branches",
                branches.len()
            ),
            Record::WhitelistApplied {
                requested,
                effective,
            } => info!(
                "whitelist applied: {} requested, {} effective",
                requested.len(),
                effective.len()
            ),
            Record::BranchResolved { branch, plan } => {
                let fallbacks = plan.entries.iter().filter(|e| e.fell_back).count();
                info!("resolved branch {branch} ({fallbacks} fallbacks)");
            }
            Record::BranchSynthesized { branch, commit_sha } => {
                info!("synthesized branch {branch} at {commit_sha}");
            }
            Record::Skip { branch, reason } => warn!("skipping branch {branch}: {reason}"),
            Record::Failure { step, detail } => error!("{step} failed: {detail}"),
            Record::PathOverride { branch, path } => {
                warn!("branch {branch}: submodule content overrides meta-repo path {path}");
            }
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Group the record log into the serialized document. Order within each
    /// group is creation order.
    pub fn to_document(&self) -> ReportDocument {
        let mut repos = Vec::new();
        let mut resolutions = Vec::new();
        let mut outcomes = Vec::new();
        for record in &self.records {
            match record {
                Record::RepoDiscovered { .. } => repos.push(record.clone()),
                Record::WhitelistApplied { .. }
                | Record::BranchResolved { .. }
                | Record::Skip { .. } => resolutions.push(record.clone()),
                Record::BranchSynthesized { .. }
                | Record::Failure { .. }
                | Record::PathOverride { .. } => outcomes.push(record.clone()),
            }
        }
        ReportDocument {
            version: REPORT_VERSION,
            started_at: self.started_at,
            finished_at: now(),
            repos,
            resolutions,
            outcomes,
        }
    }

    /// Serialize the report to `path`. Called on every exit path, so a
    /// failed run still leaves a readable (partial) document behind.
    pub fn write(&self, path: &Path) -> Result<()> {
        let document = self.to_document();
        let mut json = serde_json::to_string_pretty(&document)?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Default for MigrationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Current time, overridable through `SOURCE_DATE_EPOCH` so that report
/// documents are byte-identical across reproducible runs.
fn now() -> DateTime<Utc> {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
        .unwrap_or_else(Utc::now)
}
