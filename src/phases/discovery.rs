//! Phase 1: discovery and cloning
//!
//! Materializes a local mirror of the meta-repo and of every first-layer
//! submodule under `<workspace>/sources/`, and builds the immutable
//! repository models the resolver and synthesizer work from.
//!
//! The first-layer submodule set is the union over *all* meta-repo branches:
//! a submodule tracked only on a feature branch still participates. The
//! recorded pins are ignored (they may be stale); what is cloned is each
//! submodule's remote, and what is resolved later are its actual branch
//! heads.
//!
//! The migration strategy is consulted here, before any submodule clone:
//! an opted-out submodule is never materialized and is handed back as a
//! retained definition for the synthesizer to keep as a pinned entry.
//!
//! Submodule clones and enumeration run on a bounded worker pool; each
//! worker writes only its own `sources/<name>` directory, so the phase
//! needs no locking.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::git::GitDriver;
use crate::repository::{
    repo_name_from_url, resolve_submodule_url, submodule_name, Repository, SubmoduleDef,
};
use crate::strategy::MigrationStrategy;
use crate::workspace::Workspace;

/// Everything the discovery phase hands to the rest of the pipeline.
#[derive(Debug)]
pub struct Discovery {
    /// Participating repositories in declaration order, meta-repo first.
    pub repos: Vec<Repository>,
    /// First-layer submodules the migration strategy excluded; kept in the
    /// monorepo as pinned submodule entries.
    pub retained_submodules: Vec<SubmoduleDef>,
}

/// Clone and enumerate every participating repository.
///
/// Returns the models in declaration order: the meta-repo first, then its
/// first-layer submodules in the order their paths first appear (default
/// branch first, remaining branches in sorted order).
pub fn execute(
    driver: &GitDriver,
    workspace: &Workspace,
    metarepo_source: &str,
    workers: usize,
    strategy: Option<&MigrationStrategy>,
) -> Result<Discovery> {
    let meta = discover_metarepo(driver, workspace, metarepo_source)?;
    let defs = first_layer_defs(driver, &meta)?;
    info!(
        "meta-repo {}: {} branches, {} first-layer submodules",
        meta.name,
        meta.branches.len(),
        defs.len()
    );
    let (defs, retained_submodules) = apply_strategy(defs, strategy);

    let submodules = discover_submodules(driver, workspace, metarepo_source, &defs, workers)?;

    let mut repos = Vec::with_capacity(1 + submodules.len());
    repos.push(meta);
    repos.extend(submodules);
    Ok(Discovery {
        repos,
        retained_submodules,
    })
}

/// Split the first-layer definitions into the ones to import and the ones
/// the strategy keeps out.
fn apply_strategy(
    defs: Vec<SubmoduleDef>,
    strategy: Option<&MigrationStrategy>,
) -> (Vec<SubmoduleDef>, Vec<SubmoduleDef>) {
    let Some(strategy) = strategy else {
        return (defs, vec![]);
    };
    for path in strategy.paths() {
        if !defs.iter().any(|d| d.path == path) {
            warn!("migration strategy names unknown submodule path `{path}`");
        }
    }
    let (consumed, retained): (Vec<_>, Vec<_>) =
        defs.into_iter().partition(|def| strategy.consumes(def));
    for def in &retained {
        info!(
            "submodule {} will not be imported; its pin is kept as-is",
            def.path
        );
    }
    (consumed, retained)
}

fn discover_metarepo(
    driver: &GitDriver,
    workspace: &Workspace,
    metarepo_source: &str,
) -> Result<Repository> {
    let name = repo_name_from_url(metarepo_source).unwrap_or_else(|| "metarepo".to_string());
    let local_path = workspace.source_dir(&name);

    driver.clone_mirror(metarepo_source, &local_path)?;
    driver.fetch_all_branches(&local_path)?;
    let branches = driver
        .list_branches(&local_path)
        .map_err(|e| Error::BranchEnumerationFailed {
            repo: name.clone(),
            message: e.to_string(),
        })?;
    if branches.is_empty() {
        return Err(Error::BranchEnumerationFailed {
            repo: name,
            message: "repository has no branches".to_string(),
        });
    }
    let default_branch = driver
        .default_branch(&local_path)
        .filter(|b| branches.contains(b))
        .ok_or_else(|| Error::BranchEnumerationFailed {
            repo: name.clone(),
            message: "cannot determine default branch".to_string(),
        })?;

    Ok(Repository {
        name,
        local_path,
        default_branch,
        branches,
        nested_submodules: vec![],
        target_subpath: ".".to_string(),
    })
}

/// Union of first-layer submodule definitions across every meta branch.
///
/// The same path recorded with two different URLs, anywhere in the scan, is
/// a fatal path collision: two repositories cannot share a mount point.
fn first_layer_defs(driver: &GitDriver, meta: &Repository) -> Result<Vec<SubmoduleDef>> {
    let mut scan_order: Vec<&String> = vec![&meta.default_branch];
    scan_order.extend(meta.branches.iter().filter(|b| **b != meta.default_branch));

    let mut defs: Vec<SubmoduleDef> = Vec::new();
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for branch in scan_order {
        for def in driver.list_submodules(&meta.local_path, branch)? {
            match seen.get(&def.path) {
                None => {
                    seen.insert(def.path.clone(), def.url.clone());
                    debug!("first-layer submodule {} -> {}", def.path, def.url);
                    defs.push(def);
                }
                Some(known_url) if *known_url == def.url => {}
                Some(known_url) => {
                    return Err(Error::PathCollision {
                        path: def.path,
                        message: format!(
                            "declared with two different URLs: {known_url} and {}",
                            def.url
                        ),
                    });
                }
            }
        }
    }
    Ok(defs)
}

fn discover_submodules(
    driver: &GitDriver,
    workspace: &Workspace,
    metarepo_source: &str,
    defs: &[SubmoduleDef],
    workers: usize,
) -> Result<Vec<Repository>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| Error::Workspace {
            path: workspace.sources_dir(),
            message: format!("cannot start discovery worker pool: {e}"),
        })?;

    let results: Vec<Result<Repository>> = pool.install(|| {
        defs.par_iter()
            .map(|def| discover_one_submodule(driver, workspace, metarepo_source, def))
            .collect()
    });

    // Errors surface in declaration order, independent of worker timing.
    results.into_iter().collect()
}

fn discover_one_submodule(
    driver: &GitDriver,
    workspace: &Workspace,
    metarepo_source: &str,
    def: &SubmoduleDef,
) -> Result<Repository> {
    let name = submodule_name(&def.path);
    let url = resolve_submodule_url(metarepo_source, &def.url);
    let local_path = workspace.source_dir(&name);

    info!("cloning submodule {} from {url}", def.path);
    driver.clone_mirror(&url, &local_path)?;
    driver.fetch_all_branches(&local_path)?;

    let branches = driver
        .list_branches(&local_path)
        .map_err(|e| Error::BranchEnumerationFailed {
            repo: name.clone(),
            message: e.to_string(),
        })?;
    // A submodule without a discoverable default branch is fatal before any
    // synthesis: every fallback plan would be meaningless.
    let default_branch = driver
        .default_branch(&local_path)
        .filter(|b| branches.contains(b))
        .ok_or_else(|| Error::BranchEnumerationFailed {
            repo: name.clone(),
            message: "cannot determine default branch".to_string(),
        })?;

    let nested_submodules = driver.list_submodules(&local_path, &default_branch)?;
    if !nested_submodules.is_empty() {
        debug!(
            "submodule {} carries {} nested submodule(s)",
            def.path,
            nested_submodules.len()
        );
    }

    Ok(Repository {
        name,
        local_path,
        default_branch,
        branches,
        nested_submodules,
        target_subpath: def.path.clone(),
    })
}
