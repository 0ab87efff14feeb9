//! # Monomaker Library
//!
//! This library converts a *meta-repository* — a repo whose children are
//! first-layer git submodules — into a single monorepo whose working tree
//! combines the meta-repo and each submodule at its configured path, while
//! preserving the history of every branch known to any participating
//! repository.
//!
//! The recorded submodule pins are never trusted: the actual branch heads in
//! each submodule's remote are authoritative. For every feature branch of
//! any participant, the monorepo gains a branch combining that branch where
//! it exists and each remaining repo's default branch where it does not.
//! Nested (second-layer) submodules stay submodules, pinned at their
//! original path and SHA.
//!
//! ## Quick Example
//!
//! ```
//! use std::path::PathBuf;
//! use monomaker::repository::Repository;
//! use monomaker::resolver;
//!
//! let repos = vec![
//!     Repository {
//!         name: "meta".to_string(),
//!         local_path: PathBuf::from("/tmp/sources/meta"),
//!         default_branch: "main".to_string(),
//!         branches: ["main"].into_iter().map(String::from).collect(),
//!         nested_submodules: vec![],
//!         target_subpath: ".".to_string(),
//!     },
//!     Repository {
//!         name: "a".to_string(),
//!         local_path: PathBuf::from("/tmp/sources/a"),
//!         default_branch: "main".to_string(),
//!         branches: ["main", "feat-x"].into_iter().map(String::from).collect(),
//!         nested_submodules: vec![],
//!         target_subpath: "a".to_string(),
//!     },
//! ];
//!
//! let resolution = resolver::resolve(&repos, None);
//! assert_eq!(resolution.effective, vec!["main", "feat-x"]);
//!
//! // The meta-repo has no `feat-x`, so its entry falls back to `main`.
//! let plan = &resolution.plans[1];
//! let meta_entry = plan.entry_for("meta").unwrap();
//! assert!(meta_entry.fell_back);
//! assert_eq!(meta_entry.branch_used, "main");
//! ```
//!
//! ## Core Concepts
//!
//! - **VCS Driver (`git`)**: the only component that invokes the external
//!   git executable; parses porcelain-style output only and surfaces typed
//!   failures.
//! - **Repository Model (`repository`)**: the immutable description of one
//!   participant built during discovery.
//! - **Migration Report (`report`)**: an append-only log of discovered
//!   state, resolution decisions, and per-step outcomes, serialized as a
//!   fixed-field-order JSON document.
//! - **Branch Resolver (`resolver`)**: a pure function computing the
//!   effective branch set and per-branch, per-repo choices, applying the
//!   whitelist policy.
//! - **Migration Strategy (`strategy`)**: an optional per-submodule
//!   opt-out consulted before anything is cloned; an excluded submodule
//!   stays a pinned submodule entry in the monorepo.
//! - **History Synthesizer (`phases::synthesis`)**: materializes each plan
//!   as one monorepo branch, grafting source histories without rewriting
//!   them and reproducing meta-repo merge topology when asked.
//! - **Orchestrator (`phases::orchestrator`)**: drives
//!   discover → resolve → synthesize and owns the report, the workspace,
//!   and cancellation.
//!
//! ## Execution Flow
//!
//! 1. **Discovery**: mirror-clone the meta-repo and every first-layer
//!    submodule the migration strategy does not exclude (parallel,
//!    bounded worker pool).
//! 2. **Resolution**: compute the effective branch set and one plan per
//!    branch, defaults first.
//! 3. **Synthesis**: build each branch sequentially from a shared empty
//!    root commit; failures park the branch on a scratch ref and the run
//!    continues.
//! 4. **Report**: written on every exit path.

pub mod error;
pub mod git;
pub mod phases;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod strategy;
pub mod workspace;
