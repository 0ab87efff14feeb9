//! The conversion pipeline
//!
//! A run proceeds through three phases, driven end-to-end by the
//! [`orchestrator`]:
//!
//! 1. **Discovery** (`discovery`): mirror-clone the meta-repo and every
//!    first-layer submodule into the workspace and build the repository
//!    models. The only parallel phase; submodules are processed on a
//!    bounded worker pool.
//! 2. **Resolution** (`crate::resolver`): compute the effective branch set
//!    and one per-repo plan per branch.
//! 3. **Synthesis** (`synthesis`): materialize each plan as one monorepo
//!    branch, sequentially, so the monorepo working tree has exactly one
//!    writer.
//!
//! Every step appends to the migration report, which the orchestrator
//! writes out on every exit path.

pub mod discovery;
pub mod orchestrator;
pub mod synthesis;
