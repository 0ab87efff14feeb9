//! Workspace layout and scoped ownership of on-disk state
//!
//! A run owns one workspace directory:
//!
//! ```text
//! <workspace>/
//!   sources/<repo-name>/   mirror clone of each participating repo
//!   monorepo/              the produced monorepo
//!   report.json            the migration report
//! ```
//!
//! The monorepo and the report are the product and are never deleted by
//! monomaker. The `sources/` mirrors are scratch: a [`SourceGuard`] removes
//! them when it goes out of scope on any exit path, unless the run asked to
//! keep them for inspection.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::git::GitDriver;

/// Branch the monorepo is initialized on before any synthesis. Deleted at
/// the end of the run unless a meta-repo branch happens to share the name.
pub const INIT_BRANCH: &str = "monomaker/init";

/// An initialized run workspace.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    /// The shared empty initial commit every synthesized branch is rooted at.
    root_commit: String,
}

impl Workspace {
    /// Create the workspace layout and initialize the monorepo with its
    /// shared empty root commit.
    ///
    /// The monorepo directory must not already exist with content; a stale
    /// workspace is never silently reused.
    pub fn prepare(root: &Path, driver: &GitDriver) -> Result<Self> {
        let monorepo = root.join("monorepo");
        if monorepo.exists() && monorepo.read_dir()?.next().is_some() {
            return Err(Error::Workspace {
                path: monorepo,
                message: "monorepo directory already exists and is not empty".to_string(),
            });
        }

        std::fs::create_dir_all(root.join("sources")).map_err(|e| Error::Workspace {
            path: root.to_path_buf(),
            message: format!("cannot create sources directory: {e}"),
        })?;
        std::fs::create_dir_all(&monorepo).map_err(|e| Error::Workspace {
            path: root.to_path_buf(),
            message: format!("cannot create monorepo directory: {e}"),
        })?;

        driver.init(&monorepo, INIT_BRANCH)?;
        driver.commit_empty(&monorepo, "[monomaker] initialize monorepo")?;
        let root_commit = driver.current_sha(&monorepo)?;
        debug!("monorepo initialized at {} (root {root_commit})", monorepo.display());

        Ok(Self {
            root: root.to_path_buf(),
            root_commit,
        })
    }

    pub fn monorepo_dir(&self) -> PathBuf {
        self.root.join("monorepo")
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    pub fn source_dir(&self, repo_name: &str) -> PathBuf {
        self.sources_dir().join(repo_name)
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join("report.json")
    }

    /// The SHA of the shared empty initial commit.
    pub fn root_commit(&self) -> &str {
        &self.root_commit
    }

    /// Take scoped ownership of the `sources/` directory.
    pub fn source_guard(&self) -> SourceGuard<'_> {
        SourceGuard {
            workspace: self,
            keep: Cell::new(false),
        }
    }
}

/// Scoped ownership of the source mirrors: removes `sources/` when dropped
/// on any exit path, unless told to keep it.
#[derive(Debug)]
pub struct SourceGuard<'a> {
    workspace: &'a Workspace,
    keep: Cell<bool>,
}

impl SourceGuard<'_> {
    /// Keep the source mirrors on disk (cancelled run, or a failed run with
    /// `--keep-on-failure`).
    pub fn keep(&self) {
        self.keep.set(true);
    }
}

impl Drop for SourceGuard<'_> {
    fn drop(&mut self) {
        if self.keep.get() {
            debug!("keeping source clones for inspection");
            return;
        }
        let sources = self.workspace.sources_dir();
        if let Err(e) = std::fs::remove_dir_all(&sources) {
            warn!("could not remove {}: {e}", sources.display());
        }
    }
}
