//! Migration strategy: per-submodule participation policy
//!
//! An optional JSON input deciding, per first-layer submodule, whether its
//! branches are imported at all. A submodule that is opted out (or whose
//! recorded URL does not match the strategy's expectation) never
//! participates: it is not cloned, contributes no branches to the
//! effective set, and survives in the monorepo as a submodule entry pinned
//! at the SHA the meta-repo recorded.
//!
//! The file is an object keyed by submodule path:
//!
//! ```json
//! {
//!   "libs/widgets": {
//!     "url": "https://example.com/widgets.git",
//!     "consume_branches": false
//!   }
//! }
//! ```
//!
//! A submodule without an entry is imported normally.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::repository::SubmoduleDef;

/// Policy for one submodule path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyEntry {
    /// The URL the submodule is expected to point at; a mismatch means the
    /// meta-repo changed under the strategy's feet, and the submodule is
    /// not imported.
    pub url: String,
    /// Whether to import this submodule's branches.
    pub consume_branches: bool,
}

/// The full strategy: submodule path → entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStrategy {
    entries: BTreeMap<String, StrategyEntry>,
}

impl MigrationStrategy {
    /// Load a strategy file. Any shape other than an object of well-formed
    /// entries is a usage error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::BadStrategy {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let entries: BTreeMap<String, StrategyEntry> = serde_json::from_str(&content)
            .map_err(|e| Error::BadStrategy {
                message: format!("invalid strategy in {}: {e}", path.display()),
            })?;
        Ok(Self { entries })
    }

    /// Whether this submodule's branches should be imported. A submodule
    /// without an entry is consumed; one with an entry is consumed only
    /// when the entry says so and the recorded URL matches.
    pub fn consumes(&self, def: &SubmoduleDef) -> bool {
        match self.entries.get(&def.path) {
            None => true,
            Some(entry) => entry.consume_branches && entry.url == def.url,
        }
    }

    /// The submodule paths the strategy mentions.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
