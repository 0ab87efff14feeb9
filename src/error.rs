//! Error handling types for the monomaker application

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for monomaker operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid path {}: {message}", path.display())]
    BadPath { path: PathBuf, message: String },

    #[error("{} is not a git repository", path.display())]
    NotARepo { path: PathBuf },

    #[error("Invalid branches whitelist: {message}")]
    BadWhitelist { message: String },

    #[error("Invalid migration strategy: {message}")]
    BadStrategy { message: String },

    #[error("Workspace at {} is unusable: {message}", path.display())]
    Workspace { path: PathBuf, message: String },

    #[error("Clone failed for {url}: {message}")]
    CloneFailed { url: String, message: String },

    #[error("Cannot enumerate branches of {repo}: {message}")]
    BranchEnumerationFailed { repo: String, message: String },

    #[error("Ref {reference} not found in {repo}")]
    RefNotFound { repo: String, reference: String },

    #[error("Merge conflict in {repo}: {detail}")]
    MergeConflict { repo: String, detail: String },

    #[error("Path collision at {path}: {message}")]
    PathCollision { path: String, message: String },

    #[error("Submodule pin mismatch at {path}: expected {expected}, found {actual}")]
    GitlinkMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Git command `{command}` failed with code {exit_code}: {stderr}")]
    ExecError {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Invariant violated: {message}")]
    Invariant { message: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for monomaker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes as documented in the CLI contract.
pub mod exit_codes {
    /// Every branch synthesized, report written.
    pub const SUCCESS: i32 = 0;
    /// Bad invocation or bad input file, nothing written.
    pub const USAGE: i32 = 2;
    /// Some branches failed, workspace retained for inspection.
    pub const PARTIAL: i32 = 3;
    /// Workspace unusable, meta-repo invalid, or discovery failed.
    pub const FATAL: i32 = 4;
    /// Internal invariant violated (a bug, not an input problem).
    pub const INVARIANT: i32 = 70;
    /// Interrupted by the user; workspace left as-is, report flushed.
    pub const CANCELLED: i32 = 130;
}

impl Error {
    /// Map an error to the process exit code it should terminate with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::BadPath { .. } | Error::BadWhitelist { .. } | Error::BadStrategy { .. } => {
                exit_codes::USAGE
            }
            Error::Invariant { .. } => exit_codes::INVARIANT,
            Error::Cancelled => exit_codes::CANCELLED,
            _ => exit_codes::FATAL,
        }
    }

    /// Whether this error aborts only the branch being synthesized.
    ///
    /// Branch-scoped failures are recorded in the report and the run moves on
    /// to the next branch; everything else aborts the whole run.
    pub fn is_branch_scoped(&self) -> bool {
        matches!(
            self,
            Error::RefNotFound { .. }
                | Error::MergeConflict { .. }
                | Error::PathCollision { .. }
                | Error::GitlinkMismatch { .. }
                | Error::ExecError { .. }
        )
    }
}
