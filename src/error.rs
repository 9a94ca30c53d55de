//! Error types shared by the catalog, the resolvers and the emitter.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Application '{0}' not found")]
    ApplicationNotFound(String),

    #[error("No tables selected: pass --tables or --all-assigned")]
    NoTablesSelected,

    #[error("Table '{0}' not found in catalog")]
    TableNotFound(String),

    #[error("Column '{0}' not found in catalog")]
    ColumnNotFound(String),

    #[error("Page '{0}' not found in catalog")]
    PageNotFound(String),

    #[error("Column '{column}' is still linked to: {}", tables.join(", "))]
    ColumnInUse { column: String, tables: Vec<String> },

    #[error("Table '{table}' is still referenced by: {}", referenced_by.join(", "))]
    TableInUse {
        table: String,
        referenced_by: Vec<String>,
    },

    #[error("Failed to render template '{template}': {reason}")]
    Render { template: String, reason: String },

    #[error(transparent)]
    Fs(#[from] FsFailure),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classification of a failed file-system operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsFailureKind {
    PermissionDenied,
    NotFound,
    Other,
}

impl FsFailureKind {
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => FsFailureKind::PermissionDenied,
            std::io::ErrorKind::NotFound => FsFailureKind::NotFound,
            _ => FsFailureKind::Other,
        }
    }
}

/// A fatal file-system failure for one path, with a remediation hint
#[derive(Debug, Clone)]
pub struct FsFailure {
    pub kind: FsFailureKind,
    pub path: PathBuf,
    pub message: String,
    pub hint: Option<String>,
}

impl fmt::Display for FsFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            FsFailureKind::PermissionDenied => "Permission denied",
            FsFailureKind::NotFound => "Not found",
            FsFailureKind::Other => "File system error",
        };
        write!(f, "{} for {}: {}", what, self.path.display(), self.message)?;
        if let Some(ref hint) = self.hint {
            write!(f, " (try: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for FsFailure {}
