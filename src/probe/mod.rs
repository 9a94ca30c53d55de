//! Target-environment probe.
//!
//! Read-only questions asked of the target application's database: does a
//! table exist, how many rows does it hold, which (value, label) pairs can
//! fill a select. Connection failures never raise; they answer `Unknown`.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::codegen::defaults::SelectOption;
use crate::schema::{Application, TargetDatabase};

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PgProbe;

/// Answer from the target environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeAnswer<T> {
    Known(T),
    /// The target could not be reached or queried
    Unknown,
}

impl<T> ProbeAnswer<T> {
    pub fn known(self) -> Option<T> {
        match self {
            ProbeAnswer::Known(v) => Some(v),
            ProbeAnswer::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Target database unavailable: {0}")]
    Unavailable(String),
    #[error("Probe query failed: {0}")]
    Query(String),
}

/// Select options query against an FK target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsQuery {
    pub table: String,
    pub value_column: String,
    pub label_column: String,
    /// Restrict to rows whose `activo` flag is set
    pub active_only: bool,
    pub limit: u32,
}

/// Read-only view of the target environment
pub trait TargetProbe {
    fn table_exists(&self, table: &str) -> ProbeAnswer<bool>;

    fn row_count(&self, table: &str) -> ProbeAnswer<u64>;

    fn select_options(&self, query: &OptionsQuery) -> Result<Vec<SelectOption>, ProbeError>;
}

/// Probe used when no target database is configured or reachable
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProbe;

impl TargetProbe for OfflineProbe {
    fn table_exists(&self, _table: &str) -> ProbeAnswer<bool> {
        ProbeAnswer::Unknown
    }

    fn row_count(&self, _table: &str) -> ProbeAnswer<u64> {
        ProbeAnswer::Unknown
    }

    fn select_options(&self, _query: &OptionsQuery) -> Result<Vec<SelectOption>, ProbeError> {
        Err(ProbeError::Unavailable("offline".to_string()))
    }
}

/// Quote a SQL identifier (`"na""me"`)
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Connection URL from an application's own database fields
pub fn url_from_fields(db: &TargetDatabase) -> Option<String> {
    let name = db.name.as_deref().filter(|n| !n.is_empty())?;
    let host = db.host.as_deref().unwrap_or("localhost");
    let port = db.port.unwrap_or(5432);
    let auth = match (db.user.as_deref(), db.password.as_deref()) {
        (Some(user), Some(password)) if !password.is_empty() => format!("{}:{}@", user, password),
        (Some(user), _) => format!("{}@", user),
        (None, _) => String::new(),
    };
    Some(format!("postgres://{}{}:{}/{}", auth, host, port, name))
}

/// `DATABASE_URL` declared in a dotenv file, if any
pub fn url_from_env_file(path: &Path) -> Option<String> {
    let iter = dotenv::from_path_iter(path).ok()?;
    iter.filter_map(|item| item.ok())
        .find(|(key, _)| key == "DATABASE_URL")
        .map(|(_, value)| value)
}

/// Ordered connection candidates for an application's target database.
///
/// An explicitly configured URL comes first, then the application's own
/// fields, then `DATABASE_URL` from `<base>/.env` and `<base>/<app>/.env`.
pub fn connection_candidates(app: &Application, configured: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |url: String| {
        if !candidates.contains(&url) {
            candidates.push(url);
        }
    };

    if let Some(url) = configured.filter(|u| !u.is_empty()) {
        push(url.to_string());
    }
    if let Some(url) = url_from_fields(&app.database) {
        push(url);
    }
    for env_file in [
        app.base_path.join(".env"),
        app.base_path.join(&app.name).join(".env"),
    ] {
        if let Some(url) = url_from_env_file(&env_file) {
            debug!(path = %env_file.display(), "Found DATABASE_URL in target env file");
            push(url);
        }
    }
    candidates
}
