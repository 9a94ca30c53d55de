//! PostgreSQL probe backed by a small Diesel connection pool.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::ConnectionManager;
use diesel::sql_types::{BigInt, Bool, Text};
use std::time::Duration;
use tracing::{debug, info};

use super::{quote_ident, OptionsQuery, ProbeAnswer, ProbeError, TargetProbe};
use crate::codegen::defaults::SelectOption;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(QueryableByName)]
struct ExistsRow {
    #[diesel(sql_type = Bool)]
    present: bool,
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    total: i64,
}

#[derive(QueryableByName)]
struct OptionRow {
    #[diesel(sql_type = Text)]
    value: String,
    #[diesel(sql_type = Text)]
    label: String,
}

/// Probe for a PostgreSQL target
pub struct PgProbe {
    pool: Pool,
    schema: String,
}

impl PgProbe {
    /// Build a lazily-connecting pool; nothing is contacted yet
    pub fn new(database_url: &str, connect_timeout: Duration) -> Self {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = r2d2::Pool::builder()
            .max_size(2)
            .min_idle(Some(0))
            .connection_timeout(connect_timeout)
            .build_unchecked(manager);
        PgProbe {
            pool,
            schema: "public".to_string(),
        }
    }

    /// First candidate URL that answers `SELECT 1` within the timeout
    pub fn connect_first(candidates: &[String], connect_timeout: Duration) -> Option<Self> {
        for url in candidates {
            let probe = PgProbe::new(url, connect_timeout);
            match probe.ping() {
                Ok(()) => {
                    info!(url = %redact(url), "Connected to target database");
                    return Some(probe);
                }
                Err(e) => debug!(url = %redact(url), error = %e, "Target database candidate failed"),
            }
        }
        None
    }

    pub fn ping(&self) -> Result<(), ProbeError> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .map_err(|e| ProbeError::Query(e.to_string()))?;
        Ok(())
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, ProbeError> {
        self.pool
            .get()
            .map_err(|e| ProbeError::Unavailable(e.to_string()))
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }
}

impl TargetProbe for PgProbe {
    fn table_exists(&self, table: &str) -> ProbeAnswer<bool> {
        let result = self.conn().and_then(|mut conn| {
            diesel::sql_query(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = $1 AND table_name = $2) AS present",
            )
            .bind::<Text, _>(&self.schema)
            .bind::<Text, _>(table)
            .get_result::<ExistsRow>(&mut conn)
            .map_err(|e| ProbeError::Query(e.to_string()))
        });
        match result {
            Ok(row) => ProbeAnswer::Known(row.present),
            Err(e) => {
                debug!(table, error = %e, "table_exists probe failed");
                ProbeAnswer::Unknown
            }
        }
    }

    fn row_count(&self, table: &str) -> ProbeAnswer<u64> {
        let sql = format!("SELECT COUNT(*) AS total FROM {}", self.qualified(table));
        let result = self.conn().and_then(|mut conn| {
            diesel::sql_query(sql)
                .get_result::<CountRow>(&mut conn)
                .map_err(|e| ProbeError::Query(e.to_string()))
        });
        match result {
            Ok(row) => ProbeAnswer::Known(row.total.max(0) as u64),
            Err(e) => {
                debug!(table, error = %e, "row_count probe failed");
                ProbeAnswer::Unknown
            }
        }
    }

    fn select_options(&self, query: &OptionsQuery) -> Result<Vec<SelectOption>, ProbeError> {
        let filter = if query.active_only {
            format!(" WHERE {} = true", quote_ident("activo"))
        } else {
            String::new()
        };
        let sql = format!(
            "SELECT CAST({value} AS TEXT) AS value, CAST({label} AS TEXT) AS label \
             FROM {table}{filter} ORDER BY 2 LIMIT {limit}",
            value = quote_ident(&query.value_column),
            label = quote_ident(&query.label_column),
            table = self.qualified(&query.table),
            filter = filter,
            limit = query.limit,
        );
        let mut conn = self.conn()?;
        let rows = diesel::sql_query(sql)
            .load::<OptionRow>(&mut conn)
            .map_err(|e| ProbeError::Query(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|r| SelectOption {
                value: r.value,
                label: r.label,
            })
            .collect())
    }
}

/// Hide the password part of a connection URL for logging
pub fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let userinfo = &url[scheme_end + 3..at];
            match userinfo.split_once(':') {
                Some((user, _)) => format!("{}{}:***{}", &url[..scheme_end + 3], user, &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
