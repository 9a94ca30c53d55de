//! Catalog validation rules.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::schema::types::{fk_target_of, Column, ColumnType, Table, TableColumn};

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("Invalid regex"))
}

/// Technical names are lowercase `[a-z][a-z0-9_]*`
pub fn validate_identifier(what: &str, name: &str) -> Result<()> {
    if identifier_regex().is_match(name) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} name '{}' must match [a-z][a-z0-9_]*",
            what, name
        )))
    }
}

/// Type-conditional attributes of a global column
pub fn validate_column(column: &Column) -> Result<()> {
    validate_identifier("Column", &column.name)?;

    match column.data_type {
        ColumnType::Varchar => {
            if column.length.map_or(true, |l| l == 0) {
                return Err(Error::Validation(format!(
                    "Column '{}': varchar requires a positive length",
                    column.name
                )));
            }
        }
        _ if column.length.is_some() => {
            return Err(Error::Validation(format!(
                "Column '{}': length is only valid for varchar",
                column.name
            )));
        }
        _ => {}
    }

    if column.data_type == ColumnType::Numeric {
        let precision = column.precision.ok_or_else(|| {
            Error::Validation(format!(
                "Column '{}': numeric requires a precision",
                column.name
            ))
        })?;
        if let Some(scale) = column.scale {
            if scale > precision {
                return Err(Error::Validation(format!(
                    "Column '{}': scale {} exceeds precision {}",
                    column.name, scale, precision
                )));
            }
        }
    } else if column.precision.is_some() || column.scale.is_some() {
        return Err(Error::Validation(format!(
            "Column '{}': precision/scale are only valid for numeric",
            column.name
        )));
    }

    if column.primary_key && column.nullable {
        return Err(Error::Validation(format!(
            "Column '{}': a primary key cannot be nullable",
            column.name
        )));
    }

    Ok(())
}

/// Checks a table-column link against its column.
///
/// An explicit reference must agree with the `id_<target>` naming law and
/// sit on an integer column.
pub fn validate_link(table: &str, link: &TableColumn, column: &Column) -> Result<()> {
    let primary_key = link.primary_key.unwrap_or(column.primary_key);
    let nullable = link.nullable.unwrap_or(column.nullable);
    if primary_key && nullable {
        return Err(Error::Validation(format!(
            "{}.{}: a primary key cannot be nullable",
            table, column.name
        )));
    }

    if let Some(ref target) = link.references {
        if fk_target_of(&column.name) != Some(target.as_str()) {
            return Err(Error::Validation(format!(
                "{}.{}: a reference to '{}' requires the column to be named 'id_{}'",
                table, column.name, target, target
            )));
        }
        if !column.data_type.is_integer() {
            return Err(Error::Validation(format!(
                "{}.{}: a foreign key must be an integer column, found {}",
                table,
                column.name,
                column.data_type.as_str()
            )));
        }
    }
    Ok(())
}

/// Link positions of a table form a dense 1..N sequence, one link per column
pub fn validate_positions(table: &Table) -> Result<()> {
    let mut seen = HashSet::new();
    for link in &table.columns {
        if !seen.insert(link.column.as_str()) {
            return Err(Error::Validation(format!(
                "Table '{}' links column '{}' more than once",
                table.name, link.column
            )));
        }
    }

    let mut positions: Vec<u32> = table.columns.iter().map(|l| l.position).collect();
    positions.sort_unstable();
    let dense = positions
        .iter()
        .enumerate()
        .all(|(i, p)| *p as usize == i + 1);
    if !dense {
        return Err(Error::Validation(format!(
            "Table '{}' column positions are not a dense 1..{} sequence: {:?}",
            table.name,
            table.columns.len(),
            positions
        )));
    }
    Ok(())
}
