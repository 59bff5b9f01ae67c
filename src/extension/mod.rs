//! # DuckDB Surface
//!
//! Named parameter handling and errors shared by the table functions.

use crate::error::SchemaReadError;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use thiserror::Error;

pub(crate) mod read_schema_table_function;
mod writer;

#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error("Invalid parameter '{0}': {1}")]
    InvalidParameter(String, String),

    #[error("Workbook '{0}' defines no table named '{1}'")]
    TableNotFound(String, String),
}

/// A named parameter of a table function.
pub(crate) trait NamedParam<T> {
    /// Parameter name as used in SQL
    fn name() -> &'static str;

    fn kind() -> LogicalTypeHandle;

    fn definition() -> (String, LogicalTypeHandle) {
        (Self::name().to_string(), Self::kind())
    }

    /// Value of the parameter, `None` when not given
    fn read(bind: &BindInfo) -> Result<Option<T>, SchemaReadError>;
}

/// Reads a VARCHAR named parameter, treating blank text as absent.
fn read_varchar(bind: &BindInfo, name: &str) -> Option<String> {
    bind.get_named_parameter(name)
        .map(|value| value.to_string())
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// `sheets := 'users*, orders'`: comma separated glob patterns on sheet names
pub(crate) struct SheetsParam;

impl NamedParam<Vec<String>> for SheetsParam {
    fn name() -> &'static str {
        "sheets"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo) -> Result<Option<Vec<String>>, SchemaReadError> {
        let patterns = match read_varchar(bind, Self::name()) {
            Some(patterns) => split_patterns(&patterns),
            None => return Ok(None),
        };
        if patterns.is_empty() {
            Err(ExtensionError::InvalidParameter(
                Self::name().to_owned(),
                "no sheet name pattern given".to_owned(),
            ))?
        }
        for pattern in &patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                ExtensionError::InvalidParameter(Self::name().to_owned(), format!("'{pattern}' {e}"))
            })?;
        }
        Ok(Some(patterns))
    }
}

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `table_name := 'orders'`: only the fields of one table (case-insensitive)
pub(crate) struct TableNameParam;

impl NamedParam<String> for TableNameParam {
    fn name() -> &'static str {
        "table_name"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo) -> Result<Option<String>, SchemaReadError> {
        Ok(read_varchar(bind, Self::name()))
    }
}
