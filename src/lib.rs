//! # Sheet Schema
//!
//! Reads schema workbooks (`.xlsx`, `.xlsm`, `.xltx`, `.xltm` and `.ods`) in
//! which every sheet describes one table and every row one of its fields, and
//! turns them into typed table models with validation expressions.
//!
//! The [`schema`] module is the library surface. Built as a loadable DuckDB
//! extension the crate also registers one table function:
//!
//! - `read_schema(path, sheets := 'glob, ...', table_name := 'name')`: one
//!   row per extracted field
extern crate duckdb;
extern crate duckdb_loadable_macros;
extern crate libduckdb_sys;

mod error;
mod extension;
mod helpers;
pub mod schema;
mod spreadsheet;

pub use crate::error::SchemaReadError;
pub use crate::extension::ExtensionError;

use crate::extension::read_schema_table_function::ReadSchemaTableFunction;
use anyhow::{Context, Result};
use duckdb::Connection;
use duckdb_loadable_macros::duckdb_entrypoint_c_api;
use libduckdb_sys as ffi;

/// Extension entry point for DuckDB.
///
/// # Errors
///
/// Returns an error if the table function fails to register with DuckDB.
#[duckdb_entrypoint_c_api()]
pub unsafe fn extension_entrypoint(connection: Connection) -> Result<()> {
    connection
        .register_table_function::<ReadSchemaTableFunction>("read_schema")
        .context("Failed to register read_schema table function")?;
    Ok(())
}
