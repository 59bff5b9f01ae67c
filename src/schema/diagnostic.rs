use serde::Serialize;
use std::fmt;

/// A recoverable finding of an extraction run. Never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// Unrecognized type token, the field was read as `String`
    UnknownType { table: String, column: String, token: String },
    /// Sheet without any field row, no table was produced
    EmptyTable { sheet: String },
    /// Column defined twice in one table, the later row wins
    DuplicateField { table: String, field: String },
    /// More than one field carries the primary key marker
    MultiplePrimaryKeys { table: String, fields: Vec<String> },
    /// Foreign table that no extracted table is named after
    DanglingReference { table: String, field: String, target: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownType { table, column, token } => {
                write!(f, "Unknown type '{token}' of column '{table}.{column}', defaulting to String")
            }
            Diagnostic::EmptyTable { sheet } => write!(f, "Sheet '{sheet}' defines no fields, skipped"),
            Diagnostic::DuplicateField { table, field } => {
                write!(f, "Column '{table}.{field}' is defined more than once, keeping the last definition")
            }
            Diagnostic::MultiplePrimaryKeys { table, fields } => {
                write!(f, "Table '{table}' has multiple primary keys: {}", fields.join(", "))
            }
            Diagnostic::DanglingReference { table, field, target } => {
                write!(f, "Field '{table}.{field}' references unknown table '{target}'")
            }
        }
    }
}
