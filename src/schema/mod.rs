//! # Schema Extraction
//!
//! Turns a schema workbook (one table per sheet, one row per column) into
//! typed [`TableModel`]s.
//!
//! ## Sheet layout
//!
//! | Row | Content |
//! |-----|---------|
//! | 1   | table name in the second cell (optional, the sheet name otherwise) |
//! | 2   | header labels: `column`, `type`, `is_null`, `constraints`, ... |
//! | 3.. | one field per row, rows without `column` are skipped |
//!
//! ## Pipeline
//!
//! Each field row goes through [`normalize_type`], [`Constraints`],
//! [`resolve_enum`] and [`ValidationExpression::translate`]; the results are
//! assembled per sheet by [`extract_tables`]. Recoverable problems are
//! reported as [`Diagnostic`]s, never as errors.
//!
//! ```no_run
//! use sheet_schema::schema::{extract_tables, ExtractOptions, Snapshot};
//!
//! let extraction = extract_tables("models.xlsx", &ExtractOptions::default())?;
//! Snapshot::new(extraction.tables).save("schema.json".as_ref())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod assembler;
mod constraints;
mod diagnostic;
mod enums;
mod integrity;
mod model;
mod row;
mod snapshot;
mod types;
mod validation;

pub use assembler::extract_tables;
pub use assembler::ExtractOptions;
pub use assembler::Extraction;
pub use constraints::is_required;
pub use constraints::is_yes;
pub use constraints::tokenize_constraints;
pub use constraints::ConstraintFlag;
pub use constraints::Constraints;
pub use diagnostic::Diagnostic;
pub use enums::parse_comment_mapping;
pub use enums::parse_enum_list;
pub use enums::resolve_enum;
pub use enums::strip_quotes;
pub use enums::ResolvedEnum;
pub use integrity::check_integrity;
pub use model::FieldDescriptor;
pub use model::Reference;
pub use model::Scalar;
pub use model::SemanticType;
pub use model::TableModel;
pub use row::RowRecord;
pub use row::SheetLayout;
pub use snapshot::Snapshot;
pub use snapshot::SnapshotError;
pub use types::is_reference_column;
pub use types::normalize_type;
pub use types::NormalizedType;
pub use validation::parse_rules;
pub use validation::BaseCheck;
pub use validation::BasePredicate;
pub use validation::Directive;
pub use validation::Modifier;
pub use validation::ModifierCheck;
pub use validation::ValidationExpression;
pub use validation::ValidationTarget;
pub use validation::ZodTarget;
