use crate::error::ResultMessage;
use crate::error::SchemaReadError;
use crate::schema::constraints::Constraints;
use crate::schema::diagnostic::Diagnostic;
use crate::schema::enums::resolve_enum;
use crate::schema::integrity::check_integrity;
use crate::schema::model::FieldDescriptor;
use crate::schema::model::Scalar;
use crate::schema::model::TableModel;
use crate::schema::row::RowRecord;
use crate::schema::row::SheetLayout;
use crate::schema::row::SheetRows;
use crate::schema::row::COLUMN;
use crate::schema::row::COMMENTS;
use crate::schema::row::DEFAULT_VALUE;
use crate::schema::row::ENUM_VALUES;
use crate::schema::row::FAKER_VALUE;
use crate::schema::row::TYPE;
use crate::schema::row::UI_COMPONENT;
use crate::schema::row::VALIDATION_RULE;
use crate::schema::types::normalize_type;
use crate::schema::validation::ValidationExpression;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::sheet::Sheet;
use glob::Pattern;
use serde::Deserialize;

/// Knobs of one extraction run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Glob patterns on sheet names, empty reads every sheet
    pub sheet_patterns: Vec<String>,
    pub sheet_limit: Option<usize>,
    pub layout: SheetLayout,
    /// Report multiple primary keys and dangling references
    pub check_integrity: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            sheet_patterns: Vec::new(),
            sheet_limit: None,
            layout: SheetLayout::default(),
            check_integrity: true,
        }
    }
}

impl ExtractOptions {
    pub(crate) fn criteria(&self) -> Result<Criteria, SchemaReadError> {
        let sheet_name_patterns = if self.sheet_patterns.is_empty() {
            None
        } else {
            let patterns = self.sheet_patterns
                .iter()
                .map(|pattern| Pattern::new(pattern))
                .collect::<Result<Vec<_>, _>>()?;
            Some(patterns)
        };
        Ok(Criteria {
            sheet_name_patterns,
            sheet_limit: self.sheet_limit,
        })
    }
}

/// Tables of one workbook, in sheet order, with the findings of the run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub tables: Vec<TableModel>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads a workbook and assembles one table per sheet that defines fields.
///
/// Only unreadable workbooks fail; everything else is reported as a
/// [`Diagnostic`].
pub fn extract_tables(file_name: &str, options: &ExtractOptions) -> Result<Extraction, SchemaReadError> {
    let criteria = options.criteria()?;
    let mut spreadsheet = open_spreadsheet(file_name)?;
    let sheets = spreadsheet
        .read_sheets(&criteria)
        .with_prefix(&format!("Failed to read workbook '{}'", spreadsheet.name()))?;
    Ok(assemble(&sheets, options))
}

pub(crate) fn assemble(sheets: &[Sheet], options: &ExtractOptions) -> Extraction {
    let mut extraction = Extraction::default();
    for sheet in sheets {
        let rows = SheetRows::new(sheet, &options.layout);
        let mut fields = Vec::<FieldDescriptor>::new();
        for record in rows.records() {
            let (field, unknown_type) = build_field(&rows.table_name, &record);
            if let Some(diagnostic) = unknown_type {
                extraction.report(diagnostic);
            }
            match fields.iter().position(|existing| existing.name == field.name) {
                Some(index) => {
                    extraction.report(Diagnostic::DuplicateField {
                        table: rows.table_name.to_owned(),
                        field: field.name.to_owned(),
                    });
                    fields[index] = field;
                }
                None => fields.push(field),
            }
        }

        if fields.is_empty() {
            extraction.report(Diagnostic::EmptyTable {
                sheet: rows.sheet_name().to_owned(),
            });
            continue;
        }
        tracing::debug!(
            "Table '{}' from sheet '{}' of '{}' (headers: {}): {:#?}",
            rows.table_name,
            rows.sheet_name(),
            sheet.file_name,
            rows.headers().collect::<Vec<_>>().join(", "),
            fields
        );
        extraction.tables.push(TableModel {
            table_name: rows.table_name.to_owned(),
            fields,
        });
    }

    if options.check_integrity {
        for diagnostic in check_integrity(&extraction.tables) {
            extraction.report(diagnostic);
        }
    }
    extraction
}

impl Extraction {
    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

/// Builds the descriptor of one field row, with the diagnostic of an
/// unrecognized type token.
pub(crate) fn build_field(table: &str, record: &RowRecord) -> (FieldDescriptor, Option<Diagnostic>) {
    let name = record.text(COLUMN).unwrap_or_default();
    let raw_type = record.text(TYPE).unwrap_or_default();
    let normalized = normalize_type(&raw_type, &name);
    let unknown_type = if normalized.recognized {
        None
    } else {
        Some(Diagnostic::UnknownType {
            table: table.to_owned(),
            column: name.to_owned(),
            token: raw_type.to_owned(),
        })
    };

    let constraints = Constraints::resolve(record);
    let comments = record.text(COMMENTS);
    let default_value = record.scalar(DEFAULT_VALUE).map(|value| match value {
        Scalar::Text(text) => Scalar::Text(text.trim().to_owned()),
        other => other.to_owned(),
    });
    let resolved = resolve_enum(comments.as_deref(), record.text(ENUM_VALUES).as_deref(), default_value);
    let ui_hint = record.text(UI_COMPONENT);
    let validation = record.text(VALIDATION_RULE);
    let validation_expression = ValidationExpression::translate(
        normalized.semantic_type,
        constraints.is_foreign,
        resolved.enum_values.as_deref(),
        validation.as_deref(),
        ui_hint.as_deref(),
    );

    let field = FieldDescriptor {
        name,
        semantic_type: normalized.semantic_type,
        raw_type,
        required: constraints.required,
        unique: constraints.unique,
        indexed: constraints.indexed,
        sortable: constraints.sortable,
        exportable: constraints.exportable,
        is_primary: constraints.is_primary,
        is_foreign: constraints.is_foreign,
        reference: constraints.reference(),
        is_dependent: constraints.is_dependent,
        dependent_on: constraints.dependent_on,
        is_parent: constraints.is_parent,
        child_table: constraints.child_table,
        default_value: resolved.default_value,
        enum_values: resolved.enum_values,
        ui_hint,
        comments,
        faker: record.text(FAKER_VALUE),
        validation,
        validation_expression,
    };
    (field, unknown_type)
}
