//! # Read Schema Table Function
//!
//! `read_schema(path, sheets := ..., table_name := ...)` extracts the table
//! models of a schema workbook and returns one row per field.
extern crate duckdb;
extern crate duckdb_loadable_macros;
extern crate libduckdb_sys;

use crate::error::SchemaReadError;
use crate::extension::writer::write_to_vector;
use crate::extension::writer::OutputValue;
use crate::extension::ExtensionError;
use crate::extension::NamedParam;
use crate::extension::SheetsParam;
use crate::extension::TableNameParam;
use crate::schema::extract_tables;
use crate::schema::ExtractOptions;
use crate::schema::FieldDescriptor;
use crate::schema::TableModel;
use crate::schema::ZodTarget;
use duckdb::core::DataChunkHandle;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

struct ReadSchemaParameters {
    /// Path or URL of the schema workbook
    file_name: String,
    sheets: Option<Vec<String>>,
    table_name: Option<String>,
}

impl TryFrom<&BindInfo> for ReadSchemaParameters {
    type Error = SchemaReadError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        Ok(ReadSchemaParameters {
            file_name: bind.get_parameter(0).to_string(),
            sheets: SheetsParam::read(bind)?,
            table_name: TableNameParam::read(bind)?,
        })
    }
}

/// Output columns of `read_schema`, in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SchemaColumn {
    TableName,
    FieldName,
    SemanticType,
    RawType,
    Required,
    Unique,
    Indexed,
    Primary,
    Foreign,
    ForeignTable,
    ForeignKey,
    DefaultValue,
    EnumValues,
    UiHint,
    Exportable,
    Validation,
    Zod,
}

impl SchemaColumn {
    const ALL: [SchemaColumn; 17] = [
        SchemaColumn::TableName,
        SchemaColumn::FieldName,
        SchemaColumn::SemanticType,
        SchemaColumn::RawType,
        SchemaColumn::Required,
        SchemaColumn::Unique,
        SchemaColumn::Indexed,
        SchemaColumn::Primary,
        SchemaColumn::Foreign,
        SchemaColumn::ForeignTable,
        SchemaColumn::ForeignKey,
        SchemaColumn::DefaultValue,
        SchemaColumn::EnumValues,
        SchemaColumn::UiHint,
        SchemaColumn::Exportable,
        SchemaColumn::Validation,
        SchemaColumn::Zod,
    ];

    fn name(self) -> &'static str {
        match self {
            SchemaColumn::TableName => "table_name",
            SchemaColumn::FieldName => "field_name",
            SchemaColumn::SemanticType => "semantic_type",
            SchemaColumn::RawType => "raw_type",
            SchemaColumn::Required => "required",
            SchemaColumn::Unique => "unique",
            SchemaColumn::Indexed => "indexed",
            SchemaColumn::Primary => "primary",
            SchemaColumn::Foreign => "foreign",
            SchemaColumn::ForeignTable => "foreign_table",
            SchemaColumn::ForeignKey => "foreign_key",
            SchemaColumn::DefaultValue => "default_value",
            SchemaColumn::EnumValues => "enum_values",
            SchemaColumn::UiHint => "ui_hint",
            SchemaColumn::Exportable => "exportable",
            SchemaColumn::Validation => "validation",
            SchemaColumn::Zod => "zod",
        }
    }

    fn kind(self) -> LogicalTypeId {
        match self {
            SchemaColumn::Required
            | SchemaColumn::Unique
            | SchemaColumn::Indexed
            | SchemaColumn::Primary
            | SchemaColumn::Foreign
            | SchemaColumn::Exportable => LogicalTypeId::Boolean,
            _ => LogicalTypeId::Varchar,
        }
    }

    /// Value of this column for one field. Lists and the validation
    /// expression are rendered as JSON.
    fn value(self, table: &TableModel, field: &FieldDescriptor) -> Result<OutputValue, SchemaReadError> {
        let reference = field.reference.as_ref();
        let value: OutputValue = match self {
            SchemaColumn::TableName => OutputValue::Text(table.table_name.to_owned()),
            SchemaColumn::FieldName => OutputValue::Text(field.name.to_owned()),
            SchemaColumn::SemanticType => OutputValue::Text(field.semantic_type.to_string()),
            SchemaColumn::RawType => OutputValue::Text(field.raw_type.to_owned()),
            SchemaColumn::Required => field.required.into(),
            SchemaColumn::Unique => field.unique.into(),
            SchemaColumn::Indexed => field.indexed.into(),
            SchemaColumn::Primary => field.is_primary.into(),
            SchemaColumn::Foreign => field.is_foreign.into(),
            SchemaColumn::ForeignTable => reference.and_then(|reference| reference.table.to_owned()).into(),
            SchemaColumn::ForeignKey => reference.and_then(|reference| reference.key.to_owned()).into(),
            SchemaColumn::DefaultValue => field.default_value.as_ref().map(|value| value.to_string()).into(),
            SchemaColumn::EnumValues => match &field.enum_values {
                Some(values) => OutputValue::Text(serde_json::to_string(values)?),
                None => OutputValue::Null,
            },
            SchemaColumn::UiHint => field.ui_hint.to_owned().into(),
            SchemaColumn::Exportable => field.exportable.into(),
            SchemaColumn::Validation => OutputValue::Text(serde_json::to_string(&field.validation_expression)?),
            SchemaColumn::Zod => OutputValue::Text(field.validation_expression.render(&ZodTarget)),
        };
        Ok(value)
    }
}

/// Keeps the tables matching `table_name` (ignoring case), or all of them.
fn select_tables<'a>(
    file_name: &str,
    tables: &'a [TableModel],
    table_name: Option<&str>,
) -> Result<Vec<&'a TableModel>, ExtensionError> {
    let table_name = match table_name {
        Some(table_name) => table_name,
        None => return Ok(tables.iter().collect()),
    };
    let selected: Vec<&TableModel> = tables
        .iter()
        .filter(|table| table.table_name.eq_ignore_ascii_case(table_name))
        .collect();
    if selected.is_empty() {
        Err(ExtensionError::TableNotFound(file_name.to_owned(), table_name.to_owned()))
    } else {
        Ok(selected)
    }
}

fn field_rows(tables: &[&TableModel]) -> Result<Vec<Vec<OutputValue>>, SchemaReadError> {
    let mut rows = Vec::new();
    for table in tables {
        for field in &table.fields {
            let row = SchemaColumn::ALL
                .iter()
                .map(|column| column.value(table, field))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
    }
    Ok(rows)
}

#[repr(C)]
pub(crate) struct ReadSchemaBindData {
    /// One row per field, one value per [`SchemaColumn`]
    rows: Vec<Vec<OutputValue>>,
}

impl TryFrom<&ReadSchemaParameters> for ReadSchemaBindData {
    type Error = SchemaReadError;

    fn try_from(parameters: &ReadSchemaParameters) -> Result<Self, Self::Error> {
        let options = ExtractOptions {
            sheet_patterns: parameters.sheets.to_owned().unwrap_or_default(),
            ..ExtractOptions::default()
        };
        let extraction = extract_tables(&parameters.file_name, &options)?;
        let tables = select_tables(&parameters.file_name, &extraction.tables, parameters.table_name.as_deref())?;
        Ok(ReadSchemaBindData {
            rows: field_rows(&tables)?,
        })
    }
}

#[repr(C)]
pub(crate) struct ReadSchemaInitData {
    /// Next row to emit
    row: AtomicUsize,
}

pub(crate) struct ReadSchemaTableFunction;

impl VTab for ReadSchemaTableFunction {
    type InitData = ReadSchemaInitData;
    type BindData = ReadSchemaBindData;

    /// Extracts the workbook and registers the output columns.
    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = ReadSchemaParameters::try_from(bind)?;
        let data = ReadSchemaBindData::try_from(&parameters)?;
        for column in SchemaColumn::ALL {
            bind.add_result_column(column.name(), LogicalTypeHandle::from(column.kind()));
        }
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(ReadSchemaInitData {
            row: AtomicUsize::new(0),
        })
    }

    fn func(func: &TableFunctionInfo<Self>, output: &mut DataChunkHandle) -> Result<(), Box<dyn Error>> {
        const STEP: usize = 2048;

        let bind = func.get_bind_data();
        let init = func.get_init_data();
        let row_lower_bound = init.row.fetch_add(STEP, Ordering::Relaxed);
        let row_upper_bound = bind.rows.len().min(row_lower_bound.saturating_add(STEP));

        if row_lower_bound < row_upper_bound {
            let rows = &bind.rows[row_lower_bound..row_upper_bound];
            output.set_len(rows.len());
            for index in 0..SchemaColumn::ALL.len() {
                let mut vector = output.flat_vector(index);
                for (row, values) in rows.iter().enumerate() {
                    write_to_vector(&mut vector, row, &values[index]);
                }
            }
        } else {
            output.set_len(0);
        }
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![LogicalTypeHandle::from(LogicalTypeId::Varchar)])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![SheetsParam::definition(), TableNameParam::definition()])
    }
}
