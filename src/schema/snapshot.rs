use crate::schema::model::FieldDescriptor;
use crate::schema::model::TableModel;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Cannot access snapshot '{0}': {1}")]
    IoError(String, #[source] std::io::Error),

    #[error("Invalid snapshot '{0}': {1}")]
    FormatError(String, #[source] serde_json::Error),
}

/// Persisted list of the tables of one extraction run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub tables: Vec<TableModel>,
}

impl Snapshot {
    pub fn new(tables: Vec<TableModel>) -> Self {
        Snapshot { tables }
    }

    /// Writes the snapshot as JSON, replacing any previous file.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let name = path.display().to_string();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SnapshotError::IoError(name.to_owned(), e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SnapshotError::FormatError(name.to_owned(), e))?;
        fs::write(path, json).map_err(|e| SnapshotError::IoError(name, e))
    }

    /// Reads a snapshot. A missing file is an empty snapshot.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let name = path.display().to_string();
        if !path.exists() {
            tracing::warn!("Snapshot '{}' not found, no tables available", name);
            return Ok(Snapshot::default());
        }
        let json = fs::read_to_string(path).map_err(|e| SnapshotError::IoError(name.to_owned(), e))?;
        serde_json::from_str(&json).map_err(|e| SnapshotError::FormatError(name, e))
    }

    /// Table by name, ignoring case.
    pub fn find(&self, table_name: &str) -> Option<&TableModel> {
        let table_name = table_name.to_lowercase();
        self.tables
            .iter()
            .find(|table| table.table_name.to_lowercase() == table_name)
    }

    /// Fields flagged exportable. Every field when none is flagged, nothing
    /// for an unknown table.
    pub fn exportable_fields(&self, table_name: &str) -> Vec<&FieldDescriptor> {
        let table = match self.find(table_name) {
            Some(table) => table,
            None => return Vec::new(),
        };
        let exportable: Vec<&FieldDescriptor> = table.fields.iter().filter(|field| field.exportable).collect();
        if exportable.is_empty() {
            table.fields.iter().collect()
        } else {
            exportable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::Reference;
    use crate::schema::model::Scalar;
    use crate::schema::model::SemanticType;
    use crate::schema::validation::ValidationExpression;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn field(name: &str, semantic_type: SemanticType, exportable: bool) -> FieldDescriptor {
        let enum_values = (semantic_type == SemanticType::String).then(|| vec!["Inactive".to_owned(), "Active".to_owned()]);
        FieldDescriptor {
            name: name.to_owned(),
            semantic_type,
            raw_type: "varchar".to_owned(),
            required: true,
            unique: false,
            indexed: true,
            sortable: false,
            exportable,
            is_primary: false,
            is_foreign: semantic_type == SemanticType::Reference,
            reference: (semantic_type == SemanticType::Reference).then(|| Reference {
                table: Some("customers".to_owned()),
                key: None,
            }),
            is_dependent: false,
            dependent_on: None,
            is_parent: false,
            child_table: None,
            default_value: Some(Scalar::Number(1.0)),
            enum_values: enum_values.clone(),
            ui_hint: Some("select".to_owned()),
            comments: None,
            faker: None,
            validation: Some("required|max:20".to_owned()),
            validation_expression: ValidationExpression::translate(semantic_type, false, enum_values.as_deref(), Some("required|max:20"), None),
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(vec![
            TableModel {
                table_name: "Orders".to_owned(),
                fields: vec![
                    field("status", SemanticType::String, true),
                    field("customer_id", SemanticType::Reference, false),
                    field("total", SemanticType::Number, true),
                ],
            },
            TableModel {
                table_name: "customers".to_owned(),
                fields: vec![field("name", SemanticType::String, false), field("age", SemanticType::Number, false)],
            },
        ])
    }

    #[test]
    fn round_trip_preserves_everything() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("schema.json");
        let snapshot = snapshot();
        snapshot.save(&path).unwrap();
        assert_eq!(Snapshot::load(&path).unwrap(), snapshot);
    }

    #[test]
    fn save_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.json");
        snapshot().save(&path).unwrap();
        Snapshot::default().save(&path).unwrap();
        assert_eq!(Snapshot::load(&path).unwrap(), Snapshot::default());
    }

    #[test]
    fn json_uses_camel_case_list() {
        let json = serde_json::to_value(snapshot()).unwrap();
        let first = &json[0];
        assert_eq!(first["tableName"], "Orders");
        assert_eq!(first["fields"][0]["semanticType"], "String");
        assert_eq!(first["fields"][0]["enumValues"][1], "Active");
        assert_eq!(first["fields"][1]["isForeign"], true);
        assert_eq!(first["fields"][1]["reference"]["table"], "customers");
        assert!(first["fields"][0]["validationExpression"]["modifiers"].is_array());
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        assert_eq!(Snapshot::load(&dir.path().join("absent.json")).unwrap(), Snapshot::default());
    }

    #[test]
    fn malformed_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Snapshot::load(&path), Err(SnapshotError::FormatError(_, _))));
    }

    #[test]
    fn finds_tables_ignoring_case() {
        let snapshot = snapshot();
        assert_eq!(snapshot.find("orders").map(|table| table.table_name.as_str()), Some("Orders"));
        assert_eq!(snapshot.find("CUSTOMERS").map(|table| table.table_name.as_str()), Some("customers"));
        assert!(snapshot.find("products").is_none());
    }

    #[test]
    fn exportable_fields_fall_back_to_all() {
        let snapshot = snapshot();
        let names = |table: &str| -> Vec<String> {
            snapshot.exportable_fields(table).iter().map(|field| field.name.to_owned()).collect()
        };
        assert_eq!(names("ORDERS"), vec!["status", "total"]);
        assert_eq!(names("customers"), vec!["name", "age"]);
        assert!(names("products").is_empty());
    }
}
