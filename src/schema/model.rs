use crate::schema::validation::ValidationExpression;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// The closed set of value kinds a field can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    String,
    Number,
    Boolean,
    Date,
    /// Pointer to a record of another table
    Reference,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::String => "String",
            SemanticType::Number => "Number",
            SemanticType::Boolean => "Boolean",
            SemanticType::Date => "Date",
            SemanticType::Reference => "Reference",
        };
        f.write_str(name)
    }
}

/// A cell value that keeps its workbook type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(value) => write!(f, "{value}"),
            Scalar::Number(value) => f.write_str(&format_number(*value)),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

/// Whole numbers render without a fractional part (`3`, not `3.0`).
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Target of a foreign reference. Either side may be unknown.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// One column definition of a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    /// Declared type token as written in the workbook
    #[serde(default)]
    pub raw_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub exportable: bool,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_foreign: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
    #[serde(default)]
    pub is_dependent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent_on: Option<String>,
    #[serde(default)]
    pub is_parent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faker: Option<String>,
    /// Raw pipe-delimited rule string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    pub validation_expression: ValidationExpression,
}

impl FieldDescriptor {
    /// Binary upload fields are marked by "file" in the UI hint.
    pub fn is_upload(&self) -> bool {
        is_upload_hint(self.ui_hint.as_deref())
    }

    pub fn is_reference(&self) -> bool {
        self.semantic_type == SemanticType::Reference || self.reference.is_some()
    }

    /// Recomputes the validation expression from the other attributes.
    pub fn derive_validation(&self) -> ValidationExpression {
        ValidationExpression::translate(
            self.semantic_type,
            self.is_foreign,
            self.enum_values.as_deref(),
            self.validation.as_deref(),
            self.ui_hint.as_deref(),
        )
    }
}

pub(crate) fn is_upload_hint(ui_hint: Option<&str>) -> bool {
    ui_hint
        .map(|hint| hint.to_ascii_lowercase().contains("file"))
        .unwrap_or(false)
}

/// All fields of one sheet, in row order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableModel {
    pub table_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TableModel {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.is_primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::Number(3.0).to_string(), "3");
        assert_eq!(Scalar::Number(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Number(-10.0).to_string(), "-10");
        assert_eq!(Scalar::Boolean(true).to_string(), "true");
        assert_eq!(Scalar::Text("Active".to_owned()).to_string(), "Active");
    }

    #[test]
    fn scalar_json_keeps_type() {
        let values: Vec<Scalar> = serde_json::from_str(r#"[true, 1.5, "Y"]"#).unwrap();
        assert_eq!(values, vec![Scalar::Boolean(true), Scalar::Number(1.5), Scalar::Text("Y".to_owned())]);
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"[true,1.5,"Y"]"#);
    }

    #[test]
    fn upload_hint_is_case_insensitive() {
        assert!(is_upload_hint(Some("FileUpload")));
        assert!(is_upload_hint(Some("image-file")));
        assert!(!is_upload_hint(Some("textarea")));
        assert!(!is_upload_hint(None));
    }

    #[test]
    fn semantic_type_serializes_by_name() {
        assert_eq!(serde_json::to_string(&SemanticType::Reference).unwrap(), r#""Reference""#);
        assert_eq!(SemanticType::Date.to_string(), "Date");
    }
}
