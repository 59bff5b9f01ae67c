use crate::schema::model::SemanticType;

/// Result of normalizing a declared type token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NormalizedType {
    pub semantic_type: SemanticType,
    /// False when the token was not recognized and `String` was assumed
    pub recognized: bool,
}

/// Maps a declared type token to its semantic type.
///
/// Tokens are matched case-insensitively. `int` and `integer` columns whose
/// name ends in `_id` are references. Unknown tokens, including an empty one,
/// fall back to `String` with `recognized == false`.
pub fn normalize_type(raw_type: &str, column: &str) -> NormalizedType {
    let semantic_type = match raw_type.trim().to_ascii_lowercase().as_str() {
        "int" | "integer" if is_reference_column(column) => SemanticType::Reference,
        "int" | "integer" | "bigint" | "smallint" | "decimal" | "float" | "double" => SemanticType::Number,
        "varchar" | "text" | "string" | "char" | "longtext" => SemanticType::String,
        "bool" | "boolean" => SemanticType::Boolean,
        "datetime" | "timestamp" | "date" => SemanticType::Date,
        "objectid" | "foreignkey" => SemanticType::Reference,
        _ => {
            return NormalizedType {
                semantic_type: SemanticType::String,
                recognized: false,
            }
        }
    };
    NormalizedType {
        semantic_type,
        recognized: true,
    }
}

/// Integer columns named `*_id` double as relational pointers.
pub fn is_reference_column(column: &str) -> bool {
    column.trim().to_ascii_lowercase().ends_with("_id")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semantic(raw_type: &str, column: &str) -> SemanticType {
        let normalized = normalize_type(raw_type, column);
        assert!(normalized.recognized, "'{raw_type}' should be recognized");
        normalized.semantic_type
    }

    #[test]
    fn maps_every_known_token() {
        for token in ["int", "integer", "bigint", "smallint", "decimal", "float", "double"] {
            assert_eq!(semantic(token, "amount"), SemanticType::Number);
        }
        for token in ["varchar", "text", "string", "char", "longtext"] {
            assert_eq!(semantic(token, "name"), SemanticType::String);
        }
        for token in ["bool", "boolean"] {
            assert_eq!(semantic(token, "active"), SemanticType::Boolean);
        }
        for token in ["datetime", "timestamp", "date"] {
            assert_eq!(semantic(token, "created_at"), SemanticType::Date);
        }
        for token in ["objectid", "foreignkey"] {
            assert_eq!(semantic(token, "owner"), SemanticType::Reference);
        }
    }

    #[test]
    fn tokens_are_case_insensitive() {
        assert_eq!(semantic("VARCHAR", "name"), SemanticType::String);
        assert_eq!(semantic(" DateTime ", "created_at"), SemanticType::Date);
        assert_eq!(semantic("ObjectId", "owner"), SemanticType::Reference);
    }

    #[test]
    fn integer_id_columns_are_references() {
        assert_eq!(semantic("int", "customer_id"), SemanticType::Reference);
        assert_eq!(semantic("INTEGER", "Customer_ID"), SemanticType::Reference);
        assert_eq!(semantic("int", "customerid"), SemanticType::Number);
        assert_eq!(semantic("bigint", "customer_id"), SemanticType::Number);
    }

    #[test]
    fn unknown_tokens_default_to_string() {
        for token in ["json", "", "varchar(255)", "uuid"] {
            let normalized = normalize_type(token, "payload");
            assert_eq!(normalized.semantic_type, SemanticType::String);
            assert!(!normalized.recognized);
        }
    }

    #[test]
    fn reference_columns() {
        assert!(is_reference_column("order_id"));
        assert!(is_reference_column("ORDER_ID "));
        assert!(!is_reference_column("id"));
        assert!(!is_reference_column("identity"));
    }
}
