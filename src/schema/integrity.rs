use crate::schema::diagnostic::Diagnostic;
use crate::schema::model::TableModel;
use std::collections::HashSet;

/// Reports tables with several primary keys and references to tables that
/// were not extracted. Table names compare case-insensitively.
pub fn check_integrity(tables: &[TableModel]) -> Vec<Diagnostic> {
    let known: HashSet<String> = tables
        .iter()
        .map(|table| table.table_name.to_lowercase())
        .collect();

    let mut diagnostics = Vec::<Diagnostic>::new();
    for table in tables {
        let primary_keys: Vec<String> = table.primary_keys().map(|field| field.name.to_owned()).collect();
        if primary_keys.len() > 1 {
            diagnostics.push(Diagnostic::MultiplePrimaryKeys {
                table: table.table_name.to_owned(),
                fields: primary_keys,
            });
        }

        for field in &table.fields {
            let target = field
                .reference
                .as_ref()
                .and_then(|reference| reference.table.as_deref());
            if let Some(target) = target {
                if !known.contains(&target.to_lowercase()) {
                    diagnostics.push(Diagnostic::DanglingReference {
                        table: table.table_name.to_owned(),
                        field: field.name.to_owned(),
                        target: target.to_owned(),
                    });
                }
            }
        }
    }
    diagnostics
}
