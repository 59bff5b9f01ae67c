use crate::schema::model::Scalar;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::sheet::Sheet;
use indexmap::IndexMap;
use serde::Deserialize;

pub(crate) const COLUMN: &str = "column";
pub(crate) const TYPE: &str = "type";
pub(crate) const IS_NULL: &str = "is_null";
pub(crate) const IS_UNIQUE: &str = "is_unique";
pub(crate) const IS_INDEX: &str = "is_index";
pub(crate) const CONSTRAINTS: &str = "constraints";
pub(crate) const FOREIGN_TABLE: &str = "foreign_table";
pub(crate) const FOREIGN_KEY: &str = "foreign_key";
pub(crate) const IS_DEPENDENT: &str = "is_dependent";
pub(crate) const DEPENDENT_ON: &str = "dependent_on";
pub(crate) const IS_PARENT: &str = "is_parent";
pub(crate) const CHILD_TABLE: &str = "child_table";
pub(crate) const DEFAULT_VALUE: &str = "default_value";
pub(crate) const UI_COMPONENT: &str = "ui_component";
pub(crate) const VALIDATION_RULE: &str = "validation_rule";
pub(crate) const SORTABLE: &str = "sortable";
pub(crate) const FAKER_VALUE: &str = "faker_value";
pub(crate) const COMMENTS: &str = "comments";
pub(crate) const ENUM_VALUES: &str = "enum_values";
pub(crate) const EXPORTABLE: &str = "exportable";

/// Where the table name, header and data live on a sheet (0-based).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub table_name_row: usize,
    pub table_name_col: usize,
    pub header_row: usize,
    pub first_data_row: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout {
            table_name_row: 0,
            table_name_col: 1,
            header_row: 1,
            first_data_row: 2,
        }
    }
}

/// One data row keyed by lower-cased header.
#[derive(Clone, Debug, PartialEq)]
pub struct RowRecord {
    /// Row index on the sheet (0-based)
    pub row: usize,
    pub values: IndexMap<String, Scalar>,
}

impl RowRecord {
    pub fn scalar(&self, key: &str) -> Option<&Scalar> {
        self.values.get(key).filter(|value| is_present(value))
    }

    /// Trimmed text of a present value
    pub fn text(&self, key: &str) -> Option<String> {
        self.scalar(key).map(|value| value.to_string().trim().to_owned())
    }
}

/// A value is present when its text is non-empty after trimming.
fn is_present(value: &Scalar) -> bool {
    match value {
        Scalar::Text(text) => !text.trim().is_empty(),
        _ => true,
    }
}

/// Table name, headers and data rows of one sheet.
pub(crate) struct SheetRows<'a> {
    sheet: &'a Sheet,
    layout: &'a SheetLayout,
    pub(crate) table_name: String,
    /// (column index, header key) in column order
    headers: Vec<(usize, String)>,
}

impl<'a> SheetRows<'a> {
    pub(crate) fn new(sheet: &'a Sheet, layout: &'a SheetLayout) -> Self {
        let table_name = sheet
            .get(layout.table_name_row, layout.table_name_col)
            .and_then(|cell| cell.text())
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| sheet.name.to_owned());
        let headers = sheet
            .row(layout.header_row)
            .into_iter()
            .filter_map(|cell| {
                let key = cell.text()?.trim().to_lowercase();
                if key.is_empty() {
                    None
                } else {
                    Some((cell.col, key))
                }
            })
            .collect();
        SheetRows {
            sheet,
            layout,
            table_name,
            headers,
        }
    }

    pub(crate) fn sheet_name(&self) -> &str {
        &self.sheet.name
    }

    pub(crate) fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().map(|(_, key)| key.as_str())
    }

    /// Data rows with a `column` value, lazily in sheet order.
    pub(crate) fn records(&self) -> impl Iterator<Item = RowRecord> + '_ {
        self.sheet
            .row_indexes_from(self.layout.first_data_row.max(self.layout.header_row + 1))
            .map(|row| self.record(row))
            .filter(|record| record.scalar(COLUMN).is_some())
    }

    fn record(&self, row: usize) -> RowRecord {
        let mut values = IndexMap::<String, Scalar>::new();
        for (col, key) in &self.headers {
            if let Some(value) = self.sheet.get(row, *col).and_then(to_scalar) {
                // a later duplicate header overwrites
                values.insert(key.to_owned(), value);
            }
        }
        RowRecord { row, values }
    }
}

fn to_scalar(cell: &Cell) -> Option<Scalar> {
    match cell.kind {
        CellType::Empty | CellType::Error => None,
        CellType::Boolean => Some(Scalar::Boolean(cell.value == "1")),
        CellType::Number => match cell.value.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Some(Scalar::Number(number)),
            _ => Some(Scalar::Text(cell.value.to_owned())),
        },
        _ => cell.text().map(Scalar::Text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheet(rows: &[(usize, usize, CellType, &str)]) -> Sheet {
        let mut sheet = Sheet::new("schema.xlsx", "Sheet1");
        for (row, col, kind, value) in rows {
            sheet.push(Cell {
                row: *row,
                col: *col,
                kind: *kind,
                value: value.to_string(),
            });
        }
        sheet
    }

    #[test]
    fn table_name_from_meta_cell() {
        let sheet = sheet(&[(0, 0, CellType::Text, "Table"), (0, 1, CellType::Text, "  users  ")]);
        let layout = SheetLayout::default();
        assert_eq!(SheetRows::new(&sheet, &layout).table_name, "users");
    }

    #[test]
    fn table_name_falls_back_to_sheet_name() {
        let blank = sheet(&[(0, 1, CellType::Text, "   ")]);
        let layout = SheetLayout::default();
        assert_eq!(SheetRows::new(&blank, &layout).table_name, "Sheet1");
        let empty = sheet(&[]);
        assert_eq!(SheetRows::new(&empty, &layout).table_name, "Sheet1");
    }

    #[test]
    fn headers_are_trimmed_and_lower_cased() {
        let sheet = sheet(&[
            (1, 0, CellType::Text, " Column "),
            (1, 1, CellType::Text, "TYPE"),
            (1, 2, CellType::Text, "  "),
            (1, 3, CellType::Text, "Is_Null"),
            (2, 0, CellType::Text, "id"),
            (2, 1, CellType::Text, "int"),
            (2, 2, CellType::Text, "ignored"),
            (2, 3, CellType::Text, "N"),
        ]);
        let layout = SheetLayout::default();
        let rows = SheetRows::new(&sheet, &layout);
        assert_eq!(rows.headers().collect::<Vec<_>>(), vec!["column", "type", "is_null"]);

        let records: Vec<RowRecord> = rows.records().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].row, 2);
        assert_eq!(records[0].values.keys().collect::<Vec<_>>(), vec!["column", "type", "is_null"]);
        assert_eq!(records[0].text(IS_NULL).as_deref(), Some("N"));
    }

    #[test]
    fn later_duplicate_header_overwrites() {
        let sheet = sheet(&[
            (1, 0, CellType::Text, "column"),
            (1, 1, CellType::Text, "type"),
            (1, 2, CellType::Text, "Type"),
            (2, 0, CellType::Text, "id"),
            (2, 1, CellType::Text, "varchar"),
            (2, 2, CellType::Text, "int"),
        ]);
        let layout = SheetLayout::default();
        let rows = SheetRows::new(&sheet, &layout);
        let record = rows.records().next().unwrap();
        assert_eq!(record.text(TYPE).as_deref(), Some("int"));
    }

    #[test]
    fn rows_without_column_are_skipped() {
        let sheet = sheet(&[
            (1, 0, CellType::Text, "column"),
            (1, 1, CellType::Text, "type"),
            (2, 1, CellType::Text, "int"),
            (3, 0, CellType::Text, "   "),
            (3, 1, CellType::Text, "int"),
            (5, 0, CellType::Text, "email"),
            (7, 0, CellType::Error, "#REF!"),
        ]);
        let layout = SheetLayout::default();
        let rows = SheetRows::new(&sheet, &layout);
        let names: Vec<String> = rows.records().filter_map(|record| record.text(COLUMN)).collect();
        assert_eq!(names, vec!["email"]);
    }

    #[test]
    fn cells_keep_their_type() {
        let sheet = sheet(&[
            (1, 0, CellType::Text, "column"),
            (1, 1, CellType::Text, "default_value"),
            (1, 2, CellType::Text, "exportable"),
            (2, 0, CellType::Text, "count"),
            (2, 1, CellType::Number, "10"),
            (2, 2, CellType::Boolean, "1"),
        ]);
        let layout = SheetLayout::default();
        let rows = SheetRows::new(&sheet, &layout);
        let record = rows.records().next().unwrap();
        assert_eq!(record.scalar(DEFAULT_VALUE), Some(&Scalar::Number(10.0)));
        assert_eq!(record.text(DEFAULT_VALUE).as_deref(), Some("10"));
        assert_eq!(record.scalar(EXPORTABLE), Some(&Scalar::Boolean(true)));
    }

    #[test]
    fn non_finite_numbers_stay_text() {
        let sheet = sheet(&[
            (1, 0, CellType::Text, "column"),
            (1, 1, CellType::Text, "default_value"),
            (1, 2, CellType::Text, "faker_value"),
            (2, 0, CellType::Text, "ratio"),
            (2, 1, CellType::Number, "NaN"),
            (2, 2, CellType::Number, "inf"),
        ]);
        let layout = SheetLayout::default();
        let rows = SheetRows::new(&sheet, &layout);
        let record = rows.records().next().unwrap();
        assert_eq!(record.scalar(DEFAULT_VALUE), Some(&Scalar::Text("NaN".to_owned())));
        assert_eq!(record.scalar(FAKER_VALUE), Some(&Scalar::Text("inf".to_owned())));
    }

    #[test]
    fn custom_layout() {
        let sheet = sheet(&[
            (0, 0, CellType::Text, "orders"),
            (2, 0, CellType::Text, "column"),
            (4, 0, CellType::Text, "total"),
        ]);
        let layout = SheetLayout {
            table_name_row: 0,
            table_name_col: 0,
            header_row: 2,
            first_data_row: 4,
        };
        let rows = SheetRows::new(&sheet, &layout);
        assert_eq!(rows.table_name, "orders");
        assert_eq!(rows.records().count(), 1);
    }

    #[test]
    fn layout_deserializes_with_defaults() {
        let layout: SheetLayout = serde_json::from_str(r#"{"header_row": 3}"#).unwrap();
        assert_eq!(layout.header_row, 3);
        assert_eq!(layout.table_name_col, 1);
        assert_eq!(layout.first_data_row, 2);
    }
}
