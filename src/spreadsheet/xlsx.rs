use crate::error::SchemaReadError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::DateSystem;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::BufRead;
use zip::ZipArchive;

const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
/// Phonetic guide text (ruby) for East Asian strings
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");
const LOCAL_WORKBOOK_PROPERTIES: &[u8] = b"workbookPr";
const LOCAL_SHEET: &[u8] = b"sheet";
const LOCAL_RELATIONSHIP: &[u8] = b"Relationship";

/// Office Open XML workbook (.xlsx and friends)
pub(crate) struct XlsxSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Cell type per style index (`s` attribute)
    number_formats: Vec<CellType>,
    /// (sheet name, part path) in workbook order
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(file_name: &str) -> Result<XlsxSpreadsheet, SchemaReadError> {
        let mut zip = ZipArchive::new(UnifiedReader::new(file_name)?)?;
        let relationships = load_relationships(&mut zip, "xl/_rels/workbook.xml.rels")?;
        let (sheets, system) = load_workbook(&mut zip, &relationships)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, system)?;
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            number_formats,
            sheets,
        })
    }

    fn load_shared_strings(&mut self) -> Result<Vec<String>, SchemaReadError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
            }
        });
        Ok(shared_strings)
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, SchemaReadError> {
        let shared_strings = self.load_shared_strings()?;
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, zip_path) in &self.sheets {
            if criteria.is_full(sheets.len()) {
                break;
            } else if !criteria.accept(sheet_name) {
                continue;
            }

            let mut sheet = Sheet::new(&self.name, sheet_name);
            let mut reader = self.zip
                .xml_reader(zip_path)?
                .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
            let mut row_count = 0usize;
            let mut col_count = 0usize;
            let mut row = 0usize;
            let mut col = 0usize;
            let mut kind = CellType::default();
            let mut value = String::new();
            match_xml_events!(reader => {
                Event::Start(event) if event.name() == TAG_ROW => {
                    row = event.parse_attribute_value::<usize>("r")?
                        .and_then(|number| number.checked_sub(1))
                        .unwrap_or(row_count);
                    col_count = 0;
                }
                Event::End(event) if event.name() == TAG_ROW => {
                    row_count = row + 1;
                }
                Event::Start(event) if event.name() == TAG_CELL => {
                    (row, col) = event.get_attribute_value("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .unwrap_or((row, col_count));
                    col_count = col + 1;
                    value.clear();
                    kind = match event.get_attribute_value("t")?.as_deref() {
                        Some("inlineStr") | Some("str") => CellType::Text,
                        Some("s") => CellType::SharedString,
                        Some("d") => CellType::IsoDateTime,
                        Some("b") => CellType::Boolean,
                        Some("e") => CellType::Error,
                        _ => CellType::Number,
                    };
                    if kind == CellType::Number {
                        if let Some(style) = event.parse_attribute_value::<usize>("s")? {
                            kind = self.number_formats.get(style).copied().unwrap_or(CellType::Number);
                        }
                    }
                }
                Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                    value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if event.name() == TAG_VALUE => {
                    value = read_string_value(&mut reader, TAG_VALUE, true)?;
                }
                Event::End(event) if event.name() == TAG_CELL => {
                    if kind == CellType::SharedString {
                        let index = value.trim().parse::<usize>()?;
                        let text = shared_strings.get(index).ok_or_else(|| {
                            SpreadsheetError::SharedStringError(self.name.to_owned(), index)
                        })?;
                        value = text.to_owned();
                        kind = CellType::Text;
                    }
                    if kind == CellType::Error {
                        tracing::debug!("{}!{} holds error value '{}', read as empty", sheet.name, index_to_reference(row, col), value);
                    } else if !value.is_empty() {
                        sheet.push(Cell {
                            row,
                            col,
                            kind,
                            value: std::mem::take(&mut value),
                        });
                    }
                    kind = CellType::Empty;
                },
            });
            sheets.push(sheet);
        }
        Ok(sheets)
    }
}

/// Maps relationship ids to worksheet part paths.
fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, path: &str) -> Result<HashMap<String, String>, SchemaReadError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships = HashMap::<String, String>::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == LOCAL_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Sheet names with their part paths, and the workbook date system.
fn load_workbook(
    zip: &mut ZipArchive<UnifiedReader>,
    relationships: &HashMap<String, String>,
) -> Result<(Vec<(String, String)>, DateSystem), SchemaReadError> {
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets = Vec::<(String, String)>::new();
    let mut system = DateSystem::Excel1900;
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == LOCAL_SHEET => {
            let mut name = None::<String>;
            let mut id = None::<String>;
            for result in event.attributes() {
                let attribute = result?;
                match attribute.key.local_name().as_ref() {
                    b"name" => name = Some(attribute.unescape_value()?.to_string()),
                    b"id" => id = Some(attribute.unescape_value()?.to_string()),
                    _ => (),
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id) {
                    sheets.push((name, path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.local_name().as_ref() == LOCAL_WORKBOOK_PROPERTIES => {
            let is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
            if is_1904 {
                system = DateSystem::Excel1904;
            }
        }
    });
    Ok((sheets, system))
}

/// Cell type for each cell style, derived from `styles.xml` number formats.
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>, system: DateSystem) -> Result<Vec<CellType>, SchemaReadError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_ids = Vec::<String>::new();
    let mut in_custom_formats = false;
    let mut in_format_indexes = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => in_custom_formats = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => in_custom_formats = false,
        Event::Start(event) if in_custom_formats && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::custom_number_format(&format, system));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => in_format_indexes = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => in_format_indexes = false,
        Event::Start(event) if in_format_indexes && event.name() == TAG_FORMAT_INDEX => {
            format_ids.push(event.get_attribute_value("numFmtId")?.map(|id| id.to_string()).unwrap_or_default());
        }
    });

    Ok(format_ids
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::builtin_number_format(id, system))
                .unwrap_or(CellType::Number)
        })
        .collect())
}

/// Relationship targets are relative to `xl/` unless absolute.
fn to_zip_path(path: &str) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Reads text up to `end_tag`, skipping phonetic runs. Rich text runs
/// (`<r><t>..</t></r>`) are concatenated.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, SchemaReadError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::fixture;
    use tempfile::tempdir;

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
    }

    #[test]
    fn reads_inline_string_sheets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.xlsx");
        fixture::write_xlsx(&path, &[
            ("users", vec![vec!["", "Users"], vec!["Column", "Type"], vec!["id", "int"], vec!["email", "varchar"]]),
            ("orders", vec![vec!["", ""], vec!["column"], vec!["total", "decimal"]]),
        ]);

        let mut spreadsheet = XlsxSpreadsheet::open(path.to_str().unwrap()).unwrap();
        let sheets = spreadsheet.read_sheets(&Criteria::default()).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "users");
        assert_eq!(sheets[0].get(0, 1).and_then(|cell| cell.text()).as_deref(), Some("Users"));
        assert_eq!(sheets[0].get(0, 0), None);
        assert_eq!(sheets[0].get(3, 0).and_then(|cell| cell.text()).as_deref(), Some("email"));
        assert_eq!(sheets[1].name, "orders");
        assert_eq!(sheets[1].get(2, 1).and_then(|cell| cell.text()).as_deref(), Some("decimal"));
    }

    #[test]
    fn reads_shared_strings_styles_and_cell_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("typed.xlsx");
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="3"><c r="A3" t="b"><v>1</v></c><c r="B3"><v>42</v></c><c r="C3" s="1"><v>45352</v></c><c r="D3" t="e"><v>#N/A</v></c><c r="E3" t="str"><v>formula</v></c></row>
            <row><c t="inlineStr"><is><r><t>Y =&gt; </t></r><r><t>Active</t></r></is></c></row>
        </sheetData></worksheet>"#;
        let shared = r#"<sst><si><t>column</t></si><si><t>ステータス</t><rPh><t>すてーたす</t></rPh></si></sst>"#;
        let styles = r#"<styleSheet><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy/mm/dd"/></numFmts>
            <cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="164"/></cellXfs></styleSheet>"#;
        fixture::write_xlsx_parts(&path, &[("typed", sheet.to_owned())], Some(shared), Some(styles));

        let mut spreadsheet = XlsxSpreadsheet::open(path.to_str().unwrap()).unwrap();
        let sheets = spreadsheet.read_sheets(&Criteria::default()).unwrap();
        let sheet = &sheets[0];
        let text = |row: usize, col: usize| sheet.get(row, col).and_then(|cell| cell.text());
        assert_eq!(text(0, 0).as_deref(), Some("column"));
        assert_eq!(text(0, 1).as_deref(), Some("ステータス"));
        assert_eq!(text(2, 0).as_deref(), Some("true"));
        assert_eq!(text(2, 1).as_deref(), Some("42"));
        assert_eq!(text(2, 2).as_deref(), Some("2024-03-01"));
        assert_eq!(sheet.get(2, 3), None);
        assert_eq!(text(2, 4).as_deref(), Some("formula"));
        assert_eq!(text(3, 0).as_deref(), Some("Y => Active"));
    }

    #[test]
    fn respects_sheet_criteria() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.xlsx");
        fixture::write_xlsx(&path, &[
            ("users", vec![vec!["x"]]),
            ("orders", vec![vec!["y"]]),
            ("order_items", vec![vec!["z"]]),
        ]);
        let mut spreadsheet = XlsxSpreadsheet::open(path.to_str().unwrap()).unwrap();
        let criteria = Criteria {
            sheet_name_patterns: Some(vec![glob::Pattern::new("order*").unwrap()]),
            sheet_limit: Some(1),
        };
        let sheets = spreadsheet.read_sheets(&criteria).unwrap();
        assert_eq!(sheets.iter().map(|sheet| sheet.name.as_str()).collect::<Vec<_>>(), vec!["orders"]);
    }

    #[test]
    fn malformed_workbook_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();
        assert!(XlsxSpreadsheet::open(path.to_str().unwrap()).is_err());
    }
}
