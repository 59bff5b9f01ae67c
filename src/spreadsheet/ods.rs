use crate::error::SchemaReadError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use thiserror::Error;
use zip::ZipArchive;

const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const SPREADSHEET: QName = QName(b"office:spreadsheet");
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
/// Cells hidden under a merged range
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// Cell comments, never part of the value
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
/// Run of `text:c` spaces
const SPACES: QName = QName(b"text:s");
const TAB: QName = QName(b"text:tab");
const LINE_BREAK: QName = QName(b"text:line-break");
/// Sheet bounds of spreadsheet applications
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;
/// Cells materialized from one repeated non-empty cell at most
const MAX_REPEATED_CELLS: usize = 16_384;

#[derive(Error, Debug)]
pub enum OdsError {
    #[error("Invalid OpenDocument spreadsheet MIME type")]
    MimeTypeError,
}

/// OpenDocument spreadsheet (.ods)
pub(crate) struct OdsSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
}

impl OdsSpreadsheet {
    /// Opens the container and rejects encrypted or non-spreadsheet documents.
    pub(crate) fn open(file_name: &str) -> Result<Self, SchemaReadError> {
        let mut zip = ZipArchive::new(UnifiedReader::new(file_name)?)?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: file_name.to_owned(),
            zip,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, SchemaReadError> {
        let mut sheets = Vec::<Sheet>::new();
        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_owned()))?;
        'sheets: loop {
            // seek the next accepted table
            let mut sheet_name = None::<String>;
            match_xml_events!(reader => {
                Event::End(event) if event.name() == SPREADSHEET => break 'sheets,
                Event::Start(event) if event.name() == TABLE => {
                    let name = event.get_attribute_value("table:name")?.map(|name| name.to_string()).unwrap_or_default();
                    if criteria.is_full(sheets.len()) {
                        break 'sheets;
                    } else if criteria.accept(&name) {
                        sheet_name = Some(name);
                        break;
                    }
                }
            });
            let sheet_name = match sheet_name {
                Some(sheet_name) => sheet_name,
                None => break,
            };

            let mut sheet = Sheet::new(&self.name, &sheet_name);
            let mut row = 0usize;
            let mut col = 0usize;
            let mut row_count = 1usize;
            let mut col_count = 1usize;
            let mut kind = CellType::default();
            let mut value = String::new();
            let mut in_text = false;
            let mut in_annotation = false;
            let mut paragraphs = 0usize;
            let mut depth = 0usize;
            match_xml_events!(reader => {
                // nested tables (sub-tables) are flattened into the outer one
                Event::Start(event) if event.name() == TABLE => depth += 1,
                Event::End(event) if event.name() == TABLE => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Event::Start(event) if event.name() == TABLE_ROW => {
                    row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                    col = 0;
                }
                Event::End(event) if event.name() == TABLE_ROW => row = row.saturating_add(row_count),
                Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                    value.clear();
                    paragraphs = 0;
                    col_count = event.parse_attribute_value("table:number-columns-repeated")?.unwrap_or(1);
                    let value_type = event.get_attribute_value("office:value-type")?.map(|it| it.to_string());
                    let is_error = event.get_attribute_value("calcext:value-type")?
                        .map(|it| it == "error")
                        .unwrap_or(false);
                    kind = match value_type.as_deref() {
                        None => CellType::Empty,
                        Some(_) if is_error => CellType::Error,
                        Some("string") => CellType::Text,
                        Some("boolean") => CellType::Boolean,
                        Some("date") => CellType::IsoDateTime,
                        Some("time") => CellType::IsoDuration,
                        Some(_) => CellType::Number,
                    };
                    let attribute = match kind {
                        CellType::Boolean => Some("office:boolean-value"),
                        CellType::IsoDateTime => Some("office:date-value"),
                        CellType::IsoDuration => Some("office:time-value"),
                        CellType::Number => Some("office:value"),
                        _ => None,
                    };
                    if let Some(attribute) = attribute {
                        if let Some(data) = event.get_attribute_value(attribute)? {
                            if kind == CellType::Boolean {
                                value.push_str(if data == "true" || data == "1" { "1" } else { "0" });
                            } else {
                                value.push_str(&data);
                            }
                        }
                    }
                    in_text = kind == CellType::Text;
                }
                Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                    if kind != CellType::Empty && kind != CellType::Error && !value.is_empty() {
                        for (row, col) in repeated_positions(row, col, row_count, col_count) {
                            sheet.push(Cell {
                                row,
                                col,
                                kind,
                                value: value.to_owned(),
                            });
                        }
                    }
                    col = col.saturating_add(col_count);
                    kind = CellType::Empty;
                    in_text = false;
                    in_annotation = false;
                }
                Event::Start(event) if in_text && event.name() == ANNOTATION => in_annotation = true,
                Event::End(event) if in_text && event.name() == ANNOTATION => in_annotation = false,
                Event::Start(event) if in_text && !in_annotation && event.name() == PARAGRAPH => {
                    if paragraphs > 0 {
                        value.push('\n');
                    }
                    paragraphs += 1;
                }
                Event::Start(event) if in_text && !in_annotation && event.name() == SPACES => {
                    let count = event.parse_attribute_value("text:c")?.unwrap_or(1usize);
                    value.push_str(&" ".repeat(count));
                }
                Event::Start(event) if in_text && !in_annotation && event.name() == TAB => value.push('\t'),
                Event::Start(event) if in_text && !in_annotation && event.name() == LINE_BREAK => value.push('\n'),
                Event::Text(event) if in_text && !in_annotation => value.push_str(&event.xml_content()?),
                Event::GeneralRef(event) if in_text && !in_annotation => value.push_bytes_ref(&event)?,
            });
            sheets.push(sheet);
        }

        Ok(sheets)
    }
}

/// Positions covered by a cell repeated over `row_count` rows and `col_count`
/// columns, clipped to the sheet bounds and to [`MAX_REPEATED_CELLS`].
fn repeated_positions(row: usize, col: usize, row_count: usize, col_count: usize) -> impl Iterator<Item = (usize, usize)> {
    let rows = row_count.min(MAX_ROWS.saturating_sub(row));
    let cols = col_count.min(MAX_COLS.saturating_sub(col));
    if rows.saturating_mul(cols) > MAX_REPEATED_CELLS {
        tracing::debug!("Cell at row {} col {} repeated {}x{}, truncated to {} cells", row, col, rows, cols, MAX_REPEATED_CELLS);
    }
    (0..rows)
        .flat_map(move |row_offset| (0..cols).map(move |col_offset| (row + row_offset, col + col_offset)))
        .take(MAX_REPEATED_CELLS)
}

/// Rejects archives whose `mimetype` entry is not an OpenDocument spreadsheet.
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), SchemaReadError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.as_slice() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// An `encryption-data` entry in the manifest marks an encrypted document.
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, SchemaReadError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::End(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}
