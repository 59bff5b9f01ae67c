//! # Workbook Reading
//!
//! Opens Office Open XML (`.xlsx`, `.xlsm`, `.xltx`, `.xltm`) and OpenDocument
//! (`.ods`) workbooks from local paths or remote URLs and materializes their
//! worksheets as [`Sheet`](sheet::Sheet)s of positioned cells. Everything
//! above this module works on sheets and never sees the container format.

use crate::error::SchemaReadError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

#[cfg(test)]
pub(crate) mod fixture;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Unsupported workbook format: '{0}'")]
    FormatError(String),

    #[error("Workbook part '{0}' is missing")]
    FileError(String),

    #[error("Workbook '{0}' contains no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Workbook '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Shared string {1} referenced by '{0}' does not exist")]
    SharedStringError(String, usize),
}

/// A workbook whose worksheets can be read into memory.
pub(crate) trait Spreadsheet {
    /// File name or URL the workbook was opened from
    fn name(&self) -> String;

    /// Reads the worksheets accepted by `criteria`, in workbook order.
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, SchemaReadError>;
}

/// Opens a workbook, choosing the reader from the file extension.
pub(crate) fn open_spreadsheet(file_name: &str) -> Result<Box<dyn Spreadsheet>, SchemaReadError> {
    match extension_of(file_name).as_str() {
        "xlsx" | "xlsm" | "xltx" | "xltm" => Ok(Box::new(XlsxSpreadsheet::open(file_name)?)),
        "ods" => Ok(Box::new(OdsSpreadsheet::open(file_name)?)),
        _ => Err(SpreadsheetError::FormatError(file_name.to_owned()))?,
    }
}

/// Lower-cased extension, ignoring URL query strings and fragments.
fn extension_of(file_name: &str) -> String {
    let path = file_name
        .split(['?', '#'])
        .next()
        .unwrap_or(file_name);
    let stem = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match stem.rsplit_once('.') {
        Some((_, extension)) => extension.to_ascii_lowercase(),
        None => String::new(),
    }
}
