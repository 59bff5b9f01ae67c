//! Writes prepared output values into DuckDB vectors.

use duckdb::core::FlatVector;
use duckdb::core::Inserter;

/// One output cell of a table function, already converted at bind time.
#[derive(Clone, Debug, PartialEq)]
pub(super) enum OutputValue {
    Text(String),
    Boolean(bool),
    Null,
}

impl From<bool> for OutputValue {
    fn from(value: bool) -> Self {
        OutputValue::Boolean(value)
    }
}

impl From<Option<String>> for OutputValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(OutputValue::Null, OutputValue::Text)
    }
}

pub(super) fn write_to_vector(vector: &mut FlatVector, row: usize, value: &OutputValue) {
    match value {
        OutputValue::Text(text) => vector.insert(row, text.as_str()),
        OutputValue::Boolean(value) => write_primitive(vector, row, *value),
        OutputValue::Null => vector.set_null(row),
    }
}

/// Writes a primitive value directly to a vector using pointer arithmetic.
fn write_primitive<T>(vector: &mut FlatVector, index: usize, value: T) {
    unsafe {
        let pointer: *mut T = vector.as_mut_ptr();
        std::ptr::write(pointer.add(index), value);
    }
}
