//! Conversion between sheet rows (header-labelled cell text) and records.

use crate::database::column::FieldKind;
use crate::database::schema::Record;
use crate::database::schema::Schema;
use crate::spreadsheet::cell::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// A cell whose text could not be converted to its field's kind.
/// The field keeps its default value; the load goes on.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "The value '{value}' in row {row} (primary key: {}) could not be converted to {} for field '{field}': {message}",
    .primary_key.as_deref().unwrap_or("unknown"),
    .kind.as_str()
)]
pub struct ConversionError {
    /// 1-based sheet row
    pub row: usize,
    /// Primary-key text of the row, when the key cell itself is readable
    pub primary_key: Option<String>,
    /// Header name of the field
    pub field: String,
    /// Declared kind of the field
    pub kind: FieldKind,
    /// Raw cell text
    pub value: String,
    /// Why the conversion failed
    pub message: String,
}

/// A decoded record together with the cells that fell back to defaults.
#[derive(Debug)]
pub struct Decoded<R> {
    pub record: R,
    pub errors: Vec<ConversionError>,
}

/// Header row for a schema: field names in declaration order.
pub fn header_row(schema: &Schema) -> Vec<String> {
    schema.field_names()
}

/// Maps header names to column indexes. The first occurrence of a repeated
/// name wins.
fn header_index(header: &[String]) -> HashMap<&str, usize> {
    let mut index = HashMap::with_capacity(header.len());
    for (column, name) in header.iter().enumerate() {
        index.entry(name.as_str()).or_insert(column);
    }
    index
}

/// Builds a record from one data row.
///
/// Fields are located by header name, so the sheet's column order may differ
/// from the declaration order. Fields whose column is missing from the
/// header, or lies past the end of a short row, keep their default value.
pub fn decode<R: Record>(schema: &Schema, header: &[String], row: &[String], row_number: usize) -> Decoded<R> {
    let columns = header_index(header);
    let cell = |name: &str| columns.get(name).and_then(|column| row.get(*column));
    let primary_key = cell(schema.primary_key_field().name.as_str())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_owned());

    let mut record = R::default();
    let mut errors = Vec::new();
    for field in schema.fields() {
        let Some(raw) = cell(field.name.as_str()) else {
            continue;
        };
        let failure = match Value::parse(field.kind, raw) {
            Ok(value) => {
                let text = value.to_string();
                if record.set_value(&field.name, value) {
                    None
                } else {
                    Some(format!("{} is out of range for the field's type", text))
                }
            }
            Err(message) => Some(message),
        };
        if let Some(message) = failure {
            let error = ConversionError {
                row: row_number,
                primary_key: primary_key.to_owned(),
                field: field.name.to_owned(),
                kind: field.kind,
                value: raw.to_owned(),
                message,
            };
            warn!("{}; the field keeps its default value", error);
            record.set_value(&field.name, field.kind.default_value());
            errors.push(error);
        }
    }
    Decoded { record, errors }
}

/// Renders a record as cell text in declaration order.
pub fn encode<R: Record>(schema: &Schema, record: &R) -> Vec<String> {
    schema
        .fields()
        .iter()
        .map(|field| {
            record
                .value(&field.name)
                .map(|value| value.to_string())
                .unwrap_or_default()
        })
        .collect()
}
