use crate::spreadsheet::cell::Value;
use chrono::NaiveDate;
use chrono::NaiveDateTime;

/// Primitive kinds a record field may declare.
/// Every kind has a text form in both directions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Free text, never fails to convert
    Text,
    /// 64-bit signed integers
    Integer,
    /// Double-precision floating point numbers
    Float,
    /// Boolean values (true/false)
    Boolean,
    /// Calendar date without time component
    Date,
    /// Date and time without time zone
    DateTime,
}

/// One declared field of a record type: its header name, kind and
/// whether it is the primary key.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Column header name
    pub name: String,
    /// Declared primitive kind
    pub kind: FieldKind,
    /// Whether this field uniquely identifies a record
    pub primary_key: bool,
}

impl Field {
    pub fn new(name: &str, kind: FieldKind, primary_key: bool) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            primary_key,
        }
    }
}

impl FieldKind {
    /// Returns the lower-case name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
        }
    }

    /// The value a field of this kind holds when its cell is missing,
    /// empty or unconvertible.
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Text => Value::Text(String::new()),
            FieldKind::Integer => Value::Integer(0),
            FieldKind::Float => Value::Float(0.0),
            FieldKind::Boolean => Value::Boolean(false),
            FieldKind::Date => Value::Date(NaiveDate::default()),
            FieldKind::DateTime => Value::DateTime(NaiveDateTime::default()),
        }
    }
}
