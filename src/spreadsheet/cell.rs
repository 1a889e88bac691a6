use crate::database::column::FieldKind;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use std::fmt::Display;

/// Date layouts accepted when reading a date cell.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Date/time layouts accepted when reading a date/time cell.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// A typed field value, the in-memory counterpart of one cell's text.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Returns the field kind this value belongs to.
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Text(_) => FieldKind::Text,
            Value::Integer(_) => FieldKind::Integer,
            Value::Float(_) => FieldKind::Float,
            Value::Boolean(_) => FieldKind::Boolean,
            Value::Date(_) => FieldKind::Date,
            Value::DateTime(_) => FieldKind::DateTime,
        }
    }

    /// Converts cell text to a value of the given kind.
    ///
    /// Empty (or all-blank) text is the kind's default and never fails.
    /// On failure the message describes why; callers substitute
    /// [`FieldKind::default_value`].
    pub fn parse(kind: FieldKind, raw: &str) -> Result<Value, String> {
        if kind == FieldKind::Text {
            return Ok(Value::Text(raw.to_owned()));
        }
        let text = raw.trim();
        if text.is_empty() {
            return Ok(kind.default_value());
        }
        match kind {
            FieldKind::Text => Ok(Value::Text(raw.to_owned())),
            FieldKind::Integer => to_integer(text).map(Value::Integer),
            FieldKind::Float => to_float(text).map(Value::Float),
            FieldKind::Boolean => to_boolean(text).map(Value::Boolean),
            FieldKind::Date => to_date(text).map(Value::Date),
            FieldKind::DateTime => to_datetime(text).map(Value::DateTime),
        }
    }

    /// Text used to identify a record by this value, or None when the value
    /// counts as null (empty text).
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Text(text) if text.is_empty() => None,
            Value::Text(text) => Some(text.to_owned()),
            other => Some(other.to_string()),
        }
    }
}

/// Parses an integer, accepting integral decimal renderings such as `3.0`.
fn to_integer(value: &str) -> Result<i64, String> {
    if let Ok(number) = value.parse::<i64>() {
        return Ok(number);
    }
    match value.find('.') {
        Some(index) if value[(index + 1)..].chars().all(|c| c == '0') => value[..index]
            .parse::<i64>()
            .map_err(|e| format!("parse '{}' to integer failed: {}", value, e)),
        _ => Err(format!("parse '{}' to integer failed", value)),
    }
}

fn to_float(value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|e| format!("parse '{}' to float failed: {}", value, e))
}

fn to_boolean(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("parse '{}' to boolean failed", value)),
    }
}

fn to_date(value: &str) -> Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| format!("parse '{}' to date failed", value))
}

fn to_datetime(value: &str) -> Result<NaiveDateTime, String> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            to_date(value)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("parse '{}' to datetime failed", value))
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{}", text),
            Value::Integer(number) => write!(f, "{}", number),
            Value::Float(number) => write!(f, "{}", number),
            Value::Boolean(flag) => write!(f, "{}", if *flag { "TRUE" } else { "FALSE" }),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}
