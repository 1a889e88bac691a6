//! Record declarations and the validated field layout of a record type.

use crate::database::column::Field;
use crate::database::column::FieldKind;
use crate::spreadsheet::cell::Value;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use thiserror::Error;

/// Errors in the field declarations of a record type.
#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    #[error("Record type '{0}' declares no fields")]
    Empty(String),

    #[error("Record type '{0}' declares no primary key")]
    MissingPrimaryKey(String),

    #[error("Record type '{record}' declares more than one primary key: {fields:?}")]
    MultiplePrimaryKeys { record: String, fields: Vec<String> },

    #[error("Record type '{record}' declares field '{field}' more than once")]
    DuplicateField { record: String, field: String },
}

/// Rust types usable as record fields.
pub trait FieldType: Sized {
    /// Declared kind of a field of this type.
    const KIND: FieldKind;

    fn to_value(&self) -> Value;

    /// Returns None when the value is of another kind or out of range.
    fn from_value(value: Value) -> Option<Self>;
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.to_owned())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(number) => Some(number),
            _ => None,
        }
    }
}

/// Narrower integer types convert through `i64`.
macro_rules! impl_integer_field {
    ($($kind:ty),+) => {
        $(
            impl FieldType for $kind {
                const KIND: FieldKind = FieldKind::Integer;

                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Integer(number) => <$kind>::try_from(number).ok(),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_integer_field!(i32, u32, i16, u16, u8);

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(number) => Some(number),
            _ => None,
        }
    }
}

impl FieldType for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(number) => Some(number as f32),
            _ => None,
        }
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Boolean(flag) => Some(flag),
            _ => None,
        }
    }
}

impl FieldType for NaiveDate {
    const KIND: FieldKind = FieldKind::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Date(date) => Some(date),
            _ => None,
        }
    }
}

impl FieldType for NaiveDateTime {
    const KIND: FieldKind = FieldKind::DateTime;

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::DateTime(datetime) => Some(datetime),
            _ => None,
        }
    }
}

/// Kind of a field, taken from its Rust type. Used by [`impl_record!`].
pub fn kind_of<T: FieldType>(_: &T) -> FieldKind {
    T::KIND
}

/// A type whose instances map to rows of a sheet.
///
/// Implementations are usually generated with [`impl_record!`].
pub trait Record: Default {
    /// Fields in declaration order; this order is the column order.
    fn fields() -> Vec<Field>;

    /// Reads the field with the given header name.
    fn value(&self, field: &str) -> Option<Value>;

    /// Assigns the field with the given header name. Returns false when no
    /// such field exists or the value does not fit the field's type.
    fn set_value(&mut self, field: &str, value: Value) -> bool;
}

/// Declares how a struct maps to sheet columns.
///
/// ```
/// use sheet_orm::impl_record;
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Pet {
///     name: String,
///     age: i32,
/// }
///
/// impl_record!(Pet, primary_key = name, {
///     name => "Name",
///     age => "Age",
/// });
/// ```
#[macro_export]
macro_rules! impl_record {
    ($record:ty, primary_key = $key:ident, { $($field:ident => $name:literal),+ $(,)? }) => {
        impl $crate::database::schema::Record for $record {
            fn fields() -> ::std::vec::Vec<$crate::database::column::Field> {
                let sample = <$record as ::std::default::Default>::default();
                ::std::vec![
                    $(
                        $crate::database::column::Field::new(
                            $name,
                            $crate::database::schema::kind_of(&sample.$field),
                            stringify!($field) == stringify!($key),
                        )
                    ),+
                ]
            }

            fn value(&self, field: &str) -> ::std::option::Option<$crate::spreadsheet::cell::Value> {
                match field {
                    $($name => ::std::option::Option::Some(
                        $crate::database::schema::FieldType::to_value(&self.$field)
                    ),)+
                    _ => ::std::option::Option::None,
                }
            }

            fn set_value(&mut self, field: &str, value: $crate::spreadsheet::cell::Value) -> bool {
                match field {
                    $($name => match $crate::database::schema::FieldType::from_value(value) {
                        ::std::option::Option::Some(converted) => {
                            self.$field = converted;
                            true
                        }
                        ::std::option::Option::None => false,
                    },)+
                    _ => false,
                }
            }
        }
    };
}

/// The validated field layout of a record type.
#[derive(Clone, Debug)]
pub struct Schema {
    /// Record type name, used in messages
    name: String,
    /// Fields in declaration order
    fields: Vec<Field>,
    /// Index of the primary-key field
    primary_key: usize,
}

impl Schema {
    /// Builds and validates the schema of a record type.
    pub fn of<R: Record>() -> Result<Self, SchemaError> {
        Self::new(std::any::type_name::<R>(), R::fields())
    }

    /// Validates a declared field list: at least one field, unique names and
    /// exactly one primary key.
    pub fn new(name: &str, fields: Vec<Field>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::Empty(name.to_owned()));
        }
        let mut names = HashSet::new();
        for field in &fields {
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    record: name.to_owned(),
                    field: field.name.to_owned(),
                });
            }
        }
        let keys: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.primary_key)
            .map(|(index, _)| index)
            .collect();
        match keys.as_slice() {
            [] => Err(SchemaError::MissingPrimaryKey(name.to_owned())),
            [index] => Ok(Self {
                name: name.to_owned(),
                primary_key: *index,
                fields,
            }),
            _ => Err(SchemaError::MultiplePrimaryKeys {
                record: name.to_owned(),
                fields: keys.iter().map(|index| fields[*index].name.to_owned()).collect(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Header names in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.to_owned()).collect()
    }

    pub fn primary_key_field(&self) -> &Field {
        &self.fields[self.primary_key]
    }

    /// The record's primary-key value as text, None when null.
    pub fn key_of<R: Record>(&self, record: &R) -> Option<String> {
        record
            .value(&self.primary_key_field().name)
            .and_then(|value| value.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Pet {
        name: String,
        species: String,
        age: i32,
        price: f64,
        vaccinated: bool,
    }

    crate::impl_record!(Pet, primary_key = name, {
        name => "Name",
        species => "Species",
        age => "Age",
        price => "Price",
        vaccinated => "Vaccinated",
    });

    #[test]
    fn fields_follow_declaration_order() {
        let schema = Schema::of::<Pet>().unwrap();
        assert_eq!(
            schema.field_names(),
            vec!["Name", "Species", "Age", "Price", "Vaccinated"]
        );
        assert_eq!(schema.field_names(), schema.field_names());
        let kinds: Vec<FieldKind> = schema.fields().iter().map(|field| field.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FieldKind::Text,
                FieldKind::Text,
                FieldKind::Integer,
                FieldKind::Float,
                FieldKind::Boolean
            ]
        );
    }

    #[test]
    fn primary_key_is_declared_field() {
        let schema = Schema::of::<Pet>().unwrap();
        assert_eq!(schema.primary_key_field().name, "Name");
        assert!(schema.primary_key_field().primary_key);
    }

    #[test]
    fn generated_accessors() {
        let mut pet = Pet::default();
        assert!(pet.set_value("Name", Value::Text("Buddy".to_owned())));
        assert!(pet.set_value("Age", Value::Integer(2)));
        assert!(!pet.set_value("Age", Value::Text("two".to_owned())));
        assert!(!pet.set_value("Age", Value::Integer(i64::MAX)));
        assert!(!pet.set_value("Owner", Value::Text("x".to_owned())));
        assert_eq!(pet.age, 2);
        assert_eq!(pet.value("Name"), Some(Value::Text("Buddy".to_owned())));
        assert_eq!(pet.value("Owner"), None);
    }

    #[test]
    fn key_of_treats_empty_text_as_null() {
        let schema = Schema::of::<Pet>().unwrap();
        let mut pet = Pet::default();
        assert_eq!(schema.key_of(&pet), None);
        pet.name = "Fluffy".to_owned();
        assert_eq!(schema.key_of(&pet), Some("Fluffy".to_owned()));
    }

    #[test]
    fn rejects_missing_primary_key() {
        let fields = vec![
            Field::new("Name", FieldKind::Text, false),
            Field::new("Age", FieldKind::Integer, false),
        ];
        assert_eq!(
            Schema::new("Pet", fields).unwrap_err(),
            SchemaError::MissingPrimaryKey("Pet".to_owned())
        );
    }

    #[test]
    fn rejects_multiple_primary_keys() {
        let fields = vec![
            Field::new("Name", FieldKind::Text, true),
            Field::new("Tag", FieldKind::Integer, true),
        ];
        assert_eq!(
            Schema::new("Pet", fields).unwrap_err(),
            SchemaError::MultiplePrimaryKeys {
                record: "Pet".to_owned(),
                fields: vec!["Name".to_owned(), "Tag".to_owned()],
            }
        );
    }

    #[test]
    fn rejects_duplicate_and_empty_declarations() {
        let fields = vec![
            Field::new("Name", FieldKind::Text, true),
            Field::new("Name", FieldKind::Text, false),
        ];
        assert!(matches!(
            Schema::new("Pet", fields),
            Err(SchemaError::DuplicateField { .. })
        ));
        assert_eq!(
            Schema::new("Pet", vec![]).unwrap_err(),
            SchemaError::Empty("Pet".to_owned())
        );
    }

    #[derive(Default)]
    struct Unkeyed {
        note: String,
    }

    crate::impl_record!(Unkeyed, primary_key = id, {
        note => "Note",
    });

    #[test]
    fn macro_with_unknown_key_is_rejected() {
        assert!(matches!(
            Schema::of::<Unkeyed>(),
            Err(SchemaError::MissingPrimaryKey(_))
        ));
    }
}
