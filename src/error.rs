use thiserror::Error;

/// Main error type for the crate.
/// Aggregates errors from the schema, codec, store and table modules.
#[derive(Error, Debug)]
pub enum SheetOrmError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    // Third-party library errors
    #[error("{0}")]
    UrlError(#[from] url::ParseError),

    // Database module errors
    #[error("{0}")]
    SchemaError(#[from] crate::database::schema::SchemaError),

    #[error("{0}")]
    RangeError(#[from] crate::database::range::RangeError),

    #[error("{0}")]
    TableError(#[from] crate::database::table::TableError),

    // Spreadsheet module errors
    #[error("{0}")]
    ConversionError(#[from] crate::spreadsheet::codec::ConversionError),

    // Store module errors
    #[error("{0}")]
    TransportError(#[from] crate::store::TransportError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetOrmError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetOrmError::WithContextError(format!("{}: {}", message, e)))
    }
}
