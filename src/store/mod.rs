//! # Tabular Store
//!
//! Transport to the remote grid that backs a table: rectangular reads,
//! rectangular writes and batched multi-range writes. No caching, no retries
//! and no business logic live here.
use crate::database::range::RangeSpec;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub mod credentials;
pub mod memory;
pub mod sheets;

/// Errors raised by a store call. None of them are retried.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Store request issued before authentication")]
    Unauthenticated,

    #[error("Credentials unavailable: {0}")]
    CredentialsError(String),

    #[error("{0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Store answered {status}: {body}")]
    StatusError { status: u16, body: String },

    #[error("Unexpected store response: {0}")]
    ResponseError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// How the store interprets written text.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    /// Stored exactly as given
    #[default]
    Raw,
    /// Parsed as if typed into the sheet (numbers, booleans, dates)
    UserEntered,
}

impl ValueInputOption {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

/// One range of a batched write.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeUpdate {
    pub range: RangeSpec,
    pub values: Vec<Vec<String>>,
}

/// An authenticated view of one spreadsheet.
///
/// Every range carries its sheet name; the spreadsheet itself is fixed by
/// the implementation. `authenticate` must complete before any other call.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Acquires whatever the store needs to accept requests.
    async fn authenticate(&self) -> Result<(), TransportError>;

    /// Reads a rectangle of cell text. Trailing empty cells and rows are
    /// dropped; an empty range yields an empty vector.
    async fn read_range(&self, range: &RangeSpec) -> Result<Vec<Vec<String>>, TransportError>;

    /// Overwrites exactly the addressed cells.
    async fn write_range(
        &self,
        range: &RangeSpec,
        values: Vec<Vec<String>>,
        option: ValueInputOption,
    ) -> Result<(), TransportError>;

    /// Applies every update in a single request; a failure is reported once
    /// for the whole batch.
    async fn batch_write(&self, updates: Vec<RangeUpdate>, option: ValueInputOption) -> Result<(), TransportError>;
}

/// Writes `names` into row 1 unless that row already holds something.
/// Returns whether the header was written.
pub async fn ensure_headers<S: TabularStore + ?Sized>(
    store: &S,
    sheet: &str,
    names: &[String],
    option: ValueInputOption,
) -> Result<bool, TransportError> {
    let range = RangeSpec::row(sheet, 1, names.len());
    let existing = store.read_range(&range).await?;
    let is_blank = existing.iter().flatten().all(|cell| cell.is_empty());
    if !is_blank {
        return Ok(false);
    }
    store.write_range(&range, vec![names.to_vec()], option).await?;
    info!("Headers added to sheet '{}': {}", sheet, names.join(", "));
    Ok(true)
}
