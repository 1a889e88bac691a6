//! # Sheet ORM
//!
//! Typed records over a single spreadsheet tab. A record type declares its
//! fields and one primary key; a [`Table`] loads the tab into records, lets
//! callers read, change and add them, and writes every tracked record back
//! to its row in one batched request.
//!
//! ## Layout of a tab
//!
//! - Row 1 holds the header: one column per declared field, in declaration order
//! - Rows 2 and onward hold one record each, in load/add order
//! - A record keeps its row for the lifetime of the table
//!
//! ## Example
//!
//! ```no_run
//! use sheet_orm::impl_record;
//! use sheet_orm::MemoryStore;
//! use sheet_orm::Table;
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Pet {
//!     name: String,
//!     age: i32,
//! }
//!
//! impl_record!(Pet, primary_key = name, {
//!     name => "Name",
//!     age => "Age",
//! });
//!
//! # async fn run() -> Result<(), sheet_orm::SheetOrmError> {
//! let store = MemoryStore::new().with_sheet("Pets", Vec::new()).await;
//! let mut pets = Table::<Pet, _>::new(store, "Pets")?;
//! pets.load().await?;
//! pets.add(Pet { name: "Fluffy".to_owned(), age: 3 })?;
//! pets.save().await?;
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod database;
pub mod error;
pub mod spreadsheet;
pub mod store;

pub use crate::config::SheetConfig;
pub use crate::database::column::Field;
pub use crate::database::column::FieldKind;
pub use crate::database::range::RangeSpec;
pub use crate::database::schema::FieldType;
pub use crate::database::schema::Record;
pub use crate::database::schema::Schema;
pub use crate::database::table::LoadReport;
pub use crate::database::table::Table;
pub use crate::database::table::TableState;
pub use crate::error::SheetOrmError;
pub use crate::spreadsheet::cell::Value;
pub use crate::spreadsheet::codec::ConversionError;
pub use crate::store::credentials::Credentials;
pub use crate::store::credentials::StaticToken;
pub use crate::store::memory::MemoryStore;
pub use crate::store::sheets::SheetsStore;
pub use crate::store::TabularStore;
pub use crate::store::ValueInputOption;
