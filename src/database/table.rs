//! # Table
//!
//! A [`Table`] owns the records of one sheet tab and tracks which row each
//! primary key occupies. Row 1 holds the header; records follow from row 2
//! in load/add order, and a record's row address never changes once given.
//!
//! Lifecycle: `Constructed -> Authenticating -> Ready`. [`Table::load`]
//! connects on demand; [`Table::save`] refuses to run before the table is
//! ready and [`Table::add`] refuses to run before a load, so that new rows
//! are always numbered after the rows already in the sheet.
use crate::config::SheetConfig;
use crate::database::range::RangeSpec;
use crate::database::schema::Record;
use crate::database::schema::Schema;
use crate::error::SheetOrmError;
use crate::spreadsheet::codec::decode;
use crate::spreadsheet::codec::encode;
use crate::spreadsheet::codec::header_row;
use crate::spreadsheet::codec::ConversionError;
use crate::store::ensure_headers;
use crate::store::RangeUpdate;
use crate::store::TabularStore;
use crate::store::ValueInputOption;
use std::collections::HashMap;
use std::fmt::Display;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// First row holding a record; row 1 is the header.
const FIRST_DATA_ROW: usize = 2;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Cannot {operation} sheet '{sheet}' while the table is {state}")]
    NotReady {
        sheet: String,
        operation: &'static str,
        state: TableState,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TableState {
    /// Created, no store call made yet
    Constructed,
    /// Authentication or header bootstrap in progress
    Authenticating,
    /// Authenticated with the header row in place
    Ready,
}

impl Display for TableState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TableState::Constructed => "not connected",
            TableState::Authenticating => "connecting",
            TableState::Ready => "ready",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a [`Table::load`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadReport {
    /// Data rows read (the header excluded)
    pub rows: usize,
    /// Records registered in the change tracker
    pub tracked: usize,
    /// Rows whose primary key was already taken by an earlier row, as (key, row)
    pub duplicates: Vec<(String, usize)>,
    /// Rows without a primary-key value
    pub unkeyed: usize,
    /// Cells that fell back to their field's default value
    pub errors: Vec<ConversionError>,
}

impl LoadReport {
    /// Fails with the first conversion error, if any.
    pub fn ensure_clean(self) -> Result<Self, SheetOrmError> {
        if let Some(error) = self.errors.first() {
            Err(error.to_owned())?;
        }
        Ok(self)
    }
}

/// Where a tracked record lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct TrackedRow {
    /// Position in the record list
    index: usize,
    /// 1-based sheet row
    row: usize,
}

/// Typed view over one sheet tab.
pub struct Table<R: Record, S: TabularStore> {
    store: S,
    sheet: String,
    schema: Schema,
    state: TableState,
    loaded: bool,
    header_input_option: ValueInputOption,
    save_input_option: ValueInputOption,
    /// Every decoded or added record, in load/add order
    records: Vec<R>,
    /// Primary key to record position and row address
    tracker: HashMap<String, TrackedRow>,
}

impl<R: Record, S: TabularStore> Table<R, S> {
    /// Creates a table over `sheet`. Fails when `R` does not declare exactly
    /// one primary key.
    pub fn new(store: S, sheet: &str) -> Result<Self, SheetOrmError> {
        Ok(Self {
            store,
            sheet: sheet.to_owned(),
            schema: Schema::of::<R>()?,
            state: TableState::Constructed,
            loaded: false,
            header_input_option: ValueInputOption::Raw,
            save_input_option: ValueInputOption::UserEntered,
            records: Vec::new(),
            tracker: HashMap::new(),
        })
    }

    /// Creates a table using the sheet name and input options of `config`.
    pub fn from_config(store: S, config: &SheetConfig) -> Result<Self, SheetOrmError> {
        Ok(Self::new(store, &config.sheet_name)?
            .with_input_options(config.header_input_option, config.save_input_option))
    }

    pub fn with_input_options(mut self, header: ValueInputOption, save: ValueInputOption) -> Self {
        self.header_input_option = header;
        self.save_input_option = save;
        self
    }

    /// Authenticates and writes the header row if the sheet has none.
    /// Does nothing once the table is ready.
    pub async fn connect(&mut self) -> Result<(), SheetOrmError> {
        if self.state == TableState::Ready {
            return Ok(());
        }
        self.state = TableState::Authenticating;
        match self.bootstrap().await {
            Ok(()) => {
                self.state = TableState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = TableState::Constructed;
                Err(e)
            }
        }
    }

    async fn bootstrap(&self) -> Result<(), SheetOrmError> {
        self.store.authenticate().await?;
        let written = ensure_headers(
            &self.store,
            &self.sheet,
            &header_row(&self.schema),
            self.header_input_option,
        )
        .await?;
        debug!("Sheet '{}' ready (header written: {})", self.sheet, written);
        Ok(())
    }

    /// Replaces the in-memory records with the sheet's content.
    ///
    /// Rows are decoded in sheet order and numbered from row 2. The first row
    /// carrying a given primary key is tracked; later rows with the same key
    /// and rows without a key are kept for iteration but never saved.
    pub async fn load(&mut self) -> Result<LoadReport, SheetOrmError> {
        self.connect().await?;
        let range = RangeSpec::sheet(&self.sheet);
        let mut rows = self.store.read_range(&range).await?.into_iter();
        let header = rows.next().unwrap_or_default();
        if header != header_row(&self.schema) {
            warn!(
                "Header of sheet '{}' is [{}], declared fields are [{}]; fields are read by name but saved in declaration order",
                self.sheet,
                header.join(", "),
                self.schema.field_names().join(", ")
            );
        }

        self.records.clear();
        self.tracker.clear();
        let mut report = LoadReport::default();
        for (offset, row) in rows.enumerate() {
            let row_number = FIRST_DATA_ROW + offset;
            let decoded = decode::<R>(&self.schema, &header, &row, row_number);
            report.rows += 1;
            report.errors.extend(decoded.errors);
            match self.schema.key_of(&decoded.record) {
                Some(key) if self.tracker.contains_key(&key) => report.duplicates.push((key, row_number)),
                Some(key) => {
                    self.tracker.insert(
                        key,
                        TrackedRow {
                            index: self.records.len(),
                            row: row_number,
                        },
                    );
                    report.tracked += 1;
                }
                None => report.unkeyed += 1,
            }
            self.records.push(decoded.record);
        }
        for (key, row) in &report.duplicates {
            warn!("Row {} of sheet '{}' repeats primary key '{}' and will not be saved", row, self.sheet, key);
        }
        self.loaded = true;
        info!(
            "Loaded {} rows from sheet '{}' ({} tracked, {} conversion errors)",
            report.rows,
            self.sheet,
            report.tracked,
            report.errors.len()
        );
        Ok(report)
    }

    /// Appends a record, then tracks it at the next free row unless its
    /// primary key is empty or already tracked. Returns whether it was tracked.
    pub fn add(&mut self, record: R) -> Result<bool, SheetOrmError> {
        if !self.loaded {
            Err(self.not_ready("add to"))?;
        }
        let key = self.schema.key_of(&record);
        self.records.push(record);
        let index = self.records.len() - 1;
        match key {
            Some(key) if !self.tracker.contains_key(&key) => {
                self.tracker.insert(
                    key,
                    TrackedRow {
                        index,
                        row: FIRST_DATA_ROW + index,
                    },
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Writes every tracked record to its row in one batch request.
    /// Returns the number of rows written.
    pub async fn save(&mut self) -> Result<usize, SheetOrmError> {
        if self.state != TableState::Ready {
            Err(self.not_ready("save"))?;
        }
        let mut rows: Vec<TrackedRow> = self.tracker.values().copied().collect();
        rows.sort_by_key(|tracked| tracked.row);
        let width = self.schema.fields().len();
        let updates: Vec<RangeUpdate> = rows
            .iter()
            .map(|tracked| RangeUpdate {
                range: RangeSpec::row(&self.sheet, tracked.row, width),
                values: vec![encode(&self.schema, &self.records[tracked.index])],
            })
            .collect();
        let count = updates.len();
        if count > 0 {
            self.store.batch_write(updates, self.save_input_option).await?;
        }
        info!("Saved {} rows to sheet '{}'", count, self.sheet);
        Ok(count)
    }

    fn not_ready(&self, operation: &'static str) -> TableError {
        TableError::NotReady {
            sheet: self.sheet.to_owned(),
            operation,
            state: self.state,
        }
    }

    /// Records in load/add order. Never triggers a load.
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    /// Mutable records in load/add order. Changing a primary key here does
    /// not move the record: it keeps being saved to its original row.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, R> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The tracked record with this primary key.
    pub fn get(&self, key: &str) -> Option<&R> {
        self.tracker.get(key).map(|tracked| &self.records[tracked.index])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut R> {
        let index = self.tracker.get(key)?.index;
        self.records.get_mut(index)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tracker.contains_key(key)
    }

    /// Row address of the tracked record with this primary key.
    pub fn row_of(&self, key: &str) -> Option<usize> {
        self.tracker.get(key).map(|tracked| tracked.row)
    }

    /// Number of records a save writes.
    pub fn tracked(&self) -> usize {
        self.tracker.len()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<'a, R: Record, S: TabularStore> IntoIterator for &'a Table<R, S> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::memory::StoreRequest;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Pet {
        name: String,
        age: i64,
    }

    crate::impl_record!(Pet, primary_key = name, {
        name => "Name",
        age => "Age",
    });

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn pet(name: &str, age: i64) -> Pet {
        Pet {
            name: name.to_owned(),
            age,
        }
    }

    async fn store(rows: &[&[&str]]) -> MemoryStore {
        MemoryStore::new()
            .with_sheet("Pets", rows.iter().map(|row| strings(row)).collect())
            .await
    }

    #[tokio::test]
    async fn connect_moves_to_ready() {
        let mut table = Table::<Pet, _>::new(store(&[]).await, "Pets").unwrap();
        assert_eq!(table.state(), TableState::Constructed);
        table.connect().await.unwrap();
        assert_eq!(table.state(), TableState::Ready);
        assert_eq!(table.store().rows("Pets").await, vec![strings(&["Name", "Age"])]);
    }

    #[tokio::test]
    async fn failed_connect_returns_to_constructed() {
        let store = store(&[]).await;
        store.fail_next("offline").await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        assert!(table.connect().await.is_err());
        assert_eq!(table.state(), TableState::Constructed);
        table.connect().await.unwrap();
        assert_eq!(table.state(), TableState::Ready);
    }

    #[tokio::test]
    async fn save_before_ready_fails() {
        let mut table = Table::<Pet, _>::new(store(&[]).await, "Pets").unwrap();
        let error = table.save().await.unwrap_err();
        assert!(matches!(
            error,
            SheetOrmError::TableError(TableError::NotReady {
                operation: "save",
                state: TableState::Constructed,
                ..
            })
        ));
        assert!(table.store().requests().await.is_empty());
    }

    #[tokio::test]
    async fn add_before_load_fails() {
        let mut table = Table::<Pet, _>::new(store(&[]).await, "Pets").unwrap();
        assert!(table.add(pet("Fluffy", 3)).is_err());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn load_assigns_rows_in_order() {
        let store = store(&[&["Name", "Age"], &["Buddy", "1"], &["Rex", "4"], &["Max", "2"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        let report = table.load().await.unwrap();
        assert_eq!(report.rows, 3);
        assert_eq!(report.tracked, 3);
        assert_eq!(table.row_of("Buddy"), Some(2));
        assert_eq!(table.row_of("Rex"), Some(3));
        assert_eq!(table.row_of("Max"), Some(4));
        let names: Vec<&str> = table.iter().map(|pet| pet.name.as_str()).collect();
        assert_eq!(names, vec!["Buddy", "Rex", "Max"]);
    }

    #[tokio::test]
    async fn first_duplicate_wins() {
        let store = store(&[&["Name", "Age"], &["Buddy", "1"], &["Buddy", "9"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        let report = table.load().await.unwrap();
        assert_eq!(report.duplicates, vec![("Buddy".to_owned(), 3)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.tracked(), 1);
        assert_eq!(table.get("Buddy"), Some(&pet("Buddy", 1)));
        assert_eq!(table.row_of("Buddy"), Some(2));
    }

    #[tokio::test]
    async fn unkeyed_rows_are_iterated_not_tracked() {
        let store = store(&[&["Name", "Age"], &["", "5"], &["Rex", "4"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        let report = table.load().await.unwrap();
        assert_eq!(report.unkeyed, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.row_of("Rex"), Some(3));
    }

    #[tokio::test]
    async fn add_takes_next_free_row() {
        let store = store(&[&["Name", "Age"], &["Buddy", "1"], &["Buddy", "2"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        table.load().await.unwrap();
        assert!(table.add(pet("Fluffy", 3)).unwrap());
        assert_eq!(table.row_of("Fluffy"), Some(4));
        assert!(!table.add(pet("Fluffy", 5)).unwrap());
        assert!(!table.add(pet("", 5)).unwrap());
        assert_eq!(table.len(), 5);
        assert!(table.add(pet("Max", 1)).unwrap());
        assert_eq!(table.row_of("Max"), Some(7));
    }

    #[tokio::test]
    async fn save_writes_tracked_rows_in_one_batch() {
        let store = store(&[&["Name", "Age"], &["Buddy", "1"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        table.load().await.unwrap();
        table.add(pet("Fluffy", 3)).unwrap();
        table.add(pet("", 8)).unwrap();
        table.store().clear_requests().await;

        assert_eq!(table.save().await.unwrap(), 2);
        assert_eq!(
            table.store().requests().await,
            vec![StoreRequest::BatchWrite {
                updates: vec![
                    ("Pets!A2:B2".to_owned(), vec![strings(&["Buddy", "1"])]),
                    ("Pets!A3:B3".to_owned(), vec![strings(&["Fluffy", "3"])]),
                ],
                option: ValueInputOption::UserEntered,
            }]
        );
    }

    #[tokio::test]
    async fn save_with_nothing_tracked_sends_nothing() {
        let mut table = Table::<Pet, _>::new(store(&[]).await, "Pets").unwrap();
        table.load().await.unwrap();
        table.store().clear_requests().await;
        assert_eq!(table.save().await.unwrap(), 0);
        assert!(table.store().requests().await.is_empty());
    }

    #[tokio::test]
    async fn changed_key_keeps_row() {
        let store = store(&[&["Name", "Age"], &["Buddy", "1"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        table.load().await.unwrap();
        if let Some(buddy) = table.get_mut("Buddy") {
            buddy.name = "Bud".to_owned();
        }
        table.save().await.unwrap();
        assert_eq!(
            table.store().rows("Pets").await,
            vec![strings(&["Name", "Age"]), strings(&["Bud", "1"])]
        );
    }

    #[tokio::test]
    async fn transport_failure_surfaces_from_save() {
        let store = store(&[&["Name", "Age"], &["Buddy", "1"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        table.load().await.unwrap();
        table.store().fail_next("quota exceeded").await;
        assert!(matches!(
            table.save().await,
            Err(SheetOrmError::TransportError(_))
        ));
        assert_eq!(table.store().rows("Pets").await[1], strings(&["Buddy", "1"]));
    }

    #[tokio::test]
    async fn load_reads_columns_past_declared_width() {
        let store = store(&[&["Id", "Name", "Age"], &["1", "Buddy", "4"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        let report = table.load().await.unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(table.get("Buddy"), Some(&pet("Buddy", 4)));
        assert!(table
            .store()
            .requests()
            .await
            .contains(&StoreRequest::Read { range: "Pets".to_owned() }));
    }

    #[tokio::test]
    async fn reload_replaces_records() {
        let store = store(&[&["Name", "Age"], &["Buddy", "1"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        table.load().await.unwrap();
        table.load().await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.row_of("Buddy"), Some(2));
    }

    #[tokio::test]
    async fn conversion_errors_are_reported() {
        let store = store(&[&["Name", "Age"], &["Buddy", "abc"]]).await;
        let mut table = Table::<Pet, _>::new(store, "Pets").unwrap();
        let report = table.load().await.unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(table.get("Buddy"), Some(&pet("Buddy", 0)));
        assert!(matches!(
            report.ensure_clean(),
            Err(SheetOrmError::ConversionError(_))
        ));
    }
}
