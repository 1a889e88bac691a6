//! In-process store that behaves like a remote sheet grid and journals
//! every request it receives.

use crate::database::range::RangeSpec;
use crate::store::RangeUpdate;
use crate::store::TabularStore;
use crate::store::TransportError;
use crate::store::ValueInputOption;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A request as received by [`MemoryStore`], ranges rendered in A1 form.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreRequest {
    Authenticate,
    Read {
        range: String,
    },
    Write {
        range: String,
        values: Vec<Vec<String>>,
        option: ValueInputOption,
    },
    BatchWrite {
        updates: Vec<(String, Vec<Vec<String>>)>,
        option: ValueInputOption,
    },
}

#[derive(Default)]
struct MemoryState {
    /// Cell grids by sheet name, row-major, 0-based
    sheets: HashMap<String, Vec<Vec<String>>>,
    /// Every request received, in order
    journal: Vec<StoreRequest>,
    /// Failure to return from the next request
    fail_next: Option<String>,
    authenticated: bool,
}

/// Clones share the same grid, so a test can keep one handle while a table
/// owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet holding `rows` (row 1 first), replacing any sheet of
    /// the same name. Clones made earlier see the new sheet too.
    pub async fn with_sheet(self, name: &str, rows: Vec<Vec<String>>) -> Self {
        self.state.write().await.sheets.insert(name.to_owned(), rows);
        self
    }

    /// The sheet's content as a read of the whole grid would return it.
    pub async fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        let state = self.state.read().await;
        state.sheets.get(sheet).map(|grid| trim(grid.to_vec())).unwrap_or_default()
    }

    pub async fn requests(&self) -> Vec<StoreRequest> {
        self.state.read().await.journal.to_vec()
    }

    pub async fn clear_requests(&self) {
        self.state.write().await.journal.clear();
    }

    /// Makes the next request fail with [`TransportError::Unavailable`].
    pub async fn fail_next(&self, message: &str) {
        self.state.write().await.fail_next = Some(message.to_owned());
    }

    /// Records the request, then applies the injected failure and the
    /// authentication check.
    fn admit(state: &mut MemoryState, request: StoreRequest) -> Result<(), TransportError> {
        debug!("Memory store request: {:?}", request);
        let is_authenticate = request == StoreRequest::Authenticate;
        state.journal.push(request);
        if let Some(message) = state.fail_next.take() {
            return Err(TransportError::Unavailable(message));
        }
        if !is_authenticate && !state.authenticated {
            return Err(TransportError::Unauthenticated);
        }
        Ok(())
    }
}

/// Drops trailing empty cells of every row, then trailing empty rows.
fn trim(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    for row in rows.iter_mut() {
        while row.last().map(|cell| cell.is_empty()).unwrap_or(false) {
            row.pop();
        }
    }
    while rows.last().map(|row| row.is_empty()).unwrap_or(false) {
        rows.pop();
    }
    rows
}

fn unknown_sheet(range: &RangeSpec) -> TransportError {
    TransportError::StatusError {
        status: 400,
        body: format!("Unable to parse range: {}", range),
    }
}

/// Copies the addressed rectangle out of a grid.
fn read_grid(grid: &[Vec<String>], range: &RangeSpec) -> Vec<Vec<String>> {
    let first = range.row_lower_bound - 1;
    let last = range
        .row_upper_bound
        .map(|row| row.min(grid.len()))
        .unwrap_or(grid.len());
    let rows = (first..last)
        .map(|index| {
            let row = &grid[index];
            let end = range
                .col_upper_bound
                .map(|col| col + 1)
                .unwrap_or(row.len())
                .max(range.col_lower_bound);
            (range.col_lower_bound..end)
                .map(|col| row.get(col).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    trim(rows)
}

/// Checks that `values` fits inside `range`.
fn check_fits(range: &RangeSpec, values: &[Vec<String>]) -> Result<(), TransportError> {
    let height_fits = range
        .row_upper_bound
        .map(|row| values.len() <= row - range.row_lower_bound + 1)
        .unwrap_or(true);
    let width_fits = range
        .width()
        .map(|width| values.iter().all(|row| row.len() <= width))
        .unwrap_or(true);
    if height_fits && width_fits {
        Ok(())
    } else {
        Err(TransportError::StatusError {
            status: 400,
            body: format!("Requested writing outside of range {}", range),
        })
    }
}

fn write_grid(grid: &mut Vec<Vec<String>>, range: &RangeSpec, values: &[Vec<String>]) {
    for (offset, values) in values.iter().enumerate() {
        let index = range.row_lower_bound - 1 + offset;
        if grid.len() <= index {
            grid.resize(index + 1, Vec::new());
        }
        let row = &mut grid[index];
        for (col_offset, value) in values.iter().enumerate() {
            let col = range.col_lower_bound + col_offset;
            if row.len() <= col {
                row.resize(col + 1, String::new());
            }
            row[col] = value.to_owned();
        }
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn authenticate(&self) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        Self::admit(&mut state, StoreRequest::Authenticate)?;
        state.authenticated = true;
        Ok(())
    }

    async fn read_range(&self, range: &RangeSpec) -> Result<Vec<Vec<String>>, TransportError> {
        let mut state = self.state.write().await;
        Self::admit(&mut state, StoreRequest::Read { range: range.to_string() })?;
        let grid = state.sheets.get(&range.sheet).ok_or_else(|| unknown_sheet(range))?;
        Ok(read_grid(grid, range))
    }

    async fn write_range(
        &self,
        range: &RangeSpec,
        values: Vec<Vec<String>>,
        option: ValueInputOption,
    ) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        Self::admit(
            &mut state,
            StoreRequest::Write {
                range: range.to_string(),
                values: values.to_vec(),
                option,
            },
        )?;
        check_fits(range, &values)?;
        let grid = state.sheets.get_mut(&range.sheet).ok_or_else(|| unknown_sheet(range))?;
        write_grid(grid, range, &values);
        Ok(())
    }

    async fn batch_write(&self, updates: Vec<RangeUpdate>, option: ValueInputOption) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        Self::admit(
            &mut state,
            StoreRequest::BatchWrite {
                updates: updates
                    .iter()
                    .map(|update| (update.range.to_string(), update.values.to_vec()))
                    .collect(),
                option,
            },
        )?;
        // Validate everything before touching any grid.
        for update in &updates {
            check_fits(&update.range, &update.values)?;
            if !state.sheets.contains_key(&update.range.sheet) {
                return Err(unknown_sheet(&update.range));
            }
        }
        for update in &updates {
            if let Some(grid) = state.sheets.get_mut(&update.range.sheet) {
                write_grid(grid, &update.range, &update.values);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new().with_sheet(
            "Pets",
            vec![
                strings(&["Name", "Age"]),
                strings(&["Buddy", "1", ""]),
                vec![],
                strings(&["Rex"]),
            ],
        )
        .await;
        store.authenticate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn requests_need_authentication() {
        let store = MemoryStore::new().with_sheet("Pets", vec![]).await;
        let range = RangeSpec::row("Pets", 1, 2);
        assert!(matches!(
            store.read_range(&range).await,
            Err(TransportError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn read_open_ended_range() {
        let store = store().await;
        let rows = store.read_range(&RangeSpec::rows_from("Pets", 1, 2)).await.unwrap();
        assert_eq!(
            rows,
            vec![strings(&["Name", "Age"]), strings(&["Buddy", "1"]), vec![], strings(&["Rex"])]
        );
    }

    #[tokio::test]
    async fn read_whole_sheet() {
        let store = store().await;
        store
            .write_range(&RangeSpec::row("Pets", 4, 4), vec![strings(&["Rex", "", "", "x"])], ValueInputOption::Raw)
            .await
            .unwrap();
        let rows = store.read_range(&RangeSpec::sheet("Pets")).await.unwrap();
        assert_eq!(
            rows,
            vec![strings(&["Name", "Age"]), strings(&["Buddy", "1"]), vec![], strings(&["Rex", "", "", "x"])]
        );
    }

    #[tokio::test]
    async fn sheets_added_later_are_shared() {
        let store = MemoryStore::new();
        let handle = store.clone();
        let _store = store.with_sheet("Pets", vec![strings(&["Name"])]).await;
        assert_eq!(handle.rows("Pets").await, vec![strings(&["Name"])]);
    }

    #[tokio::test]
    async fn read_trims_trailing_blank_rows() {
        let store = store().await;
        let rows = store.read_range(&RangeSpec::row("Pets", 3, 2)).await.unwrap();
        assert!(rows.is_empty());
        let rows = store.read_range(&RangeSpec::row("Pets", 40, 2)).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn write_grows_grid() {
        let store = store().await;
        store
            .write_range(&RangeSpec::row("Pets", 6, 2), vec![strings(&["Max", "4"])], ValueInputOption::Raw)
            .await
            .unwrap();
        let rows = store.rows("Pets").await;
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[4], Vec::<String>::new());
        assert_eq!(rows[5], strings(&["Max", "4"]));
    }

    #[tokio::test]
    async fn write_outside_range_is_rejected() {
        let store = store().await;
        let result = store
            .write_range(&RangeSpec::row("Pets", 2, 1), vec![strings(&["Max", "4"])], ValueInputOption::Raw)
            .await;
        assert!(matches!(result, Err(TransportError::StatusError { status: 400, .. })));
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = store().await;
        let updates = vec![
            RangeUpdate {
                range: RangeSpec::row("Pets", 2, 2),
                values: vec![strings(&["Buddy", "2"])],
            },
            RangeUpdate {
                range: RangeSpec::row("Dogs", 2, 2),
                values: vec![strings(&["Rex", "5"])],
            },
        ];
        assert!(store.batch_write(updates, ValueInputOption::UserEntered).await.is_err());
        assert_eq!(store.rows("Pets").await[1], strings(&["Buddy", "1"]));
    }

    #[tokio::test]
    async fn injected_failure_hits_next_request_only() {
        let store = store().await;
        store.fail_next("quota exceeded").await;
        let range = RangeSpec::row("Pets", 1, 2);
        assert!(matches!(
            store.read_range(&range).await,
            Err(TransportError::Unavailable(message)) if message == "quota exceeded"
        ));
        assert!(store.read_range(&range).await.is_ok());
    }

    #[tokio::test]
    async fn journal_records_requests() {
        let store = store().await;
        store.clear_requests().await;
        store.read_range(&RangeSpec::row("Pets", 1, 2)).await.unwrap();
        assert_eq!(
            store.requests().await,
            vec![StoreRequest::Read { range: "Pets!A1:B1".to_owned() }]
        );
    }
}
